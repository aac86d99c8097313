// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - WordPress Enumeration Library
 * Component detection and credential testing engines
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

pub mod circuit_breaker;
pub mod config;
pub mod context;
pub mod errors;
pub mod http_client;
pub mod models;
pub mod progress;
pub mod scheduler;
pub mod target;

// Detection and brute-force engines
pub mod scanners;

pub use context::ScanContext;
pub use errors::{ScannerError, ScannerResult};
