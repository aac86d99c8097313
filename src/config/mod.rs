// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

pub mod core;
pub mod loader;
pub mod validation;

pub use core::{AppConfig, DataPaths, HttpConfig, ScannerConfig};

pub use loader::{load_config, ConfigFormat, ConfigLoader};

pub use validation::ConfigValidator;
