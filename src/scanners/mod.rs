// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - WordPress Enumeration Engines
 * Item detection and credential testing on top of the wave scheduler
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

pub mod brute_force;
pub mod detector;
pub mod families;
pub mod wordpress;

pub use brute_force::{
    classify_login_response, BruteForceOptions, BruteForceReport, CredentialBruteForcer,
    LoginOutcome,
};
pub use detector::{DetectionOptions, Detector};
pub use families::{DirectoryFamily, ExistenceCheck, ItemFamily, TimthumbFamily, UserFamily};
pub use wordpress::{
    BruteForceSettings, ComponentScope, EnumerationPlan, ScanReport, WordPressScanner,
};
