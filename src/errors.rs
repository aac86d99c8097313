// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Scanner Error Types
 * Fatal error taxonomy for enumeration and credential testing runs
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use std::path::PathBuf;
use thiserror::Error;

/// Errors that terminate a detection or brute-force run.
///
/// Per-request failures (timeouts, 5xx, odd responses) never show up here:
/// they are classified where the response is handled and only surface through
/// counters and the progress channel.
#[derive(Error, Debug)]
pub enum ScannerError {
    /// Missing or unusable input, reported before any request is issued
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Health monitor tripped: too many responses without a status code
    #[error("The target seems to be down ({failures} requests without a response)")]
    TargetDown { failures: u32 },

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid vulnerability database {path}: {reason}")]
    VulnDatabase { path: PathBuf, reason: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("The remote website is up, but does not seem to be running WordPress: {url}")]
    NotWordPress { url: String },

    #[error("The remote host redirects to {location}, use --follow-redirection to follow it")]
    Redirected { location: String },

    #[error("HTTP client error: {0}")]
    Http(String),
}

impl ScannerError {
    pub fn config(message: impl Into<String>) -> Self {
        ScannerError::Configuration(message.into())
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ScannerError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<reqwest::Error> for ScannerError {
    fn from(err: reqwest::Error) -> Self {
        ScannerError::Http(err.to_string())
    }
}

impl From<url::ParseError> for ScannerError {
    fn from(err: url::ParseError) -> Self {
        ScannerError::InvalidUrl(err.to_string())
    }
}

/// Result type for scanner operations
pub type ScannerResult<T> = Result<T, ScannerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_down_message() {
        let err = ScannerError::TargetDown { failures: 10 };
        assert_eq!(
            err.to_string(),
            "The target seems to be down (10 requests without a response)"
        );
    }

    #[test]
    fn test_configuration_message() {
        let err = ScannerError::config("A file must be supplied");
        assert!(err.to_string().contains("A file must be supplied"));
    }
}
