// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Circuit Breaker Pattern
 * Aborts a run once the target stops answering
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use tracing::{debug, warn};

use crate::errors::ScannerError;
use crate::http_client::HttpResponse;

/// A target is considered down after this many responses with status 0
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
        }
    }
}

/// Run-scoped health monitor.
///
/// Every response of the run passes through [`CircuitBreaker::observe`] before
/// the request-specific handler sees it. The failure count is cumulative for
/// the whole run and never resets; once open, the breaker stays open.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    failure_count: AtomicU32,
    open: AtomicBool,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            failure_count: AtomicU32::new(0),
            open: AtomicBool::new(false),
        }
    }

    pub fn observe(&self, response: &HttpResponse) -> CircuitState {
        if response.status_code == 0 {
            self.record_failure()
        } else {
            self.state()
        }
    }

    pub fn record_failure(&self) -> CircuitState {
        let failures = self.failure_count.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("Zero-status response #{}", failures);

        if failures >= self.config.failure_threshold && !self.open.swap(true, Ordering::SeqCst) {
            warn!(
                "Circuit breaker opening after {} requests without a response",
                failures
            );
        }

        self.state()
    }

    pub fn state(&self) -> CircuitState {
        if self.open.load(Ordering::SeqCst) {
            CircuitState::Open
        } else {
            CircuitState::Closed
        }
    }

    pub fn is_open(&self) -> bool {
        self.state() == CircuitState::Open
    }

    pub fn failure_count(&self) -> u32 {
        self.failure_count.load(Ordering::SeqCst)
    }

    /// The fatal error to unwind with, if the breaker has tripped
    pub fn check(&self) -> Result<(), ScannerError> {
        if self.is_open() {
            Err(ScannerError::TargetDown {
                failures: self.failure_count(),
            })
        } else {
            Ok(())
        }
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status_code: u16) -> HttpResponse {
        let mut response = HttpResponse::no_response(false, 0);
        response.status_code = status_code;
        response
    }

    #[test]
    fn test_opens_on_tenth_zero_status() {
        let cb = CircuitBreaker::default();

        for _ in 0..9 {
            assert_eq!(cb.observe(&response(0)), CircuitState::Closed);
        }
        assert!(cb.check().is_ok());

        assert_eq!(cb.observe(&response(0)), CircuitState::Open);
        assert!(matches!(
            cb.check(),
            Err(ScannerError::TargetDown { failures: 10 })
        ));
    }

    #[test]
    fn test_error_statuses_do_not_count() {
        let cb = CircuitBreaker::default();

        for status in [404, 500, 502, 503, 403] {
            for _ in 0..5 {
                cb.observe(&response(status));
            }
        }

        assert_eq!(cb.failure_count(), 0);
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[test]
    fn test_count_is_cumulative_not_consecutive() {
        let cb = CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 3,
        });

        cb.observe(&response(0));
        cb.observe(&response(200));
        cb.observe(&response(0));
        cb.observe(&response(200));
        assert_eq!(cb.state(), CircuitState::Closed);

        cb.observe(&response(0));
        assert_eq!(cb.state(), CircuitState::Open);

        // Stays open whatever comes next
        cb.observe(&response(200));
        assert!(cb.is_open());
    }

    #[test]
    fn test_concurrent_observers() {
        let cb = std::sync::Arc::new(CircuitBreaker::default());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let cb = cb.clone();
                std::thread::spawn(move || {
                    for _ in 0..5 {
                        cb.record_failure();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(cb.failure_count(), 20);
        assert!(cb.is_open());
    }
}
