// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

use std::sync::Arc;
use std::time::Duration;

use crate::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
use crate::config::AppConfig;
use crate::errors::ScannerResult;
use crate::http_client::{HttpClient, HttpResponse, ProbeRequest};
use crate::progress::{NullProgress, ProgressSink};
use crate::scheduler::RequestScheduler;

/// Everything one run shares between its engines: the HTTP client, the
/// target-health breaker, the concurrency ceiling and the progress sink.
///
/// Nothing in here is global; two contexts never see each other's counters.
#[derive(Clone)]
pub struct ScanContext {
    pub client: Arc<HttpClient>,
    pub health: Arc<CircuitBreaker>,
    pub max_threads: usize,
    pub cache_ttl: Duration,
    pub progress: Arc<dyn ProgressSink>,
}

impl ScanContext {
    pub fn new(client: HttpClient, max_threads: usize) -> Self {
        Self {
            client: Arc::new(client),
            health: Arc::new(CircuitBreaker::default()),
            max_threads: max_threads.max(1),
            cache_ttl: Duration::ZERO,
            progress: Arc::new(NullProgress),
        }
    }

    pub fn from_config(config: &AppConfig) -> ScannerResult<Self> {
        let client = HttpClient::from_config(&config.http)?;
        Ok(Self::new(client, config.scanner.max_threads)
            .with_health(CircuitBreakerConfig {
                failure_threshold: config.scanner.target_down_threshold,
            })
            .with_cache_ttl(config.http.cache_ttl()))
    }

    pub fn with_health(mut self, config: CircuitBreakerConfig) -> Self {
        self.health = Arc::new(CircuitBreaker::new(config));
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Fresh scheduler bound to this run's client and breaker
    pub fn scheduler(&self) -> RequestScheduler {
        RequestScheduler::new(self.client.clone(), self.health.clone(), self.max_threads)
    }

    /// Single request outside of a wave. Goes through the health breaker like
    /// every scheduled request does.
    pub async fn fetch(&self, request: ProbeRequest) -> ScannerResult<HttpResponse> {
        self.health.check()?;
        let response = self.client.execute(&request).await;
        self.health.observe(&response);
        self.health.check()?;
        Ok(response)
    }
}
