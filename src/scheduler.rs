// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Wave Request Scheduler
 * Sends queued HTTP requests concurrently, at most max_threads in flight,
 * and hands each response to the handler registered with it
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */
use futures::stream::{self, StreamExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;

use crate::circuit_breaker::CircuitBreaker;
use crate::errors::ScannerResult;
use crate::http_client::{HttpClient, HttpResponse, ProbeRequest};

/// Runs once with the response of the request it was submitted with.
/// Handlers may run on any runtime thread and should return quickly.
pub type CompletionHandler = Box<dyn FnOnce(&HttpResponse) + Send + 'static>;

struct QueuedRequest {
    request: ProbeRequest,
    on_complete: CompletionHandler,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WaveReport {
    /// Requests that got a response (or a status-0 failure) and ran their handler
    pub completed: usize,
    /// Requests never sent because the health breaker opened mid-wave
    pub skipped: usize,
}

/// Wave-based request scheduler.
///
/// Callers queue requests with [`submit`](Self::submit), then block in
/// [`run_wave`](Self::run_wave) until every queued request has been answered
/// and its handler has run. The usual loop is "queue `max_threads`, run a
/// wave, repeat, then [`drain`](Self::drain)", which keeps memory and sockets
/// bounded. Within a wave handlers fire in response-arrival order.
pub struct RequestScheduler {
    client: Arc<HttpClient>,
    health: Arc<CircuitBreaker>,
    max_threads: usize,
    queue: Vec<QueuedRequest>,
    in_flight: Arc<AtomicUsize>,
    peak_in_flight: Arc<AtomicUsize>,
    requests_sent: usize,
}

impl RequestScheduler {
    pub fn new(client: Arc<HttpClient>, health: Arc<CircuitBreaker>, max_threads: usize) -> Self {
        Self {
            client,
            health,
            max_threads: max_threads.max(1),
            queue: Vec::new(),
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak_in_flight: Arc::new(AtomicUsize::new(0)),
            requests_sent: 0,
        }
    }

    pub fn submit<F>(&mut self, request: ProbeRequest, on_complete: F)
    where
        F: FnOnce(&HttpResponse) + Send + 'static,
    {
        self.queue.push(QueuedRequest {
            request,
            on_complete: Box::new(on_complete),
        });
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// True once a full wave worth of requests is waiting
    pub fn is_full(&self) -> bool {
        self.queue.len() >= self.max_threads
    }

    pub fn max_threads(&self) -> usize {
        self.max_threads
    }

    /// Highest number of concurrently unanswered requests seen so far
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    pub fn requests_sent(&self) -> usize {
        self.requests_sent
    }

    /// Send everything queued and wait for all of it.
    ///
    /// Every response goes through the health breaker first, then to its
    /// handler. Once the breaker is open no further request of the wave is
    /// started (those already in flight still complete and run their
    /// handlers) and the call returns [`ScannerError::TargetDown`].
    ///
    /// [`ScannerError::TargetDown`]: crate::errors::ScannerError::TargetDown
    pub async fn run_wave(&mut self) -> ScannerResult<WaveReport> {
        self.health.check()?;

        let batch = std::mem::take(&mut self.queue);
        let mut report = WaveReport::default();
        if batch.is_empty() {
            return Ok(report);
        }

        debug!(
            "[Scheduler] Running wave of {} requests (max_threads={})",
            batch.len(),
            self.max_threads
        );

        let client = Arc::clone(&self.client);
        let health = Arc::clone(&self.health);
        let in_flight = Arc::clone(&self.in_flight);
        let peak = Arc::clone(&self.peak_in_flight);

        let mut responses = stream::iter(batch)
            .map(move |queued| {
                let QueuedRequest {
                    request,
                    on_complete,
                } = queued;
                let client = Arc::clone(&client);
                let health = Arc::clone(&health);
                let in_flight = Arc::clone(&in_flight);
                let peak = Arc::clone(&peak);

                async move {
                    if health.is_open() {
                        return (on_complete, None);
                    }

                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);

                    let response = client.execute(&request).await;

                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    (on_complete, Some(response))
                }
            })
            .buffer_unordered(self.max_threads);

        while let Some((on_complete, response)) = responses.next().await {
            match response {
                Some(response) => {
                    self.health.observe(&response);
                    on_complete(&response);
                    report.completed += 1;
                }
                None => report.skipped += 1,
            }
        }

        self.requests_sent += report.completed;

        if report.skipped > 0 {
            debug!("[Scheduler] {} requests skipped, target down", report.skipped);
        }

        self.health.check()?;
        Ok(report)
    }

    /// Run whatever is still queued
    pub async fn drain(&mut self) -> ScannerResult<WaveReport> {
        self.run_wave().await
    }
}
