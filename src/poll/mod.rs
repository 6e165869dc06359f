//! Timeout-bounded polling
//!
//! Repeatedly samples an async predicate until it reports the wanted
//! value or a deadline passes.

use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

/// Samples a predicate at a fixed interval until a timeout
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeoutSampler {
    timeout: Duration,
    interval: Duration,
}

impl TimeoutSampler {
    /// Create a sampler with the given timeout and a 3 second interval
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            interval: Duration::from_secs(3),
        }
    }

    /// Set the delay between samples
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Sample `func` until it returns `expected`.
    ///
    /// Returns `true` once the expected value is observed and `false` if the
    /// timeout elapses first. The predicate is always sampled at least once.
    /// A sample that errors is logged and counted as a miss.
    pub async fn wait_for_func_status<F, Fut>(&self, mut func: F, expected: bool) -> bool
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<bool>>,
    {
        let start = Instant::now();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;

            match func().await {
                Ok(value) if value == expected => {
                    debug!("Expected status {} observed after {} samples", expected, attempt);
                    return true;
                }
                Ok(value) => {
                    debug!("Sample {} returned {}, waiting for {}", attempt, value, expected);
                }
                Err(e) => {
                    warn!("Sample {} failed: {:#}", attempt, e);
                }
            }

            if start.elapsed() >= self.timeout {
                warn!(
                    "Timed out after {}s ({} samples) waiting for status {}",
                    self.timeout.as_secs(),
                    attempt,
                    expected
                );
                return false;
            }

            sleep(self.interval).await;
        }
    }
}
