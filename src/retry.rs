use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// Bounded exponential backoff, parameterized per call site.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub multiplier: u32,
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32, base_delay: Duration, multiplier: u32) -> Self {
        Self {
            max_attempts,
            base_delay,
            multiplier,
        }
    }

    /// Run `op` until it succeeds, the error is not retryable, or
    /// `max_attempts` is exhausted; the last error is returned unchanged.
    /// Sleeps `base_delay` after the first failed attempt, doubling (or
    /// whatever `multiplier` says) after each further one.
    pub async fn run<T, E, F, Fut, P>(&self, mut op: F, mut retryable: P) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: FnMut(&E) -> bool,
        E: Display,
    {
        let mut delay = self.base_delay;
        let mut attempt = 1u32;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.max_attempts && retryable(&e) => {
                    warn!(
                        "Attempt {}/{} failed: {} (retrying in {:?})",
                        attempt, self.max_attempts, e, delay
                    );
                    tokio::time::sleep(delay).await;
                    delay *= self.multiplier;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
