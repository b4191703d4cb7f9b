//! Politeness pacing between successive requests to one target.
//!
//! A crawl is strictly serial: each request start waits until at least the
//! configured delay has elapsed since the previous start. The wait is the
//! crawl's only suspension point besides the fetch itself, so it also
//! observes cancellation.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Enforces a minimum gap between request starts.
#[derive(Debug)]
pub struct RequestPacer {
    delay: Duration,
    last_start: Option<Instant>,
}

impl RequestPacer {
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            last_start: None,
        }
    }

    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Waits until the next request may start, then records the start.
    ///
    /// The first call returns immediately. Returns `false`, without
    /// recording a start, if `cancel` fires during the wait.
    pub async fn wait(&mut self, cancel: &CancellationToken) -> bool {
        if let Some(last) = self.last_start {
            let ready_at = last + self.delay;
            if Instant::now() < ready_at {
                tracing::debug!(
                    delay_ms = u64::try_from(self.delay.as_millis()).unwrap_or(u64::MAX),
                    "pacing before next request"
                );
                tokio::select! {
                    () = cancel.cancelled() => return false,
                    () = tokio::time::sleep_until(ready_at) => {}
                }
            }
        }
        self.last_start = Some(Instant::now());
        true
    }
}
