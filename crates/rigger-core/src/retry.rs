//! Bounded retry with exponential backoff
//!
//! Wraps flaky calls (rate-limited launch endpoints, task polling)
//! with a capped exponential backoff and full jitter. Attempts are
//! counted including the first call, so `max_attempts = 3` means at
//! most two retries.

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Retry policy for a flaky operation
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_wait: Duration,
    max_wait: Duration,
}

impl RetryPolicy {
    /// Policy with the given attempt budget and default waits
    /// (1 s base, 10 s cap)
    #[inline]
    #[must_use]
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_wait: Duration::from_secs(1),
            max_wait: Duration::from_secs(10),
        }
    }

    /// With a base wait
    #[inline]
    #[must_use]
    pub fn with_base_wait(mut self, base: Duration) -> Self {
        self.base_wait = base;
        self
    }

    /// With a wait cap
    #[inline]
    #[must_use]
    pub fn with_max_wait(mut self, max: Duration) -> Self {
        self.max_wait = max;
        self
    }

    /// Attempt budget
    #[inline]
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Run an operation, retrying every failure
    ///
    /// # Errors
    /// Returns the final error once the attempt budget is spent.
    pub async fn run<T, E, F, Fut>(&self, what: &str, op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        self.run_if(what, op, |_| true).await
    }

    /// Run an operation, retrying only errors the predicate accepts
    ///
    /// # Errors
    /// Returns the first non-retryable error, or the final error once
    /// the attempt budget is spent.
    pub async fn run_if<T, E, F, Fut, P>(
        &self,
        what: &str,
        mut op: F,
        retryable: P,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
        P: Fn(&E) -> bool,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.max_attempts && retryable(&e) => {
                    let wait = self.backoff(attempt);
                    tracing::debug!(
                        what,
                        attempt,
                        wait_ms = wait.as_millis() as u64,
                        error = %e,
                        "retrying after failure"
                    );
                    sleep(wait).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Jittered wait before the next attempt
    ///
    /// Full jitter: uniform over zero to the capped exponential step.
    fn backoff(&self, attempt: u32) -> Duration {
        let shift = (attempt - 1).min(16);
        let step = self
            .base_wait
            .saturating_mul(1u32 << shift)
            .min(self.max_wait);
        let jittered = rand::rng().random_range(0..=step.as_millis() as u64);
        Duration::from_millis(jittered)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts)
            .with_base_wait(Duration::from_millis(1))
            .with_max_wait(Duration::from_millis(2))
    }

    #[tokio::test]
    async fn succeeds_after_retries() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, String> = fast(5)
            .run("op", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err("transient".to_string())
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;
        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn stops_at_attempt_budget() {
        let calls = AtomicU32::new(0);
        let result: Result<(), String> = fast(3)
            .run("op", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("always".to_string()) }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn predicate_blocks_retry() {
        let calls = AtomicU32::new(0);
        let result: Result<(), String> = fast(5)
            .run_if(
                "op",
                || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err("fatal".to_string()) }
                },
                |e| e != "fatal",
            )
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn backoff_respects_cap() {
        let policy = RetryPolicy::new(20)
            .with_base_wait(Duration::from_millis(100))
            .with_max_wait(Duration::from_millis(250));
        for attempt in 1..20 {
            assert!(policy.backoff(attempt) <= Duration::from_millis(250));
        }
    }
}
