//! Retry policy for provider calls
//!
//! One policy object is shared by every provider-backed stage. Transient
//! errors are retried with exponential backoff up to the bound; permanent
//! errors are returned immediately.

use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::provider::ProviderError;

/// Bounded retry with capped exponential backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first call
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

/// A successful call and the number of calls it took
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Retried<T> {
    pub value: T,
    pub calls: u32,
}

/// The last error once retrying stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exhausted {
    pub error: ProviderError,
    pub calls: u32,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, initial_backoff: Duration, max_backoff: Duration) -> Self {
        Self {
            max_retries,
            initial_backoff,
            max_backoff,
        }
    }

    /// Policy without delays between retries
    pub fn immediate(max_retries: u32) -> Self {
        Self::new(max_retries, Duration::ZERO, Duration::ZERO)
    }

    /// Delay before retry number `retry` (1-based)
    pub fn delay_for(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }

        let factor = 2u32.saturating_pow(retry - 1);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }

    /// Runs `op` until it succeeds, fails permanently or the bound is hit
    ///
    /// # Arguments
    /// * `label` - Name used in retry log lines
    /// * `op` - Produces a fresh attempt each time it is called
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<Retried<T>, Exhausted>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let total = self.max_retries + 1;
        let mut calls = 0;

        loop {
            calls += 1;

            match op().await {
                Ok(value) => return Ok(Retried { value, calls }),
                Err(error) if error.is_transient() && calls < total => {
                    let delay = self.delay_for(calls);
                    warn!(
                        "{} failed (call {}/{}): {}; retrying in {:?}",
                        label, calls, total, error, delay
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
                Err(error) => return Err(Exhausted { error, calls }),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(2, Duration::from_millis(500), Duration::from_secs(8))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy::new(5, Duration::from_millis(100), Duration::from_millis(350));
        assert_eq!(policy.delay_for(0), Duration::ZERO);
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(350));
    }

    #[tokio::test]
    async fn test_transient_errors_are_retried() {
        let counter = AtomicU32::new(0);
        let result = RetryPolicy::immediate(2)
            .run("draft", || async {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(ProviderError::Transient("timeout".into()))
                } else {
                    Ok("text")
                }
            })
            .await
            .unwrap();

        assert_eq!(result.value, "text");
        assert_eq!(result.calls, 3);
    }

    #[tokio::test]
    async fn test_retry_bound_is_respected() {
        let counter = AtomicU32::new(0);
        let err = RetryPolicy::immediate(2)
            .run("draft", || async {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(ProviderError::Transient("timeout".into()))
            })
            .await
            .unwrap_err();

        assert_eq!(err.calls, 3);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert!(err.error.is_transient());
    }

    #[tokio::test]
    async fn test_permanent_error_is_not_retried() {
        let counter = AtomicU32::new(0);
        let err = RetryPolicy::immediate(2)
            .run("seo", || async {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(ProviderError::Permanent("bad request".into()))
            })
            .await
            .unwrap_err();

        assert_eq!(err.calls, 1);
        assert!(!err.error.is_transient());
    }
}
