//! Timeout and bounded exponential backoff for upstream API calls.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::PerceptorError;

/// Backoff schedule for a retried call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    /// Multiplier applied for each subsequent wait.
    pub backoff_factor: f64,
    pub max_delay_ms: u64,
    /// Add ±25% random jitter to each computed delay.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            backoff_factor: 2.0,
            max_delay_ms: 8_000,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Delay before the retry that follows failed attempt `attempt` (1-indexed).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let raw = self.base_delay_ms as f64 * self.backoff_factor.powi((attempt - 1) as i32);
        let capped = raw.min(self.max_delay_ms as f64).max(0.0) as u64;

        let delay_ms = if self.jitter && capped >= 4 {
            let spread = capped / 4;
            let offset = rand::thread_rng().gen_range(0..=spread * 2);
            (capped - spread) + offset
        } else {
            capped
        };

        Duration::from_millis(delay_ms)
    }

    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

/// Per-call timeout plus the retry schedule applied around it.
#[derive(Debug, Clone)]
pub struct UpstreamCallPolicy {
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for UpstreamCallPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }
}

/// Run `op` under `policy`: each attempt is bounded by the timeout, and
/// transient failures are retried with backoff until attempts run out.
pub async fn call_with_retry<T, F, Fut>(
    service: &str,
    policy: &UpstreamCallPolicy,
    mut op: F,
) -> Result<T, PerceptorError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, PerceptorError>>,
{
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        let outcome = match tokio::time::timeout(policy.timeout, op()).await {
            Ok(result) => result,
            Err(_) => Err(PerceptorError::UpstreamTimeout {
                service: service.to_string(),
                timeout_ms: policy.timeout.as_millis() as u64,
            }),
        };

        match outcome {
            Ok(value) => {
                if attempt > 1 {
                    debug!(service, attempt, "Upstream call succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) if err.is_transient() && policy.retry.should_retry(attempt) => {
                let delay = policy.retry.delay_for(attempt);
                warn!(
                    service,
                    attempt,
                    max = policy.retry.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Upstream call failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn quick_policy(max_attempts: u32) -> UpstreamCallPolicy {
        UpstreamCallPolicy {
            timeout: Duration::from_millis(50),
            retry: RetryPolicy {
                max_attempts,
                base_delay_ms: 1,
                backoff_factor: 2.0,
                max_delay_ms: 5,
                jitter: false,
            },
        }
    }

    #[test]
    fn exponential_backoff_grows_and_caps() {
        let policy = RetryPolicy {
            jitter: false,
            ..Default::default()
        };
        assert_eq!(policy.delay_for(1).as_millis(), 500);
        assert_eq!(policy.delay_for(2).as_millis(), 1_000);
        assert_eq!(policy.delay_for(3).as_millis(), 2_000);
        assert_eq!(policy.delay_for(20).as_millis(), 8_000);
    }

    #[test]
    fn jitter_stays_within_a_quarter() {
        let policy = RetryPolicy::default();
        for _ in 0..50 {
            let d = policy.delay_for(1).as_millis();
            assert!((375..=625).contains(&d), "jittered delay out of range: {d}");
        }
    }

    #[tokio::test]
    async fn retries_transient_errors_until_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let result = call_with_retry("test", &quick_policy(3), || {
            let counter = Arc::clone(&counter);
            async move {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    Err(PerceptorError::upstream_status("test", 503, "busy"))
                } else {
                    Ok(n)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let result: Result<(), _> = call_with_retry("test", &quick_policy(5), || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(PerceptorError::upstream_status("test", 401, "denied"))
            }
        })
        .await;
        assert!(matches!(
            result,
            Err(PerceptorError::Upstream { status: Some(401), .. })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn timeouts_surface_as_distinct_kind() {
        let result: Result<(), _> = call_with_retry("slow", &quick_policy(2), || async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        match result {
            Err(PerceptorError::UpstreamTimeout { service, timeout_ms }) => {
                assert_eq!(service, "slow");
                assert_eq!(timeout_ms, 50);
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }
}
