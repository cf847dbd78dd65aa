//! Retry helper for upstream fetches
//!
//! Exponential backoff (base → 2x per attempt, capped) with ±jitter. Each
//! attempt is bounded by its own timeout. Only retryable error codes are
//! retried; everything else is returned on first occurrence.

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::models::config::RetryPolicy;
use crate::models::errors::{AppError, AppResult, ErrorCode};

/// Delay before retry number `retry` (1-based), jitter included
pub fn backoff_delay(policy: &RetryPolicy, retry: u32) -> Duration {
    let base_ms = policy.base_delay.as_millis() as u64;
    let cap_ms = policy.max_delay.as_millis() as u64;
    let exp = retry.saturating_sub(1).min(16);
    let capped = base_ms.saturating_mul(1u64 << exp).min(cap_ms);

    let jitter_range = (capped * policy.jitter_percent) / 100;
    let jitter: i64 = if jitter_range == 0 {
        0
    } else {
        rand::thread_rng().gen_range(-(jitter_range as i64)..=(jitter_range as i64))
    };
    Duration::from_millis((capped as i64 + jitter).max(0) as u64)
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the policy
/// runs out of attempts. Exhaustion surfaces as `UPSTREAM_UNAVAILABLE`.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    attempt_timeout: Duration,
    operation: &str,
    mut op: F,
) -> AppResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut last_error: Option<AppError> = None;

    for attempt in 0..attempts {
        if attempt > 0 {
            let delay = backoff_delay(policy, attempt);
            debug!(
                operation,
                attempt = attempt + 1,
                max_attempts = attempts,
                delay_ms = delay.as_millis() as u64,
                "⏳ Retrying upstream call"
            );
            tokio::time::sleep(delay).await;
        }

        let result = match tokio::time::timeout(attempt_timeout, op()).await {
            Ok(result) => result,
            Err(_) => Err(AppError::upstream_timeout(format!(
                "{} timed out after {}ms",
                operation,
                attempt_timeout.as_millis()
            ))),
        };

        match result {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() => {
                if e.code == ErrorCode::UpstreamRateLimited {
                    warn!(operation, attempt = attempt + 1, "⏳ Rate limited, backing off");
                } else {
                    warn!(
                        operation,
                        attempt = attempt + 1,
                        error = %e,
                        "⚠️ Upstream call failed"
                    );
                }
                last_error = Some(e);
            }
            Err(e) => return Err(e),
        }
    }

    let message = format!("{} failed after {} attempts", operation, attempts);
    Err(match last_error {
        Some(e) => AppError::with_source(ErrorCode::UpstreamUnavailable, message, e),
        None => AppError::upstream_unavailable(message),
    })
}
