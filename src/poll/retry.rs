//! Transient-failure retry with exponential backoff and jitter (§4.7).
//!
//! Starting delay 1s, doubling to a cap of 30s, with ±20% jitter. A 429
//! response's `Retry-After` is honored as a floor for the next attempt's
//! delay. Non-retryable errors (4xx other than 429) and exhausted
//! retries return immediately.

use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::error::AdapterError;

const BASE_DELAY: Duration = Duration::from_secs(1);
const MAX_DELAY: Duration = Duration::from_secs(30);

fn jittered(delay: Duration) -> Duration {
    let factor = rand::thread_rng().gen_range(0.8..=1.2);
    Duration::from_secs_f64((delay.as_secs_f64() * factor).max(0.0))
}

/// Retry `op` up to `max_retries` additional times after the first
/// attempt, while the returned error is retryable (§7 `isRetryable`).
/// Non-retryable errors and the final exhausted attempt propagate
/// unchanged to the caller, which is responsible for classifying the
/// sync outcome as `Failed` (§4.7).
pub async fn with_retry<F, Fut, T>(max_retries: u32, op: F) -> Result<T, AdapterError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AdapterError>>,
{
    with_retry_counted(max_retries, op).await.map(|(value, _attempts)| value)
}

/// Like [`with_retry`], but also returns the number of retry attempts
/// made beyond the first call, so callers can report `retryCount` on
/// operations alerts (§7) instead of guessing at it.
pub async fn with_retry_counted<F, Fut, T>(max_retries: u32, mut op: F) -> Result<(T, u32), AdapterError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AdapterError>>,
{
    let mut attempt = 0;
    let mut delay = BASE_DELAY;

    loop {
        match op().await {
            Ok(value) => return Ok((value, attempt)),
            Err(err) if err.is_retryable && attempt < max_retries => {
                attempt += 1;
                let floor = err.retry_after_seconds.map(Duration::from_secs).unwrap_or(Duration::ZERO);
                let wait = jittered(delay).max(floor);
                log::warn!(
                    "retrying {} for adapter '{}' (attempt {}/{}) after {:?}: {}",
                    err.operation,
                    err.adapter_id,
                    attempt,
                    max_retries,
                    wait,
                    err
                );
                tokio::time::sleep(wait).await;
                delay = (delay * 2).min(MAX_DELAY);
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_succeeds_without_retry() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, AdapterError> = with_retry(3, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(42) }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retries_transient_then_succeeds() {
        let calls = AtomicU32::new(0);
        let result = with_retry(3, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(AdapterError::from_status("a", "P", "listUsers", Some(503), None))
                } else {
                    Ok(7)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_fails_immediately() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, AdapterError> = with_retry(3, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(AdapterError::from_status("a", "P", "getUser", Some(404), None)) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exhausts_retries_and_propagates() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, AdapterError> = with_retry(2, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(AdapterError::from_status("a", "P", "listUsers", Some(503), None)) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
