//! Retry utilities for the fetch collaborator.
//!
//! Transient failures (see [`ExtractionError::is_transient`]) are retried with
//! exponential backoff. Everything else is returned immediately so the
//! extraction pipeline can move on to the next tier.

use std::future::Future;
use std::time::Duration;

use crate::error::ExtractionError;

/// Executes `operation` with exponential backoff retries on transient errors.
///
/// On a transient error the function sleeps for
/// `backoff_base_ms * 2^attempt` milliseconds and tries again, up to
/// `max_retries` additional attempts after the first try. A
/// [`ExtractionError::RateLimited`] error waits at least as long as the
/// server's `Retry-After`. Every sleep is capped at `max_delay` and at the
/// global backoff ceiling. If all retries are exhausted the last error is
/// returned.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    max_delay: Duration,
    mut operation: F,
) -> Result<T, ExtractionError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ExtractionError>>,
{
    let mut attempt = 0u32;

    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        if !err.is_transient() || attempt >= max_retries {
            return Err(err);
        }

        let ceiling_ms = u64::try_from(max_delay.as_millis()).unwrap_or(u64::MAX);
        let delay_ms = backoff_delay_ms(&err, backoff_base_ms, attempt).min(ceiling_ms);
        tracing::warn!(
            attempt,
            max_retries,
            delay_ms,
            error = %err,
            "transient fetch error; retrying after backoff"
        );
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        attempt += 1;
    }
}

/// Upper bound for a single backoff sleep.
const MAX_BACKOFF_MS: u64 = 10_000;

fn backoff_delay_ms(err: &ExtractionError, backoff_base_ms: u64, attempt: u32) -> u64 {
    let exponential = backoff_base_ms.saturating_mul(1u64 << attempt.min(62));
    let floor = match err {
        ExtractionError::RateLimited {
            retry_after_secs, ..
        } if backoff_base_ms > 0 => retry_after_secs.saturating_mul(1000),
        _ => 0,
    };
    exponential.max(floor).min(MAX_BACKOFF_MS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    const UNCAPPED: Duration = Duration::from_secs(60);

    fn unavailable() -> ExtractionError {
        ExtractionError::UnexpectedStatus {
            status: 503,
            url: "https://www.walmart.com/ip/1".to_owned(),
        }
    }

    #[tokio::test]
    async fn succeeds_immediately_on_first_try() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&call_count);
        let result = retry_with_backoff(1, 0, UNCAPPED, || {
            let cc = Arc::clone(&cc);
            async move {
                cc.fetch_add(1, Ordering::SeqCst);
                Ok::<u32, ExtractionError>(42)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_once_then_succeeds() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&call_count);
        let result = retry_with_backoff(1, 0, UNCAPPED, || {
            let cc = Arc::clone(&cc);
            async move {
                if cc.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(unavailable())
                } else {
                    Ok::<u32, ExtractionError>(7)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(call_count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn gives_up_after_single_retry() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&call_count);
        let result = retry_with_backoff(1, 0, UNCAPPED, || {
            let cc = Arc::clone(&cc);
            async move {
                cc.fetch_add(1, Ordering::SeqCst);
                Err::<u32, ExtractionError>(unavailable())
            }
        })
        .await;
        assert_eq!(call_count.load(Ordering::SeqCst), 2);
        assert!(matches!(
            result,
            Err(ExtractionError::UnexpectedStatus { status: 503, .. })
        ));
    }

    #[tokio::test]
    async fn does_not_retry_not_found() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&call_count);
        let result = retry_with_backoff(1, 0, UNCAPPED, || {
            let cc = Arc::clone(&cc);
            async move {
                cc.fetch_add(1, Ordering::SeqCst);
                Err::<u32, ExtractionError>(ExtractionError::NotFound {
                    url: "https://www.target.com/p/gone".to_owned(),
                })
            }
        })
        .await;
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(ExtractionError::NotFound { .. })));
    }

    #[tokio::test]
    async fn sleep_is_held_to_the_caller_ceiling() {
        let started = std::time::Instant::now();
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&call_count);
        let result = retry_with_backoff(1, 100, Duration::from_millis(20), || {
            let cc = Arc::clone(&cc);
            async move {
                if cc.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(ExtractionError::RateLimited {
                        domain: "www.walmart.com".to_owned(),
                        retry_after_secs: 60,
                    })
                } else {
                    Ok::<u32, ExtractionError>(3)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 3);
        // a 60s Retry-After would otherwise sleep for the 10s ceiling
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn backoff_honours_retry_after_within_ceiling() {
        let limited = ExtractionError::RateLimited {
            domain: "www.amazon.com".to_owned(),
            retry_after_secs: 2,
        };
        assert_eq!(backoff_delay_ms(&limited, 100, 0), 2_000);

        let long_wait = ExtractionError::RateLimited {
            domain: "www.amazon.com".to_owned(),
            retry_after_secs: 3_600,
        };
        assert_eq!(backoff_delay_ms(&long_wait, 100, 0), MAX_BACKOFF_MS);
        assert_eq!(backoff_delay_ms(&unavailable(), 250, 1), 500);
        assert_eq!(backoff_delay_ms(&long_wait, 0, 0), 0);
    }
}
