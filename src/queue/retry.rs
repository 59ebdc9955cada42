use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use super::config::RequestOptions;
use super::errors::QueueError;
use super::types::BoxError;

pub const BACKOFF_FACTOR: f64 = 1.5;
pub const JITTER_MIN: f64 = 0.85;
pub const JITTER_MAX: f64 = 1.15;

/// Delay before retry number `attempt` (1-based): `base * 1.5^(attempt-1) * jitter`,
/// rounded to the nearest millisecond
pub fn backoff_delay(base: Duration, attempt: u32, jitter: f64) -> Duration {
    let exponent = attempt.saturating_sub(1) as i32;
    let millis = base.as_millis() as f64 * BACKOFF_FACTOR.powi(exponent) * jitter;
    Duration::from_millis(millis.round() as u64)
}

/// Uniform jitter factor in `[0.85, 1.15]`
pub fn jitter() -> f64 {
    rand::random_range(JITTER_MIN..=JITTER_MAX)
}

/// Retry bookkeeping for a single request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryContext {
    /// Failed attempts so far
    pub attempt: u32,
    /// Most recent backoff
    pub backoff: Duration,
}

impl RetryContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure and compute the jittered wait before the next try
    pub fn record_failure(&mut self, base: Duration) -> Duration {
        self.attempt += 1;
        self.backoff = backoff_delay(base, self.attempt, jitter());
        self.backoff
    }
}

/// Race `action` against its deadline and retry with backoff until it succeeds
/// or `max_retries` retries have failed.
///
/// Dropping an attempt on timeout cancels it at its next suspension point; any
/// side effects it already produced stay, so actions must be safe to repeat.
pub async fn run_with_retries<F, Fut, T, E>(
    label: &str,
    action: &F,
    options: RequestOptions,
) -> Result<T, QueueError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Into<BoxError>,
{
    let deadline = options.timeout();
    let mut context = RetryContext::new();

    loop {
        let failure = match tokio::time::timeout(deadline, action()).await {
            Ok(Ok(value)) => {
                if context.attempt > 0 {
                    debug!("🔁 Request on '{}' succeeded after {} retries", label, context.attempt);
                }
                return Ok(value);
            }
            Ok(Err(e)) => QueueError::action(e),
            Err(_) => QueueError::Timeout(deadline),
        };

        if context.attempt < options.max_retries {
            let delay = context.record_failure(options.retry_delay());
            warn!(
                "⚠️ Request attempt {} on '{}' failed, retrying after {:?}: {}",
                context.attempt, label, delay, failure
            );
            tokio::time::sleep(delay).await;
        } else {
            let attempts = context.attempt + 1;
            warn!("💥 Request on '{}' failed after {} attempts: {}", label, attempts, failure);
            return Err(QueueError::ExhaustedRetries {
                attempts,
                source: Box::new(failure),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    #[test]
    fn test_backoff_growth() {
        let base = Duration::from_millis(1000);
        assert_eq!(backoff_delay(base, 1, 1.0), Duration::from_millis(1000));
        assert_eq!(backoff_delay(base, 2, 1.0), Duration::from_millis(1500));
        assert_eq!(backoff_delay(base, 3, 1.0), Duration::from_millis(2250));
        assert_eq!(backoff_delay(base, 1, JITTER_MIN), Duration::from_millis(850));
        assert_eq!(backoff_delay(base, 1, JITTER_MAX), Duration::from_millis(1150));
    }

    #[test]
    fn test_jitter_bounds() {
        for _ in 0..1000 {
            let j = jitter();
            assert!((JITTER_MIN..=JITTER_MAX).contains(&j), "jitter {} out of range", j);
        }
    }

    #[test]
    fn test_context_tracks_attempts() {
        let mut context = RetryContext::new();
        let first = context.record_failure(Duration::from_millis(100));
        assert_eq!(context.attempt, 1);
        assert!(first >= Duration::from_millis(85) && first <= Duration::from_millis(115));
        let second = context.record_failure(Duration::from_millis(100));
        assert_eq!(context.attempt, 2);
        assert!(second >= Duration::from_millis(127) && second <= Duration::from_millis(173));
        assert_eq!(context.backoff, second);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fails_twice_then_succeeds() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let action = move || async move {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err("transient")
            } else {
                Ok(7)
            }
        };
        let options = RequestOptions::default().with_retry_delay_ms(1000);

        let started = Instant::now();
        let value = run_with_retries("flaky", &action, options).await.unwrap();
        let elapsed = started.elapsed();

        assert_eq!(value, 7);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        // (1 + 1.5) * retry_delay, within jitter bounds
        assert!(elapsed >= Duration::from_millis(2125), "elapsed {:?}", elapsed);
        assert!(elapsed <= Duration::from_millis(2875), "elapsed {:?}", elapsed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_wrap_last_error() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let action = move || async move {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(format!("failure {}", n))
        };
        let options = RequestOptions::default().with_max_retries(2).with_retry_delay_ms(10);

        let err = run_with_retries("doomed", &action, options).await.unwrap_err();
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        match err {
            QueueError::ExhaustedRetries { attempts, source } => {
                assert_eq!(attempts, 3);
                assert_eq!(source.to_string(), "Action failed: failure 2");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_counts_as_failure() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let action = move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, BoxError>(())
        };
        let options = RequestOptions::default()
            .with_timeout_ms(200)
            .with_max_retries(1)
            .with_retry_delay_ms(50);

        let err = run_with_retries("slow", &action, options).await.unwrap_err();
        assert_eq!(counter.load(Ordering::SeqCst), 2);
        assert!(err.root_cause().is_timeout());
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_retries_single_attempt() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let action = move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>("nope")
        };
        let options = RequestOptions::default().with_max_retries(0);

        let err = run_with_retries("once", &action, options).await.unwrap_err();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(matches!(err, QueueError::ExhaustedRetries { attempts: 1, .. }));
    }
}
