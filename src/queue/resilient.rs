use std::future::Future;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use super::concurrent::ConcurrencyLimitedTaskQueue;
use super::config::{QueueConfig, RequestOptions, RequestOptionsUpdate};
use super::errors::QueueError;
use super::retry::run_with_retries;
use super::traits::AsyncQueue;
use super::types::{Action, BoxError, QueueState, TaskHandle};

/// Concurrency-limited queue whose requests get a deadline and retries.
///
/// Each request is wrapped in a timeout/backoff loop and then submitted like any
/// other task, so one request's retries never hold up other requests' starts.
pub struct ResilientRequestQueue<T> {
    queue: ConcurrencyLimitedTaskQueue<T>,
    defaults: Arc<RwLock<RequestOptions>>,
}

impl<T> Clone for ResilientRequestQueue<T> {
    fn clone(&self) -> Self {
        Self {
            queue: self.queue.clone(),
            defaults: Arc::clone(&self.defaults),
        }
    }
}

impl<T: Send + 'static> ResilientRequestQueue<T> {
    pub fn new(
        name: impl Into<String>,
        concurrency_limit: usize,
        defaults: RequestOptions,
    ) -> Result<Self, QueueError> {
        defaults.validate()?;
        let queue = ConcurrencyLimitedTaskQueue::new(name, concurrency_limit)?;
        info!(
            "🛡️ Resilient queue '{}' using timeout {}ms, {} retries, {}ms base delay",
            queue.name(),
            defaults.timeout_ms,
            defaults.max_retries,
            defaults.retry_delay_ms
        );
        Ok(Self {
            queue,
            defaults: Arc::new(RwLock::new(defaults)),
        })
    }

    pub fn from_config(config: &QueueConfig) -> Result<Self, QueueError> {
        config.validate()?;
        Self::new(config.name.clone(), config.concurrency_limit, config.request)
    }

    /// Submit a request with explicit timeout/retry settings
    pub fn add_request<F, Fut, E>(&self, action: F, options: RequestOptions) -> TaskHandle<T>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: Into<BoxError> + 'static,
    {
        let label = self.queue.name().to_string();
        self.queue.add_task(move || async move {
            run_with_retries(&label, &action, options).await
        })
    }

    /// Submit a request using the queue's current defaults
    pub fn add_default_request<F, Fut, E>(&self, action: F) -> TaskHandle<T>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: Into<BoxError> + 'static,
    {
        let options = self.request_options();
        self.add_request(action, options)
    }

    pub fn request_options(&self) -> RequestOptions {
        *self.defaults.read()
    }

    /// Update the defaults; every field is validated before anything changes
    pub fn set_request_options(&self, update: RequestOptionsUpdate) -> Result<(), QueueError> {
        let mut candidate = self.request_options();
        if let Some(max_retries) = update.max_retries {
            candidate.max_retries = max_retries;
        }
        if let Some(retry_delay_ms) = update.retry_delay_ms {
            candidate.retry_delay_ms = retry_delay_ms;
        }
        if let Some(timeout_ms) = update.timeout_ms {
            candidate.timeout_ms = timeout_ms;
        }
        candidate.validate()?;
        if let Some(limit) = update.concurrency_limit {
            self.queue.set_concurrency_limit(limit)?;
        }
        *self.defaults.write() = candidate;
        Ok(())
    }

    pub fn active_task_count(&self) -> usize {
        self.queue.active_task_count()
    }

    pub fn concurrency_limit(&self) -> usize {
        self.queue.concurrency_limit()
    }
}

impl<T: Send + 'static> AsyncQueue<T> for ResilientRequestQueue<T> {
    fn name(&self) -> &str {
        self.queue.name()
    }

    /// Plain actions are passed through without timeout or retries
    fn submit(&self, action: Action<T>, auto_start: bool) -> TaskHandle<T> {
        self.queue.submit(action, auto_start)
    }

    fn pause(&self) {
        self.queue.pause();
    }

    fn stop(&self) {
        self.queue.stop();
    }

    fn start(&self) -> bool {
        self.queue.start()
    }

    fn status(&self) -> QueueState {
        self.queue.status()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
    use tokio::time::{sleep, Duration, Instant};

    fn fast_options() -> RequestOptions {
        RequestOptions::default()
            .with_timeout_ms(500)
            .with_retry_delay_ms(100)
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_retries_until_success() {
        let queue = ResilientRequestQueue::new("api", 3, RequestOptions::default()).unwrap();
        let calls = Arc::new(AtomicU32::new(0));

        let counter = calls.clone();
        let started = Instant::now();
        let handle = queue.add_request(
            move || {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err("503")
                    } else {
                        Ok("payload")
                    }
                }
            },
            RequestOptions::default().with_max_retries(2),
        );

        assert_eq!(handle.await.unwrap(), "payload");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(started.elapsed() >= Duration::from_millis(2125));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_request_rejects() {
        let queue = ResilientRequestQueue::<()>::new("api", 2, fast_options()).unwrap();
        let handle = queue.add_default_request(|| async { Err::<(), _>("down") });

        match handle.await {
            Err(QueueError::ExhaustedRetries { attempts, source }) => {
                assert_eq!(attempts, 3);
                assert!(matches!(*source, QueueError::Action(_)));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_enforced() {
        let queue = ResilientRequestQueue::new("api", 1, fast_options()).unwrap();
        let handle = queue.add_request(
            || async {
                sleep(Duration::from_secs(30)).await;
                Ok::<_, BoxError>(1)
            },
            fast_options().with_max_retries(0),
        );

        let err = handle.await.unwrap_err();
        assert!(err.root_cause().is_timeout());
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_do_not_block_other_requests() {
        let queue = ResilientRequestQueue::new("api", 2, fast_options()).unwrap();
        let flaky_calls = Arc::new(AtomicUsize::new(0));

        let counter = flaky_calls.clone();
        let flaky = queue.add_request(
            move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err::<u32, _>("still down")
                }
            },
            fast_options().with_max_retries(3),
        );
        let started = Instant::now();
        let healthy = queue.add_request(|| async { Ok::<_, BoxError>(5) }, fast_options());

        assert_eq!(healthy.await.unwrap(), 5);
        // Finished well before the flaky request's first backoff expired
        assert!(started.elapsed() < Duration::from_millis(85));
        assert!(flaky.await.is_err());
        assert_eq!(flaky_calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_set_request_options_validation() {
        let queue = ResilientRequestQueue::<()>::new("api", 3, RequestOptions::default()).unwrap();

        let err = queue
            .set_request_options(RequestOptionsUpdate {
                timeout_ms: Some(50),
                max_retries: Some(9),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, QueueError::InvalidArgument(_)));
        // Rejected update leaves defaults untouched
        assert_eq!(queue.request_options(), RequestOptions::default());

        queue
            .set_request_options(RequestOptionsUpdate {
                max_retries: Some(5),
                retry_delay_ms: Some(250),
                ..Default::default()
            })
            .unwrap();
        let options = queue.request_options();
        assert_eq!(options.max_retries, 5);
        assert_eq!(options.retry_delay_ms, 250);
        assert_eq!(options.timeout_ms, 10_000);
    }

    #[tokio::test]
    async fn test_set_request_options_updates_limit() {
        let queue = ResilientRequestQueue::<()>::new("api", 3, RequestOptions::default()).unwrap();
        queue
            .set_request_options(RequestOptionsUpdate {
                concurrency_limit: Some(6),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(queue.concurrency_limit(), 6);

        let err = queue.set_request_options(RequestOptionsUpdate {
            concurrency_limit: Some(0),
            ..Default::default()
        });
        assert!(matches!(err, Err(QueueError::InvalidArgument(_))));
    }

    #[test]
    fn test_invalid_defaults_rejected() {
        let result = ResilientRequestQueue::<()>::new(
            "api",
            3,
            RequestOptions::default().with_timeout_ms(10),
        );
        assert!(matches!(result, Err(QueueError::InvalidArgument(_))));
    }
}
