use std::sync::Arc;

use super::buffer::OrderedBuffer;
use super::config::QueueConfig;
use super::dispatch::QueueCore;
use super::errors::QueueError;
use super::traits::AsyncQueue;
use super::types::{Action, QueueState, TaskEntry, TaskHandle};

/// FIFO queue with up to `concurrency_limit` actions in flight.
///
/// Tasks start in submission order but may complete in any order.
pub struct ConcurrencyLimitedTaskQueue<T> {
    core: Arc<QueueCore<T, OrderedBuffer<TaskEntry<T>>>>,
}

impl<T> Clone for ConcurrencyLimitedTaskQueue<T> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<T: Send + 'static> ConcurrencyLimitedTaskQueue<T> {
    pub fn new(name: impl Into<String>, concurrency_limit: usize) -> Result<Self, QueueError> {
        if concurrency_limit < 1 {
            return Err(QueueError::InvalidArgument(
                "Concurrency limit must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            core: QueueCore::new(name.into(), concurrency_limit, OrderedBuffer::new()),
        })
    }

    pub fn from_config(config: &QueueConfig) -> Result<Self, QueueError> {
        config.validate()?;
        Self::new(config.name.clone(), config.concurrency_limit)
    }

    /// Number of actions currently executing
    pub fn active_task_count(&self) -> usize {
        self.core.in_flight()
    }

    pub fn concurrency_limit(&self) -> usize {
        self.core.limit()
    }

    /// Adjust the limit at runtime; a higher limit starts queued work right away
    pub fn set_concurrency_limit(&self, limit: usize) -> Result<(), QueueError> {
        self.core.set_limit(limit)
    }
}

impl<T: Send + 'static> AsyncQueue<T> for ConcurrencyLimitedTaskQueue<T> {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn submit(&self, action: Action<T>, auto_start: bool) -> TaskHandle<T> {
        self.core.submit(action, (), auto_start)
    }

    fn pause(&self) {
        self.core.pause();
    }

    fn stop(&self) {
        self.core.stop();
    }

    fn start(&self) -> bool {
        self.core.start()
    }

    fn status(&self) -> QueueState {
        self.core.status()
    }
}
