use std::sync::Arc;

use super::buffer::OrderedBuffer;
use super::dispatch::QueueCore;
use super::traits::AsyncQueue;
use super::types::{Action, QueueState, TaskEntry, TaskHandle};

/// FIFO queue running one task at a time.
///
/// Each action is awaited to completion before the next is dequeued, so
/// results settle in submission order. A failing action only rejects its own
/// handle; draining continues with the next entry.
pub struct SequentialTaskQueue<T> {
    core: Arc<QueueCore<T, OrderedBuffer<TaskEntry<T>>>>,
}

impl<T> Clone for SequentialTaskQueue<T> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<T: Send + 'static> SequentialTaskQueue<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            core: QueueCore::new(name.into(), 1, OrderedBuffer::new()),
        }
    }

    /// True while an action is executing
    pub fn is_running(&self) -> bool {
        self.core.in_flight() > 0
    }
}

impl<T: Send + 'static> Default for SequentialTaskQueue<T> {
    fn default() -> Self {
        Self::new("sequential")
    }
}

impl<T: Send + 'static> AsyncQueue<T> for SequentialTaskQueue<T> {
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
