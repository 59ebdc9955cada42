use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tracing::debug;

use super::errors::QueueError;

/// Boxed error accepted from user actions
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Final outcome delivered to a task's handle
pub type TaskResult<T> = Result<T, QueueError>;

type ActionFn<T> = Box<dyn FnOnce() -> BoxFuture<'static, Result<T, BoxError>> + Send + 'static>;

/// A deferred unit of work producing a `T`
pub struct Action<T> {
    inner: ActionFn<T>,
}

impl<T: Send + 'static> Action<T> {
    pub fn new<F, Fut, E>(action: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: Into<BoxError>,
    {
        Self {
            inner: Box::new(move || async move { action().await.map_err(Into::into) }.boxed()),
        }
    }

    /// Execute the action, isolating panics and normalizing its error.
    ///
    /// A `QueueError` returned by the action (as wrapping queues do) is passed
    /// through untouched instead of being nested inside `QueueError::Action`.
    pub async fn run(self) -> TaskResult<T> {
        match AssertUnwindSafe((self.inner)()).catch_unwind().await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(match err.downcast::<QueueError>() {
                Ok(queue_err) => *queue_err,
                Err(other) => QueueError::Action(other),
            }),
            Err(panic) => Err(QueueError::Panicked(panic_message(panic.as_ref()))),
        }
    }
}

impl<T> fmt::Debug for Action<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Action { .. }")
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Resolving half of a task's handle
pub(crate) struct Settle<T> {
    id: u64,
    sender: oneshot::Sender<TaskResult<T>>,
}

impl<T> Settle<T> {
    /// Deliver the outcome; a caller that dropped its handle is not an error
    pub fn settle(self, result: TaskResult<T>) -> bool {
        if self.sender.send(result).is_err() {
            debug!("📤 Handle for task {} dropped before settling", self.id);
            return false;
        }
        true
    }
}

/// A queued action plus the means to settle its handle
pub struct TaskEntry<T> {
    pub id: u64,
    pub created_at: Instant,
    action: Action<T>,
    settle: Settle<T>,
}

impl<T: Send + 'static> TaskEntry<T> {
    pub fn new(id: u64, action: Action<T>) -> (Self, TaskHandle<T>) {
        let (sender, receiver) = oneshot::channel();
        let entry = Self {
            id,
            created_at: Instant::now(),
            action,
            settle: Settle { id, sender },
        };
        (entry, TaskHandle { id, receiver })
    }

    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Reject the handle without running the action
    pub fn cancel(self) {
        self.settle.settle(Err(QueueError::Cancelled));
    }

    pub(crate) fn into_parts(self) -> (Action<T>, Settle<T>) {
        (self.action, self.settle)
    }
}

impl<T> fmt::Debug for TaskEntry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskEntry")
            .field("id", &self.id)
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Future returned to producers; resolves once the task settles
#[derive(Debug)]
#[must_use = "dropping a TaskHandle discards the task's outcome"]
pub struct TaskHandle<T> {
    id: u64,
    receiver: oneshot::Receiver<TaskResult<T>>,
}

impl<T> TaskHandle<T> {
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl<T> Future for TaskHandle<T> {
    type Output = TaskResult<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.receiver).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            // Settle half dropped without a value
            Poll::Ready(Err(_)) => Poll::Ready(Err(QueueError::Cancelled)),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Scheduler state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DrainState {
    Idle,
    Draining,
    Paused,
    Stopped,
}

impl fmt::Display for DrainState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DrainState::Idle => write!(f, "IDLE"),
            DrainState::Draining => write!(f, "DRAINING"),
            DrainState::Paused => write!(f, "PAUSED"),
            DrainState::Stopped => write!(f, "STOPPED"),
        }
    }
}

/// Point-in-time view of a queue's counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QueueState {
    pub in_flight: usize,
    pub queued: usize,
    pub paused: bool,
    pub stopped: bool,
}

impl QueueState {
    pub fn drain_state(&self) -> DrainState {
        if self.stopped {
            DrainState::Stopped
        } else if self.paused {
            DrainState::Paused
        } else if self.in_flight > 0 {
            DrainState::Draining
        } else {
            DrainState::Idle
        }
    }

    pub fn is_idle(&self) -> bool {
        self.drain_state() == DrainState::Idle && self.queued == 0
    }
}
