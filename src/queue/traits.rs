use std::future::Future;

use super::types::{Action, BoxError, QueueState, TaskHandle};

/// Capabilities shared by every queue variant and by the decorators that wrap them
pub trait AsyncQueue<T: Send + 'static>: Send + Sync {
    fn name(&self) -> &str;

    /// Append an already-boxed action
    fn submit(&self, action: Action<T>, auto_start: bool) -> TaskHandle<T>;

    /// Stop starting new work; queued entries stay queued
    fn pause(&self);

    /// Cancel everything queued and block further drains until `start`
    fn stop(&self);

    /// Resume draining; true if the attempt started work
    fn start(&self) -> bool;

    fn status(&self) -> QueueState;

    fn len(&self) -> usize {
        self.status().queued
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn add_task<F, Fut, E>(&self, action: F) -> TaskHandle<T>
    where
        Self: Sized,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: Into<BoxError>,
    {
        self.submit(Action::new(action), true)
    }

    fn add_task_with<F, Fut, E>(&self, action: F, auto_start: bool) -> TaskHandle<T>
    where
        Self: Sized,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: Into<BoxError>,
    {
        self.submit(Action::new(action), auto_start)
    }
}
