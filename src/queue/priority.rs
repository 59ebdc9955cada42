use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;

use super::config::QueueConfig;
use super::dispatch::{QueueCore, Schedule};
use super::errors::QueueError;
use super::traits::AsyncQueue;
use super::types::{Action, BoxError, QueueState, TaskEntry, TaskHandle};

pub const DEFAULT_PRIORITY: i64 = 0;

#[derive(Debug)]
struct Prioritized<E> {
    priority: i64,
    item: E,
}

/// Buffer kept in non-increasing priority order.
///
/// Insert is a linear scan for the first strictly lower priority, so equal
/// priorities keep arrival order. Dequeue scans for the highest priority and
/// takes the earliest among ties. Both are O(n); meant for small queues.
#[derive(Debug)]
pub struct PriorityBuffer<E> {
    entries: VecDeque<Prioritized<E>>,
}

impl<E> Default for PriorityBuffer<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> PriorityBuffer<E> {
    pub fn new() -> Self {
        Self {
            entries: VecDeque::new(),
        }
    }

    pub fn insert(&mut self, item: E, priority: i64) {
        let entry = Prioritized { priority, item };
        match self.entries.iter().position(|existing| existing.priority < priority) {
            Some(index) => self.entries.insert(index, entry),
            None => self.entries.push_back(entry),
        }
    }

    pub fn dequeue(&mut self) -> Option<E> {
        let mut best: Option<(usize, i64)> = None;
        for (index, entry) in self.entries.iter().enumerate() {
            match best {
                Some((_, priority)) if entry.priority <= priority => {}
                _ => best = Some((index, entry.priority)),
            }
        }
        let (index, _) = best?;
        self.entries.remove(index).map(|entry| entry.item)
    }

    pub fn peek(&self) -> Option<(&E, i64)> {
        self.entries.front().map(|entry| (&entry.item, entry.priority))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn reset(&mut self) {
        self.entries.clear();
    }

    /// Items with their priorities in dequeue order
    pub fn iter(&self) -> impl Iterator<Item = (&E, i64)> + '_ {
        self.entries.iter().map(|entry| (&entry.item, entry.priority))
    }
}

impl<T: Send + 'static> Schedule<T> for PriorityBuffer<TaskEntry<T>> {
    type Meta = i64;

    fn insert(&mut self, entry: TaskEntry<T>, priority: i64) {
        PriorityBuffer::insert(self, entry, priority);
    }

    fn next_entry(&mut self) -> Option<TaskEntry<T>> {
        self.dequeue()
    }

    fn queued(&self) -> usize {
        self.len()
    }

    fn take_all(&mut self) -> Vec<TaskEntry<T>> {
        self.entries.drain(..).map(|entry| entry.item).collect()
    }
}

/// Queue that always runs the highest-priority entry next.
///
/// Sequential by default; `with_concurrency` lets several entries run at once
/// while still starting them in priority order.
pub struct PriorityTaskQueue<T> {
    core: Arc<QueueCore<T, PriorityBuffer<TaskEntry<T>>>>,
}

impl<T> Clone for PriorityTaskQueue<T> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<T: Send + 'static> PriorityTaskQueue<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            core: QueueCore::new(name.into(), 1, PriorityBuffer::new()),
        }
    }

    pub fn with_concurrency(name: impl Into<String>, concurrency_limit: usize) -> Result<Self, QueueError> {
        if concurrency_limit < 1 {
            return Err(QueueError::InvalidArgument(
                "Concurrency limit must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            core: QueueCore::new(name.into(), concurrency_limit, PriorityBuffer::new()),
        })
    }

    pub fn from_config(config: &QueueConfig) -> Result<Self, QueueError> {
        config.validate()?;
        Self::with_concurrency(config.name.clone(), config.concurrency_limit)
    }

    pub fn add_task_with_priority<F, Fut, E>(&self, action: F, priority: i64) -> TaskHandle<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: Into<BoxError>,
    {
        self.core.submit(Action::new(action), priority, true)
    }

    pub fn add_prioritized<F, Fut, E>(&self, action: F, auto_start: bool, priority: i64) -> TaskHandle<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: Into<BoxError>,
    {
        self.core.submit(Action::new(action), priority, auto_start)
    }
}

impl<T: Send + 'static> AsyncQueue<T> for PriorityTaskQueue<T> {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn submit(&self, action: Action<T>, auto_start: bool) -> TaskHandle<T> {
        self.core.submit(action, DEFAULT_PRIORITY, auto_start)
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

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{sleep, Duration};

    #[test]
    fn test_buffer_stable_insertion() {
        let mut buffer = PriorityBuffer::new();
        for (label, priority) in [("a", 2), ("b", 0), ("c", 2), ("d", 1), ("e", 0)] {
            buffer.insert(label, priority);
        }
        let order: Vec<_> = buffer.iter().map(|(label, _)| *label).collect();
        assert_eq!(order, vec!["a", "c", "d", "b", "e"]);
        assert_eq!(buffer.peek(), Some((&"a", 2)));

        let mut drained = Vec::new();
        while let Some(label) = buffer.dequeue() {
            drained.push(label);
        }
        assert_eq!(drained, vec!["a", "c", "d", "b", "e"]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_buffer_negative_priorities() {
        let mut buffer = PriorityBuffer::new();
        buffer.insert("low", -5);
        buffer.insert("default", 0);
        buffer.insert("lower", -10);
        assert_eq!(buffer.dequeue(), Some("default"));
        assert_eq!(buffer.dequeue(), Some("low"));
        assert_eq!(buffer.dequeue(), Some("lower"));
        assert_eq!(buffer.dequeue(), None);
    }

    #[tokio::test]
    async fn test_priority_ordering() {
        let queue = PriorityTaskQueue::new("priority");
        let executed = Arc::new(parking_lot::Mutex::new(Vec::new()));

        // Hold the queue so every entry is buffered before the first dequeue
        queue.pause();
        let mut handles = Vec::new();
        for (label, priority) in [("H1", 2), ("L1", 0), ("H2", 2), ("M1", 1), ("L2", 0)] {
            let executed = executed.clone();
            handles.push(queue.add_task_with_priority(
                move || async move {
                    executed.lock().push(label);
                    Ok::<_, BoxError>(label)
                },
                priority,
            ));
        }
        assert_eq!(queue.len(), 5);
        queue.start();

        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(*executed.lock(), vec!["H1", "H2", "M1", "L1", "L2"]);
    }

    #[tokio::test]
    async fn test_late_high_priority_jumps_queue() {
        let queue = PriorityTaskQueue::new("preempt");
        let executed = Arc::new(parking_lot::Mutex::new(Vec::new()));

        let record = |label: &'static str, executed: Arc<parking_lot::Mutex<Vec<&'static str>>>| {
            move || async move {
                sleep(Duration::from_millis(10)).await;
                executed.lock().push(label);
                Ok::<_, BoxError>(())
            }
        };

        let first = queue.add_task(record("first", executed.clone()));
        let low = queue.add_task_with_priority(record("low", executed.clone()), -1);
        let urgent = queue.add_prioritized(record("urgent", executed.clone()), true, 10);

        first.await.unwrap();
        low.await.unwrap();
        urgent.await.unwrap();
        // "first" was already running when the others arrived
        assert_eq!(*executed.lock(), vec!["first", "urgent", "low"]);
    }

    #[tokio::test]
    async fn test_stop_cancels_queued_entries() {
        let queue = PriorityTaskQueue::new("cancel");
        queue.pause();
        let a = queue.add_task_with_priority(|| async { Ok::<_, BoxError>(1) }, 1);
        let b = queue.add_task_with_priority(|| async { Ok::<_, BoxError>(2) }, 5);

        queue.stop();
        assert!(a.await.unwrap_err().is_cancelled());
        assert!(b.await.unwrap_err().is_cancelled());
        assert_eq!(queue.len(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_priority_queue() {
        let queue = PriorityTaskQueue::with_concurrency("wide", 2).unwrap();
        queue.pause();
        let handles: Vec<_> = (0..4)
            .map(|i| {
                queue.add_task_with_priority(
                    move || async move {
                        sleep(Duration::from_millis(20)).await;
                        Ok::<_, BoxError>(i)
                    },
                    i,
                )
            })
            .collect();
        assert!(queue.start());
        assert_eq!(queue.status().in_flight, 2);

        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.await.unwrap(), i as i64);
        }
        assert!(PriorityTaskQueue::<()>::with_concurrency("bad", 0).is_err());
    }
}
