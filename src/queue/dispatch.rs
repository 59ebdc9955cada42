use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::{debug, error, info};

use super::buffer::OrderedBuffer;
use super::errors::QueueError;
use super::types::{Action, QueueState, TaskEntry, TaskHandle};

/// Ordering policy: where new entries go and which one runs next
pub(crate) trait Schedule<T>: Send + 'static {
    /// Extra placement data supplied on insert
    type Meta: Send;

    fn insert(&mut self, entry: TaskEntry<T>, meta: Self::Meta);
    fn next_entry(&mut self) -> Option<TaskEntry<T>>;
    fn queued(&self) -> usize;
    fn take_all(&mut self) -> Vec<TaskEntry<T>>;
}

impl<T: Send + 'static> Schedule<T> for OrderedBuffer<TaskEntry<T>> {
    type Meta = ();

    fn insert(&mut self, entry: TaskEntry<T>, _meta: ()) {
        self.enqueue(entry);
    }

    fn next_entry(&mut self) -> Option<TaskEntry<T>> {
        self.dequeue()
    }

    fn queued(&self) -> usize {
        self.len()
    }

    fn take_all(&mut self) -> Vec<TaskEntry<T>> {
        OrderedBuffer::take_all(self)
    }
}

struct CoreState<S> {
    buffer: S,
    in_flight: usize,
    limit: usize,
    paused: bool,
    stopped: bool,
}

/// Bounded-concurrency drain shared by the FIFO and priority queues.
///
/// All bookkeeping happens under `state`, which is never held across an
/// `.await`; actions themselves run on spawned tasks.
pub(crate) struct QueueCore<T, S> {
    name: String,
    state: Mutex<CoreState<S>>,
    task_counter: AtomicU64,
    _marker: PhantomData<fn() -> T>,
}

impl<T, S> QueueCore<T, S>
where
    T: Send + 'static,
    S: Schedule<T>,
{
    pub fn new(name: String, limit: usize, buffer: S) -> Arc<Self> {
        info!("🚀 Queue '{}' initialized (concurrency limit: {})", name, limit);
        Arc::new(Self {
            name,
            state: Mutex::new(CoreState {
                buffer,
                in_flight: 0,
                limit,
                paused: false,
                stopped: false,
            }),
            task_counter: AtomicU64::new(0),
            _marker: PhantomData,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append an action and optionally kick the drain
    pub fn submit(self: &Arc<Self>, action: Action<T>, meta: S::Meta, auto_start: bool) -> TaskHandle<T> {
        let task_id = self.task_counter.fetch_add(1, Ordering::SeqCst);
        let (entry, handle) = TaskEntry::new(task_id, action);

        let queued = {
            let mut state = self.state.lock();
            state.buffer.insert(entry, meta);
            state.buffer.queued()
        };
        debug!("📥 Queued task {} on '{}' (queue size: {})", task_id, self.name, queued);

        if auto_start {
            self.drain();
        }
        handle
    }

    /// Start as many entries as the limit allows; returns how many started
    pub fn drain(self: &Arc<Self>) -> usize {
        let mut started = 0;
        loop {
            let entry = {
                let mut state = self.state.lock();
                if state.paused || state.stopped || state.in_flight >= state.limit {
                    break;
                }
                match state.buffer.next_entry() {
                    Some(entry) => {
                        state.in_flight += 1;
                        entry
                    }
                    None => break,
                }
            };
            started += 1;
            self.spawn_entry(entry);
        }
        started
    }

    fn spawn_entry(self: &Arc<Self>, entry: TaskEntry<T>) {
        let core = Arc::clone(self);
        let task_id = entry.id;
        debug!("🏃 Starting task {} on '{}' (wait time: {:?})", task_id, self.name, entry.age());

        tokio::spawn(async move {
            let (action, settle) = entry.into_parts();
            let start_time = Instant::now();
            let result = action.run().await;

            match &result {
                Ok(_) => debug!("✅ Task {} on '{}' completed in {:?}", task_id, core.name, start_time.elapsed()),
                Err(e) => error!("❌ Task {} on '{}' failed: {}", task_id, core.name, e),
            }
            // Release the slot first so a woken caller never sees this task in flight
            core.state.lock().in_flight -= 1;
            settle.settle(result);
            core.drain();
        });
    }

    pub fn pause(&self) {
        self.state.lock().paused = true;
        info!("⏸️ Queue '{}' paused", self.name);
    }

    /// Reject every queued entry with `Cancelled`; in-flight tasks finish
    pub fn stop(&self) -> usize {
        let discarded = {
            let mut state = self.state.lock();
            state.stopped = true;
            state.buffer.take_all()
        };
        let count = discarded.len();
        for entry in discarded {
            entry.cancel();
        }
        info!("⏹️ Queue '{}' stopped ({} queued tasks cancelled)", self.name, count);
        count
    }

    /// Clear paused/stopped and attempt a drain
    pub fn start(self: &Arc<Self>) -> bool {
        {
            let mut state = self.state.lock();
            state.paused = false;
            state.stopped = false;
        }
        let started = self.drain();
        info!("▶️ Queue '{}' started ({} tasks dispatched)", self.name, started);
        started > 0
    }

    pub fn status(&self) -> QueueState {
        let state = self.state.lock();
        QueueState {
            in_flight: state.in_flight,
            queued: state.buffer.queued(),
            paused: state.paused,
            stopped: state.stopped,
        }
    }

    pub fn in_flight(&self) -> usize {
        self.state.lock().in_flight
    }

    pub fn limit(&self) -> usize {
        self.state.lock().limit
    }

    /// Change the limit; raising it dispatches immediately
    pub fn set_limit(self: &Arc<Self>, limit: usize) -> Result<(), QueueError> {
        if limit < 1 {
            return Err(QueueError::InvalidArgument(
                "Concurrency limit must be at least 1".to_string(),
            ));
        }
        self.state.lock().limit = limit;
        debug!("🔧 Queue '{}' concurrency limit set to {}", self.name, limit);
        self.drain();
        Ok(())
    }
}
