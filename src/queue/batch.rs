use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, error, info};

use super::buffer::OrderedBuffer;
use super::config::QueueConfig;
use super::errors::QueueError;
use super::traits::AsyncQueue;
use super::types::{Action, QueueState, TaskEntry, TaskHandle};

const BATCH_CHANNEL_CAPACITY: usize = 64;

/// Results gathered by one `process_batch` run
#[derive(Debug, Clone, Serialize)]
pub struct Batch<T> {
    pub id: u64,
    pub items: Vec<T>,
    pub created_at: DateTime<Utc>,
}

impl<T> Batch<T> {
    fn new(id: u64) -> Self {
        Self {
            id,
            items: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Placeholder returned when no batch could start
    fn empty() -> Self {
        Self::new(0)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

struct BatchState<T> {
    buffer: OrderedBuffer<TaskEntry<T>>,
    processing: bool,
    paused: bool,
    stopped: bool,
}

struct BatchInner<T> {
    name: String,
    batch_size: usize,
    state: Mutex<BatchState<T>>,
    task_counter: AtomicU64,
    batch_counter: AtomicU64,
    batches: broadcast::Sender<Arc<Batch<T>>>,
}

impl<T: Clone + Send + Sync + 'static> BatchInner<T> {
    /// Run one batch; a call made while another batch runs yields an empty batch
    fn run_batch(self: Arc<Self>) -> BoxFuture<'static, Batch<T>> {
        async move {
            {
                let mut state = self.state.lock();
                if state.processing || state.buffer.is_empty() || state.paused || state.stopped {
                    return Batch::empty();
                }
                state.processing = true;
            }

            let batch_id = self.batch_counter.fetch_add(1, Ordering::SeqCst) + 1;
            let mut batch = Batch::new(batch_id);
            debug!("📦 Batch {} started on '{}'", batch_id, self.name);

            // Strictly sequential within a batch
            while batch.len() < self.batch_size {
                let entry = {
                    let mut state = self.state.lock();
                    if state.paused || state.stopped {
                        break;
                    }
                    match state.buffer.dequeue() {
                        Some(entry) => entry,
                        None => break,
                    }
                };

                let task_id = entry.id;
                let (action, settle) = entry.into_parts();
                match action.run().await {
                    Ok(value) => {
                        batch.items.push(value.clone());
                        settle.settle(Ok(value));
                    }
                    Err(e) => {
                        error!("❌ Task {} in batch {} on '{}' failed: {}", task_id, batch_id, self.name, e);
                        settle.settle(Err(e));
                    }
                }
            }

            let more_pending = {
                let mut state = self.state.lock();
                state.processing = false;
                !state.buffer.is_empty() && !state.paused && !state.stopped
            };
            debug!("📦 Batch {} on '{}' finished with {} items", batch_id, self.name, batch.len());

            if !batch.is_empty() && self.batches.send(Arc::new(batch.clone())).is_err() {
                debug!("📦 No subscribers for batch {} on '{}'", batch_id, self.name);
            }

            if more_pending {
                // Next batch runs on its own task rather than deepening this one
                tokio::spawn(Arc::clone(&self).run_batch());
            }
            batch
        }
        .boxed()
    }

    fn schedule(self: &Arc<Self>) {
        let idle = {
            let state = self.state.lock();
            !state.processing
        };
        if idle {
            tokio::spawn(Arc::clone(self).run_batch());
        }
    }
}

/// Queue that executes entries in bounded, strictly sequential batches.
///
/// Each batch runs up to `batch_size` actions one after another and collects
/// their results; a finished batch is published to subscribers. A failed action
/// rejects its own handle and is left out of the batch.
pub struct BatchingTaskQueue<T> {
    inner: Arc<BatchInner<T>>,
}

impl<T> Clone for BatchingTaskQueue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> BatchingTaskQueue<T> {
    pub fn new(name: impl Into<String>, batch_size: usize) -> Result<Self, QueueError> {
        if batch_size < 1 {
            return Err(QueueError::InvalidArgument(
                "Batch size must be at least 1".to_string(),
            ));
        }
        let name = name.into();
        let (batches, _) = broadcast::channel(BATCH_CHANNEL_CAPACITY);
        info!("🚀 Batching queue '{}' initialized (batch size: {})", name, batch_size);

        Ok(Self {
            inner: Arc::new(BatchInner {
                name,
                batch_size,
                state: Mutex::new(BatchState {
                    buffer: OrderedBuffer::new(),
                    processing: false,
                    paused: false,
                    stopped: false,
                }),
                task_counter: AtomicU64::new(0),
                batch_counter: AtomicU64::new(0),
                batches,
            }),
        })
    }

    pub fn from_config(config: &QueueConfig) -> Result<Self, QueueError> {
        config.validate()?;
        Self::new(config.name.clone(), config.batch_size)
    }

    pub fn batch_size(&self) -> usize {
        self.inner.batch_size
    }

    /// True while a batch is running
    pub fn is_processing(&self) -> bool {
        self.inner.state.lock().processing
    }

    /// Run one batch now and return its results.
    ///
    /// The batch runs on its own task, so dropping this future stops the wait
    /// but not the batch.
    pub async fn process_batch(&self) -> Batch<T> {
        match tokio::spawn(Arc::clone(&self.inner).run_batch()).await {
            Ok(batch) => batch,
            Err(e) => {
                error!("💥 Batch task on '{}' aborted: {}", self.inner.name, e);
                Batch::empty()
            }
        }
    }

    /// Receive every non-empty batch as it completes
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<Batch<T>>> {
        self.inner.batches.subscribe()
    }
}

impl<T: Clone + Send + Sync + 'static> AsyncQueue<T> for BatchingTaskQueue<T> {
    fn name(&self) -> &str {
        &self.inner.name
    }

    fn submit(&self, action: Action<T>, auto_start: bool) -> TaskHandle<T> {
        let task_id = self.inner.task_counter.fetch_add(1, Ordering::SeqCst);
        let (entry, handle) = TaskEntry::new(task_id, action);
        let queued = {
            let mut state = self.inner.state.lock();
            state.buffer.enqueue(entry);
            state.buffer.len()
        };
        debug!("📥 Queued task {} on '{}' (queue size: {})", task_id, self.inner.name, queued);

        if auto_start {
            self.inner.schedule();
        }
        handle
    }

    fn pause(&self) {
        self.inner.state.lock().paused = true;
        info!("⏸️ Batching queue '{}' paused", self.inner.name);
    }

    fn stop(&self) {
        let discarded = {
            let mut state = self.inner.state.lock();
            state.stopped = true;
            state.buffer.take_all()
        };
        let count = discarded.len();
        for entry in discarded {
            entry.cancel();
        }
        info!("⏹️ Batching queue '{}' stopped ({} queued tasks cancelled)", self.inner.name, count);
    }

    fn start(&self) -> bool {
        let pending = {
            let mut state = self.inner.state.lock();
            state.paused = false;
            state.stopped = false;
            !state.buffer.is_empty()
        };
        self.inner.schedule();
        info!("▶️ Batching queue '{}' started", self.inner.name);
        pending
    }

    fn status(&self) -> QueueState {
        let state = self.inner.state.lock();
        QueueState {
            in_flight: usize::from(state.processing),
            queued: state.buffer.len(),
            paused: state.paused,
            stopped: state.stopped,
        }
    }
}
