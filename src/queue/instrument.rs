//! Queue decorators that observe work without changing scheduling.
//!
//! Both wrappers are generic over [`AsyncQueue`], so they compose with any
//! variant: the action is rewrapped to measure itself and the result is passed
//! through unchanged.

use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

use super::metrics::QueueMetrics;
use super::traits::AsyncQueue;
use super::types::{Action, QueueState, TaskHandle};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Records timing and outcome of every task submitted through it
pub struct Monitored<Q, T> {
    inner: Q,
    metrics: QueueMetrics,
    _marker: PhantomData<fn() -> T>,
}

impl<Q, T> Monitored<Q, T>
where
    Q: AsyncQueue<T>,
    T: Send + 'static,
{
    pub fn new(inner: Q) -> Self {
        let metrics = QueueMetrics::new(inner.name());
        Self::with_metrics(inner, metrics)
    }

    /// Share an existing collector, e.g. one registered with an aggregator
    pub fn with_metrics(inner: Q, metrics: QueueMetrics) -> Self {
        Self {
            inner,
            metrics,
            _marker: PhantomData,
        }
    }

    pub fn metrics(&self) -> &QueueMetrics {
        &self.metrics
    }

    pub fn inner(&self) -> &Q {
        &self.inner
    }

    pub fn into_inner(self) -> Q {
        self.inner
    }
}

impl<Q, T> AsyncQueue<T> for Monitored<Q, T>
where
    Q: AsyncQueue<T>,
    T: Send + 'static,
{
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn submit(&self, action: Action<T>, auto_start: bool) -> TaskHandle<T> {
        let metrics = self.metrics.clone();
        metrics.record_task_submitted();
        let queued_at = Instant::now();

        let timed = Action::new(move || async move {
            metrics.record_task_started(queued_at.elapsed());
            let started = Instant::now();
            let result = action.run().await;
            metrics.record_outcome(&result, started.elapsed());
            result
        });
        self.inner.submit(timed, auto_start)
    }

    fn pause(&self) {
        self.inner.pause();
    }

    fn stop(&self) {
        self.inner.stop();
    }

    fn start(&self) -> bool {
        self.inner.start()
    }

    fn status(&self) -> QueueState {
        self.inner.status()
    }
}

/// Lifecycle notification published by [`Observed`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum QueueEvent {
    Queued { task_id: u64 },
    Started { task_id: u64 },
    Completed { task_id: u64, elapsed: Duration },
    Failed { task_id: u64, elapsed: Duration, error: String },
}

impl QueueEvent {
    pub fn task_id(&self) -> u64 {
        match self {
            QueueEvent::Queued { task_id }
            | QueueEvent::Started { task_id }
            | QueueEvent::Completed { task_id, .. }
            | QueueEvent::Failed { task_id, .. } => *task_id,
        }
    }
}

/// Publishes a [`QueueEvent`] at each stage of every task submitted through it
pub struct Observed<Q, T> {
    inner: Q,
    events: broadcast::Sender<QueueEvent>,
    task_counter: AtomicU64,
    _marker: PhantomData<fn() -> T>,
}

impl<Q, T> Observed<Q, T>
where
    Q: AsyncQueue<T>,
    T: Send + 'static,
{
    pub fn new(inner: Q) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner,
            events,
            task_counter: AtomicU64::new(0),
            _marker: PhantomData,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.events.subscribe()
    }

    pub fn inner(&self) -> &Q {
        &self.inner
    }
}

fn publish(events: &broadcast::Sender<QueueEvent>, event: QueueEvent) {
    if events.send(event).is_err() {
        // Nobody listening
        debug!("📡 Queue event dropped without subscribers");
    }
}

impl<Q, T> AsyncQueue<T> for Observed<Q, T>
where
    Q: AsyncQueue<T>,
    T: Send + 'static,
{
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn submit(&self, action: Action<T>, auto_start: bool) -> TaskHandle<T> {
        let task_id = self.task_counter.fetch_add(1, Ordering::SeqCst);
        let events = self.events.clone();

        let observed = Action::new(move || async move {
            publish(&events, QueueEvent::Started { task_id });
            let started = Instant::now();
            let result = action.run().await;
            let elapsed = started.elapsed();
            let event = match &result {
                Ok(_) => QueueEvent::Completed { task_id, elapsed },
                Err(e) => QueueEvent::Failed {
                    task_id,
                    elapsed,
                    error: e.to_string(),
                },
            };
            publish(&events, event);
            result
        });

        publish(&self.events, QueueEvent::Queued { task_id });
        self.inner.submit(observed, auto_start)
    }

    fn pause(&self) {
        self.inner.pause();
    }

    fn stop(&self) {
        self.inner.stop();
    }

    fn start(&self) -> bool {
        self.inner.start()
    }

    fn status(&self) -> QueueState {
        self.inner.status()
    }
}
