//! Async task queues with ordering, concurrency and retry guarantees.
//!
//! Every queue accepts deferred actions and hands back a [`TaskHandle`] that
//! resolves with the action's own result. Variants differ only in how queued
//! entries are ordered and how many may run at once.

pub mod logging;
pub mod queue;

pub use queue::{
    AsyncQueue, Batch, BatchingTaskQueue, ConcurrencyLimitedTaskQueue, Monitored, Observed,
    OrderedBuffer, PriorityTaskQueue, QueueConfig, QueueError, QueueEvent, QueueMetrics,
    QueueState, RequestOptions, ResilientRequestQueue, SequentialTaskQueue, TaskHandle,
};
