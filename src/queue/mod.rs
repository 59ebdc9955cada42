pub mod batch;
pub mod buffer;
pub mod concurrent;
pub mod config;
mod dispatch;
pub mod errors;
pub mod instrument;
pub mod metrics;
pub mod priority;
pub mod resilient;
pub mod retry;
pub mod sequential;
pub mod traits;
pub mod types;


pub use batch::{Batch, BatchingTaskQueue};
pub use buffer::OrderedBuffer;
pub use concurrent::ConcurrencyLimitedTaskQueue;
pub use config::{QueueConfig, RequestOptions, RequestOptionsUpdate};
pub use errors::QueueError;
pub use instrument::{Monitored, Observed, QueueEvent};
pub use metrics::{HealthStatus, MetricsAggregator, OverallHealth, QueueHealth, QueueMetrics, QueueMetricsData};
pub use priority::{PriorityBuffer, PriorityTaskQueue, DEFAULT_PRIORITY};
pub use resilient::ResilientRequestQueue;
pub use retry::{backoff_delay, RetryContext};
pub use sequential::SequentialTaskQueue;
pub use traits::AsyncQueue;
pub use types::{Action, BoxError, DrainState, QueueState, TaskEntry, TaskHandle, TaskResult};
