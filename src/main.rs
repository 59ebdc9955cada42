use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_queue::logging::{init_logging, log_system_info, LoggingConfig};
use async_queue::queue::{BoxError, MetricsAggregator, OverallHealth};
use async_queue::{
    AsyncQueue, BatchingTaskQueue, ConcurrencyLimitedTaskQueue, Monitored, Observed,
    PriorityTaskQueue, QueueConfig, QueueEvent, QueueMetrics, ResilientRequestQueue,
    SequentialTaskQueue,
};
use serde::Deserialize;
use tokio::time::{sleep, Duration};
use tracing::{error, info, warn};

/// Full TOML configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct AppConfig {
    queue: QueueConfig,
    logging: LoggingConfig,
}

impl AppConfig {
    fn load(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        config.queue.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("queue.toml"));
    let config = AppConfig::load(&config_path)?;

    let _guard = init_logging(&config.logging)?;
    log_system_info();
    if !config_path.exists() {
        warn!("⚠️ {} not found, running with default configuration", config_path.display());
    }
    info!("🚀 Starting queue demo with '{}' configuration", config.queue.name);

    let aggregator = MetricsAggregator::new();

    run_sequential(&config.queue, &aggregator).await?;
    run_priority().await?;
    run_concurrent(&config.queue, &aggregator).await?;
    run_batching(&config.queue).await?;
    run_resilient(&config.queue).await;

    aggregator.log_all_summaries();
    let overall: OverallHealth = aggregator.overall_health();
    info!("🏁 Demo finished ({:?}, {} queues)", overall.status, overall.total_queues);
    Ok(())
}

/// Metrics collector for `name`, registered with the aggregator, when enabled
fn metrics_for(config: &QueueConfig, name: &str, aggregator: &MetricsAggregator) -> Option<QueueMetrics> {
    if !config.enable_metrics {
        return None;
    }
    let metrics = QueueMetrics::new(name);
    aggregator.register_queue(metrics.clone());
    Some(metrics)
}

async fn run_sequential(config: &QueueConfig, aggregator: &MetricsAggregator) -> Result<(), BoxError> {
    let queue = SequentialTaskQueue::<u32>::new("sequential-demo");
    let metrics = metrics_for(config, queue.name(), aggregator);
    match metrics {
        Some(metrics) => drive_sequential(&Monitored::with_metrics(queue, metrics)).await,
        None => drive_sequential(&queue).await,
    }
}

async fn drive_sequential<Q: AsyncQueue<u32>>(queue: &Q) -> Result<(), BoxError> {
    let slow = queue.add_task(|| async {
        sleep(Duration::from_millis(50)).await;
        Ok::<_, BoxError>(1)
    });
    let fast = queue.add_task(|| async { Ok::<_, BoxError>(2) });
    let failing = queue.add_task(|| async { Err::<u32, _>("simulated failure") });

    info!("📋 Sequential results: {} then {}", slow.await?, fast.await?);
    if let Err(e) = failing.await {
        info!("📋 Failure stayed isolated: {}", e);
    }
    Ok(())
}

async fn run_priority() -> Result<(), BoxError> {
    let queue = PriorityTaskQueue::new("priority-demo");
    queue.pause();

    let handles: Vec<_> = [("report", 0), ("alert", 2), ("sync", 1), ("page", 2)]
        .into_iter()
        .map(|(label, priority)| {
            queue.add_task_with_priority(move || async move { Ok::<_, BoxError>(label) }, priority)
        })
        .collect();

    queue.start();
    let mut order = Vec::new();
    for handle in handles {
        order.push(handle.await?);
    }
    info!("🎯 Priority submissions settled: {:?}", order);
    Ok(())
}

async fn run_concurrent(config: &QueueConfig, aggregator: &MetricsAggregator) -> Result<(), BoxError> {
    let queue = ConcurrencyLimitedTaskQueue::<u64>::from_config(config)?;
    info!("⚡ Concurrent demo with limit {}", queue.concurrency_limit());
    let metrics = metrics_for(config, queue.name(), aggregator);
    match metrics {
        Some(metrics) => drive_concurrent(&Monitored::with_metrics(queue, metrics)).await,
        None => drive_concurrent(&queue).await,
    }
}

async fn drive_concurrent<Q: AsyncQueue<u64>>(queue: &Q) -> Result<(), BoxError> {
    let handles: Vec<_> = (0..8u64)
        .map(|i| {
            queue.add_task(move || async move {
                sleep(Duration::from_millis(10 * (8 - i))).await;
                Ok::<_, BoxError>(i)
            })
        })
        .collect();
    info!("⚡ {} tasks in flight", queue.status().in_flight);

    let mut total = 0;
    for handle in handles {
        total += handle.await?;
    }
    info!("⚡ Concurrent tasks finished, sum {}", total);
    Ok(())
}

async fn run_batching(config: &QueueConfig) -> Result<(), BoxError> {
    let queue = Observed::new(BatchingTaskQueue::from_config(config)?);
    let mut batches = queue.inner().subscribe();
    let mut events = queue.subscribe();

    let handles: Vec<_> = (0..config.batch_size * 2 + 1)
        .map(|i| queue.add_task(move || async move { Ok::<_, BoxError>(i) }))
        .collect();
    for handle in handles {
        handle.await?;
    }

    while let Ok(batch) = batches.try_recv() {
        info!("📦 Batch {} delivered {} items", batch.id, batch.len());
    }
    let mut completed = 0;
    while let Ok(event) = events.try_recv() {
        match event {
            QueueEvent::Completed { .. } => completed += 1,
            QueueEvent::Failed { task_id, error, .. } => warn!("⚠️ Task {} failed: {}", task_id, error),
            _ => {}
        }
    }
    info!("📦 Observed {} completed batch tasks", completed);
    Ok(())
}

async fn run_resilient(config: &QueueConfig) {
    let queue = match ResilientRequestQueue::from_config(config) {
        Ok(queue) => queue,
        Err(e) => {
            error!("💥 Failed to build resilient queue: {}", e);
            return;
        }
    };

    let attempts = Arc::new(AtomicU32::new(0));
    let counter = attempts.clone();
    let flaky = queue.add_default_request(move || {
        let counter = counter.clone();
        async move {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                Err("upstream unavailable")
            } else {
                Ok("payload")
            }
        }
    });

    match flaky.await {
        Ok(body) => info!("🛡️ Request succeeded after {} attempts: {}", attempts.load(Ordering::SeqCst), body),
        Err(e) => error!("💥 Request failed: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_follow_config_flag() {
        let aggregator = MetricsAggregator::new();
        let disabled: AppConfig = toml::from_str(
            r#"
            [queue]
            enable_metrics = false
            "#,
        )
        .unwrap();
        assert!(metrics_for(&disabled.queue, "quiet", &aggregator).is_none());
        assert_eq!(aggregator.overall_health().total_queues, 0);

        let enabled = AppConfig::default();
        let metrics = metrics_for(&enabled.queue, "loud", &aggregator).unwrap();
        assert_eq!(metrics.snapshot().queue_name, "loud");
        assert_eq!(aggregator.overall_health().total_queues, 1);
    }

    #[tokio::test]
    async fn test_sequential_demo_without_metrics() {
        let aggregator = MetricsAggregator::new();
        let config = QueueConfig {
            enable_metrics: false,
            ..QueueConfig::default()
        };
        run_sequential(&config, &aggregator).await.unwrap();
        assert_eq!(aggregator.overall_health().total_queues, 0);
    }
}
