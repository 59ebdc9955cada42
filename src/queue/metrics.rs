use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::errors::QueueError;

/// Queue performance metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueMetricsData {
    pub queue_name: String,
    pub tasks_submitted: u64,
    pub tasks_started: u64,
    pub tasks_completed: u64,
    pub tasks_failed: u64,
    pub tasks_timeout: u64,
    pub total_wait_time_ms: u64,
    pub total_execution_time_ms: u64,
    pub average_wait_time_ms: f64,
    pub average_execution_time_ms: f64,
    pub failure_rate: f64,
    pub current_throughput_per_sec: f64,
    pub peak_throughput_per_sec: f64,
    #[serde(skip)]
    pub last_activity: Option<Instant>,
}

impl QueueMetricsData {
    fn new(queue_name: String) -> Self {
        Self {
            queue_name,
            tasks_submitted: 0,
            tasks_started: 0,
            tasks_completed: 0,
            tasks_failed: 0,
            tasks_timeout: 0,
            total_wait_time_ms: 0,
            total_execution_time_ms: 0,
            average_wait_time_ms: 0.0,
            average_execution_time_ms: 0.0,
            failure_rate: 0.0,
            current_throughput_per_sec: 0.0,
            peak_throughput_per_sec: 0.0,
            last_activity: None,
        }
    }

    /// Tasks that reached a final outcome
    pub fn total_processed(&self) -> u64 {
        self.tasks_completed + self.tasks_failed + self.tasks_timeout
    }

    fn update_averages(&mut self) {
        let processed = self.total_processed();
        if processed > 0 {
            self.average_execution_time_ms = self.total_execution_time_ms as f64 / processed as f64;
            self.failure_rate = (self.tasks_failed + self.tasks_timeout) as f64 / processed as f64;
        }
        if self.tasks_started > 0 {
            self.average_wait_time_ms = self.total_wait_time_ms as f64 / self.tasks_started as f64;
        }
    }
}

/// Thread-safe queue metrics collector
#[derive(Debug, Clone)]
pub struct QueueMetrics {
    data: Arc<RwLock<QueueMetricsData>>,
    // Recent completions for throughput calculation
    recent_completions: Arc<RwLock<VecDeque<Instant>>>,
    throughput_window: Duration,
    start_time: Instant,
}

impl QueueMetrics {
    pub fn new(queue_name: impl Into<String>) -> Self {
        Self::with_window(queue_name, Duration::from_secs(60))
    }

    pub fn with_window(queue_name: impl Into<String>, throughput_window: Duration) -> Self {
        Self {
            data: Arc::new(RwLock::new(QueueMetricsData::new(queue_name.into()))),
            recent_completions: Arc::new(RwLock::new(VecDeque::new())),
            throughput_window,
            start_time: Instant::now(),
        }
    }

    pub fn record_task_submitted(&self) {
        let mut metrics = self.data.write();
        metrics.tasks_submitted += 1;
        metrics.last_activity = Some(Instant::now());
        debug!("📊 Task submitted (total: {})", metrics.tasks_submitted);
    }

    /// Record a start along with how long the task sat in the queue
    pub fn record_task_started(&self, wait_time: Duration) {
        let mut metrics = self.data.write();
        metrics.tasks_started += 1;
        metrics.total_wait_time_ms += wait_time.as_millis() as u64;
        metrics.update_averages();
        debug!("📊 Task started (total: {}, waited {:?})", metrics.tasks_started, wait_time);
    }

    pub fn record_task_completed(&self, execution_time: Duration) {
        let completion_time = Instant::now();
        {
            let mut metrics = self.data.write();
            metrics.tasks_completed += 1;
            metrics.total_execution_time_ms += execution_time.as_millis() as u64;
            metrics.last_activity = Some(completion_time);
            metrics.update_averages();
            debug!(
                "📊 Task completed (total: {}, avg exec time: {:.2}ms)",
                metrics.tasks_completed, metrics.average_execution_time_ms
            );
        }
        self.update_throughput(completion_time);
    }

    pub fn record_task_error(&self, execution_time: Duration) {
        let mut metrics = self.data.write();
        metrics.tasks_failed += 1;
        metrics.total_execution_time_ms += execution_time.as_millis() as u64;
        metrics.last_activity = Some(Instant::now());
        metrics.update_averages();
        debug!("📊 Task failed (total: {})", metrics.tasks_failed);
    }

    pub fn record_task_timeout(&self, execution_time: Duration) {
        let mut metrics = self.data.write();
        metrics.tasks_timeout += 1;
        metrics.total_execution_time_ms += execution_time.as_millis() as u64;
        metrics.last_activity = Some(Instant::now());
        metrics.update_averages();
        debug!("📊 Task timeout (total: {})", metrics.tasks_timeout);
    }

    /// Record a settled outcome, classifying timeouts separately
    pub fn record_outcome<T>(&self, result: &Result<T, QueueError>, execution_time: Duration) {
        match result {
            Ok(_) => self.record_task_completed(execution_time),
            Err(e) if e.root_cause().is_timeout() => self.record_task_timeout(execution_time),
            Err(_) => self.record_task_error(execution_time),
        }
    }

    fn update_throughput(&self, completion_time: Instant) {
        let current_throughput = {
            let mut completions = self.recent_completions.write();
            completions.push_back(completion_time);

            // Drop entries outside the window
            while let Some(&oldest) = completions.front() {
                if completion_time.duration_since(oldest) > self.throughput_window {
                    completions.pop_front();
                } else {
                    break;
                }
            }
            completions.len() as f64 / self.throughput_window.as_secs_f64()
        };

        let mut metrics = self.data.write();
        metrics.current_throughput_per_sec = current_throughput;
        if current_throughput > metrics.peak_throughput_per_sec {
            metrics.peak_throughput_per_sec = current_throughput;
        }
    }

    /// Current metrics snapshot
    pub fn snapshot(&self) -> QueueMetricsData {
        self.data.read().clone()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.snapshot())
    }

    pub fn health(&self) -> QueueHealth {
        let data = self.data.read();
        let uptime = self.start_time.elapsed();

        let total_processed = data.total_processed();
        let success_rate = if total_processed > 0 {
            data.tasks_completed as f64 / total_processed as f64
        } else {
            1.0
        };

        let status = if success_rate >= 0.95 {
            HealthStatus::Healthy
        } else if success_rate >= 0.80 {
            HealthStatus::Warning
        } else {
            HealthStatus::Critical
        };

        QueueHealth {
            status,
            uptime,
            success_rate,
            current_load: data.current_throughput_per_sec / data.peak_throughput_per_sec.max(1.0),
            queue_name: data.queue_name.clone(),
            last_activity: data.last_activity,
        }
    }

    pub fn reset(&self) {
        let queue_name = self.data.read().queue_name.clone();
        *self.data.write() = QueueMetricsData::new(queue_name);
        self.recent_completions.write().clear();
        info!("📊 Queue metrics reset");
    }

    pub fn log_summary(&self) {
        let data = self.snapshot();
        let health = self.health();

        info!("📊 Queue '{}' Summary:", data.queue_name);
        info!("  Status: {:?}", health.status);
        info!("  Uptime: {:?}", health.uptime);
        info!("  Success Rate: {:.1}%", health.success_rate * 100.0);
        info!(
            "  Tasks: {} submitted, {} completed, {} failed, {} timed out",
            data.tasks_submitted, data.tasks_completed, data.tasks_failed, data.tasks_timeout
        );
        info!(
            "  Throughput: {:.2}/sec (peak: {:.2}/sec)",
            data.current_throughput_per_sec, data.peak_throughput_per_sec
        );
        info!(
            "  Avg Times: {:.2}ms wait, {:.2}ms execution",
            data.average_wait_time_ms, data.average_execution_time_ms
        );
    }
}

/// Queue health status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueHealth {
    pub status: HealthStatus,
    #[serde(skip)]
    pub uptime: Duration,
    pub success_rate: f64,
    pub current_load: f64,
    pub queue_name: String,
    #[serde(skip)]
    pub last_activity: Option<Instant>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    Healthy,
    Warning,
    Critical,
}

/// Metrics aggregator for multiple queues
#[derive(Debug, Default)]
pub struct MetricsAggregator {
    queues: RwLock<Vec<QueueMetrics>>,
}

impl MetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_queue(&self, metrics: QueueMetrics) {
        let name = metrics.snapshot().queue_name;
        self.queues.write().push(metrics);
        info!("📊 Registered queue '{}' for metrics aggregation", name);
    }

    pub fn overall_health(&self) -> OverallHealth {
        let queues = self.queues.read();
        let mut total_healthy = 0;
        let mut total_warning = 0;
        let mut total_critical = 0;
        let mut queue_healths = Vec::with_capacity(queues.len());

        for queue_metrics in queues.iter() {
            let health = queue_metrics.health();
            match health.status {
                HealthStatus::Healthy => total_healthy += 1,
                HealthStatus::Warning => total_warning += 1,
                HealthStatus::Critical => total_critical += 1,
            }
            queue_healths.push(health);
        }

        let overall_status = if total_critical > 0 {
            HealthStatus::Critical
        } else if total_warning > 0 {
            HealthStatus::Warning
        } else {
            HealthStatus::Healthy
        };

        OverallHealth {
            status: overall_status,
            total_queues: queues.len(),
            healthy_queues: total_healthy,
            warning_queues: total_warning,
            critical_queues: total_critical,
            queue_healths,
        }
    }

    pub fn log_all_summaries(&self) {
        let queues = self.queues.read().clone();
        info!("📊 === Queue Metrics Summary ({} queues) ===", queues.len());
        for queue_metrics in &queues {
            queue_metrics.log_summary();
        }

        let overall = self.overall_health();
        info!(
            "📊 Overall Status: {:?} ({} healthy, {} warning, {} critical)",
            overall.status, overall.healthy_queues, overall.warning_queues, overall.critical_queues
        );
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverallHealth {
    pub status: HealthStatus,
    pub total_queues: usize,
    pub healthy_queues: usize,
    pub warning_queues: usize,
    pub critical_queues: usize,
    pub queue_healths: Vec<QueueHealth>,
}
