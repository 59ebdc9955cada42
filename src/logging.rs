//! Logging setup for console output with an optional rotating log file
//!
//! Queue internals log through `tracing`; applications pick the subscriber.

use serde::Deserialize;
use tracing_subscriber::{
    fmt::{self, time::ChronoUtc},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};
use tracing_appender::non_blocking::WorkerGuard;

type InitError = Box<dyn std::error::Error + Send + Sync>;

/// Logging configuration options
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "async_queue=debug")
    pub level_filter: String,
    /// Whether to include timestamps in console output
    pub console_timestamps: bool,
    /// Emit console lines as JSON
    pub json_format: bool,
    /// Directory for daily-rotated log files; console only when unset
    pub log_dir: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level_filter: "info,async_queue=info".to_string(),
            console_timestamps: true,
            json_format: false,
            log_dir: None,
        }
    }
}

impl LoggingConfig {
    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level_filter))
    }

    fn console_timer(&self) -> ChronoUtc {
        if self.console_timestamps {
            ChronoUtc::new("%Y-%m-%d %H:%M:%S%.3f UTC".to_string())
        } else {
            ChronoUtc::new(String::new())
        }
    }
}

/// Initialize the global subscriber from `config`.
///
/// When `log_dir` is set a second, JSON-formatted layer writes to
/// `<log_dir>/async_queue.YYYY-MM-DD.log`. The returned guard flushes that
/// writer on drop and must be held for the life of the program.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>, InitError> {
    let console_layer = if config.json_format {
        fmt::layer()
            .json()
            .with_writer(std::io::stdout)
            .with_target(true)
            .with_timer(ChronoUtc::new("%Y-%m-%dT%H:%M:%S%.3fZ".to_string()))
            .with_filter(config.env_filter())
            .boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stdout)
            .with_ansi(true)
            .with_level(true)
            .with_target(true)
            .with_timer(config.console_timer())
            .with_filter(config.env_filter())
            .boxed()
    };

    let (file_layer, guard) = match &config.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::daily(dir, "async_queue.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .json()
                .with_writer(writer)
                .with_ansi(false)
                .with_thread_ids(true)
                .with_thread_names(true)
                .with_timer(ChronoUtc::new("%Y-%m-%dT%H:%M:%S%.3fZ".to_string()))
                .with_filter(config.env_filter());
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()?;

    tracing::info!(
        json_format = config.json_format,
        log_dir = ?config.log_dir,
        "📁 Logging initialized"
    );
    Ok(guard)
}

/// Initialize simple logging for testing or minimal setups
pub fn init_simple_logging() -> Result<(), InitError> {
    tracing_subscriber::fmt()
        .with_env_filter("info,async_queue=info")
        .try_init()?;

    tracing::info!("🖥️ Simple console logging initialized");
    Ok(())
}

/// Log basic runtime information for debugging
pub fn log_system_info() {
    let cpu_count = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);

    tracing::info!(
        package_version = env!("CARGO_PKG_VERSION"),
        target_arch = std::env::consts::ARCH,
        target_os = std::env::consts::OS,
        cpu_count,
        "📊 Environment information logged"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_config_default() {
        let config = LoggingConfig::default();
        assert_eq!(config.level_filter, "info,async_queue=info");
        assert!(config.console_timestamps);
        assert!(!config.json_format);
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn test_logging_config_partial_toml() {
        let config: LoggingConfig = toml::from_str(
            r#"
            level_filter = "debug"
            json_format = true
            "#,
        )
        .unwrap();
        assert_eq!(config.level_filter, "debug");
        assert!(config.json_format);
        assert!(config.console_timestamps);
    }

    #[test]
    fn test_second_init_is_an_error() {
        // Whichever call wins the global slot, the other must report failure
        let first = init_simple_logging();
        let second = init_simple_logging();
        assert!(first.is_err() || second.is_err());
    }
}
