use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::errors::QueueError;

pub const DEFAULT_TIMEOUT_MS: u32 = 10_000;
pub const DEFAULT_MAX_RETRIES: u32 = 2;
pub const DEFAULT_RETRY_DELAY_MS: u32 = 1_000;
pub const DEFAULT_CONCURRENCY_LIMIT: usize = 3;
pub const DEFAULT_BATCH_SIZE: usize = 10;
/// Lower bound for a queue-wide default request timeout
pub const MIN_TIMEOUT_MS: u32 = 100;

/// Per-request timeout and retry settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestOptions {
    pub timeout_ms: u32,
    pub max_retries: u32,
    pub retry_delay_ms: u32,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
        }
    }
}

impl RequestOptions {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(u64::from(self.timeout_ms))
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(u64::from(self.retry_delay_ms))
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u32) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_delay_ms(mut self, retry_delay_ms: u32) -> Self {
        self.retry_delay_ms = retry_delay_ms;
        self
    }

    pub fn validate(&self) -> Result<(), QueueError> {
        if self.timeout_ms < MIN_TIMEOUT_MS {
            return Err(QueueError::InvalidArgument(format!(
                "Timeout must be at least {}ms, got {}ms",
                MIN_TIMEOUT_MS, self.timeout_ms
            )));
        }
        Ok(())
    }
}

/// Partial update of a resilient queue's defaults
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestOptionsUpdate {
    pub concurrency_limit: Option<usize>,
    pub max_retries: Option<u32>,
    pub retry_delay_ms: Option<u32>,
    pub timeout_ms: Option<u32>,
}

/// Queue configuration, loadable from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    pub name: String,
    pub concurrency_limit: usize,
    pub batch_size: usize,
    pub enable_metrics: bool,
    pub request: RequestOptions,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            concurrency_limit: DEFAULT_CONCURRENCY_LIMIT,
            batch_size: DEFAULT_BATCH_SIZE,
            enable_metrics: true,
            request: RequestOptions::default(),
        }
    }
}

impl QueueConfig {
    /// Load and validate configuration from a TOML file
    pub fn from_toml<P: AsRef<Path>>(path: P) -> Result<Self, QueueError> {
        let config_content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&config_content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, QueueError> {
        let config: QueueConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), QueueError> {
        if self.concurrency_limit < 1 {
            return Err(QueueError::InvalidArgument(
                "Concurrency limit must be at least 1".to_string(),
            ));
        }
        if self.batch_size < 1 {
            return Err(QueueError::InvalidArgument(
                "Batch size must be at least 1".to_string(),
            ));
        }
        self.request.validate()
    }
}
