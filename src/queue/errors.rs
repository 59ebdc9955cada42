use std::time::Duration;
use thiserror::Error;

use super::types::BoxError;

/// Errors surfaced by the queue family
#[derive(Error, Debug)]
pub enum QueueError {
    /// Structural misuse, raised synchronously to the caller
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The action itself failed; only its own handle is rejected
    #[error("Action failed: {0}")]
    Action(#[source] BoxError),

    /// The action panicked while running
    #[error("Action panicked: {0}")]
    Panicked(String),

    /// Deadline exceeded while racing an action against its timer
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Every attempt of a retried request failed
    #[error("Request failed after {attempts} attempts: {source}")]
    ExhaustedRetries {
        attempts: u32,
        #[source]
        source: Box<QueueError>,
    },

    /// The task was discarded before it could run
    #[error("Task cancelled before execution")]
    Cancelled,

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(String),
}

impl QueueError {
    /// Wrap any action error
    pub fn action<E: Into<BoxError>>(err: E) -> Self {
        QueueError::Action(err.into())
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, QueueError::Timeout(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, QueueError::Cancelled)
    }

    /// The innermost error, looking through `ExhaustedRetries`
    pub fn root_cause(&self) -> &QueueError {
        match self {
            QueueError::ExhaustedRetries { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

impl From<toml::de::Error> for QueueError {
    fn from(err: toml::de::Error) -> Self {
        QueueError::Config(err.to_string())
    }
}

impl From<std::io::Error> for QueueError {
    fn from(err: std::io::Error) -> Self {
        QueueError::Config(err.to_string())
    }
}
