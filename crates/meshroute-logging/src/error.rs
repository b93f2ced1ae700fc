//! Logging setup error types

use thiserror::Error;

/// Errors installing the logging subscriber
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Failed to open log output: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to create rolling log file: {0}")]
    Appender(#[from] tracing_appender::rolling::InitError),

    #[error("Failed to install subscriber: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

/// Result type for logging setup
pub type LoggingResult<T> = Result<T, LoggingError>;
