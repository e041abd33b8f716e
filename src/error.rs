//! Error types for the notegen generation client.

use thiserror::Error;

/// Persistence-related errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Snapshot read failed: {0}")]
    ReadFailed(String),

    #[error("Snapshot write failed: {0}")]
    WriteFailed(String),

    #[error("Malformed snapshot: {0}")]
    Malformed(String),

    #[error("Storage I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Record decoding errors. Logged by the decoder and never propagated past it.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Record is missing its {0} line")]
    MissingLine(&'static str),

    #[error("Record line is missing the '{0}' marker")]
    MissingMarker(&'static str),

    #[error("Unknown event type: {0}")]
    UnknownEvent(String),

    #[error("Invalid {event_type} payload: {message}")]
    InvalidPayload { event_type: String, message: String },
}

/// Errors surfaced by the orchestrator, the service clients and the CLI
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Service error: {0}")]
    ServiceError(String),

    #[error("Service request failed: {0}")]
    RequestFailed(String),

    #[error("Service rejected request: {0}")]
    ServiceRejected(String),

    #[error("Generation stream failed: {0}")]
    StreamFailed(String),

    #[error("Invalid service response: {0}")]
    InvalidResponse(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("No task: {0}")]
    NoTask(String),

    #[error("Page not found: {0}")]
    PageNotFound(usize),

    #[error("Retry already in flight for page {0}")]
    RetryInFlight(usize),

    #[error("History record not found: {0}")]
    HistoryRecordNotFound(String),

    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}
