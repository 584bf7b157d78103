/// Centralized error types for the scaler dashboard client
use thiserror::Error;

/// Server status code meaning "no error, but the data is not there yet"
pub const STATUS_PENDING: i64 = 2;

#[derive(Error, Debug)]
pub enum SyncError {
    // Validation Errors
    #[error("Validation failed: {0}")]
    Validation(String),

    // Network Errors
    #[error("Transport failed: {0}")]
    Transport(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    // Data Errors
    #[error("Server reported status {status}: {message}")]
    Data { status: i64, message: String },

    #[error("Data not yet available")]
    Pending,

    #[error("Deserialization failed: {0}")]
    Deserialization(#[from] serde_json::Error),

    // Configuration Errors
    #[error("Configuration error: {0}")]
    Config(String),

    // File I/O Errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SyncError>;

impl SyncError {
    /// Local data inconsistency, reported the same way as a bad server status
    pub fn data(message: impl Into<String>) -> Self {
        SyncError::Data {
            status: -1,
            message: message.into(),
        }
    }

    /// Pending is a retry signal, not a user-visible failure
    pub fn is_pending(&self) -> bool {
        matches!(self, SyncError::Pending)
    }

    /// Check if the next regular tick may succeed without user action
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SyncError::Pending | SyncError::Transport(_) | SyncError::Http(_) | SyncError::Data { .. }
        )
    }

    /// Get error code for logging/monitoring
    pub fn error_code(&self) -> &str {
        match self {
            SyncError::Validation(_) => "VAL_001",
            SyncError::Transport(_) => "NET_001",
            SyncError::Http(_) => "NET_002",
            SyncError::Data { .. } => "DATA_001",
            SyncError::Pending => "DATA_002",
            SyncError::Deserialization(_) => "DATA_003",
            SyncError::Config(_) => "CFG_001",
            SyncError::Io(_) => "FILE_001",
        }
    }

    /// Message shown on the user-facing status line
    pub fn status_message(&self) -> String {
        match self {
            SyncError::Validation(msg) => msg.clone(),
            SyncError::Pending => "Waiting for data...".to_string(),
            other => format!("{} ({})", other, other.error_code()),
        }
    }
}
