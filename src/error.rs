//! Error types for machine_sync

use std::fmt;

/// Unified error type for machine_sync operations
#[derive(Debug)]
pub enum SyncError {
    /// HTTP request failed (network error, timeout, etc.)
    Network(reqwest::Error),
    /// Failed to parse JSON data
    Parse(serde_json::Error),
    /// HTTP error status code
    HttpStatus(reqwest::StatusCode),
    /// Database operation failed
    Database(rusqlite::Error),
    /// Failed to read a file (catalog export, database directory)
    Io(std::io::Error),
    /// Inventory feed response carried an `errors` payload
    FeedErrors(String),
    /// A machine record's mandatory `updated_at` date was missing or unparsable
    InvalidTimestamp { opdb_id: String, value: String },
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncError::Network(e) => write!(f, "Network error: {}", e),
            SyncError::Parse(e) => write!(f, "Parse error: {}", e),
            SyncError::HttpStatus(status) => write!(f, "HTTP error: {}", status),
            SyncError::Database(e) => write!(f, "Database error: {}", e),
            SyncError::Io(e) => write!(f, "I/O error: {}", e),
            SyncError::FeedErrors(errors) => {
                write!(f, "Inventory feed returned errors: {}", errors)
            }
            SyncError::InvalidTimestamp { opdb_id, value } => {
                write!(
                    f,
                    "Machine {} has an unparsable updated_at date: {:?}",
                    opdb_id, value
                )
            }
        }
    }
}

impl std::error::Error for SyncError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SyncError::Network(e) => Some(e),
            SyncError::Parse(e) => Some(e),
            SyncError::HttpStatus(_) => None,
            SyncError::Database(e) => Some(e),
            SyncError::Io(e) => Some(e),
            SyncError::FeedErrors(_) => None,
            SyncError::InvalidTimestamp { .. } => None,
        }
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        SyncError::Network(err)
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Parse(err)
    }
}

impl From<rusqlite::Error> for SyncError {
    fn from(err: rusqlite::Error) -> Self {
        SyncError::Database(err)
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::Io(err)
    }
}

/// Result alias for machine_sync operations
pub type Result<T> = std::result::Result<T, SyncError>;
