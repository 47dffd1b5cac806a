//! Cluster API error types.

use thiserror::Error;

/// Result type for cluster operations.
pub type ClusterResult<T> = Result<T, ClusterError>;

/// Errors that can occur talking to the cluster API.
#[derive(Debug, Error)]
pub enum ClusterError {
    /// The object does not exist. Benign during delete; during a status
    /// read it means the session is dead.
    #[error("object not found: {0}")]
    NotFound(String),

    /// The API server rejected the request.
    #[error("cluster API returned {status}: {message}")]
    Api { status: u16, message: String },

    /// Transport-level failure reaching the API server.
    #[error("cluster API request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Outcome of an idempotent delete. The error leg of the tri-state travels
/// through `ClusterResult`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The object existed and deletion was submitted.
    Deleted,
    /// The object was already gone.
    AlreadyAbsent,
}
