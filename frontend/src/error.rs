//! Error taxonomy for the sync engine.

use shared::ValidationError;

/// A network or server fault on a remote call. Never retried by the adapter.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RemoteFailure {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Server error {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Failed to parse response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for RemoteFailure {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            RemoteFailure::Decode(error.to_string())
        } else {
            RemoteFailure::Network(error.to_string())
        }
    }
}

/// Failure of a user-issued engine operation
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Remote(#[from] RemoteFailure),
}

impl SyncError {
    pub fn is_validation(&self) -> bool {
        matches!(self, SyncError::Validation(_))
    }
}

pub type SyncResult<T> = Result<T, SyncError>;
