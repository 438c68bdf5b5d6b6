use serde::{Deserialize, Serialize};

/// Coarse classification of a [`SyncError`].
///
/// The sync coordinator only branches on this, never on the full error:
/// - `Connectivity`: the remote store could not be reached; recovered by
///   deferring to the background sync job.
/// - `NotFound` / `PermissionDenied`: surfaced to the caller, never retried.
/// - `Storage`: a local cache failure, fatal to the current operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    Connectivity,
    NotFound,
    PermissionDenied,
    Storage,
    Internal,
}

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("remote store unreachable: {0}")]
    Connectivity(String),

    #[error("document not found: {0}")]
    NotFound(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("remote store error: {0}")]
    Remote(String),

    #[error("local storage error: {0}")]
    Storage(#[from] diesel::result::Error),

    #[error("storage pool error: {0}")]
    Pool(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl SyncError {
    pub fn connectivity(message: impl Into<String>) -> Self {
        Self::Connectivity(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::PermissionDenied(message.into())
    }

    pub fn remote(message: impl Into<String>) -> Self {
        Self::Remote(message.into())
    }

    pub fn pool(message: impl Into<String>) -> Self {
        Self::Pool(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Connectivity(_) => ErrorKind::Connectivity,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::PermissionDenied(_) => ErrorKind::PermissionDenied,
            Self::Storage(_) | Self::Pool(_) | Self::Serialization(_) => ErrorKind::Storage,
            Self::Remote(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Whether this error should be recovered by enqueueing a deferred sync.
    pub fn is_connectivity(&self) -> bool {
        self.kind() == ErrorKind::Connectivity
    }
}

pub type SyncResult<T> = Result<T, SyncError>;
