//! Run ledger errors
//!
//! Every failure is a deterministic validation outcome. Nothing here is worth
//! retrying with the same input.
//!
//! | Error | Code |
//! |-------|------|
//! | [`InvalidArgument`](RunError::InvalidArgument) | `INVALID_ARGUMENT` |
//! | [`NotFound`](RunError::NotFound) | `NOT_FOUND` |
//! | [`Conflict`](RunError::Conflict) | `CONFLICT` |
//! | [`PermissionDenied`](RunError::PermissionDenied) | `PERMISSION_DENIED` |
//! | [`NotAdmin`](RunError::NotAdmin) | `PERMISSION_DENIED` |
//! | [`Storage`](RunError::Storage) | `STORAGE` |

use thiserror::Error;

use crate::models::{Identity, RunId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunError {
    /// Malformed, missing, negative or zero-divisor input
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("run {0} not found")]
    NotFound(RunId),

    /// Duplicate player
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("{requester} may not delete run {run}")]
    PermissionDenied { requester: Identity, run: RunId },

    #[error("{0} is not an administrator")]
    NotAdmin(Identity),

    /// The persistence adapter failed
    #[error("storage error: {0}")]
    Storage(String),
}

impl RunError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "INVALID_ARGUMENT",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::PermissionDenied { .. } | Self::NotAdmin(_) => "PERMISSION_DENIED",
            Self::Storage(_) => "STORAGE",
        }
    }
}

impl From<rusqlite::Error> for RunError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for RunError {
    fn from(err: serde_json::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RunError>;
