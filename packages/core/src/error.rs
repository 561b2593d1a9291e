//! Failure types for archive jobs.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a cancellation context was cancelled.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "reason", rename_all = "snake_case")]
pub enum CancelCause {
    /// Cancelled explicitly by the owner of the context.
    #[error("context canceled")]
    Canceled,
    /// The context's deadline elapsed.
    #[error("context deadline exceeded")]
    DeadlineExceeded,
    /// Cancelled with a caller-supplied reason.
    #[error("{0}")]
    Reason(String),
}

/// The one error an archive job can end with.
///
/// It wraps the cause taken from the caller's cancellation context; the cause
/// is reachable through [`std::error::Error::source`] or [`ArchiveError::cause`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArchiveError {
    #[error("archive job failed: {0}")]
    Cancelled(#[source] CancelCause),
}

impl ArchiveError {
    /// The cancellation cause this error wraps.
    pub fn cause(&self) -> &CancelCause {
        match self {
            ArchiveError::Cancelled(cause) => cause,
        }
    }
}

impl From<CancelCause> for ArchiveError {
    fn from(cause: CancelCause) -> Self {
        ArchiveError::Cancelled(cause)
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn cancelled_error_unwraps_to_cause() {
        let err = ArchiveError::from(CancelCause::Canceled);
        assert_eq!(err.to_string(), "archive job failed: context canceled");
        assert_eq!(err.cause(), &CancelCause::Canceled);

        let source = err.source().map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("context canceled"));
    }
}
