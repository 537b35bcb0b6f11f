//! Error types for core host operations.

use thiserror::Error;

use crate::TouchId;

/// Result type for core host operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in core host operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Input arrived for a contact that is not being tracked.
    #[error("Unknown touch contact: {0}")]
    UnknownContact(TouchId),

    /// A contact start arrived for an identifier that is still active.
    #[error("Touch contact already active: {0}")]
    DuplicateContact(TouchId),

    /// The host refused to grant a permission scope.
    #[error("Authorization failed: {0}")]
    AuthorizeDenied(String),

    /// A scope name outside the supported set.
    #[error("Unknown permission scope: {0}")]
    UnknownScope(String),

    /// A host accessor could not answer.
    #[error("Host accessor unavailable: {0}")]
    HostUnavailable(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
