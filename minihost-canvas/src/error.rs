//! Canvas error types.

use thiserror::Error;

use crate::backend::BackendError;
use crate::context::ContextKind;

/// Result type for canvas operations.
pub type CanvasResult<T> = Result<T, CanvasError>;

/// Errors that can occur in canvas operations.
#[derive(Debug, Error)]
pub enum CanvasError {
    /// A context of another type is already bound to the surface.
    #[error("Context conflict: surface is bound to {bound}, requested {requested}")]
    ContextConflict {
        /// Context type bound to the surface.
        bound: ContextKind,
        /// Context type that was requested.
        requested: ContextKind,
    },

    /// Unknown context type name.
    #[error("Unsupported context type: {0}")]
    UnsupportedContext(String),

    /// Context attributes outside their allowed range.
    #[error("Invalid context attributes: {0}")]
    InvalidAttributes(String),

    /// Snapshot region outside the surface bounds or empty.
    #[error("Invalid region: {0}")]
    InvalidRegion(String),

    /// Unknown image encoding requested.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Backend read-back or draw failure.
    #[error("Render backend error: {0}")]
    RenderBackend(#[from] BackendError),

    /// Image encoding failed.
    #[error("Encoding failed: {0}")]
    Encode(String),

    /// Temp file I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Host configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The export worker stopped before completing a request.
    #[error("Export worker closed before completion")]
    ExportWorkerClosed,
}
