//! Engine error taxonomy.

use thiserror::Error;
use wallog_store::StoreError;

/// Errors surfaced by the reconciliation engine.
///
/// `Validation` covers malformed caller input and is raised before any
/// remote call; everything remote funnels through `Store`. Partial
/// failures inside an accepted batch are NOT errors - they are reported
/// in the operation outcomes.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed caller input (unknown shard key, missing identifier,
    /// undecodable cursor token). Never retried.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// A reconciliation run was triggered while one is in progress.
    #[error("reconciliation job already running")]
    AlreadyRunning,

    /// An auxiliary lookup could not be fully drained; the run cannot
    /// classify records without complete lookup sets.
    #[error("auxiliary lookup failed: {message}")]
    LookupFailed { message: String },

    /// Remote store failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl EngineError {
    pub fn validation(message: impl Into<String>) -> Self {
        EngineError::Validation {
            message: message.into(),
        }
    }

    pub fn lookup_failed(message: impl Into<String>) -> Self {
        EngineError::LookupFailed {
            message: message.into(),
        }
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
