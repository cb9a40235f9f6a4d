//! Engine error types

use thiserror::Error;

/// Errors that can occur while building or running an engine
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid configuration: {reason}")]
    InvalidConfiguration { reason: String },

    #[error("Cancellation requested")]
    CancellationRequested,

    #[error("Worker {worker} panicked")]
    WorkerPanicked { worker: String },

    #[error("Failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}

impl EngineError {
    /// Shorthand for an invalid configuration error
    pub fn invalid(reason: impl Into<String>) -> Self {
        EngineError::InvalidConfiguration { reason: reason.into() }
    }

    /// Check if this error is a cooperative shutdown rather than a failure
    pub fn is_cancellation(&self) -> bool {
        matches!(self, EngineError::CancellationRequested)
    }
}
