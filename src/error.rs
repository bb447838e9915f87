//! Run-level error taxonomy.
//!
//! Only the failures listed here abort a run. Publish and write-back failures
//! are folded into the report instead (see `dispatch`).
use thiserror::Error;

/// Fatal errors surfaced by `run_workflow`.
#[derive(Debug, Error)]
pub enum RunError {
    /// Inputs were unusable before any store access happened.
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// The content store could not produce the row set.
    #[error("content store fetch failed: {0:#}")]
    StoreFetch(anyhow::Error),
}

impl RunError {
    pub fn precondition(message: impl Into<String>) -> Self {
        RunError::Precondition(message.into())
    }

    /// True when the run never reached the content store.
    pub fn is_precondition(&self) -> bool {
        matches!(self, RunError::Precondition(_))
    }
}
