//! Engine error type
//!
//! One taxonomy for both workflows: validation errors are detected
//! before any mutation; storage errors abort the call without retries
//! (the conflict-safe insert keeps caller retries idempotent).

use crate::transitions::TransitionError;
use cadence_model::SequenceId;
use cadence_store::StoreError;

/// Main engine error type
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Unknown sequence id
    #[error("sequence not found: {0}")]
    SequenceNotFound(SequenceId),

    /// Malformed request
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// No lead in the candidate set has a primary contact
    #[error("no eligible leads in candidate set")]
    NoEligibleLeads,

    /// Backing store failed
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    /// Status machine rejected a transition
    #[error("status transition error: {0}")]
    Transition(#[from] TransitionError),
}

impl EngineError {
    /// Whether retrying the same call could succeed.
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage(err) if err.is_retryable())
    }
}
