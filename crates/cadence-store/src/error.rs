//! Store error type

/// Errors surfaced by a backing store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Store unreachable or backend failure
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A row expected to exist was not found
    #[error("row not found: {0}")]
    Missing(String),

    /// A constraint other than the expected enrollment conflict fired
    #[error("constraint violation: {0}")]
    Constraint(String),
}

impl StoreError {
    /// Whether a retry of the same call could succeed.
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}
