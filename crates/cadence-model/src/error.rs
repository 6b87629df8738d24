//! Validation error types
//!
//! Validation happens once, at the point a record is born: sequences at
//! creation, leads in the ingestion normalization pass. Downstream code
//! never sees a half-populated record.

use cadence_calendar::WindowError;

/// Sequence creation errors
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SequenceValidationError {
    /// Name missing or blank
    #[error("sequence name must not be empty")]
    EmptyName,

    /// A sequence needs at least one step
    #[error("sequence must define at least one step")]
    EmptySteps,

    /// Step delays must be non-decreasing in step order
    #[error("step {index} delay {delay_days}d precedes step {prev_index} delay {prev_delay_days}d")]
    NonMonotonicDelays {
        index: usize,
        delay_days: u32,
        prev_index: usize,
        prev_delay_days: u32,
    },

    /// Sending window failed validation
    #[error("invalid sending window: {0}")]
    InvalidWindow(#[from] WindowError),

    /// Per-day cap must be positive
    #[error("max_per_day must be positive")]
    ZeroDailyCap,
}

/// Lead ingestion errors
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LeadValidationError {
    /// Required field missing or blank
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// Revenue string could not be parsed
    #[error("unparseable revenue: {0:?}")]
    BadRevenue(String),

    /// Employee-count string could not be parsed
    #[error("unparseable employee count: {0:?}")]
    BadEmployeeCount(String),
}
