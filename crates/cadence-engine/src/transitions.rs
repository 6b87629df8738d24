//! Enrollment status machine
//!
//! Active enrollments may pause (reply, bounce, manual hold) and paused
//! ones may resume; only exhausting the step list completes an
//! enrollment, and completed is terminal.

use cadence_model::EnrollmentStatus;

/// Rejected status transitions
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TransitionError {
    /// The transition is not in the allowed set
    #[error("illegal transition: {from:?} -> {to:?}")]
    IllegalTransition {
        from: EnrollmentStatus,
        to: EnrollmentStatus,
    },
}

/// Validates a status transition.
pub fn validate_transition(
    from: EnrollmentStatus,
    to: EnrollmentStatus,
) -> Result<(), TransitionError> {
    if allowed(from, to) {
        Ok(())
    } else {
        Err(TransitionError::IllegalTransition { from, to })
    }
}

/// The statuses reachable in one transition from `from`.
#[must_use]
pub fn allowed_transitions(from: EnrollmentStatus) -> Vec<EnrollmentStatus> {
    use EnrollmentStatus::*;
    match from {
        Active => vec![Paused, Completed],
        Paused => vec![Active],
        Completed => vec![],
    }
}

fn allowed(from: EnrollmentStatus, to: EnrollmentStatus) -> bool {
    allowed_transitions(from).into_iter().any(|s| s == to)
}
