//! Enrollments
//!
//! The join of one lead to one sequence, tracking progress through the
//! step list. At most one enrollment exists per (sequence, lead) pair;
//! the store's conflict-ignoring insert enforces it.

use crate::ids::{ContactId, EnrollmentId, LeadId, SequenceId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Progress state of an enrollment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStatus {
    /// Steps are executing on schedule
    Active,
    /// Held (reply, bounce, or manual); may resume
    Paused,
    /// All steps executed; terminal
    Completed,
}

impl EnrollmentStatus {
    /// Whether no further transitions are possible.
    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, EnrollmentStatus::Completed)
    }
}

/// One lead's progress through one sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
    /// Enrollment identifier (creation-ordered)
    pub id: EnrollmentId,
    /// Owning sequence
    pub sequence_id: SequenceId,
    /// Enrolled lead
    pub lead_id: LeadId,
    /// Primary contact captured at enrollment time
    pub contact_id: ContactId,
    /// Index into the sequence's step list
    pub current_step: usize,
    /// Progress state
    pub status: EnrollmentStatus,
    /// When the current step becomes due
    pub next_action_at: DateTime<Utc>,
    /// Enrollment timestamp
    pub created_at: DateTime<Utc>,
}

impl Enrollment {
    /// Create a fresh enrollment at step zero.
    #[must_use]
    pub fn new(
        sequence_id: SequenceId,
        lead_id: LeadId,
        contact_id: ContactId,
        first_action_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: EnrollmentId::new(),
            sequence_id,
            lead_id,
            contact_id,
            current_step: 0,
            status: EnrollmentStatus::Active,
            next_action_at: first_action_at,
            created_at: now,
        }
    }

    /// Whether the current step is due at `now`.
    #[inline]
    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == EnrollmentStatus::Active && self.next_action_at <= now
    }
}

/// Per-sequence enrollment counts, aggregated at read time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentStats {
    /// Total enrollments ever created
    pub enrolled: usize,
    /// Currently active
    pub active: usize,
    /// Finished the step list
    pub completed: usize,
    /// Held on reply/bounce/manual pause
    pub paused: usize,
}

impl EnrollmentStats {
    /// Fold one enrollment's status into the counts.
    pub fn record(&mut self, status: EnrollmentStatus) {
        self.enrolled += 1;
        match status {
            EnrollmentStatus::Active => self.active += 1,
            EnrollmentStatus::Completed => self.completed += 1,
            EnrollmentStatus::Paused => self.paused += 1,
        }
    }
}
