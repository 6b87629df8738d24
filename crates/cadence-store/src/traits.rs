//! Store trait contracts
//!
//! The engine depends on these traits only; implementations decide the
//! backend. Every contract here maps to a single backend operation —
//! in particular the conflict-ignoring enrollment insert must be one
//! atomic operation, never a read-then-write pair, or concurrent
//! enrollers could double-enroll a lead.

use crate::error::StoreError;
use cadence_model::{
    Contact, Enrollment, EnrollmentStats, Lead, LeadId, LeadWithContact, PipelineStage, Sequence,
    SequenceId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A sequence joined with its read-time enrollment stats
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceWithStats {
    pub sequence: Sequence,
    pub stats: EnrollmentStats,
}

/// Sequence definitions
#[async_trait::async_trait]
pub trait SequenceStore: Send + Sync {
    /// Persist a new sequence.
    async fn create(&self, sequence: Sequence) -> Result<Sequence, StoreError>;

    /// Fetch a sequence by id.
    async fn get(&self, id: SequenceId) -> Result<Option<Sequence>, StoreError>;

    /// All sequences, newest first, each with enrollment counts
    /// aggregated from enrollment rows (never stored redundantly).
    async fn list_with_stats(&self) -> Result<Vec<SequenceWithStats>, StoreError>;
}

/// Leads and their contacts
#[async_trait::async_trait]
pub trait LeadStore: Send + Sync {
    /// Persist a lead.
    async fn insert(&self, lead: Lead) -> Result<(), StoreError>;

    /// Persist a contact.
    async fn insert_contact(&self, contact: Contact) -> Result<(), StoreError>;

    /// Fetch the given leads joined with their primary contact.
    ///
    /// Unknown ids are silently absent from the result. At most one
    /// contact per lead is returned, selected by `is_primary`.
    async fn find_with_primary_contact(
        &self,
        ids: &[LeadId],
    ) -> Result<Vec<LeadWithContact>, StoreError>;

    /// Move the given leads to `stage`, bumping `updated_at` to `at`.
    /// Last write wins; unknown ids are ignored.
    async fn update_stage(
        &self,
        ids: &[LeadId],
        stage: PipelineStage,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;
}

/// Enrollment rows
#[async_trait::async_trait]
pub trait EnrollmentStore: Send + Sync {
    /// Insert rows, silently dropping any that collide on
    /// (sequence_id, lead_id). Returns only the rows actually inserted.
    ///
    /// Must be atomic with respect to concurrent callers.
    async fn insert_ignore_conflicts(
        &self,
        rows: Vec<Enrollment>,
    ) -> Result<Vec<Enrollment>, StoreError>;

    /// Active enrollments with `next_action_at <= at`, FIFO by id.
    async fn due_before(&self, at: DateTime<Utc>) -> Result<Vec<Enrollment>, StoreError>;

    /// Fetch one enrollment by its unique (sequence, lead) pair.
    async fn find(
        &self,
        sequence_id: SequenceId,
        lead_id: LeadId,
    ) -> Result<Option<Enrollment>, StoreError>;

    /// Replace an existing row.
    async fn update(&self, enrollment: Enrollment) -> Result<(), StoreError>;

    /// Enrollment counts by status for one sequence.
    async fn stats_for(&self, sequence_id: SequenceId) -> Result<EnrollmentStats, StoreError>;
}
