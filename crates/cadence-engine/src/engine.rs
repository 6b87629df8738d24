//! Enrollment engine
//!
//! Joins batches of candidate leads to a sequence. The whole batch
//! shares one computed first-action time; inserts are conflict-safe so
//! re-running an enroll call (or racing another caller) can never
//! double-enroll a lead.

use crate::error::EngineError;
use cadence_calendar::add_business_days;
use cadence_model::{Enrollment, LeadId, LeadWithContact, PipelineStage, SequenceId};
use cadence_store::{EnrollmentStore, LeadStore, SequenceStore};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// One enroll call: a sequence and its candidate leads
#[derive(Debug, Clone)]
pub struct EnrollRequest {
    /// Target sequence
    pub sequence_id: SequenceId,
    /// Candidate leads; duplicates are tolerated and counted once
    pub lead_ids: Vec<LeadId>,
}

impl EnrollRequest {
    /// Create new request
    #[inline]
    #[must_use]
    pub fn new(sequence_id: SequenceId, lead_ids: Vec<LeadId>) -> Self {
        Self {
            sequence_id,
            lead_ids,
        }
    }
}

/// Outcome counts of one enroll call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrollmentReport {
    /// Rows actually inserted
    pub enrolled: usize,
    /// Candidates that produced no new row (unknown, uncontactable, or
    /// already enrolled)
    pub skipped: usize,
    /// Leads found but lacking a primary contact
    pub no_contacts: usize,
}

/// The enrollment workflow
///
/// Owns nothing but injected store handles; construct once at startup
/// and share.
pub struct EnrollmentEngine {
    sequences: Arc<dyn SequenceStore>,
    leads: Arc<dyn LeadStore>,
    enrollments: Arc<dyn EnrollmentStore>,
}

impl EnrollmentEngine {
    /// Create new engine over the given stores
    #[must_use]
    pub fn new(
        sequences: Arc<dyn SequenceStore>,
        leads: Arc<dyn LeadStore>,
        enrollments: Arc<dyn EnrollmentStore>,
    ) -> Self {
        Self {
            sequences,
            leads,
            enrollments,
        }
    }

    /// Enroll the candidate leads into the sequence, effective now.
    pub async fn enroll(&self, request: &EnrollRequest) -> Result<EnrollmentReport, EngineError> {
        self.enroll_at(request, Utc::now()).await
    }

    /// Enroll the candidate leads, treating `now` as the current instant.
    ///
    /// # Workflow
    /// 1. Validate the request (no mutation before this passes)
    /// 2. Load the sequence and the candidates with their primary contacts
    /// 3. Partition into enrollable / no-contact
    /// 4. Compute one first-action time for the whole batch
    /// 5. Bulk-insert with conflict-ignore, then move every enrollable
    ///    lead to `contacted`
    ///
    /// # Errors
    /// - `InvalidArgument` for an empty candidate set
    /// - `SequenceNotFound` for an unknown sequence
    /// - `NoEligibleLeads` when no candidate has a primary contact
    /// - `Storage` when a store call fails; no automatic retry
    pub async fn enroll_at(
        &self,
        request: &EnrollRequest,
        now: DateTime<Utc>,
    ) -> Result<EnrollmentReport, EngineError> {
        if request.lead_ids.is_empty() {
            return Err(EngineError::InvalidArgument(
                "lead_ids must not be empty".to_string(),
            ));
        }

        let sequence = self
            .sequences
            .get(request.sequence_id)
            .await?
            .ok_or(EngineError::SequenceNotFound(request.sequence_id))?;

        let mut candidate_ids = request.lead_ids.clone();
        candidate_ids.sort();
        candidate_ids.dedup();

        let records = self.leads.find_with_primary_contact(&candidate_ids).await?;
        if records.len() < candidate_ids.len() {
            tracing::debug!(
                requested = candidate_ids.len(),
                found = records.len(),
                "dropping unknown lead ids from enroll batch"
            );
        }

        let (enrollable, no_contact): (Vec<LeadWithContact>, Vec<LeadWithContact>) =
            records.into_iter().partition(LeadWithContact::is_contactable);
        let no_contacts = no_contact.len();

        if enrollable.is_empty() {
            return Err(EngineError::NoEligibleLeads);
        }

        // One timestamp for the whole batch: today, clamped to the start
        // of the sequence's sending window.
        let first_action_at = sequence
            .settings
            .sending_window
            .clamp_to_start(add_business_days(now, 0));

        let rows: Vec<Enrollment> = enrollable
            .iter()
            .filter_map(|record| {
                record.primary_contact.as_ref().map(|contact| {
                    Enrollment::new(sequence.id, record.lead.id, contact.id, first_action_at, now)
                })
            })
            .collect();

        let inserted = self.enrollments.insert_ignore_conflicts(rows).await?;
        let enrolled = inserted.len();

        // Stage moves for every enrollable lead, including ones whose
        // insert collided with an existing enrollment.
        let stage_ids: Vec<LeadId> = enrollable.iter().map(|record| record.lead.id).collect();
        self.leads
            .update_stage(&stage_ids, PipelineStage::Contacted, now)
            .await?;

        let report = EnrollmentReport {
            enrolled,
            skipped: request.lead_ids.len() - enrolled,
            no_contacts,
        };
        tracing::info!(
            sequence_id = %sequence.id,
            enrolled = report.enrolled,
            skipped = report.skipped,
            no_contacts = report.no_contacts,
            "enroll call finished"
        );
        Ok(report)
    }
}
