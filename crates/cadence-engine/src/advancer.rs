//! Step advancement
//!
//! Consumes due enrollments and drives them through their step lists.
//! A worker (cron or loop) calls [`StepAdvancer::run_pass`] with the
//! current instant; everything the pass needs is loaded through the
//! injected stores, and channel actions go through the
//! [`ChannelExecutor`] seam.
//!
//! Scheduling rules per sequence:
//! - next action = now + (next step delay - current step delay), in
//!   business days when `skip_weekends` is set, calendar days otherwise,
//!   clamped to the sending-window start
//! - at most `max_per_day` actions per sequence per local day; excess
//!   due enrollments defer to the next eligible day, earliest-enrolled
//!   first
//! - a failed channel action leaves the enrollment due, so the next
//!   pass retries it

use crate::error::EngineError;
use crate::transitions::validate_transition;
use cadence_calendar::{add_business_days, add_calendar_days};
use cadence_model::{
    Enrollment, EnrollmentStatus, LeadId, LeadWithContact, Sequence, SequenceId, Step,
};
use cadence_store::{EnrollmentStore, LeadStore, SequenceStore};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;

/// Channel action failures
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// Provider rejected or dropped the action
    #[error("channel send failed: {0}")]
    SendFailed(String),

    /// Provider unreachable
    #[error("channel unavailable: {0}")]
    Unavailable(String),
}

/// Performs the outreach action for one step
///
/// Implementations talk to the real channel providers (email relay,
/// LinkedIn automation, dialer). The advancer only cares about
/// success/failure.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ChannelExecutor: Send + Sync {
    /// Execute one step's action for one enrollment.
    async fn execute(
        &self,
        enrollment: &Enrollment,
        step: &Step,
        lead: &LeadWithContact,
    ) -> Result<(), ChannelError>;
}

/// Outcome counts of one advancement pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdvanceReport {
    /// Channel actions executed
    pub executed: usize,
    /// Enrollments that finished their step list this pass
    pub completed: usize,
    /// Enrollments pushed to the next eligible day by the rate cap
    pub deferred: usize,
    /// Channel or lookup failures; the enrollments stay due
    pub failed: usize,
}

/// The step-advancement workflow
pub struct StepAdvancer {
    sequences: Arc<dyn SequenceStore>,
    leads: Arc<dyn LeadStore>,
    enrollments: Arc<dyn EnrollmentStore>,
    executor: Arc<dyn ChannelExecutor>,
    /// Actions already taken per (sequence, local day)
    daily_counts: DashMap<(SequenceId, NaiveDate), u32>,
}

impl StepAdvancer {
    /// Create new advancer over the given stores and channel seam
    #[must_use]
    pub fn new(
        sequences: Arc<dyn SequenceStore>,
        leads: Arc<dyn LeadStore>,
        enrollments: Arc<dyn EnrollmentStore>,
        executor: Arc<dyn ChannelExecutor>,
    ) -> Self {
        Self {
            sequences,
            leads,
            enrollments,
            executor,
            daily_counts: DashMap::new(),
        }
    }

    /// Process every enrollment due at `now`.
    ///
    /// Due enrollments are handled FIFO by enrollment id (creation
    /// order), which is also the tie-break when the per-day cap defers
    /// part of the batch.
    pub async fn run_pass(&self, now: DateTime<Utc>) -> Result<AdvanceReport, EngineError> {
        self.prune_day_buckets(now);

        let due = self.enrollments.due_before(now).await?;
        tracing::debug!(due = due.len(), "advancement pass starting");

        let mut report = AdvanceReport::default();
        let mut sequence_cache: HashMap<SequenceId, Sequence> = HashMap::new();

        for enrollment in due {
            let sequence = match self
                .cached_sequence(&mut sequence_cache, enrollment.sequence_id)
                .await?
            {
                Some(sequence) => sequence,
                None => {
                    tracing::warn!(
                        enrollment_id = %enrollment.id,
                        sequence_id = %enrollment.sequence_id,
                        "due enrollment references unknown sequence"
                    );
                    report.failed += 1;
                    continue;
                }
            };

            let window = sequence.settings.sending_window;
            let day_key = (sequence.id, window.local_date(now));
            let used = self.daily_counts.get(&day_key).map(|c| *c).unwrap_or(0);
            if used >= sequence.settings.max_per_day {
                self.defer(&enrollment, &sequence, now).await?;
                report.deferred += 1;
                continue;
            }

            let Some(step) = sequence.steps.get(enrollment.current_step).cloned() else {
                // Step index past the list: reconcile by completing.
                tracing::warn!(
                    enrollment_id = %enrollment.id,
                    current_step = enrollment.current_step,
                    "enrollment past its step list, completing"
                );
                self.complete(&enrollment).await?;
                report.completed += 1;
                continue;
            };

            let mut lead_records = self
                .leads
                .find_with_primary_contact(&[enrollment.lead_id])
                .await?;
            let Some(lead) = lead_records.pop() else {
                tracing::warn!(
                    enrollment_id = %enrollment.id,
                    lead_id = %enrollment.lead_id,
                    "due enrollment references unknown lead"
                );
                report.failed += 1;
                continue;
            };

            match self.executor.execute(&enrollment, &step, &lead).await {
                Ok(()) => {
                    *self.daily_counts.entry(day_key).or_insert(0) += 1;
                    report.executed += 1;
                    if let Some(delta) = sequence.delay_to_next(enrollment.current_step) {
                        self.schedule_next(&enrollment, &sequence, delta, now).await?;
                    } else {
                        self.complete(&enrollment).await?;
                        report.completed += 1;
                    }
                }
                Err(err) => {
                    // Leave the row untouched; it stays due and the next
                    // pass retries it.
                    tracing::warn!(
                        enrollment_id = %enrollment.id,
                        channel = ?step.channel,
                        error = %err,
                        "channel action failed"
                    );
                    report.failed += 1;
                }
            }
        }

        tracing::info!(
            executed = report.executed,
            completed = report.completed,
            deferred = report.deferred,
            failed = report.failed,
            "advancement pass finished"
        );
        Ok(report)
    }

    /// Pause an active enrollment because its lead replied.
    ///
    /// No-op (returns false) when the sequence does not stop on reply,
    /// the enrollment is missing, or it is not active.
    pub async fn record_reply(
        &self,
        sequence_id: SequenceId,
        lead_id: LeadId,
    ) -> Result<bool, EngineError> {
        let sequence = self
            .sequences
            .get(sequence_id)
            .await?
            .ok_or(EngineError::SequenceNotFound(sequence_id))?;
        if !sequence.settings.stop_on_reply {
            return Ok(false);
        }
        self.pause(sequence_id, lead_id).await
    }

    /// Pause an active enrollment because its contact address bounced.
    pub async fn record_bounce(
        &self,
        sequence_id: SequenceId,
        lead_id: LeadId,
    ) -> Result<bool, EngineError> {
        let sequence = self
            .sequences
            .get(sequence_id)
            .await?
            .ok_or(EngineError::SequenceNotFound(sequence_id))?;
        if !sequence.settings.stop_on_bounce {
            return Ok(false);
        }
        self.pause(sequence_id, lead_id).await
    }

    /// Pause an active enrollment unconditionally (manual hold).
    pub async fn pause(
        &self,
        sequence_id: SequenceId,
        lead_id: LeadId,
    ) -> Result<bool, EngineError> {
        let Some(mut enrollment) = self.enrollments.find(sequence_id, lead_id).await? else {
            return Ok(false);
        };
        if enrollment.status != EnrollmentStatus::Active {
            return Ok(false);
        }
        validate_transition(enrollment.status, EnrollmentStatus::Paused)?;
        enrollment.status = EnrollmentStatus::Paused;
        self.enrollments.update(enrollment).await?;
        tracing::info!(%sequence_id, %lead_id, "enrollment paused");
        Ok(true)
    }

    /// Re-activate a paused enrollment.
    ///
    /// The stored `next_action_at` is kept; a past-due time makes the
    /// enrollment due on the next pass.
    pub async fn resume(
        &self,
        sequence_id: SequenceId,
        lead_id: LeadId,
    ) -> Result<bool, EngineError> {
        let Some(mut enrollment) = self.enrollments.find(sequence_id, lead_id).await? else {
            return Ok(false);
        };
        if enrollment.status != EnrollmentStatus::Paused {
            return Ok(false);
        }
        validate_transition(enrollment.status, EnrollmentStatus::Active)?;
        enrollment.status = EnrollmentStatus::Active;
        self.enrollments.update(enrollment).await?;
        tracing::info!(%sequence_id, %lead_id, "enrollment resumed");
        Ok(true)
    }

    async fn cached_sequence(
        &self,
        cache: &mut HashMap<SequenceId, Sequence>,
        id: SequenceId,
    ) -> Result<Option<Sequence>, EngineError> {
        if let Some(sequence) = cache.get(&id) {
            return Ok(Some(sequence.clone()));
        }
        let Some(sequence) = self.sequences.get(id).await? else {
            return Ok(None);
        };
        cache.insert(id, sequence.clone());
        Ok(Some(sequence))
    }

    async fn schedule_next(
        &self,
        enrollment: &Enrollment,
        sequence: &Sequence,
        delta_days: u32,
        now: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        let base = if sequence.settings.skip_weekends {
            add_business_days(now, delta_days)
        } else {
            add_calendar_days(now, delta_days)
        };
        let mut updated = enrollment.clone();
        updated.current_step += 1;
        updated.next_action_at = sequence.settings.sending_window.clamp_to_start(base);
        self.enrollments.update(updated).await?;
        Ok(())
    }

    async fn complete(&self, enrollment: &Enrollment) -> Result<(), EngineError> {
        validate_transition(enrollment.status, EnrollmentStatus::Completed)?;
        let mut updated = enrollment.clone();
        updated.status = EnrollmentStatus::Completed;
        self.enrollments.update(updated).await?;
        Ok(())
    }

    async fn defer(
        &self,
        enrollment: &Enrollment,
        sequence: &Sequence,
        now: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        let next_day = if sequence.settings.skip_weekends {
            add_business_days(now, 1)
        } else {
            add_calendar_days(now, 1)
        };
        let mut updated = enrollment.clone();
        let next_action_at = sequence.settings.sending_window.clamp_to_start(next_day);
        updated.next_action_at = next_action_at;
        self.enrollments.update(updated).await?;
        tracing::warn!(
            enrollment_id = %enrollment.id,
            sequence_id = %sequence.id,
            next_action_at = %next_action_at,
            "daily cap reached, deferring"
        );
        Ok(())
    }

    fn prune_day_buckets(&self, now: DateTime<Utc>) {
        // Offsets shift the local day by at most one; two days of slack
        // keeps every live bucket.
        let horizon = (now - Duration::days(2)).date_naive();
        self.daily_counts.retain(|(_, day), _| *day >= horizon);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_model::{Contact, LeadDraft, SequenceDraft};
    use cadence_store::MemoryStore;
    use chrono::TimeZone;
    use mockall::predicate::always;

    fn now() -> DateTime<Utc> {
        // A Monday inside the default window.
        Utc.with_ymd_and_hms(2025, 6, 2, 10, 0, 0).unwrap()
    }

    async fn seed_enrollment(store: &Arc<MemoryStore>) -> (SequenceId, LeadId) {
        let sequence = SequenceDraft::new("outbound").build_at(now()).unwrap();
        let sequence_id = sequence.id;
        SequenceStore::create(store.as_ref(), sequence).await.unwrap();

        let lead = LeadDraft {
            company: Some("Acme".to_string()),
            ..LeadDraft::default()
        }
        .validate_at(now())
        .unwrap();
        let lead_id = lead.id;
        LeadStore::insert(store.as_ref(), lead).await.unwrap();
        let contact = Contact::new(lead_id, "Dana", "dana@acme.example").primary();
        let contact_id = contact.id;
        store.insert_contact(contact).await.unwrap();

        store
            .insert_ignore_conflicts(vec![Enrollment::new(
                sequence_id,
                lead_id,
                contact_id,
                now(),
                now(),
            )])
            .await
            .unwrap();
        (sequence_id, lead_id)
    }

    #[tokio::test]
    async fn failed_channel_leaves_enrollment_due() {
        let store = Arc::new(MemoryStore::new());
        let (sequence_id, lead_id) = seed_enrollment(&store).await;

        let mut executor = MockChannelExecutor::new();
        executor
            .expect_execute()
            .with(always(), always(), always())
            .times(1)
            .returning(|_, _, _| Err(ChannelError::SendFailed("relay 550".to_string())));

        let advancer = StepAdvancer::new(
            store.clone(),
            store.clone(),
            store.clone(),
            Arc::new(executor),
        );
        let report = advancer.run_pass(now()).await.unwrap();

        assert_eq!(report.failed, 1);
        assert_eq!(report.executed, 0);

        let enrollment = store.find(sequence_id, lead_id).await.unwrap().unwrap();
        assert_eq!(enrollment.current_step, 0);
        assert!(enrollment.is_due(now()));
    }

    #[tokio::test]
    async fn successful_step_advances_and_reschedules() {
        let store = Arc::new(MemoryStore::new());
        let (sequence_id, lead_id) = seed_enrollment(&store).await;

        let mut executor = MockChannelExecutor::new();
        executor
            .expect_execute()
            .times(1)
            .returning(|_, _, _| Ok(()));

        let advancer = StepAdvancer::new(
            store.clone(),
            store.clone(),
            store.clone(),
            Arc::new(executor),
        );
        let report = advancer.run_pass(now()).await.unwrap();
        assert_eq!(report.executed, 1);
        assert_eq!(report.completed, 0);

        // Default cadence: step 0 -> 1 is a 3-business-day gap, so
        // Monday lands on Thursday at window start.
        let enrollment = store.find(sequence_id, lead_id).await.unwrap().unwrap();
        assert_eq!(enrollment.current_step, 1);
        assert_eq!(
            enrollment.next_action_at,
            Utc.with_ymd_and_hms(2025, 6, 5, 9, 0, 0).unwrap()
        );
    }

    #[tokio::test]
    async fn executor_is_not_called_for_future_enrollments() {
        let store = Arc::new(MemoryStore::new());
        let (sequence_id, lead_id) = seed_enrollment(&store).await;

        // Push the action into the future.
        let mut enrollment = store.find(sequence_id, lead_id).await.unwrap().unwrap();
        enrollment.next_action_at = now() + Duration::days(3);
        store.update(enrollment).await.unwrap();

        let mut executor = MockChannelExecutor::new();
        executor.expect_execute().times(0);

        let advancer = StepAdvancer::new(
            store.clone(),
            store.clone(),
            store.clone(),
            Arc::new(executor),
        );
        let report = advancer.run_pass(now()).await.unwrap();
        assert_eq!(report, AdvanceReport::default());
    }

    #[tokio::test]
    async fn reply_pause_respects_sequence_settings() {
        let store = Arc::new(MemoryStore::new());
        let (sequence_id, lead_id) = seed_enrollment(&store).await;

        let executor = MockChannelExecutor::new();
        let advancer = StepAdvancer::new(
            store.clone(),
            store.clone(),
            store.clone(),
            Arc::new(executor),
        );

        // Default settings stop on reply but not on bounce.
        assert!(!advancer.record_bounce(sequence_id, lead_id).await.unwrap());
        assert!(advancer.record_reply(sequence_id, lead_id).await.unwrap());

        let enrollment = store.find(sequence_id, lead_id).await.unwrap().unwrap();
        assert_eq!(enrollment.status, EnrollmentStatus::Paused);

        // A second reply is a no-op on a paused enrollment.
        assert!(!advancer.record_reply(sequence_id, lead_id).await.unwrap());

        assert!(advancer.resume(sequence_id, lead_id).await.unwrap());
        let enrollment = store.find(sequence_id, lead_id).await.unwrap().unwrap();
        assert_eq!(enrollment.status, EnrollmentStatus::Active);
    }
}
