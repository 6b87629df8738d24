//! In-memory reference stores
//!
//! Backs the test suites and the demo server. One `MemoryStore`
//! implements all three contracts; the enrollment unique index lives
//! behind a single async mutex so the conflict-checked bulk insert is
//! atomic with respect to concurrent enrollers.

use crate::error::StoreError;
use crate::traits::{EnrollmentStore, LeadStore, SequenceStore, SequenceWithStats};
use cadence_model::{
    Contact, ContactId, Enrollment, EnrollmentId, EnrollmentStats, Lead, LeadId, LeadWithContact,
    PipelineStage, Sequence, SequenceId,
};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::HashMap;
use tokio::sync::Mutex;

/// In-process implementation of all three store contracts
#[derive(Debug, Default)]
pub struct MemoryStore {
    sequences: DashMap<SequenceId, Sequence>,
    leads: DashMap<LeadId, Lead>,
    contacts: DashMap<ContactId, Contact>,
    enrollments: DashMap<EnrollmentId, Enrollment>,
    /// Unique index over (sequence, lead); guards the conflict check
    enrollment_index: Mutex<HashMap<(SequenceId, LeadId), EnrollmentId>>,
}

impl MemoryStore {
    /// Create empty stores
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of enrollment rows, across all sequences.
    #[inline]
    #[must_use]
    pub fn enrollment_count(&self) -> usize {
        self.enrollments.len()
    }
}

#[async_trait::async_trait]
impl SequenceStore for MemoryStore {
    async fn create(&self, sequence: Sequence) -> Result<Sequence, StoreError> {
        self.sequences.insert(sequence.id, sequence.clone());
        Ok(sequence)
    }

    async fn get(&self, id: SequenceId) -> Result<Option<Sequence>, StoreError> {
        Ok(self.sequences.get(&id).map(|s| s.clone()))
    }

    async fn list_with_stats(&self) -> Result<Vec<SequenceWithStats>, StoreError> {
        // Snapshot before the stats calls; map guards must not be held
        // across an await.
        let sequences: Vec<Sequence> = self.sequences.iter().map(|s| s.clone()).collect();
        let mut listed = Vec::with_capacity(sequences.len());
        for sequence in sequences {
            let stats = self.stats_for(sequence.id).await?;
            listed.push(SequenceWithStats { sequence, stats });
        }
        listed.sort_by(|a, b| b.sequence.created_at.cmp(&a.sequence.created_at));
        Ok(listed)
    }
}

#[async_trait::async_trait]
impl LeadStore for MemoryStore {
    async fn insert(&self, lead: Lead) -> Result<(), StoreError> {
        self.leads.insert(lead.id, lead);
        Ok(())
    }

    async fn insert_contact(&self, contact: Contact) -> Result<(), StoreError> {
        self.contacts.insert(contact.id, contact);
        Ok(())
    }

    async fn find_with_primary_contact(
        &self,
        ids: &[LeadId],
    ) -> Result<Vec<LeadWithContact>, StoreError> {
        let mut found = Vec::with_capacity(ids.len());
        for id in ids {
            let Some(lead) = self.leads.get(id).map(|l| l.clone()) else {
                continue;
            };
            let primary_contact = self
                .contacts
                .iter()
                .find(|c| c.lead_id == *id && c.is_primary)
                .map(|c| c.clone());
            found.push(LeadWithContact {
                lead,
                primary_contact,
            });
        }
        Ok(found)
    }

    async fn update_stage(
        &self,
        ids: &[LeadId],
        stage: PipelineStage,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        for id in ids {
            if let Some(mut lead) = self.leads.get_mut(id) {
                lead.stage = stage;
                lead.updated_at = at;
            }
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl EnrollmentStore for MemoryStore {
    async fn insert_ignore_conflicts(
        &self,
        rows: Vec<Enrollment>,
    ) -> Result<Vec<Enrollment>, StoreError> {
        // Holding the index lock for the whole batch makes the conflict
        // check and the insert one atomic unit.
        let mut index = self.enrollment_index.lock().await;
        let mut inserted = Vec::with_capacity(rows.len());
        for row in rows {
            let key = (row.sequence_id, row.lead_id);
            if index.contains_key(&key) {
                tracing::debug!(
                    sequence_id = %row.sequence_id,
                    lead_id = %row.lead_id,
                    "enrollment conflict, dropping row"
                );
                continue;
            }
            index.insert(key, row.id);
            self.enrollments.insert(row.id, row.clone());
            inserted.push(row);
        }
        Ok(inserted)
    }

    async fn due_before(&self, at: DateTime<Utc>) -> Result<Vec<Enrollment>, StoreError> {
        let mut due: Vec<Enrollment> = self
            .enrollments
            .iter()
            .filter(|e| e.is_due(at))
            .map(|e| e.clone())
            .collect();
        due.sort_by_key(|e| e.id);
        Ok(due)
    }

    async fn find(
        &self,
        sequence_id: SequenceId,
        lead_id: LeadId,
    ) -> Result<Option<Enrollment>, StoreError> {
        let index = self.enrollment_index.lock().await;
        let Some(id) = index.get(&(sequence_id, lead_id)) else {
            return Ok(None);
        };
        Ok(self.enrollments.get(id).map(|e| e.clone()))
    }

    async fn update(&self, enrollment: Enrollment) -> Result<(), StoreError> {
        let Some(mut slot) = self.enrollments.get_mut(&enrollment.id) else {
            return Err(StoreError::Missing(enrollment.id.to_string()));
        };
        *slot = enrollment;
        Ok(())
    }

    async fn stats_for(&self, sequence_id: SequenceId) -> Result<EnrollmentStats, StoreError> {
        let mut stats = EnrollmentStats::default();
        for entry in self.enrollments.iter() {
            if entry.sequence_id == sequence_id {
                stats.record(entry.status);
            }
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_model::{EnrollmentStatus, LeadDraft, SequenceDraft};
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 2, 9, 0, 0).unwrap()
    }

    fn lead(company: &str) -> Lead {
        LeadDraft {
            company: Some(company.to_string()),
            ..LeadDraft::default()
        }
        .validate_at(now())
        .unwrap()
    }

    #[tokio::test]
    async fn conflicting_inserts_keep_one_row() {
        let store = MemoryStore::new();
        let sequence_id = SequenceId::new();
        let lead_id = LeadId::new();
        let contact_id = ContactId::new();

        let first = Enrollment::new(sequence_id, lead_id, contact_id, now(), now());
        let second = Enrollment::new(sequence_id, lead_id, contact_id, now(), now());

        let inserted = store.insert_ignore_conflicts(vec![first.clone()]).await.unwrap();
        assert_eq!(inserted.len(), 1);

        let inserted = store.insert_ignore_conflicts(vec![second]).await.unwrap();
        assert_eq!(inserted.len(), 0);
        assert_eq!(store.enrollment_count(), 1);

        let survivor = store.find(sequence_id, lead_id).await.unwrap().unwrap();
        assert_eq!(survivor.id, first.id);
    }

    #[tokio::test]
    async fn conflict_within_one_batch_is_dropped() {
        let store = MemoryStore::new();
        let sequence_id = SequenceId::new();
        let lead_id = LeadId::new();
        let contact_id = ContactId::new();

        let rows = vec![
            Enrollment::new(sequence_id, lead_id, contact_id, now(), now()),
            Enrollment::new(sequence_id, lead_id, contact_id, now(), now()),
        ];
        let inserted = store.insert_ignore_conflicts(rows).await.unwrap();
        assert_eq!(inserted.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_enrollers_cannot_double_enroll() {
        let store = std::sync::Arc::new(MemoryStore::new());
        let sequence_id = SequenceId::new();
        let lead_id = LeadId::new();
        let contact_id = ContactId::new();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let row = Enrollment::new(sequence_id, lead_id, contact_id, now(), now());
                store.insert_ignore_conflicts(vec![row]).await.unwrap().len()
            }));
        }

        let mut total_inserted = 0;
        for handle in handles {
            total_inserted += handle.await.unwrap();
        }
        assert_eq!(total_inserted, 1);
        assert_eq!(store.enrollment_count(), 1);
    }

    #[tokio::test]
    async fn due_scan_is_fifo_by_id() {
        let store = MemoryStore::new();
        let sequence_id = SequenceId::new();

        let mut ids = Vec::new();
        for _ in 0..3 {
            let row = Enrollment::new(sequence_id, LeadId::new(), ContactId::new(), now(), now());
            ids.push(row.id);
            store.insert_ignore_conflicts(vec![row]).await.unwrap();
            std::thread::sleep(std::time::Duration::from_millis(2));
        }

        let due = store.due_before(now()).await.unwrap();
        let due_ids: Vec<EnrollmentId> = due.iter().map(|e| e.id).collect();
        assert_eq!(due_ids, ids);
    }

    #[tokio::test]
    async fn due_scan_skips_future_and_inactive() {
        let store = MemoryStore::new();
        let sequence_id = SequenceId::new();

        let due_row = Enrollment::new(sequence_id, LeadId::new(), ContactId::new(), now(), now());
        let future_row = Enrollment::new(
            sequence_id,
            LeadId::new(),
            ContactId::new(),
            now() + chrono::Duration::days(1),
            now(),
        );
        let mut paused_row =
            Enrollment::new(sequence_id, LeadId::new(), ContactId::new(), now(), now());
        paused_row.status = EnrollmentStatus::Paused;

        store
            .insert_ignore_conflicts(vec![due_row.clone(), future_row, paused_row])
            .await
            .unwrap();

        let due = store.due_before(now()).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, due_row.id);
    }

    #[tokio::test]
    async fn primary_contact_is_selected() {
        let store = MemoryStore::new();
        let lead = lead("Acme");
        let lead_id = lead.id;
        LeadStore::insert(&store, lead).await.unwrap();

        store
            .insert_contact(Contact::new(lead_id, "Backup", "backup@acme.example"))
            .await
            .unwrap();
        store
            .insert_contact(Contact::new(lead_id, "Main", "main@acme.example").primary())
            .await
            .unwrap();

        let found = store.find_with_primary_contact(&[lead_id]).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(
            found[0].primary_contact.as_ref().unwrap().email,
            "main@acme.example"
        );
    }

    #[tokio::test]
    async fn unknown_lead_ids_are_silently_absent() {
        let store = MemoryStore::new();
        let known = lead("Known Co");
        let known_id = known.id;
        LeadStore::insert(&store, known).await.unwrap();

        let found = store
            .find_with_primary_contact(&[known_id, LeadId::new()])
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn stage_update_bumps_updated_at() {
        let store = MemoryStore::new();
        let lead = lead("Acme");
        let lead_id = lead.id;
        LeadStore::insert(&store, lead).await.unwrap();

        let later = now() + chrono::Duration::hours(1);
        store
            .update_stage(&[lead_id], PipelineStage::Contacted, later)
            .await
            .unwrap();

        let found = store.find_with_primary_contact(&[lead_id]).await.unwrap();
        assert_eq!(found[0].lead.stage, PipelineStage::Contacted);
        assert_eq!(found[0].lead.updated_at, later);
    }

    #[tokio::test]
    async fn list_with_stats_aggregates_and_orders() {
        let store = MemoryStore::new();

        let older = SequenceDraft::new("older").build_at(now()).unwrap();
        let newer = SequenceDraft::new("newer")
            .build_at(now() + chrono::Duration::hours(1))
            .unwrap();
        let older_id = older.id;
        SequenceStore::create(&store, older).await.unwrap();
        SequenceStore::create(&store, newer).await.unwrap();

        let mut completed =
            Enrollment::new(older_id, LeadId::new(), ContactId::new(), now(), now());
        completed.status = EnrollmentStatus::Completed;
        store
            .insert_ignore_conflicts(vec![
                Enrollment::new(older_id, LeadId::new(), ContactId::new(), now(), now()),
                completed,
            ])
            .await
            .unwrap();

        let listed = store.list_with_stats().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].sequence.name, "newer");
        assert_eq!(listed[1].stats.enrolled, 2);
        assert_eq!(listed[1].stats.active, 1);
        assert_eq!(listed[1].stats.completed, 1);
    }
}
