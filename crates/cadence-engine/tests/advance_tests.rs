use cadence_engine::{ChannelError, ChannelExecutor, EnrollRequest, EnrollmentEngine, StepAdvancer};
use cadence_model::{
    Contact, Enrollment, EnrollmentStatus, LeadDraft, LeadId, LeadWithContact, SequenceDraft,
    SequenceId, SequenceSettings, Step, StepChannel,
};
use cadence_store::{EnrollmentStore, LeadStore, MemoryStore, SequenceStore};
use chrono::{DateTime, TimeZone, Utc};
use std::sync::{Arc, Mutex};

/// Executor that records every action it is asked to perform.
#[derive(Default)]
struct RecordingExecutor {
    calls: Mutex<Vec<(LeadId, usize, StepChannel)>>,
}

impl RecordingExecutor {
    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn channels(&self) -> Vec<StepChannel> {
        self.calls.lock().unwrap().iter().map(|c| c.2).collect()
    }
}

#[async_trait::async_trait]
impl ChannelExecutor for RecordingExecutor {
    async fn execute(
        &self,
        enrollment: &Enrollment,
        step: &Step,
        lead: &LeadWithContact,
    ) -> Result<(), ChannelError> {
        self.calls
            .lock()
            .unwrap()
            .push((lead.lead.id, enrollment.current_step, step.channel));
        Ok(())
    }
}

fn monday() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 2, 10, 0, 0).unwrap()
}

fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, day, hour, 0, 0).unwrap()
}

async fn seed_lead(store: &MemoryStore, company: &str) -> LeadId {
    let lead = LeadDraft {
        company: Some(company.to_string()),
        ..LeadDraft::default()
    }
    .validate_at(monday())
    .unwrap();
    let lead_id = lead.id;
    LeadStore::insert(store, lead).await.unwrap();
    store
        .insert_contact(Contact::new(lead_id, "Primary", "primary@example.com").primary())
        .await
        .unwrap();
    lead_id
}

async fn seed_sequence(store: &MemoryStore, draft: SequenceDraft) -> SequenceId {
    let sequence = draft.build_at(monday()).unwrap();
    let id = sequence.id;
    SequenceStore::create(store, sequence).await.unwrap();
    id
}

fn advancer_over(store: &Arc<MemoryStore>, executor: Arc<RecordingExecutor>) -> StepAdvancer {
    StepAdvancer::new(store.clone(), store.clone(), store.clone(), executor)
}

async fn enroll(store: &Arc<MemoryStore>, sequence_id: SequenceId, lead_ids: Vec<LeadId>) {
    let engine = EnrollmentEngine::new(store.clone(), store.clone(), store.clone());
    engine
        .enroll_at(&EnrollRequest::new(sequence_id, lead_ids), monday())
        .await
        .unwrap();
}

#[tokio::test]
async fn default_cadence_runs_to_completion() {
    let store = Arc::new(MemoryStore::new());
    let executor = Arc::new(RecordingExecutor::default());
    let advancer = advancer_over(&store, executor.clone());

    let sequence_id = seed_sequence(&store, SequenceDraft::new("outbound")).await;
    let lead_id = seed_lead(&store, "Acme").await;
    enroll(&store, sequence_id, vec![lead_id]).await;

    // Default delays 0,3,4,5,6 from a Monday: due dates fall on
    // Mon 2, Thu 5, Fri 6, Mon 9, Tue 10 (weekends skipped).
    let pass_times = [at(2, 10), at(5, 10), at(6, 10), at(9, 10), at(10, 10)];
    for (index, pass_at) in pass_times.iter().enumerate() {
        let report = advancer.run_pass(*pass_at).await.unwrap();
        assert_eq!(report.executed, 1, "pass {index} should execute one step");
    }

    assert_eq!(executor.call_count(), 5);
    assert_eq!(
        executor.channels(),
        vec![
            StepChannel::Email,
            StepChannel::LinkedinConnect,
            StepChannel::Email,
            StepChannel::LinkedinMessage,
            StepChannel::Email,
        ]
    );

    let enrollment = store.find(sequence_id, lead_id).await.unwrap().unwrap();
    assert_eq!(enrollment.status, EnrollmentStatus::Completed);

    // A completed enrollment never comes due again.
    let report = advancer.run_pass(at(11, 10)).await.unwrap();
    assert_eq!(report.executed, 0);
    assert_eq!(executor.call_count(), 5);
}

#[tokio::test]
async fn intermediate_passes_execute_nothing() {
    let store = Arc::new(MemoryStore::new());
    let executor = Arc::new(RecordingExecutor::default());
    let advancer = advancer_over(&store, executor.clone());

    let sequence_id = seed_sequence(&store, SequenceDraft::new("outbound")).await;
    let lead_id = seed_lead(&store, "Acme").await;
    enroll(&store, sequence_id, vec![lead_id]).await;

    advancer.run_pass(at(2, 10)).await.unwrap();

    // Tuesday and Wednesday: next action is Thursday, nothing due.
    assert_eq!(advancer.run_pass(at(3, 10)).await.unwrap().executed, 0);
    assert_eq!(advancer.run_pass(at(4, 10)).await.unwrap().executed, 0);
    assert_eq!(executor.call_count(), 1);
}

#[tokio::test]
async fn daily_cap_defers_fifo() {
    let store = Arc::new(MemoryStore::new());
    let executor = Arc::new(RecordingExecutor::default());
    let advancer = advancer_over(&store, executor.clone());

    let settings = SequenceSettings {
        max_per_day: 1,
        ..SequenceSettings::default()
    };
    let sequence_id = seed_sequence(
        &store,
        SequenceDraft::new("throttled").with_settings(settings),
    )
    .await;

    let first = seed_lead(&store, "First").await;
    // Enrollment ids are creation-ordered; insert strictly after.
    std::thread::sleep(std::time::Duration::from_millis(2));
    let second = seed_lead(&store, "Second").await;

    enroll(&store, sequence_id, vec![first]).await;
    std::thread::sleep(std::time::Duration::from_millis(2));
    enroll(&store, sequence_id, vec![second]).await;

    let report = advancer.run_pass(monday()).await.unwrap();
    assert_eq!(report.executed, 1);
    assert_eq!(report.deferred, 1);

    // The earlier enrollment won the slot.
    let calls = executor.calls.lock().unwrap().clone();
    assert_eq!(calls[0].0, first);
    drop(calls);

    // The deferred one moved to the next business day's window start.
    let deferred = store.find(sequence_id, second).await.unwrap().unwrap();
    assert_eq!(deferred.current_step, 0);
    assert_eq!(deferred.next_action_at, at(3, 9));

    // Nothing else is due today.
    let report = advancer.run_pass(monday()).await.unwrap();
    assert_eq!(report.executed, 0);
    assert_eq!(report.deferred, 0);

    // Tomorrow the deferred enrollment executes.
    let report = advancer.run_pass(at(3, 10)).await.unwrap();
    assert_eq!(report.executed, 1);
    assert_eq!(executor.call_count(), 2);
}

#[tokio::test]
async fn weekend_sending_uses_calendar_days() {
    let store = Arc::new(MemoryStore::new());
    let executor = Arc::new(RecordingExecutor::default());
    let advancer = advancer_over(&store, executor.clone());

    let settings = SequenceSettings {
        skip_weekends: false,
        ..SequenceSettings::default()
    };
    let steps = vec![
        Step::new(StepChannel::Email, 0),
        Step::new(StepChannel::Email, 1),
    ];
    let sequence_id = seed_sequence(
        &store,
        SequenceDraft::new("always-on")
            .with_steps(steps)
            .with_settings(settings),
    )
    .await;
    let lead_id = seed_lead(&store, "Weekend Co").await;
    enroll(&store, sequence_id, vec![lead_id]).await;

    // Friday execution schedules the next step on Saturday.
    let friday = at(6, 10);
    let report = advancer.run_pass(friday).await.unwrap();
    assert_eq!(report.executed, 1);

    let enrollment = store.find(sequence_id, lead_id).await.unwrap().unwrap();
    assert_eq!(enrollment.next_action_at, at(7, 9));
}

#[tokio::test]
async fn paused_enrollments_are_skipped_until_resumed() {
    let store = Arc::new(MemoryStore::new());
    let executor = Arc::new(RecordingExecutor::default());
    let advancer = advancer_over(&store, executor.clone());

    let sequence_id = seed_sequence(&store, SequenceDraft::new("outbound")).await;
    let lead_id = seed_lead(&store, "Acme").await;
    enroll(&store, sequence_id, vec![lead_id]).await;

    assert!(advancer.record_reply(sequence_id, lead_id).await.unwrap());

    let report = advancer.run_pass(monday()).await.unwrap();
    assert_eq!(report.executed, 0);
    assert_eq!(executor.call_count(), 0);

    assert!(advancer.resume(sequence_id, lead_id).await.unwrap());
    let report = advancer.run_pass(monday()).await.unwrap();
    assert_eq!(report.executed, 1);
}
