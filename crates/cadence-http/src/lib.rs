//! Cadence HTTP surface
//!
//! A thin axum layer over the engine: request bodies deserialize into
//! drafts, responses serialize camelCase, and the error taxonomy maps
//! onto status codes. No business logic lives here.

#![warn(unreachable_pub)]

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use cadence_calendar::SendingWindow;
use cadence_engine::{EngineError, EnrollRequest, EnrollmentEngine};
use cadence_model::{
    LeadId, Sequence, SequenceDraft, SequenceId, SequenceSettings, Step, StepChannel,
};
use cadence_store::{SequenceStore, SequenceWithStats};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use ulid::Ulid;

/// Shared handler state: the engine plus the sequence store
#[derive(Clone)]
pub struct AppState {
    engine: Arc<EnrollmentEngine>,
    sequences: Arc<dyn SequenceStore>,
}

impl AppState {
    /// Create new state
    #[must_use]
    pub fn new(engine: Arc<EnrollmentEngine>, sequences: Arc<dyn SequenceStore>) -> Self {
        Self { engine, sequences }
    }
}

/// Build the application router.
#[must_use]
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route(
            "/sequences",
            get(list_sequences).post(create_sequence).put(enroll_leads),
        )
        .with_state(state)
}

// ---- request bodies ----

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StepBody {
    channel: StepChannel,
    delay_days: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct WindowBody {
    start_hour: Option<u32>,
    end_hour: Option<u32>,
    utc_offset_minutes: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SettingsBody {
    sending_window: Option<WindowBody>,
    skip_weekends: Option<bool>,
    max_per_day: Option<u32>,
    stop_on_reply: Option<bool>,
    stop_on_bounce: Option<bool>,
}

impl SettingsBody {
    /// Merge the partial body over the default settings; validation
    /// happens when the draft is built.
    fn into_settings(self) -> SequenceSettings {
        let defaults = SequenceSettings::default();
        let window = self.sending_window.map_or(defaults.sending_window, |w| SendingWindow {
            start_hour: w.start_hour.unwrap_or(defaults.sending_window.start_hour),
            end_hour: w.end_hour.unwrap_or(defaults.sending_window.end_hour),
            utc_offset_minutes: w
                .utc_offset_minutes
                .unwrap_or(defaults.sending_window.utc_offset_minutes),
        });
        SequenceSettings {
            sending_window: window,
            skip_weekends: self.skip_weekends.unwrap_or(defaults.skip_weekends),
            max_per_day: self.max_per_day.unwrap_or(defaults.max_per_day),
            stop_on_reply: self.stop_on_reply.unwrap_or(defaults.stop_on_reply),
            stop_on_bounce: self.stop_on_bounce.unwrap_or(defaults.stop_on_bounce),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateSequenceBody {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    sector: Option<String>,
    #[serde(default)]
    steps: Option<Vec<StepBody>>,
    #[serde(default)]
    settings: Option<SettingsBody>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnrollBody {
    sequence_id: String,
    lead_ids: Vec<String>,
}

// ---- response bodies ----

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StepDto {
    id: String,
    channel: StepChannel,
    delay_days: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SequenceDto {
    id: String,
    name: String,
    description: String,
    sector: Option<String>,
    steps: Vec<StepDto>,
    is_active: bool,
    created_at: DateTime<Utc>,
    enrolled: usize,
    active: usize,
    completed: usize,
    paused: usize,
}

impl SequenceDto {
    fn from_stats(listed: SequenceWithStats) -> Self {
        let mut dto = Self::from_sequence(listed.sequence);
        dto.enrolled = listed.stats.enrolled;
        dto.active = listed.stats.active;
        dto.completed = listed.stats.completed;
        dto.paused = listed.stats.paused;
        dto
    }

    fn from_sequence(sequence: Sequence) -> Self {
        Self {
            id: sequence.id.to_string(),
            name: sequence.name,
            description: sequence.description,
            sector: sequence.sector,
            steps: sequence
                .steps
                .into_iter()
                .map(|s| StepDto {
                    id: s.id.to_string(),
                    channel: s.channel,
                    delay_days: s.delay_days,
                })
                .collect(),
            is_active: sequence.is_active,
            created_at: sequence.created_at,
            enrolled: 0,
            active: 0,
            completed: 0,
            paused: 0,
        }
    }
}

#[derive(Debug, Serialize)]
struct ListResponse {
    success: bool,
    sequences: Vec<SequenceDto>,
}

#[derive(Debug, Serialize)]
struct CreateResponse {
    success: bool,
    sequence: SequenceDto,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EnrollResponse {
    success: bool,
    enrolled: usize,
    skipped: usize,
    no_contacts: usize,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            success: false,
            error: message.into(),
        }),
    )
        .into_response()
}

/// Map the engine taxonomy onto HTTP statuses.
fn engine_error_response(err: &EngineError) -> Response {
    match err {
        EngineError::SequenceNotFound(_) => error_response(StatusCode::NOT_FOUND, err.to_string()),
        EngineError::InvalidArgument(_) | EngineError::NoEligibleLeads => {
            error_response(StatusCode::BAD_REQUEST, err.to_string())
        }
        EngineError::Storage(_) | EngineError::Transition(_) => {
            tracing::error!(error = %err, "internal error");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
        }
    }
}

// ---- handlers ----

async fn healthz() -> (StatusCode, Json<serde_json::Value>) {
    (StatusCode::OK, Json(serde_json::json!({"status": "ok"})))
}

async fn list_sequences(State(state): State<AppState>) -> Response {
    match state.sequences.list_with_stats().await {
        Ok(listed) => {
            let sequences = listed.into_iter().map(SequenceDto::from_stats).collect();
            (
                StatusCode::OK,
                Json(ListResponse {
                    success: true,
                    sequences,
                }),
            )
                .into_response()
        }
        Err(err) => {
            tracing::error!(error = %err, "sequence listing failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
        }
    }
}

async fn create_sequence(
    State(state): State<AppState>,
    Json(body): Json<CreateSequenceBody>,
) -> Response {
    let mut draft = SequenceDraft::new(body.name).with_description(body.description);
    if let Some(sector) = body.sector {
        draft = draft.with_sector(sector);
    }
    if let Some(steps) = body.steps {
        let steps: Vec<Step> = steps
            .into_iter()
            .map(|s| Step::new(s.channel, s.delay_days))
            .collect();
        draft = draft.with_steps(steps);
    }
    if let Some(settings) = body.settings {
        draft = draft.with_settings(settings.into_settings());
    }

    let sequence = match draft.build() {
        Ok(sequence) => sequence,
        Err(err) => return error_response(StatusCode::BAD_REQUEST, err.to_string()),
    };

    match state.sequences.create(sequence).await {
        Ok(created) => (
            StatusCode::CREATED,
            Json(CreateResponse {
                success: true,
                sequence: SequenceDto::from_sequence(created),
            }),
        )
            .into_response(),
        Err(err) => {
            tracing::error!(error = %err, "sequence creation failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
        }
    }
}

async fn enroll_leads(State(state): State<AppState>, Json(body): Json<EnrollBody>) -> Response {
    let Ok(sequence_id) = Ulid::from_str(&body.sequence_id).map(SequenceId) else {
        return error_response(StatusCode::BAD_REQUEST, "invalid argument: sequenceId");
    };
    let mut lead_ids = Vec::with_capacity(body.lead_ids.len());
    for raw in &body.lead_ids {
        let Ok(id) = Ulid::from_str(raw).map(LeadId) else {
            return error_response(
                StatusCode::BAD_REQUEST,
                format!("invalid argument: lead id {raw:?}"),
            );
        };
        lead_ids.push(id);
    }

    let request = EnrollRequest::new(sequence_id, lead_ids);
    match state.engine.enroll(&request).await {
        Ok(report) => (
            StatusCode::OK,
            Json(EnrollResponse {
                success: true,
                enrolled: report.enrolled,
                skipped: report.skipped,
                no_contacts: report.no_contacts,
            }),
        )
            .into_response(),
        Err(err) => engine_error_response(&err),
    }
}
