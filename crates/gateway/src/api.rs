//! Run API used by the dashboard.
//!
//! Endpoints:
//!
//! - `GET  /api/runs`                         : List run summaries
//! - `POST /api/runs`                         : Create a run and start research
//! - `GET  /api/runs/{id}`                    : Summary plus pipeline state
//! - `POST /api/runs/{id}/approve`            : Pass the current checkpoint
//! - `POST /api/runs/{id}/topic-map/reload`   : Re-parse an edited topic map
//! - `GET  /api/runs/{id}/events?since=N`     : Poll log events
//! - `GET  /api/runs/{id}/events/stream`      : SSE log stream
//! - `GET  /api/runs/{id}/files/{kind}/{name}`: Read a deliverable

use std::convert::Infallible;
use std::path::PathBuf;

use axum::{
    Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::sse::{Event as SseEvent, KeepAlive, Sse},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use contentcrew_core::content::ClientContext;
use contentcrew_core::error::{Error, PipelineError};
use contentcrew_core::event::LogEvent;
use contentcrew_pipeline::{RunPhase, RunSnapshot, RunSummary};
use serde::{Deserialize, Serialize};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{info, warn};

use crate::SharedState;

pub fn api_router(state: SharedState) -> Router {
    Router::new()
        .route("/runs", get(list_runs_handler).post(create_run_handler))
        .route("/runs/{id}", get(get_run_handler))
        .route("/runs/{id}/approve", post(approve_handler))
        .route("/runs/{id}/topic-map/reload", post(reload_topic_map_handler))
        .route("/runs/{id}/events", get(events_handler))
        .route("/runs/{id}/events/stream", get(event_stream_handler))
        .route("/runs/{id}/files/{kind}/{name}", get(file_handler))
        .with_state(state)
}

// ── Errors ────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// A status code with a message the dashboard shows as-is.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorResponse { error: self.message })).into_response()
    }
}

impl From<PipelineError> for ApiError {
    fn from(e: PipelineError) -> Self {
        let status = match e {
            PipelineError::RunNotFound(_) => StatusCode::NOT_FOUND,
            PipelineError::NotAtCheckpoint { .. } | PipelineError::NoTopicMap => StatusCode::CONFLICT,
            PipelineError::NoTopics | PipelineError::Phase { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        };
        Self::new(status, e.to_string())
    }
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        match e {
            Error::Pipeline(e) => e.into(),
            Error::TopicMap(e) => Self::new(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
            other => {
                warn!(error = %other, "Request failed");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, other.to_string())
            }
        }
    }
}

// ── Request / Response types ──────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateRunRequest {
    pub client: ClientContext,
    pub seed_topic: String,
}

impl CreateRunRequest {
    /// Names of required fields left blank.
    fn missing_fields(&self) -> Vec<&'static str> {
        let required = [
            ("client_name", &self.client.client_name),
            ("industry", &self.client.industry),
            ("business_summary", &self.client.business_summary),
            ("seed_topic", &self.seed_topic),
        ];
        required
            .into_iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| name)
            .collect()
    }
}

#[derive(Debug, Serialize)]
pub struct RunListResponse {
    pub runs: Vec<RunSummary>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApproveResponse {
    pub run_id: String,
    pub phase: RunPhase,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReloadResponse {
    pub run_id: String,
    pub topic_count: usize,
}

#[derive(Debug, Default, Deserialize)]
pub struct EventsQuery {
    #[serde(default)]
    pub since: u64,
}

#[derive(Debug, Serialize)]
pub struct EventsResponse {
    pub events: Vec<LogEvent>,
    /// Cursor for the next poll.
    pub next: u64,
}

// ── Handlers ──────────────────────────────────────────────────────────────

async fn list_runs_handler(State(state): State<SharedState>) -> Json<RunListResponse> {
    Json(RunListResponse {
        runs: state.runs.list().await,
    })
}

async fn create_run_handler(
    State(state): State<SharedState>,
    Json(req): Json<CreateRunRequest>,
) -> Result<(StatusCode, Json<RunSummary>), ApiError> {
    let missing = req.missing_fields();
    if !missing.is_empty() {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            format!("Missing required fields: {}", missing.join(", ")),
        ));
    }

    let run = state.runs.create(req.client, req.seed_topic.trim()).await?;
    info!(run_id = run.id(), "Run started from dashboard");
    Ok((StatusCode::CREATED, Json(run.summary().await)))
}

async fn get_run_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<RunSnapshot>, ApiError> {
    let run = state.runs.require(&id).await?;
    Ok(Json(run.snapshot().await))
}

async fn approve_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<ApproveResponse>, ApiError> {
    let phase = state.runs.approve(&id).await?;
    Ok(Json(ApproveResponse { run_id: id, phase }))
}

async fn reload_topic_map_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<ReloadResponse>, ApiError> {
    let topic_count = state.runs.reload_topic_map(&id).await?;
    Ok(Json(ReloadResponse {
        run_id: id,
        topic_count,
    }))
}

async fn events_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Query(query): Query<EventsQuery>,
) -> Result<Json<EventsResponse>, ApiError> {
    let run = state.runs.require(&id).await?;
    let events = run.log().since(query.since);
    let next = query.since + events.len() as u64;
    Ok(Json(EventsResponse { events, next }))
}

/// Replays the log from `since`, then follows it live.
async fn event_stream_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Query(query): Query<EventsQuery>,
) -> Result<Sse<impl futures::Stream<Item = Result<SseEvent, Infallible>>>, ApiError> {
    let run = state.runs.require(&id).await?;

    // Subscribe before reading history so nothing falls in between.
    let rx = run.log().subscribe();
    let history = run.log().since(query.since);
    let next = query.since + history.len() as u64;

    let live = BroadcastStream::new(rx)
        .filter_map(|result| result.ok())
        .filter(move |event| event.seq >= next);
    let stream = tokio_stream::iter(history).chain(live).map(|event| {
        let data = serde_json::to_string(&event).unwrap_or_default();
        Ok(SseEvent::default()
            .event("log")
            .id(event.seq.to_string())
            .data(data))
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

async fn file_handler(
    State(state): State<SharedState>,
    Path((id, kind, name)): Path<(String, String, String)>,
) -> Result<String, ApiError> {
    let run = state.runs.require(&id).await?;
    let layout = run.state().await.layout;
    let dir: PathBuf = match kind.as_str() {
        "topic_maps" => layout.topic_maps_dir(),
        "briefs" => layout.briefs_dir(),
        "articles" => layout.articles_dir(),
        _ => return Err(ApiError::new(StatusCode::NOT_FOUND, format!("Unknown file kind: {kind}"))),
    };
    if name.contains(['/', '\\']) || name.contains("..") {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "Invalid file name"));
    }

    tokio::fs::read_to_string(dir.join(&name))
        .await
        .map_err(|_| ApiError::new(StatusCode::NOT_FOUND, format!("File not found: {name}")))
}
