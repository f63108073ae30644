// crates/proctor-server/src/handlers.rs
// ============================================================================
// Module: HTTP Handlers
// Description: Session, event, recording, and report endpoints.
// Purpose: Translate HTTP requests into record store and storage calls.
// Dependencies: axum, bytes, proctor-core, proctor-storage, serde, time
// ============================================================================

//! ## Overview
//! Handlers decode the request, then run every record store and storage call
//! on the blocking pool through [`blocking`]. Reports are rebuilt from the
//! stored events on each request and a copy is persisted before the response
//! is returned.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::sync::Arc;

use axum::Json;
use axum::extract::Multipart;
use axum::extract::Path as UrlPath;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::extract::multipart::MultipartRejection;
use axum::http::StatusCode;
use axum::http::header;
use axum::response::IntoResponse;
use axum::response::Response;
use bytes::Bytes;
use proctor_core::Event;
use proctor_core::EventId;
use proctor_core::RecordStore;
use proctor_core::ReportFormat;
use proctor_core::ReportSummary;
use proctor_core::Session;
use proctor_core::SessionId;
use proctor_core::SessionReport;
use proctor_core::SharedRecordStore;
use proctor_core::now_utc;
use proctor_core::parse_client_timestamp;
use proctor_storage::StorageNamespace;
use proctor_storage::validate_key;
use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;

use crate::audit::StorageWriteEvent;
use crate::error::ApiError;
use crate::server::AppState;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Suffix used when an uploaded or imported file carries no extension.
const DEFAULT_VIDEO_SUFFIX: &str = ".webm";
/// Content type served for recordings.
const VIDEO_CONTENT_TYPE: &str = "video/webm";
/// Multipart field carrying the recording.
const VIDEO_FIELD_NAME: &str = "file";

// ============================================================================
// SECTION: Payloads
// ============================================================================

/// Liveness response.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Fixed status label.
    pub status: &'static str,
    /// Human-readable banner.
    pub message: &'static str,
}

/// Body of `POST /sessions`.
#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    /// Candidate display name.
    pub candidate_name: String,
}

/// Body of `POST /sessions/{id}/events`.
#[derive(Debug, Deserialize)]
pub struct LogEventRequest {
    /// Category tag or arbitrary type string.
    pub event_type: String,
    /// Optional free-form message.
    #[serde(default)]
    pub message: Option<String>,
    /// Observation time as RFC 3339, or ISO 8601 without an offset for UTC;
    /// defaults to the time of logging.
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Readiness response.
#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    /// `ready` or `not_ready`.
    pub status: &'static str,
    /// Failure detail when not ready.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Body of `POST /sessions/{id}/video/import`.
#[derive(Debug, Deserialize)]
pub struct ImportVideoRequest {
    /// File name inside the import directory.
    pub filename: String,
}

/// Event as returned to clients.
#[derive(Debug, Serialize)]
pub struct EventResponse {
    /// Event identifier.
    pub id: EventId,
    /// Raw event type.
    pub event_type: String,
    /// Optional message.
    pub message: Option<String>,
    /// Observation time.
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl From<Event> for EventResponse {
    fn from(event: Event) -> Self {
        Self {
            id: event.id,
            event_type: event.event_type,
            message: event.message,
            timestamp: event.timestamp,
        }
    }
}

/// Session with its ordered events.
#[derive(Debug, Serialize)]
pub struct SessionWithEventsResponse {
    /// Session fields.
    #[serde(flatten)]
    pub session: Session,
    /// Events in chronological order.
    pub events: Vec<EventResponse>,
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Runs a store or storage task on the blocking pool.
async fn blocking<T, F>(task: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|err| ApiError::Internal(format!("blocking task failed: {err}")))?
}

/// Unwraps a JSON body, mapping decode failures to validation errors.
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload.map(|Json(value)| value).map_err(|rejection| ApiError::Validation(rejection.body_text()))
}

/// Loads a session or fails with 404.
fn require_session(store: &SharedRecordStore, id: &SessionId) -> Result<Session, ApiError> {
    store.get_session(id)?.ok_or_else(ApiError::session_not_found)
}

/// Builds the storage key for a session recording from a source file name.
fn video_key(session_id: &SessionId, file_name: Option<&str>) -> String {
    let suffix = file_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .map_or_else(|| DEFAULT_VIDEO_SUFFIX.to_string(), |ext| format!(".{ext}"));
    format!("{session_id}{suffix}")
}

/// Saves a recording and points the session at it.
async fn attach_video(
    state: &AppState,
    session_id: SessionId,
    key: String,
    bytes: Bytes,
) -> Result<Session, ApiError> {
    let store = state.store.clone();
    let storage = Arc::clone(&state.storage);
    let audit = Arc::clone(&state.audit);
    blocking(move || {
        let reference = storage.save_video(&key, &bytes)?;
        audit.record_storage(&StorageWriteEvent::new(
            "video",
            session_id.as_str(),
            &reference,
            bytes.len(),
        ));
        store.set_video_path(&session_id, &reference)?.ok_or_else(ApiError::session_not_found)
    })
    .await
}

/// Rebuilds a session report from stored events.
fn build_report(store: &SharedRecordStore, id: &SessionId) -> Result<SessionReport, ApiError> {
    let session = require_session(store, id)?;
    let events = store.list_events(id)?;
    Ok(SessionReport::build(session, &events))
}

/// Persists a rendered report and records the write.
fn persist_report(
    state: &AppState,
    session_id: &SessionId,
    format: ReportFormat,
    bytes: &[u8],
) -> Result<String, ApiError> {
    let key = format.artifact_name(session_id);
    let reference = state.storage.save_report(&key, bytes, format.content_type())?;
    state.audit.record_storage(&StorageWriteEvent::new(
        "report",
        session_id.as_str(),
        &reference,
        bytes.len(),
    ));
    Ok(key)
}

// ============================================================================
// SECTION: Handlers
// ============================================================================

/// `GET /`
pub async fn root() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok",
        message: "Proctoring backend running",
    })
}

/// `GET /readyz`
pub async fn readiness(State(state): State<Arc<AppState>>) -> Response {
    let store = state.store.clone();
    match blocking(move || Ok(store.readiness()?)).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ReadinessResponse {
                status: "ready",
                detail: None,
            }),
        )
            .into_response(),
        Err(err) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadinessResponse {
                status: "not_ready",
                detail: Some(err.to_string()),
            }),
        )
            .into_response(),
    }
}

/// `POST /sessions`
pub async fn create_session(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateSessionRequest>, JsonRejection>,
) -> Result<Json<Session>, ApiError> {
    let request = json_body(payload)?;
    let store = state.store.clone();
    let session = blocking(move || {
        let session = Session::start(request.candidate_name);
        store.insert_session(&session)?;
        Ok(session)
    })
    .await?;
    Ok(Json(session))
}

/// `GET /sessions`
pub async fn list_sessions(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Session>>, ApiError> {
    let store = state.store.clone();
    let sessions = blocking(move || Ok(store.list_sessions()?)).await?;
    Ok(Json(sessions))
}

/// `GET /sessions/{id}`
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    UrlPath(id): UrlPath<String>,
) -> Result<Json<SessionWithEventsResponse>, ApiError> {
    let store = state.store.clone();
    let id = SessionId::new(id);
    let response = blocking(move || {
        let session = require_session(&store, &id)?;
        let events = store.list_events(&id)?.into_iter().map(EventResponse::from).collect();
        Ok(SessionWithEventsResponse {
            session,
            events,
        })
    })
    .await?;
    Ok(Json(response))
}

/// `POST /sessions/{id}/events`
pub async fn log_event(
    State(state): State<Arc<AppState>>,
    UrlPath(id): UrlPath<String>,
    payload: Result<Json<LogEventRequest>, JsonRejection>,
) -> Result<Json<EventResponse>, ApiError> {
    let request = json_body(payload)?;
    let timestamp = request.timestamp.as_deref().map(parse_client_timestamp).transpose()?;
    let store = state.store.clone();
    let session_id = SessionId::new(id);
    let event = blocking(move || {
        require_session(&store, &session_id)?;
        let event = Event::new(session_id, request.event_type, request.message, timestamp);
        store.insert_event(&event)?;
        Ok(event)
    })
    .await?;
    Ok(Json(EventResponse::from(event)))
}

/// `POST /sessions/{id}/end`
pub async fn end_session(
    State(state): State<Arc<AppState>>,
    UrlPath(id): UrlPath<String>,
) -> Result<Json<Session>, ApiError> {
    let store = state.store.clone();
    let id = SessionId::new(id);
    let session = blocking(move || {
        store.end_session(&id, now_utc())?.ok_or_else(ApiError::session_not_found)
    })
    .await?;
    Ok(Json(session))
}

/// `POST /sessions/{id}/video`
pub async fn upload_video(
    State(state): State<Arc<AppState>>,
    UrlPath(id): UrlPath<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Session>, ApiError> {
    let session_id = SessionId::new(id);
    let store = state.store.clone();
    let lookup = session_id.clone();
    blocking(move || require_session(&store, &lookup)).await?;

    let mut multipart = multipart.map_err(|rejection| ApiError::Validation(rejection.body_text()))?;
    let mut upload = None;
    while let Some(field) =
        multipart.next_field().await.map_err(|err| ApiError::Validation(err.body_text()))?
    {
        if field.name() == Some(VIDEO_FIELD_NAME) {
            let file_name = field.file_name().map(str::to_string);
            let bytes = field.bytes().await.map_err(|err| ApiError::Validation(err.body_text()))?;
            upload = Some((file_name, bytes));
            break;
        }
    }
    let (file_name, bytes) = upload
        .ok_or_else(|| ApiError::Validation(format!("multipart field `{VIDEO_FIELD_NAME}` is required")))?;
    let key = video_key(&session_id, file_name.as_deref());
    let session = attach_video(&state, session_id, key, bytes).await?;
    Ok(Json(session))
}

/// `POST /sessions/{id}/video/import`
pub async fn import_video(
    State(state): State<Arc<AppState>>,
    UrlPath(id): UrlPath<String>,
    payload: Result<Json<ImportVideoRequest>, JsonRejection>,
) -> Result<Json<Session>, ApiError> {
    let request = json_body(payload)?;
    validate_key(&request.filename)?;
    let session_id = SessionId::new(id);
    let store = state.store.clone();
    let source = state.import_dir.join(&request.filename);
    let lookup = session_id.clone();
    let bytes = blocking(move || {
        require_session(&store, &lookup)?;
        if !source.is_file() {
            return Err(ApiError::NotFound("Source video not found".to_string()));
        }
        std::fs::read(&source)
            .map_err(|err| ApiError::Storage(format!("import read failed: {err}")))
    })
    .await?;
    let key = video_key(&session_id, Some(&request.filename));
    let session = attach_video(&state, session_id, key, Bytes::from(bytes)).await?;
    Ok(Json(session))
}

/// `GET /sessions/{id}/report`
pub async fn get_report(
    State(state): State<Arc<AppState>>,
    UrlPath(id): UrlPath<String>,
) -> Result<Json<ReportSummary>, ApiError> {
    let id = SessionId::new(id);
    let summary = blocking(move || {
        let report = build_report(&state.store, &id)?;
        let html = report.render_html();
        persist_report(&state, &id, ReportFormat::Html, html.as_bytes())?;
        Ok(report.summary())
    })
    .await?;
    Ok(Json(summary))
}

/// `GET /sessions/{id}/report.csv`
pub async fn get_report_csv(
    State(state): State<Arc<AppState>>,
    UrlPath(id): UrlPath<String>,
) -> Result<Response, ApiError> {
    let id = SessionId::new(id);
    let (key, csv) = blocking(move || {
        let report = build_report(&state.store, &id)?;
        let csv = report.render_csv()?;
        let key = persist_report(&state, &id, ReportFormat::Csv, &csv)?;
        Ok((key, csv))
    })
    .await?;
    let headers = [
        (header::CONTENT_TYPE, ReportFormat::Csv.content_type().to_string()),
        (header::CONTENT_DISPOSITION, format!("attachment; filename={key}")),
    ];
    Ok((headers, csv).into_response())
}

/// `GET /videos/{name}` on remote backends.
pub async fn get_video(
    State(state): State<Arc<AppState>>,
    UrlPath(name): UrlPath<String>,
) -> Result<Response, ApiError> {
    let storage = Arc::clone(&state.storage);
    let bytes =
        blocking(move || Ok(storage.open(&StorageNamespace::Videos.reference(&name))?)).await?;
    Ok(([(header::CONTENT_TYPE, VIDEO_CONTENT_TYPE)], bytes).into_response())
}

/// `GET /reports/{name}` on remote backends.
pub async fn get_report_file(
    State(state): State<Arc<AppState>>,
    UrlPath(name): UrlPath<String>,
) -> Result<Response, ApiError> {
    let format =
        if name.ends_with(".html") { ReportFormat::Html } else { ReportFormat::Csv };
    let storage = Arc::clone(&state.storage);
    let bytes =
        blocking(move || Ok(storage.open(&StorageNamespace::Reports.reference(&name))?)).await?;
    Ok(([(header::CONTENT_TYPE, format.content_type())], bytes).into_response())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
