// crates/proctor-server/tests/http_api.rs
// ============================================================================
// Module: HTTP API Tests
// Description: End-to-end handler tests against an in-memory record store.
// Purpose: Validate routes, status codes, persisted artifacts, and audit.
// Dependencies: proctor-server, axum, tower, http-body-util, tempfile
// ============================================================================

//! ## Overview
//! Drives the assembled router with `oneshot` requests. Local storage lives in
//! a temporary directory; remote-backend routes use an in-test blob store.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;

use axum::Router;
use axum::body::Body;
use axum::http::HeaderMap;
use axum::http::Method;
use axum::http::Request;
use axum::http::StatusCode;
use axum::http::header;
use http_body_util::BodyExt;
use proctor_config::DatabaseType;
use proctor_config::ProctorConfig;
use proctor_core::Event;
use proctor_core::InMemoryRecordStore;
use proctor_core::RecordStore;
use proctor_core::Session;
use proctor_core::SessionId;
use proctor_core::SharedRecordStore;
use proctor_core::StoreError;
use proctor_server::AppState;
use proctor_server::AuditSink;
use proctor_server::HttpRequestEvent;
use proctor_server::ProctorServer;
use proctor_server::StorageWriteEvent;
use proctor_server::build_router;
use proctor_storage::BlobStorage;
use proctor_storage::LocalBlobStorage;
use proctor_storage::StorageBackendKind;
use proctor_storage::StorageError;
use proctor_storage::StorageNamespace;
use proctor_storage::parse_reference;
use proctor_store_sqlite::SqliteRecordStore;
use proctor_store_sqlite::SqliteStoreConfig;
use serde_json::Value;
use serde_json::json;
use tempfile::TempDir;
use time::Duration;
use time::OffsetDateTime;
use time::macros::datetime;
use tower::ServiceExt;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

#[derive(Default)]
struct RecordingSink {
    requests: Mutex<Vec<HttpRequestEvent>>,
    writes: Mutex<Vec<StorageWriteEvent>>,
}

impl AuditSink for RecordingSink {
    fn record_request(&self, event: &HttpRequestEvent) {
        self.requests.lock().unwrap().push(event.clone());
    }

    fn record_storage(&self, event: &StorageWriteEvent) {
        self.writes.lock().unwrap().push(event.clone());
    }
}

/// Blob store reporting itself as a remote backend.
#[derive(Default)]
struct RemoteBlobs {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl RemoteBlobs {
    fn put(&self, namespace: StorageNamespace, key: &str, bytes: &[u8]) -> String {
        let reference = namespace.reference(key);
        self.objects.lock().unwrap().insert(reference.clone(), bytes.to_vec());
        reference
    }
}

impl BlobStorage for RemoteBlobs {
    fn save_video(&self, key: &str, bytes: &[u8]) -> Result<String, StorageError> {
        Ok(self.put(StorageNamespace::Videos, key, bytes))
    }

    fn save_report(
        &self,
        key: &str,
        bytes: &[u8],
        _content_type: &str,
    ) -> Result<String, StorageError> {
        Ok(self.put(StorageNamespace::Reports, key, bytes))
    }

    fn open(&self, reference: &str) -> Result<Vec<u8>, StorageError> {
        let (namespace, key) = parse_reference(reference)?;
        self.objects
            .lock()
            .unwrap()
            .get(&namespace.reference(key))
            .cloned()
            .ok_or_else(|| StorageError::NotFound(reference.to_string()))
    }

    fn backend(&self) -> StorageBackendKind {
        StorageBackendKind::ObjectStore
    }
}

/// Record store whose backend is unreachable.
struct UnavailableStore;

impl UnavailableStore {
    fn down() -> StoreError {
        StoreError::Store("database unreachable".to_string())
    }
}

impl RecordStore for UnavailableStore {
    fn insert_session(&self, _session: &Session) -> Result<(), StoreError> {
        Err(Self::down())
    }

    fn get_session(&self, _id: &SessionId) -> Result<Option<Session>, StoreError> {
        Err(Self::down())
    }

    fn list_sessions(&self) -> Result<Vec<Session>, StoreError> {
        Err(Self::down())
    }

    fn end_session(
        &self,
        _id: &SessionId,
        _at: OffsetDateTime,
    ) -> Result<Option<Session>, StoreError> {
        Err(Self::down())
    }

    fn set_video_path(
        &self,
        _id: &SessionId,
        _video_path: &str,
    ) -> Result<Option<Session>, StoreError> {
        Err(Self::down())
    }

    fn insert_event(&self, _event: &Event) -> Result<(), StoreError> {
        Err(Self::down())
    }

    fn list_events(&self, _session_id: &SessionId) -> Result<Vec<Event>, StoreError> {
        Err(Self::down())
    }

    fn readiness(&self) -> Result<(), StoreError> {
        Err(Self::down())
    }
}

struct Harness {
    _dir: TempDir,
    router: Router,
    store: SharedRecordStore,
    audit: Arc<RecordingSink>,
    video_dir: PathBuf,
    report_dir: PathBuf,
    import_dir: PathBuf,
}

fn test_config(dir: &TempDir) -> ProctorConfig {
    let mut config = ProctorConfig::default();
    config.database.store_type = DatabaseType::Memory;
    config.database.path = None;
    config.audit.enabled = false;
    config.storage.video_dir = dir.path().join("videos");
    config.storage.report_dir = dir.path().join("reports");
    config.storage.import_dir = dir.path().join("import");
    config
}

fn local_harness() -> Harness {
    local_harness_with(|_| SharedRecordStore::from_store(InMemoryRecordStore::new()))
}

fn sqlite_harness() -> Harness {
    local_harness_with(|dir| {
        let config = SqliteStoreConfig::new(dir.path().join("proctor.db"));
        SharedRecordStore::from_store(SqliteRecordStore::new(&config).expect("sqlite store"))
    })
}

fn local_harness_with(make_store: impl FnOnce(&TempDir) -> SharedRecordStore) -> Harness {
    let dir = TempDir::new().expect("tempdir");
    let config = test_config(&dir);
    std::fs::create_dir_all(&config.storage.import_dir).expect("import dir");
    let storage = LocalBlobStorage::new(&config.storage.video_dir, &config.storage.report_dir)
        .expect("storage");
    let store = make_store(&dir);
    let audit = Arc::new(RecordingSink::default());
    let state = Arc::new(AppState::new(
        store.clone(),
        Arc::new(storage),
        audit.clone(),
        config.storage.import_dir.clone(),
    ));
    let router = build_router(state, &config);
    Harness {
        video_dir: config.storage.video_dir.clone(),
        report_dir: config.storage.report_dir.clone(),
        import_dir: config.storage.import_dir.clone(),
        _dir: dir,
        router,
        store,
        audit,
    }
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, HeaderMap, Vec<u8>) {
    let response = router.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.expect("body").to_bytes().to_vec();
    (status, headers, body)
}

async fn send_json(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(value) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(value.to_string()))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    };
    let (status, _, bytes) = send(router, request).await;
    let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).expect("json body") };
    (status, value)
}

async fn create_session(router: &Router, name: &str) -> String {
    let (status, body) =
        send_json(router, Method::POST, "/sessions", Some(json!({ "candidate_name": name }))).await;
    assert_eq!(status, StatusCode::OK);
    body["id"].as_str().expect("id").to_string()
}

fn multipart_request(uri: &str, field: &str, file_name: &str, bytes: &[u8]) -> Request<Body> {
    let boundary = "proctor-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"{field}\"; \
             filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={boundary}"))
        .body(Body::from(body))
        .expect("request")
}

// ============================================================================
// SECTION: Sessions and Events
// ============================================================================

#[tokio::test]
async fn root_reports_running() {
    let harness = local_harness();
    let (status, body) = send_json(&harness.router, Method::GET, "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok", "message": "Proctoring backend running" }));
}

#[tokio::test]
async fn create_session_returns_open_session() {
    let harness = local_harness();
    let (status, body) = send_json(
        &harness.router,
        Method::POST,
        "/sessions",
        Some(json!({ "candidate_name": "Ada Lovelace" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["candidate_name"], "Ada Lovelace");
    assert!(body["start_time"].is_string());
    assert!(body["end_time"].is_null());
    assert!(body["video_path"].is_null());
    let id = SessionId::new(body["id"].as_str().expect("id"));
    assert!(harness.store.get_session(&id).expect("get").is_some());
}

#[tokio::test]
async fn list_sessions_is_newest_first() {
    let harness = local_harness();
    let base = datetime!(2024-06-10 09:00 UTC);
    for (id, offset) in [("first", 0), ("third", 120), ("second", 60)] {
        let session = Session::start_at(SessionId::new(id), id, base + Duration::minutes(offset));
        harness.store.insert_session(&session).expect("insert");
    }
    let (status, body) = send_json(&harness.router, Method::GET, "/sessions", None).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> =
        body.as_array().expect("array").iter().map(|s| s["id"].as_str().expect("id")).collect();
    assert_eq!(ids, vec!["third", "second", "first"]);
}

#[tokio::test]
async fn unknown_session_is_404_with_detail() {
    let harness = local_harness();
    for (method, uri) in [
        (Method::GET, "/sessions/missing"),
        (Method::POST, "/sessions/missing/end"),
        (Method::GET, "/sessions/missing/report"),
        (Method::GET, "/sessions/missing/report.csv"),
    ] {
        let (status, body) = send_json(&harness.router, method, uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
        assert_eq!(body["detail"], "Session not found", "{uri}");
    }
    let (status, body) = send_json(
        &harness.router,
        Method::POST,
        "/sessions/missing/events",
        Some(json!({ "event_type": "focus_lost" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Session not found");
}

#[tokio::test]
async fn malformed_body_is_422() {
    let harness = local_harness();
    let (status, body) =
        send_json(&harness.router, Method::POST, "/sessions", Some(json!({ "name": "x" }))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["detail"].is_string());
}

#[tokio::test]
async fn events_are_returned_in_timestamp_order() {
    let harness = local_harness();
    let id = create_session(&harness.router, "Grace").await;
    let uri = format!("/sessions/{id}/events");
    for (event_type, timestamp) in [
        ("phone_detected", "2024-06-10T14:00:30Z"),
        ("focus_lost", "2024-06-10T14:00:10Z"),
        ("custom_signal", "2024-06-10T14:00:20Z"),
    ] {
        let (status, body) = send_json(
            &harness.router,
            Method::POST,
            &uri,
            Some(json!({ "event_type": event_type, "timestamp": timestamp, "message": "seen" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["event_type"], event_type);
        assert_eq!(body["timestamp"], timestamp);
        assert_eq!(body["message"], "seen");
        assert!(body["id"].is_string());
    }
    let (status, body) = send_json(&harness.router, Method::GET, &format!("/sessions/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], id.as_str());
    let types: Vec<&str> = body["events"]
        .as_array()
        .expect("events")
        .iter()
        .map(|event| event["event_type"].as_str().expect("type"))
        .collect();
    assert_eq!(types, vec!["focus_lost", "custom_signal", "phone_detected"]);
}

#[tokio::test]
async fn event_without_timestamp_uses_now() {
    let harness = local_harness();
    let id = create_session(&harness.router, "Grace").await;
    let (status, body) = send_json(
        &harness.router,
        Method::POST,
        &format!("/sessions/{id}/events"),
        Some(json!({ "event_type": "no_face" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["timestamp"].is_string());
    assert!(body["message"].is_null());
}

#[tokio::test]
async fn event_timestamps_are_normalized_to_utc() {
    let harness = local_harness();
    let id = create_session(&harness.router, "Grace").await;
    let uri = format!("/sessions/{id}/events");
    for (sent, stored) in [
        ("2024-06-10T16:00:10+02:00", "2024-06-10T14:00:10Z"),
        ("2024-06-10T09:00:20-05:00", "2024-06-10T14:00:20Z"),
        ("2024-06-10T14:00:30", "2024-06-10T14:00:30Z"),
        ("2024-06-10T14:00:40.5", "2024-06-10T14:00:40.5Z"),
    ] {
        let (status, body) = send_json(
            &harness.router,
            Method::POST,
            &uri,
            Some(json!({ "event_type": "focus_lost", "timestamp": sent })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{sent}");
        assert_eq!(body["timestamp"], stored, "{sent}");
    }
}

#[tokio::test]
async fn unusable_event_timestamps_are_422() {
    let harness = sqlite_harness();
    let id = create_session(&harness.router, "Grace").await;
    let uri = format!("/sessions/{id}/events");
    let (status, _) = send_json(
        &harness.router,
        Method::POST,
        &uri,
        Some(json!({ "event_type": "no_face", "timestamp": "2024-06-10T14:00:00Z" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    for timestamp in ["9999-12-31T23:30:00-01:00", "0000-01-01T00:30:00+01:00", "yesterday"] {
        let (status, body) = send_json(
            &harness.router,
            Method::POST,
            &uri,
            Some(json!({ "event_type": "focus_lost", "timestamp": timestamp })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{timestamp}");
        assert!(body["detail"].as_str().expect("detail").contains("timestamp"), "{timestamp}");
    }
    let (status, body) =
        send_json(&harness.router, Method::GET, &format!("/sessions/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["events"].as_array().expect("events").len(), 1);
    let (status, body) =
        send_json(&harness.router, Method::GET, &format!("/sessions/{id}/report"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["no_face_segments"], 1);
    assert_eq!(body["focus_lost_count"], 0);
    let request = Request::builder()
        .uri(format!("/sessions/{id}/report.csv"))
        .body(Body::empty())
        .expect("request");
    let (status, _, _) = send(&harness.router, request).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn readiness_reflects_record_store() {
    let harness = local_harness();
    let (status, body) = send_json(&harness.router, Method::GET, "/readyz", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ready" }));

    let dir = TempDir::new().expect("tempdir");
    let config = test_config(&dir);
    let storage = LocalBlobStorage::new(&config.storage.video_dir, &config.storage.report_dir)
        .expect("storage");
    let state = Arc::new(AppState::new(
        SharedRecordStore::from_store(UnavailableStore),
        Arc::new(storage),
        Arc::new(RecordingSink::default()),
        config.storage.import_dir.clone(),
    ));
    let router = build_router(state, &config);
    let (status, body) = send_json(&router, Method::GET, "/readyz", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "not_ready");
    assert!(body["detail"].as_str().expect("detail").contains("database unreachable"));
}

#[tokio::test]
async fn end_session_is_idempotent() {
    let harness = local_harness();
    let id = create_session(&harness.router, "Linus").await;
    let uri = format!("/sessions/{id}/end");
    let (status, first) = send_json(&harness.router, Method::POST, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(first["end_time"].is_string());
    let (status, second) = send_json(&harness.router, Method::POST, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["end_time"], second["end_time"]);
}

// ============================================================================
// SECTION: Reports
// ============================================================================

fn seed_scored_session(store: &SharedRecordStore) -> SessionId {
    let start = datetime!(2024-06-10 14:00 UTC);
    let id = SessionId::new("sess-86");
    store.insert_session(&Session::start_at(id.clone(), "Ada", start)).expect("insert");
    store.end_session(&id, start + Duration::seconds(125)).expect("end");
    for (offset, event_type) in [(1, "focus_lost"), (2, "focus_lost"), (3, "phone_detected")] {
        let event = proctor_core::Event::new(
            id.clone(),
            event_type,
            None,
            Some(start + Duration::seconds(offset)),
        );
        store.insert_event(&event).expect("event");
    }
    id
}

#[tokio::test]
async fn report_summary_scores_and_persists_html() {
    let harness = local_harness();
    let id = seed_scored_session(&harness.store);
    let (status, body) =
        send_json(&harness.router, Method::GET, &format!("/sessions/{id}/report"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["candidate_name"], "Ada");
    assert_eq!(body["session_id"], "sess-86");
    assert_eq!(body["interview_duration_seconds"], 125);
    assert_eq!(body["focus_lost_count"], 2);
    assert_eq!(body["phone_detected_count"], 1);
    assert_eq!(body["no_face_segments"], 0);
    assert_eq!(body["suspicious_events_count"], 1);
    assert_eq!(body["integrity_score"], 86);

    let html = std::fs::read_to_string(harness.report_dir.join("report_sess-86.html"))
        .expect("html persisted");
    assert!(html.contains("Ada"));
    let writes = harness.audit.writes.lock().unwrap();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].kind, "report");
}

#[tokio::test]
async fn report_csv_is_attachment_and_persisted() {
    let harness = local_harness();
    let id = seed_scored_session(&harness.store);
    let request = Request::builder()
        .uri(format!("/sessions/{id}/report.csv"))
        .body(Body::empty())
        .expect("request");
    let (status, headers, body) = send(&harness.router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "text/csv");
    assert_eq!(headers[header::CONTENT_DISPOSITION], "attachment; filename=report_sess-86.csv");
    let text = String::from_utf8(body.clone()).expect("utf8");
    let mut lines = text.lines();
    assert!(lines.next().expect("header").starts_with("candidate_name,session_id,"));
    assert!(lines.next().expect("row").ends_with(",86"));
    let persisted = std::fs::read(harness.report_dir.join("report_sess-86.csv")).expect("csv");
    assert_eq!(persisted, body);
}

#[tokio::test]
async fn local_reports_are_served_from_directory() {
    let harness = local_harness();
    let id = seed_scored_session(&harness.store);
    send_json(&harness.router, Method::GET, &format!("/sessions/{id}/report"), None).await;
    let request = Request::builder()
        .uri("/reports/report_sess-86.html")
        .body(Body::empty())
        .expect("request");
    let (status, _, body) = send(&harness.router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert!(String::from_utf8(body).expect("utf8").contains("Ada"));
}

// ============================================================================
// SECTION: Recordings
// ============================================================================

#[tokio::test]
async fn upload_video_stores_file_and_updates_session() {
    let harness = local_harness();
    let id = create_session(&harness.router, "Ada").await;
    let payload = b"fake-mp4-bytes";
    let request =
        multipart_request(&format!("/sessions/{id}/video"), "file", "clip.mp4", payload);
    let (status, _, body) = send(&harness.router, request).await;
    assert_eq!(status, StatusCode::OK);
    let session: Value = serde_json::from_slice(&body).expect("json");
    let video_path = session["video_path"].as_str().expect("video path");
    assert!(video_path.ends_with(&format!("{id}.mp4")));
    let stored = std::fs::read(harness.video_dir.join(format!("{id}.mp4"))).expect("video file");
    assert_eq!(stored, payload);

    let request = Request::builder()
        .uri(format!("/videos/{id}.mp4"))
        .body(Body::empty())
        .expect("request");
    let (status, _, served) = send(&harness.router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(served, payload);
}

#[tokio::test]
async fn upload_without_file_field_is_422() {
    let harness = local_harness();
    let id = create_session(&harness.router, "Ada").await;
    let request =
        multipart_request(&format!("/sessions/{id}/video"), "attachment", "clip.mp4", b"x");
    let (status, _, body) = send(&harness.router, request).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = serde_json::from_slice(&body).expect("json");
    assert!(body["detail"].as_str().expect("detail").contains("file"));
}

#[tokio::test]
async fn upload_for_unknown_session_is_404() {
    let harness = local_harness();
    let request = multipart_request("/sessions/missing/video", "file", "clip.webm", b"x");
    let (status, _, _) = send(&harness.router, request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn import_video_copies_from_import_dir() {
    let harness = local_harness();
    let id = create_session(&harness.router, "Ada").await;
    std::fs::write(harness.import_dir.join("sample.webm"), b"imported").expect("seed");
    let (status, body) = send_json(
        &harness.router,
        Method::POST,
        &format!("/sessions/{id}/video/import"),
        Some(json!({ "filename": "sample.webm" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["video_path"].as_str().expect("path").ends_with(&format!("{id}.webm")));
    let stored = std::fs::read(harness.video_dir.join(format!("{id}.webm"))).expect("video");
    assert_eq!(stored, b"imported");
}

#[tokio::test]
async fn import_video_missing_source_is_404() {
    let harness = local_harness();
    let id = create_session(&harness.router, "Ada").await;
    let (status, body) = send_json(
        &harness.router,
        Method::POST,
        &format!("/sessions/{id}/video/import"),
        Some(json!({ "filename": "absent.webm" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Source video not found");
}

#[tokio::test]
async fn import_video_rejects_path_traversal() {
    let harness = local_harness();
    let id = create_session(&harness.router, "Ada").await;
    for filename in ["../secret.webm", "nested/clip.webm", ".."] {
        let (status, _) = send_json(
            &harness.router,
            Method::POST,
            &format!("/sessions/{id}/video/import"),
            Some(json!({ "filename": filename })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{filename}");
    }
}

// ============================================================================
// SECTION: Remote Backend
// ============================================================================

fn remote_harness() -> (TempDir, Router, SharedRecordStore, Arc<RemoteBlobs>) {
    let dir = TempDir::new().expect("tempdir");
    let config = test_config(&dir);
    let store = SharedRecordStore::from_store(InMemoryRecordStore::new());
    let blobs = Arc::new(RemoteBlobs::default());
    let state = Arc::new(AppState::new(
        store.clone(),
        blobs.clone(),
        Arc::new(RecordingSink::default()),
        config.storage.import_dir.clone(),
    ));
    let router = build_router(state, &config);
    (dir, router, store, blobs)
}

#[tokio::test]
async fn remote_artifacts_are_streamed_through_storage() {
    let (_dir, router, store, blobs) = remote_harness();
    let id = seed_scored_session(&store);
    let (status, _) = send_json(&router, Method::GET, &format!("/sessions/{id}/report"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(blobs.open("reports/report_sess-86.html").is_ok());

    let request =
        Request::builder().uri("/reports/report_sess-86.html").body(Body::empty()).expect("request");
    let (status, headers, _) = send(&router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "text/html");

    blobs.put(StorageNamespace::Videos, "sess-86.webm", b"video");
    let request = Request::builder().uri("/videos/sess-86.webm").body(Body::empty()).expect("request");
    let (status, headers, body) = send(&router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "video/webm");
    assert_eq!(body, b"video");
}

#[tokio::test]
async fn remote_missing_artifact_is_404() {
    let (_dir, router, _store, _blobs) = remote_harness();
    let (status, body) = send_json(&router, Method::GET, "/videos/none.webm", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["detail"].as_str().expect("detail").starts_with("storage not found"));
}

// ============================================================================
// SECTION: Middleware and Bootstrap
// ============================================================================

#[tokio::test]
async fn requests_are_audited_with_route_and_session() {
    let harness = local_harness();
    send_json(&harness.router, Method::GET, "/sessions/abc", None).await;
    let requests = harness.audit.requests.lock().unwrap();
    let event = requests.last().expect("audit event");
    assert_eq!(event.method, "GET");
    assert_eq!(event.route, "/sessions/{id}");
    assert_eq!(event.status, 404);
    assert_eq!(event.session_id.as_deref(), Some("abc"));
}

#[tokio::test]
async fn cors_allows_any_origin() {
    let harness = local_harness();
    let request = Request::builder()
        .uri("/")
        .header(header::ORIGIN, "http://localhost:5173")
        .body(Body::empty())
        .expect("request");
    let (status, headers, _) = send(&harness.router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
}

#[tokio::test]
async fn server_builds_from_memory_config() {
    let dir = TempDir::new().expect("tempdir");
    let server = ProctorServer::from_config(test_config(&dir)).expect("server");
    let router = server.router();
    let (status, _) = send_json(&router, Method::GET, "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(dir.path().join("videos").is_dir());
    assert!(dir.path().join("reports").is_dir());
}

#[tokio::test]
async fn server_rejects_invalid_config() {
    let dir = TempDir::new().expect("tempdir");
    let mut config = test_config(&dir);
    config.database.path = Some(dir.path().join("ignored.db"));
    assert!(ProctorServer::from_config(config).is_err());
}
