// crates/proctor-server/src/audit.rs
// ============================================================================
// Module: Audit Logging
// Description: Structured JSON-line events for requests, writes, and lifecycle.
// Purpose: Emit operational logs without binding to a logging framework.
// Dependencies: proctor-config, serde, serde_json
// ============================================================================

//! ## Overview
//! Every HTTP request produces one `http_request` event, every persisted
//! artifact a `storage_write` event, and startup/shutdown a `server_lifecycle`
//! event. Events are serialized as single JSON lines and routed to a sink
//! chosen from the `[audit]` configuration section.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use proctor_config::AuditConfig;
use serde::Serialize;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Per-request audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct HttpRequestEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// HTTP method.
    pub method: String,
    /// Matched route template, or the raw path when unrouted.
    pub route: String,
    /// Response status code.
    pub status: u16,
    /// Handling time in milliseconds.
    pub duration_ms: u128,
    /// Session identifier when the path carries one.
    pub session_id: Option<String>,
}

/// Artifact write audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct StorageWriteEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Artifact kind (`video` or `report`).
    pub kind: &'static str,
    /// Owning session identifier.
    pub session_id: String,
    /// Reference returned by the storage backend.
    pub reference: String,
    /// Artifact size in bytes.
    pub bytes: usize,
}

/// Server lifecycle audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct LifecycleEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Lifecycle phase (`starting`, `listening`, `stopped`, `failed`).
    pub phase: &'static str,
    /// Optional detail message.
    pub message: Option<String>,
}

/// Inputs required to construct a request audit event.
pub struct HttpRequestEventParams {
    /// HTTP method.
    pub method: String,
    /// Matched route template.
    pub route: String,
    /// Response status code.
    pub status: u16,
    /// Handling time in milliseconds.
    pub duration_ms: u128,
    /// Session identifier when present.
    pub session_id: Option<String>,
}

/// Returns the current time in milliseconds since the epoch.
fn now_ms() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis()
}

impl HttpRequestEvent {
    /// Creates a new request event with a consistent timestamp.
    #[must_use]
    pub fn new(params: HttpRequestEventParams) -> Self {
        Self {
            event: "http_request",
            timestamp_ms: now_ms(),
            method: params.method,
            route: params.route,
            status: params.status,
            duration_ms: params.duration_ms,
            session_id: params.session_id,
        }
    }
}

impl StorageWriteEvent {
    /// Creates a new storage write event.
    #[must_use]
    pub fn new(kind: &'static str, session_id: &str, reference: &str, bytes: usize) -> Self {
        Self {
            event: "storage_write",
            timestamp_ms: now_ms(),
            kind,
            session_id: session_id.to_string(),
            reference: reference.to_string(),
            bytes,
        }
    }
}

impl LifecycleEvent {
    /// Creates a new lifecycle event.
    #[must_use]
    pub fn new(phase: &'static str, message: Option<String>) -> Self {
        Self {
            event: "server_lifecycle",
            timestamp_ms: now_ms(),
            phase,
            message,
        }
    }
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Audit sink for server events.
pub trait AuditSink: Send + Sync {
    /// Record a request event.
    fn record_request(&self, event: &HttpRequestEvent);

    /// Record a storage write event.
    fn record_storage(&self, _event: &StorageWriteEvent) {}

    /// Record a lifecycle event.
    fn record_lifecycle(&self, _event: &LifecycleEvent) {}
}

/// Shared audit sink trait object.
pub type SharedAuditSink = Arc<dyn AuditSink>;

/// Builds the sink selected by the audit configuration.
///
/// # Errors
///
/// Returns an error when the configured log file cannot be opened.
pub fn build_audit_sink(config: &AuditConfig) -> io::Result<SharedAuditSink> {
    if !config.enabled {
        return Ok(Arc::new(NoopAuditSink));
    }
    match &config.path {
        Some(path) => Ok(Arc::new(FileAuditSink::new(Path::new(path))?)),
        None => Ok(Arc::new(StderrAuditSink)),
    }
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl StderrAuditSink {
    /// Writes one serialized payload line to stderr.
    fn emit<T: Serialize>(event: &T) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(io::stderr(), "{payload}");
        }
    }
}

impl AuditSink for StderrAuditSink {
    fn record_request(&self, event: &HttpRequestEvent) {
        Self::emit(event);
    }

    fn record_storage(&self, event: &StorageWriteEvent) {
        Self::emit(event);
    }

    fn record_lifecycle(&self, event: &LifecycleEvent) {
        Self::emit(event);
    }
}

/// Audit sink that logs JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    /// Appends one serialized payload line.
    fn emit<T: Serialize>(&self, event: &T) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

impl AuditSink for FileAuditSink {
    fn record_request(&self, event: &HttpRequestEvent) {
        self.emit(event);
    }

    fn record_storage(&self, event: &StorageWriteEvent) {
        self.emit(event);
    }

    fn record_lifecycle(&self, event: &LifecycleEvent) {
        self.emit(event);
    }
}

/// No-op audit sink.
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record_request(&self, _event: &HttpRequestEvent) {}
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only audit assertions."
    )]

    use proctor_config::AuditConfig;
    use serde_json::Value;

    use super::FileAuditSink;
    use super::HttpRequestEvent;
    use super::HttpRequestEventParams;
    use super::LifecycleEvent;
    use super::StorageWriteEvent;
    use super::build_audit_sink;
    use super::AuditSink;

    #[test]
    fn file_sink_appends_json_lines() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("audit.log");
        let sink = FileAuditSink::new(&path).expect("sink");
        sink.record_request(&HttpRequestEvent::new(HttpRequestEventParams {
            method: "GET".to_string(),
            route: "/sessions/{id}".to_string(),
            status: 404,
            duration_ms: 3,
            session_id: Some("abc".to_string()),
        }));
        sink.record_storage(&StorageWriteEvent::new("report", "abc", "reports/report_abc.html", 42));
        sink.record_lifecycle(&LifecycleEvent::new("listening", None));

        let content = std::fs::read_to_string(&path).expect("read");
        let lines: Vec<Value> =
            content.lines().map(|line| serde_json::from_str(line).expect("json")).collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["event"], "http_request");
        assert_eq!(lines[0]["status"], 404);
        assert_eq!(lines[0]["session_id"], "abc");
        assert_eq!(lines[1]["event"], "storage_write");
        assert_eq!(lines[1]["bytes"], 42);
        assert_eq!(lines[2]["event"], "server_lifecycle");
        assert_eq!(lines[2]["phase"], "listening");
    }

    #[test]
    fn disabled_audit_writes_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("audit.log");
        let config = AuditConfig {
            enabled: false,
            path: Some(path.display().to_string()),
        };
        let sink = build_audit_sink(&config).expect("sink");
        sink.record_lifecycle(&LifecycleEvent::new("starting", None));
        assert!(!path.exists());
    }
}
