// crates/proctor-server/src/server.rs
// ============================================================================
// Module: Proctor Server
// Description: Application state, router assembly, and the HTTP listener.
// Purpose: Wire configuration into stores, storage, audit, and axum routes.
// Dependencies: axum, proctor-config, proctor-store-sqlite, tokio, tower-http
// ============================================================================

//! ## Overview
//! [`ProctorServer::from_config`] validates configuration and constructs the
//! record store, blob storage, and audit sink once; handlers reach them only
//! through [`AppState`]. With local storage the `/videos` and `/reports`
//! prefixes are served straight from the configured directories; with an
//! object store they are served by handlers that read through the backend.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::extract::MatchedPath;
use axum::extract::Request;
use axum::extract::State;
use axum::middleware;
use axum::middleware::Next;
use axum::response::Response;
use axum::routing::get;
use axum::routing::post;
use proctor_config::DatabaseConfig;
use proctor_config::DatabaseType;
use proctor_config::ProctorConfig;
use proctor_core::InMemoryRecordStore;
use proctor_core::SharedRecordStore;
use proctor_storage::SharedBlobStorage;
use proctor_storage::StorageBackendKind;
use proctor_storage::build_blob_storage;
use proctor_store_sqlite::SqliteRecordStore;
use proctor_store_sqlite::SqliteStoreConfig;
use thiserror::Error;
use tower_http::cors::Any;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use crate::audit::HttpRequestEvent;
use crate::audit::HttpRequestEventParams;
use crate::audit::LifecycleEvent;
use crate::audit::SharedAuditSink;
use crate::audit::build_audit_sink;
use crate::handlers;

// ============================================================================
// SECTION: State
// ============================================================================

/// Shared state reachable from every handler.
pub struct AppState {
    /// Session and event records.
    pub store: SharedRecordStore,
    /// Recording and report storage.
    pub storage: SharedBlobStorage,
    /// Audit event sink.
    pub audit: SharedAuditSink,
    /// Directory scanned by video import.
    pub import_dir: PathBuf,
}

impl AppState {
    /// Creates application state from constructed collaborators.
    #[must_use]
    pub const fn new(
        store: SharedRecordStore,
        storage: SharedBlobStorage,
        audit: SharedAuditSink,
        import_dir: PathBuf,
    ) -> Self {
        Self {
            store,
            storage,
            audit,
            import_dir,
        }
    }
}

// ============================================================================
// SECTION: Server
// ============================================================================

/// Proctoring HTTP server.
pub struct ProctorServer {
    /// Validated configuration.
    config: ProctorConfig,
    /// Shared handler state.
    state: Arc<AppState>,
}

impl ProctorServer {
    /// Builds a server from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when validation or backend construction fails.
    pub fn from_config(config: ProctorConfig) -> Result<Self, ServerError> {
        config.validate().map_err(|err| ServerError::Config(err.to_string()))?;
        let store = build_record_store(&config.database)?;
        let storage =
            build_blob_storage(&config.storage).map_err(|err| ServerError::Init(err.to_string()))?;
        let audit = build_audit_sink(&config.audit)
            .map_err(|err| ServerError::Init(format!("audit log unavailable: {err}")))?;
        let state = Arc::new(AppState::new(
            store,
            storage,
            audit,
            config.storage.import_dir.clone(),
        ));
        Ok(Self {
            config,
            state,
        })
    }

    /// Returns the assembled router.
    #[must_use]
    pub fn router(&self) -> Router {
        build_router(Arc::clone(&self.state), &self.config)
    }

    /// Binds the configured address and serves until interrupted.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when binding or serving fails.
    pub async fn serve(self) -> Result<(), ServerError> {
        let addr = self.config.server.bind_addr().map_err(|err| ServerError::Config(err.to_string()))?;
        let app = self.router();
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|err| ServerError::Transport(format!("http bind failed: {err}")))?;
        self.state.audit.record_lifecycle(&LifecycleEvent::new(
            "listening",
            Some(format!("{addr} storage={}", self.state.storage.backend().as_str())),
        ));
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|err| ServerError::Transport(format!("http server failed: {err}")))?;
        self.state.audit.record_lifecycle(&LifecycleEvent::new("stopped", None));
        Ok(())
    }
}

/// Builds the record store from database configuration.
///
/// # Errors
///
/// Returns [`ServerError`] when the `SQLite` store cannot be opened.
pub fn build_record_store(config: &DatabaseConfig) -> Result<SharedRecordStore, ServerError> {
    let store = match config.store_type {
        DatabaseType::Memory => SharedRecordStore::from_store(InMemoryRecordStore::new()),
        DatabaseType::Sqlite => {
            let path = config.path.clone().ok_or_else(|| {
                ServerError::Config("sqlite database requires path".to_string())
            })?;
            let mut sqlite_config = SqliteStoreConfig::new(path);
            sqlite_config.busy_timeout_ms = config.busy_timeout_ms;
            sqlite_config.journal_mode = config.journal_mode;
            sqlite_config.sync_mode = config.sync_mode;
            let store = SqliteRecordStore::new(&sqlite_config)
                .map_err(|err| ServerError::Init(err.to_string()))?;
            SharedRecordStore::from_store(store)
        }
    };
    Ok(store)
}

// ============================================================================
// SECTION: Router
// ============================================================================

/// Assembles routes, artifact serving, and middleware.
pub fn build_router(state: Arc<AppState>, config: &ProctorConfig) -> Router {
    let router = Router::new()
        .route("/", get(handlers::root))
        .route("/readyz", get(handlers::readiness))
        .route("/sessions", post(handlers::create_session).get(handlers::list_sessions))
        .route("/sessions/{id}", get(handlers::get_session))
        .route("/sessions/{id}/events", post(handlers::log_event))
        .route("/sessions/{id}/end", post(handlers::end_session))
        .route("/sessions/{id}/video", post(handlers::upload_video))
        .route("/sessions/{id}/video/import", post(handlers::import_video))
        .route("/sessions/{id}/report", get(handlers::get_report))
        .route("/sessions/{id}/report.csv", get(handlers::get_report_csv));
    let router = match state.storage.backend() {
        StorageBackendKind::Local => router
            .nest_service("/videos", ServeDir::new(&config.storage.video_dir))
            .nest_service("/reports", ServeDir::new(&config.storage.report_dir)),
        StorageBackendKind::ObjectStore => router
            .route("/videos/{name}", get(handlers::get_video))
            .route("/reports/{name}", get(handlers::get_report_file)),
    };
    let router = router
        .layer(middleware::from_fn_with_state(Arc::clone(&state), audit_requests))
        .layer(DefaultBodyLimit::max(config.server.max_body_bytes));
    let router = if config.server.cors { router.layer(cors_layer()) } else { router };
    router.with_state(state)
}

/// Permissive CORS policy for browser clients.
fn cors_layer() -> CorsLayer {
    CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
}

/// Records one audit event per request.
async fn audit_requests(State(state): State<Arc<AppState>>, request: Request, next: Next) -> Response {
    let started = Instant::now();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| path.clone(), |matched| matched.as_str().to_string());
    let response = next.run(request).await;
    state.audit.record_request(&HttpRequestEvent::new(HttpRequestEventParams {
        method,
        route,
        status: response.status().as_u16(),
        duration_ms: started.elapsed().as_millis(),
        session_id: session_id_from_path(&path),
    }));
    response
}

/// Extracts the session identifier from `/sessions/{id}/...` paths.
fn session_id_from_path(path: &str) -> Option<String> {
    path.strip_prefix("/sessions/")
        .and_then(|rest| rest.split('/').next())
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
}

/// Resolves when the process receives an interrupt.
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Configuration errors.
    #[error("config error: {0}")]
    Config(String),
    /// Initialization errors.
    #[error("init error: {0}")]
    Init(String),
    /// Transport errors.
    #[error("transport error: {0}")]
    Transport(String),
}

// ============================================================================
// SECTION: Tests
// ============================================================================
