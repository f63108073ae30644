// crates/proctor-server/src/lib.rs
// ============================================================================
// Module: Proctor Server Library
// Description: HTTP surface for the proctoring backend.
// Purpose: Expose the router, server bootstrap, and audit sinks.
// Dependencies: axum, proctor-core, proctor-storage, proctor-store-sqlite
// ============================================================================

//! ## Overview
//! Proctor server wires the record store, blob storage, and audit sink into an
//! axum router. Inputs are untrusted: storage keys are validated as single path
//! segments and request bodies are size-limited.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod error;
pub mod handlers;
pub mod server;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::AuditSink;
pub use audit::FileAuditSink;
pub use audit::HttpRequestEvent;
pub use audit::LifecycleEvent;
pub use audit::NoopAuditSink;
pub use audit::SharedAuditSink;
pub use audit::StderrAuditSink;
pub use audit::StorageWriteEvent;
pub use audit::build_audit_sink;
pub use error::ApiError;
pub use server::AppState;
pub use server::ProctorServer;
pub use server::ServerError;
pub use server::build_record_store;
pub use server::build_router;
