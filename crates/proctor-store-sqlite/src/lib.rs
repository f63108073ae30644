// crates/proctor-store-sqlite/src/lib.rs
// ============================================================================
// Module: SQLite Record Store
// Description: Durable RecordStore backend using SQLite WAL.
// Purpose: Persist proctoring sessions and events across restarts.
// Dependencies: proctor-core, rusqlite
// ============================================================================

//! ## Overview
//! This crate provides a SQLite-backed [`proctor_core::RecordStore`] holding a
//! `sessions` table and an append-only `events` table. Timestamps are stored
//! as RFC 3339 text alongside an integer nanosecond key used for ordering.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::SqliteRecordStore;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
