// crates/proctor-core/src/interfaces/mod.rs
// ============================================================================
// Module: Proctor Interfaces
// Description: Backend-agnostic persistence interfaces for sessions and events.
// Purpose: Let the HTTP surface and CLI run unchanged over any record store.
// Dependencies: crate::core, thiserror, time
// ============================================================================

//! ## Overview
//! The [`RecordStore`] trait is the only persistence seam the core depends on.
//! Implementations must make `end_session` an atomic set-if-unset so two
//! concurrent end requests can never overwrite one another.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;
use time::OffsetDateTime;

use crate::core::event::Event;
use crate::core::identifiers::SessionId;
use crate::core::session::Session;
use crate::core::time::TimestampError;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Record store errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Store I/O error.
    #[error("record store io error: {0}")]
    Io(String),
    /// Stored data is corrupted or cannot be decoded.
    #[error("record store corruption: {0}")]
    Corrupt(String),
    /// Record violates a store constraint.
    #[error("record store invalid data: {0}")]
    Invalid(String),
    /// Store reported an error.
    #[error("record store error: {0}")]
    Store(String),
}

impl From<TimestampError> for StoreError {
    fn from(error: TimestampError) -> Self {
        Self::Invalid(error.to_string())
    }
}

// ============================================================================
// SECTION: Record Store
// ============================================================================

/// Persistence for sessions and their events.
pub trait RecordStore: Send + Sync {
    /// Inserts a new session.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the session cannot be persisted or its
    /// identifier already exists.
    fn insert_session(&self, session: &Session) -> Result<(), StoreError>;

    /// Loads a session by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn get_session(&self, id: &SessionId) -> Result<Option<Session>, StoreError>;

    /// Lists all sessions, newest start time first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when listing fails.
    fn list_sessions(&self) -> Result<Vec<Session>, StoreError>;

    /// Sets the session end time if it is unset and returns the stored session.
    ///
    /// A session that has already ended is returned unchanged. Returns `None`
    /// when the session does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the update fails.
    fn end_session(
        &self,
        id: &SessionId,
        at: OffsetDateTime,
    ) -> Result<Option<Session>, StoreError>;

    /// Replaces the session's video reference and returns the stored session.
    ///
    /// Returns `None` when the session does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the update fails.
    fn set_video_path(
        &self,
        id: &SessionId,
        video_path: &str,
    ) -> Result<Option<Session>, StoreError>;

    /// Inserts an event. The caller must have verified the owning session.
    ///
    /// Timestamps rejected by [`crate::storable_timestamp`] fail with
    /// [`StoreError::Invalid`] and nothing is written; the same holds for
    /// session start, end, and `at` values.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the event cannot be persisted.
    fn insert_event(&self, event: &Event) -> Result<(), StoreError>;

    /// Lists a session's events by ascending timestamp, ties in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when listing fails.
    fn list_events(&self, session_id: &SessionId) -> Result<Vec<Event>, StoreError>;

    /// Reports store readiness for liveness/readiness probes.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store is unavailable.
    fn readiness(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
