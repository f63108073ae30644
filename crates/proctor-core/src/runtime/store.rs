// crates/proctor-core/src/runtime/store.rs
// ============================================================================
// Module: Proctor In-Memory Store
// Description: Mutex-guarded record store and a shared trait-object wrapper.
// Purpose: Back tests and `memory` deployments without a database.
// Dependencies: crate::{core, interfaces}, time
// ============================================================================

//! ## Overview
//! [`InMemoryRecordStore`] keeps sessions and per-session event logs in
//! `BTreeMap`s behind a single mutex, so every operation including
//! `end_session` is atomic with respect to concurrent callers.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use time::OffsetDateTime;

use crate::core::event::Event;
use crate::core::identifiers::SessionId;
use crate::core::session::Session;
use crate::core::time::storable_timestamp;
use crate::interfaces::RecordStore;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: In-Memory Store
// ============================================================================

/// Records held by the in-memory store.
#[derive(Debug, Default)]
struct Records {
    /// Sessions keyed by identifier.
    sessions: BTreeMap<SessionId, Session>,
    /// Event logs keyed by owning session, in insertion order.
    events: BTreeMap<SessionId, Vec<Event>>,
}

/// In-memory record store for tests and ephemeral deployments.
#[derive(Debug, Default, Clone)]
pub struct InMemoryRecordStore {
    /// Record maps protected by a mutex.
    records: Arc<Mutex<Records>>,
}

impl InMemoryRecordStore {
    /// Creates a new in-memory record store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the record maps.
    fn lock(&self) -> Result<MutexGuard<'_, Records>, StoreError> {
        self.records
            .lock()
            .map_err(|_| StoreError::Store("record store mutex poisoned".to_string()))
    }
}

impl RecordStore for InMemoryRecordStore {
    fn insert_session(&self, session: &Session) -> Result<(), StoreError> {
        storable_timestamp(session.start_time)?;
        session.end_time.map(storable_timestamp).transpose()?;
        let mut guard = self.lock()?;
        if guard.sessions.contains_key(&session.id) {
            return Err(StoreError::Invalid(format!("duplicate session id: {}", session.id)));
        }
        guard.sessions.insert(session.id.clone(), session.clone());
        Ok(())
    }

    fn get_session(&self, id: &SessionId) -> Result<Option<Session>, StoreError> {
        let guard = self.lock()?;
        Ok(guard.sessions.get(id).cloned())
    }

    fn list_sessions(&self) -> Result<Vec<Session>, StoreError> {
        let guard = self.lock()?;
        let mut sessions: Vec<Session> = guard.sessions.values().cloned().collect();
        sessions.sort_by(|left, right| right.start_time.cmp(&left.start_time));
        Ok(sessions)
    }

    fn end_session(
        &self,
        id: &SessionId,
        at: OffsetDateTime,
    ) -> Result<Option<Session>, StoreError> {
        storable_timestamp(at)?;
        let mut guard = self.lock()?;
        let Some(session) = guard.sessions.get_mut(id) else {
            return Ok(None);
        };
        session.end(at);
        Ok(Some(session.clone()))
    }

    fn set_video_path(
        &self,
        id: &SessionId,
        video_path: &str,
    ) -> Result<Option<Session>, StoreError> {
        let mut guard = self.lock()?;
        let Some(session) = guard.sessions.get_mut(id) else {
            return Ok(None);
        };
        session.video_path = Some(video_path.to_string());
        Ok(Some(session.clone()))
    }

    fn insert_event(&self, event: &Event) -> Result<(), StoreError> {
        storable_timestamp(event.timestamp)?;
        let mut guard = self.lock()?;
        if !guard.sessions.contains_key(&event.session_id) {
            return Err(StoreError::Invalid(format!(
                "event references unknown session: {}",
                event.session_id
            )));
        }
        guard.events.entry(event.session_id.clone()).or_default().push(event.clone());
        Ok(())
    }

    fn list_events(&self, session_id: &SessionId) -> Result<Vec<Event>, StoreError> {
        let guard = self.lock()?;
        let mut events = guard.events.get(session_id).cloned().unwrap_or_default();
        events.sort_by_key(|event| event.timestamp);
        Ok(events)
    }

    fn readiness(&self) -> Result<(), StoreError> {
        self.lock().map(|_| ())
    }
}

// ============================================================================
// SECTION: Shared Store
// ============================================================================

/// Shared record store backed by an `Arc` trait object.
#[derive(Clone)]
pub struct SharedRecordStore {
    /// Inner store implementation.
    inner: Arc<dyn RecordStore>,
}

impl SharedRecordStore {
    /// Wraps a record store in a shared, clonable wrapper.
    #[must_use]
    pub fn from_store(store: impl RecordStore + 'static) -> Self {
        Self {
            inner: Arc::new(store),
        }
    }

    /// Wraps an existing shared store.
    #[must_use]
    pub const fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            inner: store,
        }
    }
}

impl std::fmt::Debug for SharedRecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedRecordStore").finish_non_exhaustive()
    }
}

impl RecordStore for SharedRecordStore {
    fn insert_session(&self, session: &Session) -> Result<(), StoreError> {
        self.inner.insert_session(session)
    }

    fn get_session(&self, id: &SessionId) -> Result<Option<Session>, StoreError> {
        self.inner.get_session(id)
    }

    fn list_sessions(&self) -> Result<Vec<Session>, StoreError> {
        self.inner.list_sessions()
    }

    fn end_session(
        &self,
        id: &SessionId,
        at: OffsetDateTime,
    ) -> Result<Option<Session>, StoreError> {
        self.inner.end_session(id, at)
    }

    fn set_video_path(
        &self,
        id: &SessionId,
        video_path: &str,
    ) -> Result<Option<Session>, StoreError> {
        self.inner.set_video_path(id, video_path)
    }

    fn insert_event(&self, event: &Event) -> Result<(), StoreError> {
        self.inner.insert_event(event)
    }

    fn list_events(&self, session_id: &SessionId) -> Result<Vec<Event>, StoreError> {
        self.inner.list_events(session_id)
    }

    fn readiness(&self) -> Result<(), StoreError> {
        self.inner.readiness()
    }
}
