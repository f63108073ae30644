// crates/proctor-core/src/core/session.rs
// ============================================================================
// Module: Proctor Sessions
// Description: Proctoring session records and duration derivation.
// Purpose: Model one candidate's interview and its single-shot end time.
// Dependencies: crate::core::{identifiers, time}, serde, time
// ============================================================================

//! ## Overview
//! A [`Session`] is created when a candidate starts an interview and is only
//! ever mutated to record its end time (once) and its video reference. The
//! video reference is opaque here; only the storage layer interprets it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;

use crate::core::identifiers::SessionId;
use crate::core::time::now_utc;

// ============================================================================
// SECTION: Session
// ============================================================================

/// Proctoring session record.
///
/// # Invariants
/// - `end_time`, once set, never changes.
/// - `end_time` is never earlier than `start_time` when set through [`Session::end`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Session identifier.
    pub id: SessionId,
    /// Candidate display name.
    pub candidate_name: String,
    /// Session start time (UTC).
    #[serde(with = "time::serde::rfc3339")]
    pub start_time: OffsetDateTime,
    /// Session end time (UTC), unset while the session is live.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub end_time: Option<OffsetDateTime>,
    /// Opaque storage reference for the session recording.
    #[serde(default)]
    pub video_path: Option<String>,
}

impl Session {
    /// Starts a new session for the candidate with a fresh identifier.
    #[must_use]
    pub fn start(candidate_name: impl Into<String>) -> Self {
        Self::start_at(SessionId::generate(), candidate_name, now_utc())
    }

    /// Builds a session with an explicit identifier and start time.
    #[must_use]
    pub fn start_at(
        id: SessionId,
        candidate_name: impl Into<String>,
        start_time: OffsetDateTime,
    ) -> Self {
        Self {
            id,
            candidate_name: candidate_name.into(),
            start_time,
            end_time: None,
            video_path: None,
        }
    }

    /// Sets the end time if it is not already set.
    ///
    /// Returns `true` when this call recorded the end time. End times earlier
    /// than the start are clamped to the start.
    pub fn end(&mut self, at: OffsetDateTime) -> bool {
        if self.end_time.is_some() {
            return false;
        }
        self.end_time = Some(at.max(self.start_time));
        true
    }

    /// Returns true when the session has ended.
    #[must_use]
    pub const fn is_ended(&self) -> bool {
        self.end_time.is_some()
    }

    /// Returns the whole-second duration of the session.
    #[must_use]
    pub fn duration_seconds(&self) -> u64 {
        session_duration_seconds(self.start_time, self.end_time)
    }
}

// ============================================================================
// SECTION: Duration
// ============================================================================

/// Computes the session duration in whole seconds.
///
/// Returns 0 when the session has not ended. Fractional seconds are truncated
/// and an end time earlier than the start yields 0.
#[must_use]
pub fn session_duration_seconds(start: OffsetDateTime, end: Option<OffsetDateTime>) -> u64 {
    let Some(end) = end else {
        return 0;
    };
    let whole = (end - start).whole_seconds();
    u64::try_from(whole).unwrap_or(0)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
