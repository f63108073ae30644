// crates/proctor-core/src/core/event.rs
// ============================================================================
// Module: Proctor Events
// Description: Behavioral events logged against a session and their categories.
// Purpose: Define the closed set of scored categories and the event record.
// Dependencies: crate::core::{identifiers, time}, serde, time
// ============================================================================

//! ## Overview
//! Events are produced by an external client that watches the candidate and
//! are merely logged here. `event_type` is free text on the wire: the seven
//! [`EventCategory`] tags are scored, anything else is stored but ignored by
//! the summarizer.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;

use crate::core::identifiers::EventId;
use crate::core::identifiers::SessionId;
use crate::core::time::now_utc;

// ============================================================================
// SECTION: Event Category
// ============================================================================

/// Scored behavioral event categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    /// Browser tab or window lost focus.
    FocusLost,
    /// Candidate looked away from the screen.
    LookingAway,
    /// No face was visible.
    NoFace,
    /// More than one face was visible.
    MultipleFaces,
    /// A phone was detected.
    PhoneDetected,
    /// Written notes were detected.
    NotesDetected,
    /// An extra electronic device was detected.
    DeviceDetected,
}

impl EventCategory {
    /// All categories in canonical report order.
    pub const ALL: [Self; 7] = [
        Self::FocusLost,
        Self::LookingAway,
        Self::NoFace,
        Self::MultipleFaces,
        Self::PhoneDetected,
        Self::NotesDetected,
        Self::DeviceDetected,
    ];

    /// Returns the wire tag for the category.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FocusLost => "focus_lost",
            Self::LookingAway => "looking_away",
            Self::NoFace => "no_face",
            Self::MultipleFaces => "multiple_faces",
            Self::PhoneDetected => "phone_detected",
            Self::NotesDetected => "notes_detected",
            Self::DeviceDetected => "device_detected",
        }
    }

    /// Returns the human-readable label used in rendered reports.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::FocusLost => "Focus lost",
            Self::LookingAway => "Looking away",
            Self::NoFace => "No face",
            Self::MultipleFaces => "Multiple faces",
            Self::PhoneDetected => "Phone detected",
            Self::NotesDetected => "Notes detected",
            Self::DeviceDetected => "Extra device detected",
        }
    }

    /// Returns the integrity penalty applied per occurrence.
    #[must_use]
    pub const fn weight(self) -> u32 {
        match self {
            Self::FocusLost | Self::LookingAway => 2,
            Self::NoFace | Self::NotesDetected => 5,
            Self::DeviceDetected => 8,
            Self::MultipleFaces | Self::PhoneDetected => 10,
        }
    }

    /// Returns true for categories counted in the suspicious aggregate.
    #[must_use]
    pub const fn is_suspicious(self) -> bool {
        matches!(
            self,
            Self::MultipleFaces | Self::PhoneDetected | Self::NotesDetected | Self::DeviceDetected
        )
    }

    /// Parses an exact wire tag. Matching is case-sensitive.
    #[must_use]
    pub fn parse(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|category| category.as_str() == tag)
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Event
// ============================================================================

/// Event logged against a session.
///
/// # Invariants
/// - Immutable after creation.
/// - `session_id` references an existing session at insert time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Event identifier.
    pub id: EventId,
    /// Owning session identifier.
    pub session_id: SessionId,
    /// Raw event type tag as submitted by the client.
    pub event_type: String,
    /// Optional free-form message.
    #[serde(default)]
    pub message: Option<String>,
    /// Event time (UTC).
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl Event {
    /// Creates an event with a fresh identifier.
    ///
    /// When `timestamp` is `None` the current time is used.
    #[must_use]
    pub fn new(
        session_id: SessionId,
        event_type: impl Into<String>,
        message: Option<String>,
        timestamp: Option<OffsetDateTime>,
    ) -> Self {
        Self {
            id: EventId::generate(),
            session_id,
            event_type: event_type.into(),
            message,
            timestamp: timestamp.unwrap_or_else(now_utc),
        }
    }

    /// Returns the scored category for this event, if any.
    #[must_use]
    pub fn category(&self) -> Option<EventCategory> {
        EventCategory::parse(&self.event_type)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
