// crates/proctor-core/src/core/mod.rs
// ============================================================================
// Module: Proctor Core Types
// Description: Canonical session, event, and category structures.
// Purpose: Provide stable, serializable types shared by every proctor crate.
// Dependencies: serde, thiserror, time, uuid
// ============================================================================

//! ## Overview
//! Core types define proctoring sessions, the behavioral events logged against
//! them, and the closed set of scoring categories. These types are the single
//! source of truth for the HTTP surface and the record stores.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod event;
pub mod identifiers;
pub mod session;
pub mod time;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use event::Event;
pub use event::EventCategory;
pub use identifiers::EventId;
pub use identifiers::SessionId;
pub use session::Session;
pub use session::session_duration_seconds;
pub use self::time::MAX_TIMESTAMP_YEAR;
pub use self::time::MIN_TIMESTAMP_YEAR;
pub use self::time::TimestampError;
pub use self::time::format_timestamp;
pub use self::time::now_utc;
pub use self::time::parse_client_timestamp;
pub use self::time::parse_timestamp;
pub use self::time::storable_timestamp;
