// crates/proctor-core/src/lib.rs
// ============================================================================
// Module: Proctor Core Library
// Description: Public API surface for the proctoring core.
// Purpose: Expose domain types, scoring, report rendering, and store interfaces.
// Dependencies: crate::{core, interfaces, report, runtime, scoring}
// ============================================================================

//! ## Overview
//! Proctor core owns the only pieces of the proctoring backend with real
//! domain rules: summarizing a session's event log into fixed category counts,
//! deriving a bounded integrity score, and rendering HTML/CSV reports. It is
//! backend-agnostic and reaches persistence only through [`RecordStore`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod report;
pub mod runtime;
pub mod scoring;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use crate::core::Event;
pub use crate::core::EventCategory;
pub use crate::core::EventId;
pub use crate::core::Session;
pub use crate::core::SessionId;
pub use crate::core::MAX_TIMESTAMP_YEAR;
pub use crate::core::MIN_TIMESTAMP_YEAR;
pub use crate::core::TimestampError;
pub use crate::core::format_timestamp;
pub use crate::core::now_utc;
pub use crate::core::parse_client_timestamp;
pub use crate::core::parse_timestamp;
pub use crate::core::session_duration_seconds;
pub use crate::core::storable_timestamp;

pub use interfaces::RecordStore;
pub use interfaces::StoreError;
pub use report::ReportError;
pub use report::ReportFormat;
pub use report::ReportSummary;
pub use report::SessionReport;
pub use report::render_csv_report;
pub use report::render_html_report;
pub use runtime::InMemoryRecordStore;
pub use runtime::SharedRecordStore;
pub use scoring::EventCounts;
pub use scoring::IntegrityScore;
pub use scoring::compute_integrity_score;
pub use scoring::score_from_raw_counts;
pub use scoring::summarize_events;
