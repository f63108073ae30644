// crates/proctor-core/src/report/mod.rs
// ============================================================================
// Module: Proctor Reports
// Description: Report summaries and HTML/CSV rendering for sessions.
// Purpose: Turn a session, its counts, and its score into client artifacts.
// Dependencies: crate::{core, scoring}, csv, serde
// ============================================================================

//! ## Overview
//! A [`SessionReport`] bundles a session with its freshly computed
//! [`EventCounts`] and [`IntegrityScore`]. From it the module derives the JSON
//! [`ReportSummary`], a self-contained HTML document, and a single-row CSV.
//! Rendering is pure: the same inputs always produce byte-identical output.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::event::Event;
use crate::core::event::EventCategory;
use crate::core::identifiers::SessionId;
use crate::core::session::Session;
use crate::core::time::format_timestamp;
use crate::scoring::EventCounts;
use crate::scoring::IntegrityScore;
use crate::scoring::compute_integrity_score;
use crate::scoring::summarize_events;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Content type for HTML reports.
pub const HTML_CONTENT_TYPE: &str = "text/html";
/// Content type for CSV reports.
pub const CSV_CONTENT_TYPE: &str = "text/csv";

/// CSV header row, in column order.
pub const CSV_HEADER: [&str; 14] = [
    "candidate_name",
    "session_id",
    "start_time",
    "end_time",
    "interview_duration_seconds",
    "focus_lost_count",
    "looking_away_count",
    "no_face_segments",
    "multiple_faces_count",
    "phone_detected_count",
    "notes_detected_count",
    "device_detected_count",
    "suspicious_events_count",
    "integrity_score",
];

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Report rendering errors.
#[derive(Debug, Error)]
pub enum ReportError {
    /// CSV writer failure.
    #[error("report encoding error: {0}")]
    Encoding(String),
}

// ============================================================================
// SECTION: Artifact Names
// ============================================================================

/// Report artifact formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    /// Styled HTML document.
    Html,
    /// Single-row CSV document.
    Csv,
}

impl ReportFormat {
    /// Returns the file extension without the leading dot.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Csv => "csv",
        }
    }

    /// Returns the MIME content type.
    #[must_use]
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Html => HTML_CONTENT_TYPE,
            Self::Csv => CSV_CONTENT_TYPE,
        }
    }

    /// Returns the storage key for a session's report in this format.
    #[must_use]
    pub fn artifact_name(self, session_id: &SessionId) -> String {
        format!("report_{session_id}.{}", self.extension())
    }
}

// ============================================================================
// SECTION: Report Summary
// ============================================================================

/// Flat report fields returned to API clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    /// Candidate display name.
    pub candidate_name: String,
    /// Session identifier.
    pub session_id: SessionId,
    /// Whole-second session duration.
    pub interview_duration_seconds: u64,
    /// Focus-lost count.
    pub focus_lost_count: u64,
    /// Looking-away count.
    pub looking_away_count: u64,
    /// No-face count.
    pub no_face_segments: u64,
    /// Multiple-faces count.
    pub multiple_faces_count: u64,
    /// Phone-detected count.
    pub phone_detected_count: u64,
    /// Notes-detected count.
    pub notes_detected_count: u64,
    /// Extra-device count.
    pub device_detected_count: u64,
    /// Sum of the suspicious-object categories.
    pub suspicious_events_count: u64,
    /// Integrity score in `[0, 100]`.
    pub integrity_score: IntegrityScore,
}

// ============================================================================
// SECTION: Session Report
// ============================================================================

/// Session with its derived counts and score.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    /// Reported session.
    pub session: Session,
    /// Per-category counts.
    pub counts: EventCounts,
    /// Derived integrity score.
    pub score: IntegrityScore,
}

impl SessionReport {
    /// Summarizes and scores the events of a session.
    #[must_use]
    pub fn build(session: Session, events: &[Event]) -> Self {
        let counts = summarize_events(events);
        let score = compute_integrity_score(&counts);
        Self {
            session,
            counts,
            score,
        }
    }

    /// Returns the flat report fields.
    #[must_use]
    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            candidate_name: self.session.candidate_name.clone(),
            session_id: self.session.id.clone(),
            interview_duration_seconds: self.session.duration_seconds(),
            focus_lost_count: self.counts.focus_lost,
            looking_away_count: self.counts.looking_away,
            no_face_segments: self.counts.no_face,
            multiple_faces_count: self.counts.multiple_faces,
            phone_detected_count: self.counts.phone_detected,
            notes_detected_count: self.counts.notes_detected,
            device_detected_count: self.counts.device_detected,
            suspicious_events_count: self.counts.suspicious_total(),
            integrity_score: self.score,
        }
    }

    /// Renders the HTML document.
    #[must_use]
    pub fn render_html(&self) -> String {
        render_html_report(&self.session, &self.counts, self.score)
    }

    /// Renders the CSV document.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Encoding`] when the CSV writer fails.
    pub fn render_csv(&self) -> Result<Vec<u8>, ReportError> {
        render_csv_report(&self.session, &self.counts, self.score)
    }
}

// ============================================================================
// SECTION: HTML Rendering
// ============================================================================

/// Renders a self-contained HTML report.
#[must_use]
pub fn render_html_report(session: &Session, counts: &EventCounts, score: IntegrityScore) -> String {
    let end_time = session.end_time.map(format_timestamp).unwrap_or_default();
    let items: String = counts
        .iter()
        .map(|(category, count)| format!("        <li>{}: {count}</li>\n", category.label()))
        .collect();
    format!(
        r"<!doctype html>
<html>
<head>
  <meta charset='utf-8' />
  <title>Proctoring Report</title>
  <style>
    body {{ font-family: Arial, sans-serif; padding: 24px; }}
    h1 {{ margin-top: 0; }}
    .grid {{ display: grid; grid-template-columns: 240px 1fr; gap: 8px 16px; }}
    .card {{ border: 1px solid #e5e7eb; border-radius: 8px; padding: 16px; margin-top: 16px; }}
  </style>
</head>
<body>
  <h1>Proctoring Report</h1>
  <div class='grid'>
    <div><strong>Candidate Name</strong></div><div>{candidate}</div>
    <div><strong>Session ID</strong></div><div>{session_id}</div>
    <div><strong>Start Time</strong></div><div>{start}</div>
    <div><strong>End Time</strong></div><div>{end}</div>
    <div><strong>Duration (s)</strong></div><div>{duration}</div>
    <div><strong>Integrity Score</strong></div><div>{score}</div>
  </div>
  <div class='card'>
    <h3>Event Summary</h3>
    <ul>
{items}    </ul>
  </div>
</body>
</html>
",
        candidate = escape_html(&session.candidate_name),
        session_id = escape_html(session.id.as_str()),
        start = escape_html(&format_timestamp(session.start_time)),
        end = escape_html(&end_time),
        duration = session.duration_seconds(),
    )
}

/// Escapes text for inclusion in HTML element content and attributes.
fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

// ============================================================================
// SECTION: CSV Rendering
// ============================================================================

/// Renders a CSV report with a header row and one data row.
///
/// # Errors
///
/// Returns [`ReportError::Encoding`] when the CSV writer fails.
pub fn render_csv_report(
    session: &Session,
    counts: &EventCounts,
    score: IntegrityScore,
) -> Result<Vec<u8>, ReportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADER).map_err(|err| ReportError::Encoding(err.to_string()))?;

    let mut row = vec![
        session.candidate_name.clone(),
        session.id.to_string(),
        format_timestamp(session.start_time),
        session.end_time.map(format_timestamp).unwrap_or_default(),
        session.duration_seconds().to_string(),
    ];
    row.extend(EventCategory::ALL.into_iter().map(|category| counts.get(category).to_string()));
    row.push(counts.suspicious_total().to_string());
    row.push(score.to_string());

    writer.write_record(&row).map_err(|err| ReportError::Encoding(err.to_string()))?;
    writer.into_inner().map_err(|err| ReportError::Encoding(err.to_string()))
}

#[cfg(test)]
mod tests;
