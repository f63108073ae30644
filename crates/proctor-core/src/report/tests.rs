// crates/proctor-core/src/report/tests.rs
// ============================================================================
// Module: Report Rendering Tests
// Description: Unit tests for report summaries and HTML/CSV rendering.
// Purpose: Validate field derivation, escaping, and deterministic output.
// Dependencies: crate::report
// ============================================================================

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions and helpers are permitted."
)]

use time::Duration;
use time::macros::datetime;

use super::CSV_HEADER;
use super::ReportFormat;
use super::SessionReport;
use crate::core::event::Event;
use crate::core::identifiers::SessionId;
use crate::core::session::Session;

fn ended_session() -> Session {
    let start = datetime!(2024-06-10 14:00:00 UTC);
    let mut session = Session::start_at(SessionId::new("sess-42"), "Grace Hopper", start);
    session.end(start + Duration::seconds(125));
    session
}

fn event(session: &Session, event_type: &str) -> Event {
    Event::new(session.id.clone(), event_type, None, Some(session.start_time))
}

#[test]
fn summary_reflects_counts_and_score() {
    let session = ended_session();
    let events = vec![
        event(&session, "focus_lost"),
        event(&session, "focus_lost"),
        event(&session, "phone_detected"),
        event(&session, "notes_detected"),
        event(&session, "unknown_signal"),
    ];
    let summary = SessionReport::build(session, &events).summary();

    assert_eq!(summary.candidate_name, "Grace Hopper");
    assert_eq!(summary.interview_duration_seconds, 125);
    assert_eq!(summary.focus_lost_count, 2);
    assert_eq!(summary.phone_detected_count, 1);
    assert_eq!(summary.notes_detected_count, 1);
    assert_eq!(summary.suspicious_events_count, 2);
    assert_eq!(summary.integrity_score.value(), 81);
}

#[test]
fn html_lists_every_category_label() {
    let report = SessionReport::build(ended_session(), &[]);
    let html = report.render_html();

    for label in [
        "Focus lost: 0",
        "Looking away: 0",
        "No face: 0",
        "Multiple faces: 0",
        "Phone detected: 0",
        "Notes detected: 0",
        "Extra device detected: 0",
    ] {
        assert!(html.contains(label), "missing {label}");
    }
    assert!(html.contains("        <li>Focus lost: 0</li>\n        <li>Looking away: 0</li>\n"));
    assert_eq!(html.matches("<li>").count(), 7);
    assert!(html.contains("<div>2024-06-10T14:02:05Z</div>"));
    assert!(html.contains("<div>125</div>"));
    assert!(html.contains("<div>100</div>"));
}

#[test]
fn html_escapes_candidate_name() {
    let start = datetime!(2024-06-10 14:00:00 UTC);
    let session = Session::start_at(SessionId::new("s"), "<script>alert('x')</script>", start);
    let html = SessionReport::build(session, &[]).render_html();
    assert!(!html.contains("<script>"));
    assert!(html.contains("&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt;"));
}

#[test]
fn html_leaves_end_time_blank_when_live() {
    let start = datetime!(2024-06-10 14:00:00 UTC);
    let session = Session::start_at(SessionId::new("live"), "Ada", start);
    let html = SessionReport::build(session, &[]).render_html();
    assert!(html.contains("<div><strong>End Time</strong></div><div></div>"));
    assert!(html.contains("<div><strong>Duration (s)</strong></div><div>0</div>"));
}

#[test]
fn csv_has_header_and_single_row() {
    let session = ended_session();
    let events = vec![event(&session, "multiple_faces"), event(&session, "device_detected")];
    let csv = SessionReport::build(session, &events).render_csv().expect("render csv");
    let text = String::from_utf8(csv).expect("utf8");
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], CSV_HEADER.join(","));
    assert_eq!(
        lines[1],
        "Grace Hopper,sess-42,2024-06-10T14:00:00Z,2024-06-10T14:02:05Z,125,0,0,0,1,0,0,1,2,82"
    );
}

#[test]
fn csv_quotes_fields_with_commas() {
    let start = datetime!(2024-06-10 14:00:00 UTC);
    let session = Session::start_at(SessionId::new("q"), "Hopper, Grace", start);
    let csv = SessionReport::build(session, &[]).render_csv().expect("render csv");
    let text = String::from_utf8(csv).expect("utf8");
    assert!(text.contains("\"Hopper, Grace\",q,"));
}

#[test]
fn rendering_is_deterministic() {
    let session = ended_session();
    let events = vec![event(&session, "no_face"), event(&session, "looking_away")];
    let first = SessionReport::build(session.clone(), &events);
    let second = SessionReport::build(session, &events);
    assert_eq!(first.render_html(), second.render_html());
    assert_eq!(first.render_csv().expect("csv"), second.render_csv().expect("csv"));
}

#[test]
fn artifact_names_follow_format() {
    let id = SessionId::new("abc");
    assert_eq!(ReportFormat::Html.artifact_name(&id), "report_abc.html");
    assert_eq!(ReportFormat::Csv.artifact_name(&id), "report_abc.csv");
    assert_eq!(ReportFormat::Csv.content_type(), "text/csv");
}
