// crates/proctor-core/tests/scoring_scenarios.rs
// ============================================================================
// Module: Scoring Scenario Tests
// Description: Concrete event logs with known integrity outcomes.
// Purpose: Pin category weights, clamping, and duration derivation.
// ============================================================================

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::collections::BTreeMap;

use proctor_core::Event;
use proctor_core::EventCategory;
use proctor_core::Session;
use proctor_core::SessionId;
use proctor_core::compute_integrity_score;
use proctor_core::score_from_raw_counts;
use proctor_core::session_duration_seconds;
use proctor_core::summarize_events;
use time::Duration;
use time::macros::datetime;

fn events(kinds: &[&str]) -> Vec<Event> {
    let session_id = SessionId::new("scenario");
    kinds.iter().map(|kind| Event::new(session_id.clone(), *kind, None, None)).collect()
}

#[test]
fn focus_and_phone_events_score_86() {
    let counts = summarize_events(&events(&["focus_lost", "focus_lost", "phone_detected"]));
    assert_eq!(counts.focus_lost, 2);
    assert_eq!(counts.phone_detected, 1);
    assert_eq!(counts.total(), 3);
    assert_eq!(compute_integrity_score(&counts).value(), 86);
}

#[test]
fn twelve_missing_faces_score_40() {
    let counts = summarize_events(&events(&["no_face"; 12]));
    assert_eq!(compute_integrity_score(&counts).value(), 40);
}

#[test]
fn many_multiple_faces_clamp_to_zero() {
    let counts = summarize_events(&events(&["multiple_faces"; 25]));
    assert_eq!(compute_integrity_score(&counts).value(), 0);
}

#[test]
fn unknown_event_types_are_not_scored() {
    let counts = summarize_events(&events(&["tab_switch", "FOCUS_LOST", "audio_spike"]));
    assert_eq!(counts.total(), 0);
    assert_eq!(compute_integrity_score(&counts).value(), 100);
}

#[test]
fn weights_match_category_table() {
    let expected = [
        (EventCategory::FocusLost, 2),
        (EventCategory::LookingAway, 2),
        (EventCategory::NoFace, 5),
        (EventCategory::MultipleFaces, 10),
        (EventCategory::PhoneDetected, 10),
        (EventCategory::NotesDetected, 5),
        (EventCategory::DeviceDetected, 8),
    ];
    for (category, weight) in expected {
        assert_eq!(category.weight(), weight, "{category}");
        let mut raw = BTreeMap::new();
        raw.insert(category.as_str(), 1_u64);
        assert_eq!(u32::from(score_from_raw_counts(&raw).value()), 100 - weight);
    }
}

#[test]
fn duration_for_ended_and_live_sessions() {
    let start = datetime!(2024-01-15 08:00:00 UTC);
    assert_eq!(session_duration_seconds(start, Some(start + Duration::seconds(125))), 125);
    assert_eq!(session_duration_seconds(start, None), 0);

    let session = Session::start_at(SessionId::new("d"), "Ada", start);
    assert_eq!(session.duration_seconds(), 0);
}
