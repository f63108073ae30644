//! Scoring property-based tests.
//!
//! ## Purpose
//! These tests exercise the summarizer and integrity scorer with randomized
//! event logs and counts to prove boundedness and monotonicity.
//!
//! ## What is covered
//! - Counted totals never exceed the number of events.
//! - Totals equal the event count when every event type is a category tag.
//! - Scores stay within `[0, 100]` and never rise when a count rises.
// crates/proctor-core/tests/proptest_scoring.rs
// ============================================================================
// Module: Scoring Property-Based Tests
// Description: Randomized checks for summarization and scoring.
// Purpose: Ensure scoring is bounded, monotone, and ignores unknown tags.
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

use proctor_core::Event;
use proctor_core::EventCategory;
use proctor_core::EventCounts;
use proctor_core::SessionId;
use proctor_core::compute_integrity_score;
use proctor_core::summarize_events;
use proptest::prelude::*;

fn event_type_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        (0_usize..7).prop_map(|index| EventCategory::ALL[index].as_str().to_string()),
        "[a-z_]{1,16}",
    ]
}

fn category_strategy() -> impl Strategy<Value = EventCategory> {
    (0_usize..7).prop_map(|index| EventCategory::ALL[index])
}

fn counts_strategy() -> impl Strategy<Value = EventCounts> {
    proptest::collection::vec(0_u64..1_000, 7).prop_map(|values| {
        let mut counts = EventCounts::default();
        for (category, value) in EventCategory::ALL.into_iter().zip(values) {
            counts.add(category, value);
        }
        counts
    })
}

fn events_for(types: &[String]) -> Vec<Event> {
    let session_id = SessionId::new("prop");
    types.iter().map(|kind| Event::new(session_id.clone(), kind.clone(), None, None)).collect()
}

proptest! {
    #[test]
    fn summarized_total_never_exceeds_event_count(
        types in proptest::collection::vec(event_type_strategy(), 0..64)
    ) {
        let events = events_for(&types);
        let counts = summarize_events(&events);
        let total = usize::try_from(counts.total()).unwrap();
        prop_assert!(total <= events.len());

        let all_known = types.iter().all(|kind| EventCategory::parse(kind).is_some());
        prop_assert_eq!(total == events.len(), all_known);
    }

    #[test]
    fn score_is_bounded(counts in counts_strategy()) {
        let score = compute_integrity_score(&counts).value();
        prop_assert!(score <= 100);
    }

    #[test]
    fn score_is_non_increasing_per_category(
        counts in counts_strategy(),
        category in category_strategy(),
        extra in 0_u64..100,
    ) {
        let before = compute_integrity_score(&counts);
        let mut bumped = counts;
        bumped.add(category, extra);
        let after = compute_integrity_score(&bumped);
        prop_assert!(after <= before);
    }

    #[test]
    fn summarization_ignores_order(
        types in proptest::collection::vec(event_type_strategy(), 0..32)
    ) {
        let events = events_for(&types);
        let mut reversed = events.clone();
        reversed.reverse();
        prop_assert_eq!(summarize_events(&events), summarize_events(&reversed));
    }
}
