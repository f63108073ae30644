// crates/proctor-core/src/scoring.rs
// ============================================================================
// Module: Proctor Scoring
// Description: Event summarization and integrity scoring.
// Purpose: Reduce a session's event log to category counts and a bounded score.
// Dependencies: crate::core::event, serde
// ============================================================================

//! ## Overview
//! Summarization counts events per [`EventCategory`] using exact tag matches;
//! unrecognized tags are skipped. The integrity score starts at 100, subtracts
//! each category's count multiplied by its weight, and clamps to `[0, 100]`.
//! Both functions are pure and deterministic.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::event::Event;
use crate::core::event::EventCategory;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Score assigned to a session with no penalized events.
pub const MAX_INTEGRITY_SCORE: u8 = 100;

// ============================================================================
// SECTION: Event Counts
// ============================================================================

/// Per-category event counts for a single session.
///
/// # Invariants
/// - Always holds a count for every [`EventCategory`]; absent categories are zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCounts {
    /// Focus-lost events.
    #[serde(default)]
    pub focus_lost: u64,
    /// Looking-away events.
    #[serde(default)]
    pub looking_away: u64,
    /// No-face events.
    #[serde(default)]
    pub no_face: u64,
    /// Multiple-faces events.
    #[serde(default)]
    pub multiple_faces: u64,
    /// Phone-detected events.
    #[serde(default)]
    pub phone_detected: u64,
    /// Notes-detected events.
    #[serde(default)]
    pub notes_detected: u64,
    /// Extra-device events.
    #[serde(default)]
    pub device_detected: u64,
}

impl EventCounts {
    /// Returns the count for a category.
    #[must_use]
    pub const fn get(&self, category: EventCategory) -> u64 {
        match category {
            EventCategory::FocusLost => self.focus_lost,
            EventCategory::LookingAway => self.looking_away,
            EventCategory::NoFace => self.no_face,
            EventCategory::MultipleFaces => self.multiple_faces,
            EventCategory::PhoneDetected => self.phone_detected,
            EventCategory::NotesDetected => self.notes_detected,
            EventCategory::DeviceDetected => self.device_detected,
        }
    }

    /// Returns a mutable reference to the count for a category.
    const fn slot_mut(&mut self, category: EventCategory) -> &mut u64 {
        match category {
            EventCategory::FocusLost => &mut self.focus_lost,
            EventCategory::LookingAway => &mut self.looking_away,
            EventCategory::NoFace => &mut self.no_face,
            EventCategory::MultipleFaces => &mut self.multiple_faces,
            EventCategory::PhoneDetected => &mut self.phone_detected,
            EventCategory::NotesDetected => &mut self.notes_detected,
            EventCategory::DeviceDetected => &mut self.device_detected,
        }
    }

    /// Adds `amount` occurrences to a category, saturating at `u64::MAX`.
    pub const fn add(&mut self, category: EventCategory, amount: u64) {
        let slot = self.slot_mut(category);
        *slot = slot.saturating_add(amount);
    }

    /// Iterates over all categories and their counts in report order.
    pub fn iter(&self) -> impl Iterator<Item = (EventCategory, u64)> + '_ {
        EventCategory::ALL.into_iter().map(|category| (category, self.get(category)))
    }

    /// Returns the total number of counted events.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.iter().fold(0_u64, |acc, (_, count)| acc.saturating_add(count))
    }

    /// Returns the aggregate of suspicious-object categories.
    #[must_use]
    pub fn suspicious_total(&self) -> u64 {
        self.iter()
            .filter(|(category, _)| category.is_suspicious())
            .fold(0_u64, |acc, (_, count)| acc.saturating_add(count))
    }

    /// Returns the counts as a tag-keyed map containing all seven categories.
    #[must_use]
    pub fn to_map(&self) -> BTreeMap<&'static str, u64> {
        self.iter().map(|(category, count)| (category.as_str(), count)).collect()
    }
}

// ============================================================================
// SECTION: Integrity Score
// ============================================================================

/// Integrity score in the closed range `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IntegrityScore(u8);

impl IntegrityScore {
    /// Perfect score.
    pub const MAX: Self = Self(MAX_INTEGRITY_SCORE);

    /// Returns the numeric score.
    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Builds a score from a penalty total.
    fn from_penalty(penalty: u64) -> Self {
        let remaining = u64::from(MAX_INTEGRITY_SCORE).saturating_sub(penalty);
        Self(u8::try_from(remaining).unwrap_or(0))
    }
}

impl fmt::Display for IntegrityScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ============================================================================
// SECTION: Operations
// ============================================================================

/// Counts events per category.
///
/// Events whose `event_type` is not an exact category tag are ignored, so the
/// total never exceeds the number of events. Input order is irrelevant.
#[must_use]
pub fn summarize_events<'a, I>(events: I) -> EventCounts
where
    I: IntoIterator<Item = &'a Event>,
{
    let mut counts = EventCounts::default();
    for event in events {
        if let Some(category) = event.category() {
            counts.add(category, 1);
        }
    }
    counts
}

/// Computes the integrity score from category counts.
#[must_use]
pub fn compute_integrity_score(counts: &EventCounts) -> IntegrityScore {
    let penalty = counts.iter().fold(0_u64, |acc, (category, count)| {
        acc.saturating_add(count.saturating_mul(u64::from(category.weight())))
    });
    IntegrityScore::from_penalty(penalty)
}

/// Computes the integrity score from a raw tag-to-count map.
///
/// Keys that are not category tags contribute nothing.
#[must_use]
pub fn score_from_raw_counts<K>(raw: &BTreeMap<K, u64>) -> IntegrityScore
where
    K: AsRef<str> + Ord,
{
    let mut counts = EventCounts::default();
    for (key, count) in raw {
        if let Some(category) = EventCategory::parse(key.as_ref()) {
            counts.add(category, *count);
        }
    }
    compute_integrity_score(&counts)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::EventCounts;
    use super::compute_integrity_score;
    use super::score_from_raw_counts;
    use crate::core::event::EventCategory;

    #[test]
    fn empty_counts_score_full_marks() {
        assert_eq!(compute_integrity_score(&EventCounts::default()).value(), 100);
    }

    #[test]
    fn saturating_counts_do_not_overflow() {
        let mut counts = EventCounts::default();
        counts.add(EventCategory::PhoneDetected, u64::MAX);
        counts.add(EventCategory::PhoneDetected, 5);
        assert_eq!(counts.phone_detected, u64::MAX);
        assert_eq!(compute_integrity_score(&counts).value(), 0);
    }

    #[test]
    fn raw_counts_ignore_unknown_keys() {
        let mut raw = BTreeMap::new();
        raw.insert("focus_lost".to_string(), 3);
        raw.insert("tab_switch".to_string(), 40);
        assert_eq!(score_from_raw_counts(&raw).value(), 94);
    }

    #[test]
    fn to_map_always_has_seven_keys() {
        let map = EventCounts::default().to_map();
        assert_eq!(map.len(), 7);
        assert!(map.values().all(|count| *count == 0));
    }
}
