// crates/proctor-core/src/core/time.rs
// ============================================================================
// Module: Proctor Time Helpers
// Description: UTC timestamp helpers shared by stores and renderers.
// Purpose: Keep timestamp formatting identical across wire, storage, and reports.
// Dependencies: thiserror, time
// ============================================================================

//! ## Overview
//! All timestamps are UTC [`OffsetDateTime`] values rendered as RFC 3339. The
//! record stores persist the same text form that reports display, so a value
//! read back from `SQLite` renders byte-identically to the value written.
//!
//! Only instants whose UTC form falls in years `0000..=9999` can be written as
//! RFC 3339. [`storable_timestamp`] is the gate every write path goes through;
//! a value it accepts always formats and parses back to the same instant.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;
use time::OffsetDateTime;
use time::PrimitiveDateTime;
use time::UtcOffset;
use time::format_description::BorrowedFormatItem;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Earliest UTC year representable in RFC 3339.
pub const MIN_TIMESTAMP_YEAR: i32 = 0;
/// Latest UTC year representable in RFC 3339.
pub const MAX_TIMESTAMP_YEAR: i32 = 9999;

/// ISO 8601 date-time without an offset, read as UTC.
const NAIVE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!(
    "[year]-[month]-[day]T[hour]:[minute]:[second][optional [.[subsecond]]]"
);

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Timestamp parsing and range errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimestampError {
    /// Input is neither RFC 3339 nor an offset-free ISO 8601 date-time.
    #[error("invalid timestamp: {0}")]
    Malformed(String),
    /// Instant falls outside the storable UTC year range.
    #[error("timestamp out of range: {0}")]
    OutOfRange(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the current wall-clock time in UTC.
#[must_use]
pub fn now_utc() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}

/// Normalizes a timestamp to UTC and checks it can be stored.
///
/// # Errors
///
/// Returns [`TimestampError::OutOfRange`] when the UTC year falls outside
/// [`MIN_TIMESTAMP_YEAR`]..=[`MAX_TIMESTAMP_YEAR`].
pub fn storable_timestamp(value: OffsetDateTime) -> Result<OffsetDateTime, TimestampError> {
    let utc = value
        .checked_to_offset(UtcOffset::UTC)
        .ok_or_else(|| TimestampError::OutOfRange(format!("{value} has no UTC equivalent")))?;
    if (MIN_TIMESTAMP_YEAR ..= MAX_TIMESTAMP_YEAR).contains(&utc.year()) {
        Ok(utc)
    } else {
        Err(TimestampError::OutOfRange(format!(
            "UTC year {} outside {MIN_TIMESTAMP_YEAR}..={MAX_TIMESTAMP_YEAR}",
            utc.year()
        )))
    }
}

/// Formats a timestamp as RFC 3339 in UTC.
///
/// Values rejected by [`storable_timestamp`] never reach storage; for display
/// they are rendered in their own offset, or as unix seconds when even that
/// is not representable.
#[must_use]
pub fn format_timestamp(value: OffsetDateTime) -> String {
    let formatted = match storable_timestamp(value) {
        Ok(utc) => utc.format(&Rfc3339),
        Err(_) => value.format(&Rfc3339),
    };
    formatted.unwrap_or_else(|_| value.unix_timestamp().to_string())
}

/// Parses an RFC 3339 timestamp and normalizes it to UTC.
///
/// # Errors
///
/// Returns [`TimestampError`] when the input is not RFC 3339 or its UTC form
/// is out of range.
pub fn parse_timestamp(value: &str) -> Result<OffsetDateTime, TimestampError> {
    let parsed = OffsetDateTime::parse(value, &Rfc3339)
        .map_err(|err| TimestampError::Malformed(err.to_string()))?;
    storable_timestamp(parsed)
}

/// Parses a client-supplied timestamp.
///
/// RFC 3339 input keeps its offset; an ISO 8601 date-time without an offset
/// is taken as UTC.
///
/// # Errors
///
/// Returns [`TimestampError`] when the input matches neither form or its UTC
/// form is out of range.
pub fn parse_client_timestamp(value: &str) -> Result<OffsetDateTime, TimestampError> {
    match OffsetDateTime::parse(value, &Rfc3339) {
        Ok(parsed) => storable_timestamp(parsed),
        Err(rfc_err) => PrimitiveDateTime::parse(value, NAIVE_FORMAT)
            .map(PrimitiveDateTime::assume_utc)
            .map_err(|_| TimestampError::Malformed(rfc_err.to_string()))
            .and_then(storable_timestamp),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, reason = "Test-only assertions.")]

    use time::OffsetDateTime;
    use time::format_description::well_known::Rfc3339;
    use time::macros::datetime;

    use super::TimestampError;
    use super::format_timestamp;
    use super::parse_client_timestamp;
    use super::parse_timestamp;
    use super::storable_timestamp;

    #[test]
    fn format_then_parse_preserves_instant() {
        let value = datetime!(2024-03-01 09:30:15.250 UTC);
        let text = format_timestamp(value);
        assert_eq!(text, "2024-03-01T09:30:15.25Z");
        assert_eq!(parse_timestamp(&text).expect("parse"), value);
    }

    #[test]
    fn parse_normalizes_offsets_to_utc() {
        let parsed = parse_timestamp("2024-03-01T11:30:00+02:00").expect("parse");
        assert_eq!(parsed, datetime!(2024-03-01 09:30:00 UTC));
        assert_eq!(format_timestamp(parsed), "2024-03-01T09:30:00Z");
    }

    #[test]
    fn parse_rejects_non_rfc3339() {
        assert!(matches!(parse_timestamp("01/03/2024"), Err(TimestampError::Malformed(_))));
    }

    #[test]
    fn range_edges_are_storable() {
        let early = parse_timestamp("0000-01-01T00:00:00Z").expect("earliest");
        let late = parse_timestamp("9999-12-31T23:59:59.999999999Z").expect("latest");
        assert_eq!(parse_timestamp(&format_timestamp(early)).expect("reparse"), early);
        assert_eq!(parse_timestamp(&format_timestamp(late)).expect("reparse"), late);
    }

    #[test]
    fn offsets_crossing_year_bounds_are_rejected() {
        assert!(matches!(
            parse_timestamp("9999-12-31T23:30:00-01:00"),
            Err(TimestampError::OutOfRange(_))
        ));
        assert!(matches!(
            parse_timestamp("0000-01-01T00:30:00+01:00"),
            Err(TimestampError::OutOfRange(_))
        ));
    }

    #[test]
    fn out_of_range_values_still_format() {
        let late = OffsetDateTime::parse("9999-12-31T23:30:00-01:00", &Rfc3339).expect("parse");
        assert!(storable_timestamp(late).is_err());
        assert_eq!(format_timestamp(late), "9999-12-31T23:30:00-01:00");
    }

    #[test]
    fn client_timestamps_without_offset_are_utc() {
        let parsed = parse_client_timestamp("2024-03-01T09:30:15.5").expect("naive");
        assert_eq!(parsed, datetime!(2024-03-01 09:30:15.5 UTC));
        let plain = parse_client_timestamp("2024-03-01T09:30:15").expect("naive");
        assert_eq!(plain, datetime!(2024-03-01 09:30:15 UTC));
        let offset = parse_client_timestamp("2024-03-01T11:30:15+02:00").expect("offset");
        assert_eq!(offset, datetime!(2024-03-01 09:30:15 UTC));
    }

    #[test]
    fn client_timestamps_reject_garbage_and_out_of_range() {
        assert!(matches!(parse_client_timestamp("yesterday"), Err(TimestampError::Malformed(_))));
        assert!(matches!(
            parse_client_timestamp("9999-12-31T23:30:00-01:00"),
            Err(TimestampError::OutOfRange(_))
        ));
    }
}
