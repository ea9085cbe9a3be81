//! Feed timestamp handling.
//!
//! The feed stamps every row with `YYYY-MM-DD HH:mm:ss` plus a nanosecond
//! fraction (nine digits). This module owns the single parse path for that
//! format, the trailing-window arithmetic used for metric cutoffs, and
//! calendar-date extraction for day-rollover detection.
//!
//! Parsing is fallible per item and callers are expected to skip-and-continue
//! on failure; nothing in the replay loop treats a bad timestamp as fatal.

use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::error::{ReplayError, Result};

/// Feed timestamp format. `%.f` accepts the nine-digit nanosecond fraction
/// (and tolerates shorter or absent fractions).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Parse a feed timestamp string into a comparable instant.
pub fn parse_timestamp(text: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT).map_err(|source| {
        ReplayError::Timestamp {
            text: text.to_string(),
            source,
        }
    })
}

/// The earliest instant still inside a trailing window of `minutes` ending
/// at `instant`.
pub fn window_cutoff(instant: NaiveDateTime, minutes: i64) -> NaiveDateTime {
    instant - Duration::minutes(minutes)
}

/// Calendar date of an instant, as stamped by the source (no timezone
/// normalization).
pub fn calendar_date(instant: NaiveDateTime) -> NaiveDate {
    instant.date()
}
