// crates/mobility-lake-core/src/core/time.rs
// ============================================================================
// Module: Mobility Lake Time Helpers
// Description: Clocks, date-time parsing, and timestamp formatting.
// Purpose: Keep wall-clock reads injectable and parsing rules in one place.
// Dependencies: time
// ============================================================================

//! ## Overview
//! Runtime components never call the system clock directly; they receive a
//! [`Clock`]. Dataset timestamps are naive date-times ([`PrimitiveDateTime`])
//! stored with microsecond precision. Governance records carry UTC
//! [`OffsetDateTime`] values serialized as RFC 3339.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::atomic::AtomicI64;
use std::sync::atomic::Ordering;

use time::Date;
use time::Duration;
use time::OffsetDateTime;
use time::PrimitiveDateTime;
use time::UtcOffset;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;

// ============================================================================
// SECTION: Clocks
// ============================================================================

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Returns the current UTC time.
    fn now(&self) -> OffsetDateTime;
}

/// Clock backed by the operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Manually advanced clock for deterministic tests and replays.
#[derive(Debug)]
pub struct FixedClock {
    /// Current time in unix milliseconds.
    millis: AtomicI64,
}

impl FixedClock {
    /// Creates a clock frozen at `start`.
    #[must_use]
    pub fn new(start: OffsetDateTime) -> Self {
        Self {
            millis: AtomicI64::new(unix_millis(start)),
        }
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        let step = i64::try_from(by.whole_milliseconds()).unwrap_or(i64::MAX);
        self.millis.fetch_add(step, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> OffsetDateTime {
        from_unix_millis(self.millis.load(Ordering::SeqCst))
    }
}

// ============================================================================
// SECTION: Conversions
// ============================================================================

/// Returns unix milliseconds for a UTC instant.
#[must_use]
pub fn unix_millis(value: OffsetDateTime) -> i64 {
    i64::try_from(value.unix_timestamp_nanos() / 1_000_000).unwrap_or(i64::MAX)
}

/// Builds a UTC instant from unix milliseconds, clamping to the epoch on overflow.
#[must_use]
pub fn from_unix_millis(millis: i64) -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000)
        .unwrap_or(OffsetDateTime::UNIX_EPOCH)
}

/// Returns microseconds since the epoch for a naive date-time read as UTC.
#[must_use]
pub fn to_unix_micros(value: PrimitiveDateTime) -> Option<i64> {
    i64::try_from(value.assume_utc().unix_timestamp_nanos() / 1_000).ok()
}

/// Builds a naive date-time from microseconds since the epoch.
#[must_use]
pub fn from_unix_micros(micros: i64) -> Option<PrimitiveDateTime> {
    let instant = OffsetDateTime::from_unix_timestamp_nanos(i128::from(micros) * 1_000).ok()?;
    Some(PrimitiveDateTime::new(instant.date(), instant.time()))
}

/// Weekday index with Monday as zero.
#[must_use]
pub fn weekday_index(date: Date) -> i64 {
    i64::from(date.weekday().number_days_from_monday())
}

// ============================================================================
// SECTION: Parsing
// ============================================================================

/// Parses the date-time forms found in raw mobility files.
///
/// Accepts `YYYY-MM-DD HH:MM[:SS[.fff]]` with a space or `T` separator,
/// RFC 3339 with an offset (converted to UTC), `DD/MM/YYYY HH:MM[:SS]`, and
/// bare dates (midnight). Returns `None` for anything else.
#[must_use]
pub fn parse_datetime(value: &str) -> Option<PrimitiveDateTime> {
    let value = value.trim();
    let naive = PrimitiveDateTime::parse(
        value,
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
    )
    .or_else(|_| {
        PrimitiveDateTime::parse(
            value,
            format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
        )
    })
    .or_else(|_| {
        PrimitiveDateTime::parse(
            value,
            format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]"),
        )
    })
    .or_else(|_| {
        PrimitiveDateTime::parse(
            value,
            format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]"),
        )
    })
    .or_else(|_| {
        PrimitiveDateTime::parse(value, format_description!("[year]-[month]-[day] [hour]:[minute]"))
    })
    .or_else(|_| {
        PrimitiveDateTime::parse(value, format_description!("[year]-[month]-[day]T[hour]:[minute]"))
    })
    .or_else(|_| {
        PrimitiveDateTime::parse(
            value,
            format_description!("[day]/[month]/[year] [hour]:[minute]:[second]"),
        )
    })
    .or_else(|_| {
        PrimitiveDateTime::parse(value, format_description!("[day]/[month]/[year] [hour]:[minute]"))
    });
    if let Ok(parsed) = naive {
        return Some(parsed);
    }
    if let Ok(instant) = OffsetDateTime::parse(value, &Rfc3339) {
        let utc = instant.to_offset(UtcOffset::UTC);
        return Some(PrimitiveDateTime::new(utc.date(), utc.time()));
    }
    Date::parse(value, format_description!("[year]-[month]-[day]"))
        .or_else(|_| Date::parse(value, format_description!("[day]/[month]/[year]")))
        .ok()
        .map(Date::midnight)
}

// ============================================================================
// SECTION: Formatting
// ============================================================================

/// Formats a naive date-time as `YYYY-MM-DD HH:MM:SS`.
#[must_use]
pub fn format_datetime(value: PrimitiveDateTime) -> String {
    value
        .format(format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"))
        .unwrap_or_else(|_| value.to_string())
}

/// Formats an instant as a sortable `YYYYmmddHHMMSSmmm` key stamp.
#[must_use]
pub fn key_stamp(value: OffsetDateTime) -> String {
    let utc = value.to_offset(UtcOffset::UTC);
    utc.format(format_description!(
        "[year][month][day][hour][minute][second][subsecond digits:3]"
    ))
    .unwrap_or_else(|_| unix_millis(utc).to_string())
}

/// Formats an instant as a `YYYYmmdd` date stamp.
#[must_use]
pub fn date_stamp(value: OffsetDateTime) -> String {
    let utc = value.to_offset(UtcOffset::UTC);
    utc.format(format_description!("[year][month][day]"))
        .unwrap_or_else(|_| unix_millis(utc).to_string())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, reason = "Test-only assertions.")]

    use time::macros::datetime;

    use super::*;

    #[test]
    fn parses_space_and_t_separated_forms() {
        let expected = datetime!(2024-03-15 08:00:00);
        assert_eq!(parse_datetime("2024-03-15 08:00:00"), Some(expected));
        assert_eq!(parse_datetime("2024-03-15T08:00:00"), Some(expected));
        assert_eq!(parse_datetime("2024-03-15 08:00"), Some(expected));
        assert_eq!(parse_datetime("15/03/2024 08:00"), Some(expected));
    }

    #[test]
    fn parses_offsets_into_utc() {
        let parsed = parse_datetime("2024-03-15T10:00:00+02:00").unwrap();
        assert_eq!(parsed, datetime!(2024-03-15 08:00:00));
    }

    #[test]
    fn parses_bare_dates_as_midnight() {
        assert_eq!(parse_datetime("2024-03-15"), Some(datetime!(2024-03-15 00:00:00)));
        assert_eq!(parse_datetime("yesterday"), None);
    }

    #[test]
    fn micros_round_trip() {
        let value = datetime!(2024-03-15 08:30:15.250);
        let micros = to_unix_micros(value).unwrap();
        assert_eq!(from_unix_micros(micros), Some(value));
    }

    #[test]
    fn key_stamp_sorts_chronologically() {
        let earlier = key_stamp(datetime!(2024-03-15 08:00:00.5 UTC));
        let later = key_stamp(datetime!(2024-03-15 08:00:01 UTC));
        assert_eq!(earlier, "20240315080000500");
        assert!(earlier < later);
    }

    #[test]
    fn fixed_clock_advances() {
        let clock = FixedClock::new(datetime!(2024-01-01 00:00:00 UTC));
        clock.advance(Duration::seconds(90));
        assert_eq!(clock.now(), datetime!(2024-01-01 00:01:30 UTC));
    }
}
