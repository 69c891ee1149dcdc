// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for calendar arithmetic and date formatting.
//!
//! All calendar boundaries (days, months) are computed in UTC.

use chrono::{DateTime, Datelike, Duration, NaiveDate, SecondsFormat, TimeZone, Utc};

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Format a day as `YYYY-MM-DD`.
pub fn format_day(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

/// Parse a `YYYY-MM-DD` day.
pub fn parse_day(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

/// Long human form used by the history search, e.g. `January 5, 2025`.
pub fn format_long_day(day: NaiveDate) -> String {
    day.format("%B %-d, %Y").to_string()
}

/// Inclusive `[start, end]` bounds of a calendar day.
///
/// The end is the last representable nanosecond of the day, matching an
/// "end of day" filter used with `<=`. `None` for the last representable day.
pub fn day_window(day: NaiveDate) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let start = Utc.from_utc_datetime(&day.and_time(chrono::NaiveTime::MIN));
    let end = start
        .checked_add_signed(Duration::days(1))?
        .checked_sub_signed(Duration::nanoseconds(1))?;
    Some((start, end))
}

/// Whether two instants fall in different calendar months.
pub fn is_different_month(a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
    a.year() != b.year() || a.month() != b.month()
}

/// First instant of the month following `now`.
pub fn start_of_next_month(now: DateTime<Utc>) -> DateTime<Utc> {
    let (year, month) = if now.month() == 12 {
        (now.year() + 1, 1)
    } else {
        (now.year(), now.month() + 1)
    };
    Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0)
        .single()
        .unwrap_or(now)
}
