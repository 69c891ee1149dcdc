//! Conversation-history helpers.

use chrono::{DateTime, NaiveDate, Utc};

use crate::time_utils::format_long_day;

/// Distinct days that have messages, newest first.
///
/// `today` is left out because the current conversation is shown separately.
/// `search` matches case-insensitively against the long form
/// (`January 5, 2025`).
pub fn group_chat_dates<I>(timestamps: I, today: NaiveDate, search: Option<&str>) -> Vec<NaiveDate>
where
    I: IntoIterator<Item = DateTime<Utc>>,
{
    let needle = search
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase);

    let mut days: Vec<NaiveDate> = timestamps
        .into_iter()
        .map(|ts| ts.date_naive())
        .filter(|day| *day != today)
        .collect();

    days.sort_unstable_by(|a, b| b.cmp(a));
    days.dedup();

    if let Some(needle) = needle {
        days.retain(|day| format_long_day(*day).to_lowercase().contains(&needle));
    }

    days
}
