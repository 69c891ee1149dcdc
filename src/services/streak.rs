//! Consecutive-day streak rules.

use chrono::{DateTime, Utc};

const SECONDS_PER_DAY: i64 = 86_400;

/// Outcome of a streak check-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreakUpdate {
    /// Same day as the last login; nothing is written.
    Unchanged(u32),
    /// New streak value; `lastLogin` is stamped along with it.
    Set(u32),
}

impl StreakUpdate {
    pub fn streak(self) -> u32 {
        match self {
            StreakUpdate::Unchanged(streak) | StreakUpdate::Set(streak) => streak,
        }
    }
}

/// Whole days elapsed, rounded down (negative gaps round away from zero).
pub fn whole_days_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> i64 {
    (later - earlier).num_seconds().div_euclid(SECONDS_PER_DAY)
}

/// Compute the streak after a check-in at `now`.
pub fn next_streak(
    last_login: Option<DateTime<Utc>>,
    current: Option<u32>,
    now: DateTime<Utc>,
) -> StreakUpdate {
    let Some(last_login) = last_login else {
        return StreakUpdate::Set(1);
    };

    let current = current.unwrap_or(0);
    match whole_days_between(last_login, now) {
        0 => StreakUpdate::Unchanged(current),
        1 => StreakUpdate::Set(current + 1),
        _ => StreakUpdate::Set(1),
    }
}
