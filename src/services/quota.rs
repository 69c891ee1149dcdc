// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Monthly free-message quota rules.
//!
//! These functions only decide; `FirestoreDb` applies the decision inside a
//! transaction so concurrent sessions cannot lose a decrement.

use chrono::{DateTime, Utc};

use crate::models::UserProfile;
use crate::time_utils::is_different_month;

/// Allowance granted at every calendar-month boundary.
pub const FREE_MESSAGES_PER_MONTH: u32 = 15;

/// Allowance granted by the (unbilled) upgrade action.
pub const UPGRADED_ALLOWANCE: u32 = 100;

/// Stored quota fields of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaState {
    pub free_messages: u32,
    pub last_reset: Option<DateTime<Utc>>,
}

impl From<&UserProfile> for QuotaState {
    fn from(profile: &UserProfile) -> Self {
        Self {
            free_messages: profile.free_messages,
            last_reset: profile.last_free_messages_reset,
        }
    }
}

/// Count visible at `now`, and whether a monthly reset has to be stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaCheck {
    pub free_messages: u32,
    pub reset: bool,
}

/// Apply the monthly reset rule.
///
/// A missing reset date counts as "reset now", so it never triggers a reset.
pub fn check(state: QuotaState, now: DateTime<Utc>) -> QuotaCheck {
    let last_reset = state.last_reset.unwrap_or(now);
    if is_different_month(last_reset, now) {
        QuotaCheck {
            free_messages: FREE_MESSAGES_PER_MONTH,
            reset: true,
        }
    } else {
        QuotaCheck {
            free_messages: state.free_messages,
            reset: false,
        }
    }
}

/// What happened to a send attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Consumption {
    /// A message was consumed and the exchange may proceed.
    Sent { remaining: u32 },
    /// The last free message was consumed; the exchange is blocked and the
    /// user has to upgrade or wait for the next month.
    LastMessageUsed,
    /// Nothing left to consume.
    Exhausted,
}

/// Decision for one send attempt, computed from the stored state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsumptionPlan {
    pub outcome: Consumption,
    /// Count to store (and report) after the attempt.
    pub free_messages: u32,
    /// Whether the monthly reset date must be stamped.
    pub reset: bool,
}

impl ConsumptionPlan {
    /// Whether the plan changes the stored document.
    pub fn needs_write(&self) -> bool {
        self.reset || self.outcome != Consumption::Exhausted
    }
}

/// Reset if a new month started, then take one message.
pub fn plan_consumption(state: QuotaState, now: DateTime<Utc>) -> ConsumptionPlan {
    let checked = check(state, now);

    if checked.free_messages == 0 {
        return ConsumptionPlan {
            outcome: Consumption::Exhausted,
            free_messages: 0,
            reset: checked.reset,
        };
    }

    let remaining = checked.free_messages - 1;
    let outcome = if remaining == 0 {
        Consumption::LastMessageUsed
    } else {
        Consumption::Sent { remaining }
    };

    ConsumptionPlan {
        outcome,
        free_messages: remaining,
        reset: checked.reset,
    }
}
