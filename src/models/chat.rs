// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Chat message model for storage and API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One chat exchange stored at `users/{uid}/chat/{auto-id}`.
///
/// Records are append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Firestore document ID (populated on read only)
    #[serde(
        default,
        alias = "_firestore_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    pub user_message: String,
    pub ai_response: String,
    /// Assigned by the API server when the record is written
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    /// A new exchange, not yet stored.
    pub fn new(user_message: impl Into<String>, ai_response: impl Into<String>) -> Self {
        Self {
            id: None,
            user_message: user_message.into(),
            ai_response: ai_response.into(),
            timestamp: Utc::now(),
        }
    }
}
