// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Conversation history routes.

use crate::db::ChatQueryCursor;
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::services::history::group_chat_dates;
use crate::time_utils::{day_window, format_day, format_utc_rfc3339, parse_day};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Extension, Json, Router,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/history/dates", get(get_history_dates))
        .route("/api/history/{date}", get(get_history_day))
}

// ─── Dates ───────────────────────────────────────────────────

#[derive(Deserialize)]
struct DatesQuery {
    search: Option<String>,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct HistoryDatesResponse {
    /// `YYYY-MM-DD`, newest first
    pub dates: Vec<String>,
}

/// Days with past conversations for the history sidebar.
async fn get_history_dates(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<DatesQuery>,
) -> Result<Json<HistoryDatesResponse>> {
    let timestamps = state.db.list_chat_timestamps(&user.uid).await?;
    let today = chrono::Utc::now().date_naive();

    let dates = group_chat_dates(timestamps, today, params.search.as_deref())
        .into_iter()
        .map(format_day)
        .collect();

    Ok(Json(HistoryDatesResponse { dates }))
}

// ─── Messages of a Day ───────────────────────────────────────

#[derive(Deserialize)]
struct DayQuery {
    /// Cursor for forward pagination (opaque token).
    cursor: Option<String>,
    #[serde(default = "default_limit")]
    limit: u32,
}

fn default_limit() -> u32 {
    100
}

const MAX_LIMIT: u32 = 500;
const CURSOR_PARTS: usize = 3;

fn parse_cursor(cursor: Option<&str>) -> Result<Option<ChatQueryCursor>> {
    cursor
        .map(|raw| {
            let invalid_cursor = || AppError::BadRequest("Invalid 'cursor' parameter".to_string());

            let decoded = URL_SAFE_NO_PAD.decode(raw).map_err(|_| invalid_cursor())?;
            let decoded_str = std::str::from_utf8(&decoded).map_err(|_| invalid_cursor())?;

            // Document ids never contain ':', so a 3-way split is unambiguous.
            let parts: Vec<&str> = decoded_str.splitn(CURSOR_PARTS, ':').collect();
            if parts.len() != CURSOR_PARTS || parts[2].is_empty() {
                return Err(invalid_cursor());
            }

            let seconds = parts[0].parse::<i64>().map_err(|_| invalid_cursor())?;
            let nanos = parts[1].parse::<u32>().map_err(|_| invalid_cursor())?;
            let timestamp =
                chrono::DateTime::from_timestamp(seconds, nanos).ok_or_else(invalid_cursor)?;

            Ok(ChatQueryCursor {
                timestamp,
                message_id: parts[2].to_string(),
            })
        })
        .transpose()
}

fn encode_cursor(cursor: &ChatQueryCursor) -> String {
    let payload = format!(
        "{}:{}:{}",
        cursor.timestamp.timestamp(),
        cursor.timestamp.timestamp_subsec_nanos(),
        cursor.message_id
    );
    URL_SAFE_NO_PAD.encode(payload)
}

#[derive(Serialize, Clone, Debug)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct HistoryMessage {
    pub id: Option<String>,
    pub user_message: String,
    pub ai_response: String,
    pub timestamp: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct HistoryDayResponse {
    pub date: String,
    pub messages: Vec<HistoryMessage>,
    pub next_cursor: Option<String>,
}

/// Messages of one day, oldest first.
async fn get_history_day(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(date): Path<String>,
    Query(params): Query<DayQuery>,
) -> Result<Json<HistoryDayResponse>> {
    let day = parse_day(&date).ok_or_else(|| {
        AppError::BadRequest("Invalid date: expected YYYY-MM-DD".to_string())
    })?;
    let (start, end) = day_window(day)
        .ok_or_else(|| AppError::BadRequest("Invalid date: out of range".to_string()))?;

    if params.limit == 0 {
        return Err(AppError::BadRequest("'limit' must be positive".to_string()));
    }
    let limit = params.limit.min(MAX_LIMIT);
    let cursor = parse_cursor(params.cursor.as_deref())?;
    if cursor.as_ref().is_some_and(|c| !c.is_within(start, end)) {
        return Err(AppError::BadRequest(
            "Invalid 'cursor' parameter for this date".to_string(),
        ));
    }

    tracing::debug!(
        uid = %user.uid,
        date = %date,
        limit,
        cursor = ?params.cursor,
        "Fetching chat history"
    );

    // Fetch one extra item to determine if another page is available.
    let mut results = state
        .db
        .get_chat_messages_for_day(&user.uid, day, cursor.as_ref(), limit.saturating_add(1))
        .await?;

    let has_more = results.len() > limit as usize;
    if has_more {
        results.truncate(limit as usize);
    }

    let next_cursor = if has_more {
        results.last().and_then(|m| {
            m.id.as_ref().map(|id| {
                encode_cursor(&ChatQueryCursor {
                    timestamp: m.timestamp,
                    message_id: id.clone(),
                })
            })
        })
    } else {
        None
    };

    let messages = results
        .into_iter()
        .map(|m| HistoryMessage {
            id: m.id,
            user_message: m.user_message,
            ai_response: m.ai_response,
            timestamp: format_utc_rfc3339(m.timestamp),
        })
        .collect();

    Ok(Json(HistoryDayResponse {
        date: format_day(day),
        messages,
        next_cursor,
    }))
}
