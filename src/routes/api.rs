// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated users.

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::models::{Language, ProfileUpdate, UserProfile};
use crate::services::quota::UPGRADED_ALLOWANCE;
use crate::services::streak::StreakUpdate;
use crate::time_utils::{format_utc_rfc3339, start_of_next_month};
use crate::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// API routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/me", get(get_me).put(update_me))
        .route("/api/quota", get(get_quota))
        .route("/api/upgrade", post(upgrade))
        .route("/api/streak", get(get_streak).post(check_in_streak))
}

/// `?language=` on endpoints that return user-facing text.
#[derive(Deserialize, Default)]
pub(crate) struct LanguageQuery {
    #[serde(default)]
    pub language: Language,
}

// ─── User Profile ────────────────────────────────────────────

/// Current user response.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserResponse {
    pub uid: String,
    pub email: String,
    pub display_name: Option<String>,
    pub photo_url: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub address: Option<String>,
    pub country: String,
    pub newsletter: bool,
    pub psychology_school: Option<String>,
    pub free_messages: u32,
    pub next_reset: String,
    pub streak: u32,
}

impl UserResponse {
    fn new(uid: String, profile: UserProfile, free_messages: u32) -> Self {
        Self {
            uid,
            email: profile.email,
            display_name: profile.display_name,
            photo_url: profile.photo_url,
            first_name: profile.first_name,
            last_name: profile.last_name,
            phone_number: profile.phone_number,
            address: profile.address,
            country: profile.country,
            newsletter: profile.newsletter.unwrap_or(false),
            psychology_school: profile.psychology_school,
            free_messages,
            next_reset: format_utc_rfc3339(start_of_next_month(chrono::Utc::now())),
            streak: profile.streak.unwrap_or(0),
        }
    }
}

/// Get current user profile.
async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<UserResponse>> {
    // Applies a pending monthly reset before the profile is read.
    let free_messages = state.db.get_free_messages_count(&user.uid).await?;
    let profile = state.db.require_user(&user.uid).await?;

    Ok(Json(UserResponse::new(user.uid, profile, free_messages)))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SettingsResponse {
    pub success: bool,
    pub message: String,
}

/// Save settings-form changes.
async fn update_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<LanguageQuery>,
    Json(update): Json<ProfileUpdate>,
) -> Result<(StatusCode, Json<SettingsResponse>)> {
    update.validate()?;

    tracing::debug!(uid = %user.uid, fields = ?update.field_paths(), "Updating profile");

    match state.db.update_profile(&user.uid, &update).await {
        Ok(()) => Ok((
            StatusCode::OK,
            Json(SettingsResponse {
                success: true,
                message: params.language.settings_saved().to_string(),
            }),
        )),
        Err(e) => {
            tracing::error!(uid = %user.uid, error = %e, "Failed to save settings");
            Ok((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(SettingsResponse {
                    success: false,
                    message: params.language.settings_failed().to_string(),
                }),
            ))
        }
    }
}

// ─── Quota ───────────────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct QuotaResponse {
    pub free_messages: u32,
    pub next_reset: String,
}

async fn get_quota(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<QuotaResponse>> {
    let free_messages = state.db.get_free_messages_count(&user.uid).await?;

    Ok(Json(QuotaResponse {
        free_messages,
        next_reset: format_utc_rfc3339(start_of_next_month(chrono::Utc::now())),
    }))
}

/// Grant the upgraded allowance.
///
/// No payment is taken; the request is only logged.
async fn upgrade(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<QuotaResponse>> {
    tracing::info!(uid = %user.uid, "Upgrade requested");

    state
        .db
        .update_free_messages(&user.uid, UPGRADED_ALLOWANCE)
        .await?;

    Ok(Json(QuotaResponse {
        free_messages: UPGRADED_ALLOWANCE,
        next_reset: format_utc_rfc3339(start_of_next_month(chrono::Utc::now())),
    }))
}

// ─── Streak ──────────────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct StreakResponse {
    pub streak: u32,
    pub message: String,
    /// Whether this request changed the stored streak.
    pub updated: bool,
}

async fn get_streak(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<LanguageQuery>,
) -> Result<Json<StreakResponse>> {
    let streak = state.db.get_streak(&user.uid).await?;

    Ok(Json(StreakResponse {
        streak,
        message: params.language.streak_message(streak),
        updated: false,
    }))
}

/// Daily check-in.
async fn check_in_streak(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<LanguageQuery>,
) -> Result<Json<StreakResponse>> {
    let update = state.db.update_streak(&user.uid).await?;
    let streak = update.streak();

    Ok(Json(StreakResponse {
        streak,
        message: params.language.streak_message(streak),
        updated: matches!(update, StreakUpdate::Set(_)),
    }))
}
