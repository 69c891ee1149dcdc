// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session routes: exchange a Firebase ID token for a session cookie.

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::config::SESSION_COOKIE;
use crate::error::{AppError, Result};
use crate::middleware::auth::{create_jwt, SESSION_TTL_SECS};
use crate::models::user::COUNTRIES;
use crate::services::OidcError;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/session", post(create_session))
        .route("/auth/logout", post(logout))
}

/// Login request sent after the provider popup succeeds.
#[derive(Deserialize)]
pub struct SessionRequest {
    pub id_token: String,
    /// Country picked on the sign-in form, if any.
    #[serde(default)]
    pub country: Option<String>,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SessionResponse {
    pub token: String,
    pub uid: String,
    pub display_name: Option<String>,
    pub free_messages: u32,
}

/// Verify the ID token, save the user and open a session.
async fn create_session(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(body): Json<SessionRequest>,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    let identity = state
        .token_verifier
        .verify_id_token(body.id_token.trim())
        .await
        .map_err(|e| match e {
            OidcError::Forbidden(reason) => {
                tracing::warn!(reason = %reason, "Rejected Firebase ID token");
                AppError::InvalidToken
            }
            OidcError::Transient(reason) => {
                AppError::Internal(anyhow::anyhow!("ID token verification unavailable: {reason}"))
            }
        })?;

    let country = body
        .country
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty());
    if let Some(country) = country {
        if !COUNTRIES.contains(&country) {
            return Err(AppError::BadRequest(format!("Unknown country: {country}")));
        }
    }

    let profile = state.db.save_user_on_login(&identity, country).await?;
    state.db.update_last_login(&identity.uid).await?;
    let free_messages = state.db.get_free_messages_count(&identity.uid).await?;

    let token = create_jwt(&identity.uid, &state.config.jwt_signing_key)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))?;

    tracing::info!(uid = %identity.uid, free_messages, "Session created");

    let jar = jar.add(session_cookie(token.clone(), state.config.secure_cookies()));

    Ok((
        jar,
        Json(SessionResponse {
            token,
            uid: identity.uid,
            display_name: profile.display_name,
            free_messages,
        }),
    ))
}

/// Clear the session cookie.
async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> (CookieJar, StatusCode) {
    let removal = session_cookie(String::new(), state.config.secure_cookies());
    (jar.remove(removal), StatusCode::NO_CONTENT)
}

fn session_cookie(value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(time::Duration::seconds(SESSION_TTL_SECS as i64))
        .build()
}
