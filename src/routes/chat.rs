//! Chat routes: anonymous and signed-in conversations with Eliza.

use axum::{extract::State, routing::post, Extension, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{ChatMessage, Language};
use crate::services::quota::Consumption;
use crate::AppState;

/// Anonymous chat; quota is tracked by the client.
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new().route("/chat", post(anonymous_chat))
}

/// Signed-in chat with persisted history and server-side quota.
pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/chat", post(user_chat))
}

#[derive(Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub language: Language,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ChatResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub free_messages: Option<u32>,
}

/// The message as typed; whitespace only counts for the emptiness check.
fn require_message(request: &ChatRequest) -> Result<&str> {
    if request.message.trim().is_empty() {
        return Err(AppError::BadRequest("Message must not be empty".to_string()));
    }
    Ok(&request.message)
}

/// Ask the model, turning failures into the apology reply.
async fn ask_eliza(state: &AppState, message: &str, language: Language) -> (bool, String) {
    match state.llm.reply(message).await {
        Ok(reply) => (true, reply),
        Err(e) => {
            tracing::error!(error = %e, language = language.tag(), "Chat completion failed");
            (false, language.apology().to_string())
        }
    }
}

async fn anonymous_chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>> {
    let message = require_message(&request)?;
    let (success, reply) = ask_eliza(&state, message, request.language).await;

    Ok(Json(ChatResponse {
        success,
        message: reply,
        free_messages: None,
    }))
}

/// One exchange for a signed-in user.
///
/// A free message is taken before the model is called. Taking the last one
/// blocks the send and asks the user to upgrade.
async fn user_chat(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>> {
    let message = require_message(&request)?;

    let plan = state.db.consume_free_message(&user.uid).await?;
    let remaining = match plan.outcome {
        Consumption::Sent { remaining } => remaining,
        Consumption::LastMessageUsed => {
            tracing::info!(uid = %user.uid, "Last free message used");
            return Err(AppError::QuotaExhausted(
                "Last free message used; upgrade to keep chatting".to_string(),
            ));
        }
        Consumption::Exhausted => {
            return Err(AppError::QuotaExhausted(
                "No free messages left this month".to_string(),
            ));
        }
    };

    let (success, reply) = ask_eliza(&state, message, request.language).await;

    if success {
        let stored = state
            .db
            .save_chat_message(&user.uid, &ChatMessage::new(message, reply.as_str()))
            .await?;
        tracing::debug!(uid = %user.uid, message_id = ?stored.id, "Chat exchange saved");
    }

    Ok(Json(ChatResponse {
        success,
        message: reply,
        free_messages: Some(remaining),
    }))
}
