//! Speech helper routes for the browser client.

use axum::{routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use crate::error::Result;
use crate::models::Language;
use crate::services::speech::{
    merge_transcript, SpeechSettings, Voice, RECOGNITION_RESTART_DELAY, SILENCE_TIMEOUT,
};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/speech/voice", post(choose_voice))
        .route("/speech/transcript", post(merge))
}

#[derive(Deserialize)]
struct VoiceRequest {
    #[serde(default)]
    language: Language,
    #[serde(default)]
    voices: Vec<Voice>,
}

#[derive(Serialize)]
struct VoiceResponse {
    #[serde(flatten)]
    settings: SpeechSettings,
    silence_timeout_ms: u64,
    restart_delay_ms: u64,
}

async fn choose_voice(Json(request): Json<VoiceRequest>) -> Json<VoiceResponse> {
    Json(VoiceResponse {
        settings: SpeechSettings::for_language(request.language, &request.voices),
        silence_timeout_ms: SILENCE_TIMEOUT.as_millis() as u64,
        restart_delay_ms: RECOGNITION_RESTART_DELAY.as_millis() as u64,
    })
}

/// A recognizer result is a few sentences; anything longer is not speech.
#[derive(Deserialize, Validate)]
struct TranscriptRequest {
    #[serde(default)]
    #[validate(length(max = 10000))]
    input: String,
    #[validate(length(max = 10000))]
    transcript: String,
}

#[derive(Serialize)]
struct TranscriptResponse {
    input: String,
}

async fn merge(Json(request): Json<TranscriptRequest>) -> Result<Json<TranscriptResponse>> {
    request.validate()?;

    Ok(Json(TranscriptResponse {
        input: merge_transcript(&request.input, &request.transcript),
    }))
}
