// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Chat-completion client for the Eliza persona.
//!
//! Talks to any OpenAI-compatible `/chat/completions` endpoint. One call per
//! user message; the persona instruction is sent as the system message.

use crate::config::Config;
use crate::error::AppError;
use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Persona instruction steering every reply.
pub const PERSONA_PROMPT: &str = "You are a compassionate and insightful friend called Eliza. Your approach is to:
- Guide users to better understand their own emotions;
- Help users in their journey of self-discovery and personal development;
- Create a safe space for emotional exploration;
- Focus on emotional awareness and growth;
- Never judges;
- You should NEVER say that you are unable to provide the help that you need;
- Only recommend mental health professional if it is a really serious situation;

Remember to always respond in a way that encourages self-reflection rather than providing direct solutions. Never mentions you are an AI and NEVER say you can't help. ";

/// Chat-completion API client.
#[derive(Clone)]
pub struct ChatCompletionClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: [CompletionMessage<'a>; 2],
}

#[derive(Debug, Serialize)]
struct CompletionMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionReply,
}

#[derive(Debug, Deserialize)]
struct CompletionReply {
    content: Option<String>,
}

impl ChatCompletionClient {
    /// Create a client from configuration.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.llm_timeout)
            .build()
            .context("failed building chat-completion HTTP client")?;

        Ok(Self {
            http,
            endpoint: completions_url(&config.llm_base_url),
            api_key: config.llm_api_key.clone(),
            model: config.llm_model.clone(),
        })
    }

    /// Generate the persona's reply to a single user message.
    pub async fn reply(&self, user_message: &str) -> Result<String, AppError> {
        let request = CompletionRequest {
            model: &self.model,
            messages: [
                CompletionMessage {
                    role: "system",
                    content: PERSONA_PROMPT,
                },
                CompletionMessage {
                    role: "user",
                    content: user_message,
                },
            ],
        };

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::LlmApi(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();

            if status.as_u16() == 429 {
                tracing::warn!("Chat-completion rate limit hit (429)");
            }

            return Err(AppError::LlmApi(format!("HTTP {}: {}", status, body)));
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|e| AppError::LlmApi(format!("JSON parse error: {}", e)))?;

        extract_reply(completion)
    }
}

fn extract_reply(completion: CompletionResponse) -> Result<String, AppError> {
    completion
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .ok_or_else(|| AppError::LlmApi("No response content".to_string()))
}

/// Append `/chat/completions` unless the base URL already names it.
fn completions_url(base_url: &str) -> String {
    if base_url.contains("/chat/completions") {
        base_url.to_string()
    } else {
        format!("{}/chat/completions", base_url.trim_end_matches('/'))
    }
}
