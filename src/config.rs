//! Application configuration loaded from environment variables.
//!
//! Cloud Run injects secrets as environment variables via secret bindings,
//! so everything is read once at startup and cached in memory.

use std::env;
use std::time::Duration;

/// Name of the session cookie holding the JWT.
pub const SESSION_COOKIE: &str = "psaich_token";

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Frontend URL (CORS origin and cookie scope)
    pub frontend_url: String,
    /// GCP project ID (Firestore and Firebase Authentication)
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    /// Base URL of the OpenAI-compatible chat-completion API
    pub llm_base_url: String,
    /// Model used for chat completions
    pub llm_model: String,
    /// Timeout for a single chat completion
    pub llm_timeout: Duration,

    // --- Secrets ---
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    /// API key for the chat-completion API
    pub llm_api_key: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            llm_base_url: env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            llm_model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4".to_string()),
            llm_timeout: Duration::from_secs(
                env::var("LLM_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(60),
            ),

            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
                .into_bytes(),
            llm_api_key: env::var("OPENAI_API_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("OPENAI_API_KEY"))?,
        })
    }

    /// Offline configuration for tests.
    ///
    /// The chat-completion URL points at a closed local port so any LLM
    /// call fails fast.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:3000".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            llm_base_url: "http://127.0.0.1:9".to_string(),
            llm_model: "gpt-4".to_string(),
            llm_timeout: Duration::from_secs(2),
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            llm_api_key: "test_api_key".to_string(),
        }
    }

    /// Whether cookies should carry the `Secure` attribute.
    pub fn secure_cookies(&self) -> bool {
        self.frontend_url.starts_with("https://")
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}
