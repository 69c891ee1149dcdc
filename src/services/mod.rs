// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod firebase_auth;
pub mod history;
pub mod llm;
pub mod quota;
pub mod speech;
pub mod streak;

pub use firebase_auth::{FirebaseTokenVerifier, OidcError};
pub use llm::ChatCompletionClient;
pub use speech::{NoopSpeech, SpeechOutput, SpeechSettings, Voice};
