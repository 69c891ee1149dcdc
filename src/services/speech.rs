//! Speech capability: voice choice, transcript cleanup, output sinks.
//!
//! Recognition and synthesis run on the client. The server only decides
//! which voice to use and how recognized words are folded into the input.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

use crate::models::Language;

/// Stop listening after this much silence.
pub const SILENCE_TIMEOUT: Duration = Duration::from_secs(2);

/// Delay before restarting recognition after an engine error (one attempt).
pub const RECOGNITION_RESTART_DELAY: Duration = Duration::from_secs(1);

/// A synthesis voice offered by the client platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voice {
    pub name: String,
    pub lang: String,
}

/// Voice plus prosody for speaking a reply.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeechSettings {
    /// `None` means the platform default voice.
    pub voice: Option<Voice>,
    pub lang: &'static str,
    pub rate: f64,
    pub pitch: f64,
}

impl SpeechSettings {
    pub fn for_language(language: Language, voices: &[Voice]) -> Self {
        let voice = select_voice(language, voices).cloned();
        if voice.is_none() {
            tracing::warn!(
                language = language.tag(),
                offered = voices.len(),
                "No matching voice, using platform default"
            );
        }

        Self {
            voice,
            lang: language.tag(),
            rate: 0.9,
            pitch: 1.0,
        }
    }
}

/// Pick the preferred voice for a language.
///
/// Portuguese prefers a female Brazilian voice, then any Brazilian voice,
/// then any Portuguese one. English prefers "Samantha", then any `en-US`.
pub fn select_voice(language: Language, voices: &[Voice]) -> Option<&Voice> {
    match language {
        Language::PtBr => voices
            .iter()
            .find(|v| v.lang == "pt-BR" && v.name.to_lowercase().contains("female"))
            .or_else(|| voices.iter().find(|v| v.lang == "pt-BR"))
            .or_else(|| voices.iter().find(|v| v.lang.starts_with("pt"))),
        Language::EnUs => voices
            .iter()
            .find(|v| v.name == "Samantha")
            .or_else(|| voices.iter().find(|v| v.lang == "en-US")),
    }
}

/// Append a final recognition result to the current input.
///
/// Recognizers tend to repeat words across partial results, so each word is
/// kept only at its first (case-insensitive) occurrence.
pub fn merge_transcript(current_input: &str, final_transcript: &str) -> String {
    let mut seen: HashSet<String> = HashSet::new();
    let mut words: Vec<&str> = Vec::new();

    for word in final_transcript.split_whitespace() {
        if seen.insert(word.to_lowercase()) {
            words.push(word);
        }
    }

    if words.is_empty() {
        return current_input.trim().to_string();
    }

    format!("{} {}", current_input, words.join(" "))
        .trim()
        .to_string()
}

#[derive(Debug, thiserror::Error)]
pub enum SpeechError {
    #[error("speech output unavailable: {0}")]
    Unavailable(String),
}

/// Something that can read replies aloud.
pub trait SpeechOutput: Send + Sync {
    fn speak(&self, text: &str, settings: &SpeechSettings) -> Result<(), SpeechError>;
    fn stop(&self);
}

/// Speech sink for headless environments.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSpeech;

impl SpeechOutput for NoopSpeech {
    fn speak(&self, text: &str, settings: &SpeechSettings) -> Result<(), SpeechError> {
        tracing::debug!(chars = text.len(), lang = settings.lang, "Speech output disabled");
        Ok(())
    }

    fn stop(&self) {}
}
