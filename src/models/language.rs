//! Conversation languages and the user-facing texts that depend on them.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Language used for speech and for canned replies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum Language {
    #[default]
    #[serde(rename = "pt-BR")]
    PtBr,
    #[serde(rename = "en-US")]
    EnUs,
}

impl Language {
    /// BCP 47 tag.
    pub fn tag(self) -> &'static str {
        match self {
            Language::PtBr => "pt-BR",
            Language::EnUs => "en-US",
        }
    }

    /// Reply shown when the chat-completion call fails.
    pub fn apology(self) -> &'static str {
        match self {
            Language::PtBr => {
                "Desculpe, estou tendo problemas para processar sua mensagem no momento. Podemos tentar novamente?"
            }
            Language::EnUs => {
                "I apologize, but I'm having trouble processing your message right now. Could we try again?"
            }
        }
    }

    pub fn settings_saved(self) -> &'static str {
        match self {
            Language::PtBr => "Suas alterações foram salvas com sucesso!",
            Language::EnUs => "Your changes have been saved successfully!",
        }
    }

    pub fn settings_failed(self) -> &'static str {
        match self {
            Language::PtBr => {
                "Ocorreu um erro ao salvar suas alterações. Por favor, tente novamente."
            }
            Language::EnUs => "An error occurred while saving your changes. Please try again.",
        }
    }

    /// Encouragement shown next to the streak counter.
    pub fn streak_message(self, days: u32) -> String {
        let emoji = match days {
            75.. => None,
            61.. => Some(" 🫂"),
            46.. => Some(" 🧘🏼‍♀️"),
            31.. => Some(" 🧿"),
            15.. => Some(" 🍵"),
            7.. => Some(" 🪴"),
            _ => Some(""),
        };

        match (self, emoji) {
            (Language::PtBr, None) => "Você está no caminho para a paz interior ☮️".to_string(),
            (Language::EnUs, None) => "You are on the path to inner peace ☮️".to_string(),
            (Language::PtBr, Some(emoji)) => {
                format!("Você está cuidando de si mesmo por {days} dias{emoji}")
            }
            (Language::EnUs, Some(emoji)) => {
                format!("You have been taking care of yourself for {days} days{emoji}")
            }
        }
    }
}
