// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod chat;
pub mod language;
pub mod user;

pub use chat::ChatMessage;
pub use language::Language;
pub use user::{LoginIdentity, ProfileUpdate, UserProfile};
