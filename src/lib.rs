// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Psaich: a companion chat service.
//!
//! This crate provides the backend API for chatting with the Eliza persona,
//! tracking each user's monthly free-message quota, and keeping a per-day
//! history of conversations in Firestore.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::FirestoreDb;
use services::{ChatCompletionClient, FirebaseTokenVerifier};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub llm: ChatCompletionClient,
    pub token_verifier: Arc<FirebaseTokenVerifier>,
}
