// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use jsonwebtoken::{encode, Algorithm, DecodingKey, EncodingKey, Header};
use psaich_api::config::Config;
use psaich_api::db::FirestoreDb;
use psaich_api::routes::create_router;
use psaich_api::services::{ChatCompletionClient, FirebaseTokenVerifier};
use psaich_api::AppState;
use serde::Serialize;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Key id of the static Firebase test key.
#[allow(dead_code)]
pub const TEST_KID: &str = "test-kid";

#[allow(dead_code)]
pub const FIREBASE_TEST_PRIVATE_PEM: &[u8] = include_bytes!("../fixtures/firebase_test_private.pem");
pub const FIREBASE_TEST_PUBLIC_PEM: &[u8] = include_bytes!("../fixtures/firebase_test_public.pem");

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a mock database connection (offline).
#[allow(dead_code)]
pub fn test_db_offline() -> FirestoreDb {
    FirestoreDb::new_mock()
}

/// Unique Firebase-style uid for test isolation.
#[allow(dead_code)]
pub fn unique_uid(prefix: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("{prefix}-{nanos}")
}

fn build_state(config: Config, db: FirestoreDb) -> Arc<AppState> {
    let llm = ChatCompletionClient::new(&config).expect("LLM client");
    let key = DecodingKey::from_rsa_pem(FIREBASE_TEST_PUBLIC_PEM).expect("test public key");
    let token_verifier = Arc::new(
        FirebaseTokenVerifier::new_with_static_key(&config, TEST_KID, key)
            .expect("static verifier"),
    );

    Arc::new(AppState {
        config,
        db,
        llm,
        token_verifier,
    })
}

/// Create a test app with offline mock dependencies.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    let state = build_state(Config::test_default(), test_db_offline());
    (create_router(state.clone()), state)
}

/// Offline test app with a custom frontend URL (cookie attributes follow it).
#[allow(dead_code)]
pub fn create_test_app_with_frontend_url(frontend_url: &str) -> (axum::Router, Arc<AppState>) {
    let mut config = Config::test_default();
    config.frontend_url = frontend_url.to_string();
    let state = build_state(config, test_db_offline());
    (create_router(state.clone()), state)
}

/// Test app backed by the Firestore emulator.
#[allow(dead_code)]
pub async fn create_emulator_app() -> (axum::Router, Arc<AppState>) {
    let state = build_state(Config::test_default(), test_db().await);
    (create_router(state.clone()), state)
}

/// Create a session JWT the way the login route does.
#[allow(dead_code)]
pub fn create_test_jwt(uid: &str, signing_key: &[u8]) -> String {
    #[derive(Serialize)]
    struct Claims {
        sub: String,
        exp: usize,
        iat: usize,
    }

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as usize;

    let claims = Claims {
        sub: uid.to_string(),
        exp: now + 86400,
        iat: now,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(signing_key),
    )
    .unwrap()
}

/// Sign a Firebase-style ID token with the static test key.
#[allow(dead_code)]
pub fn create_firebase_id_token(uid: &str, name: &str, provider: &str) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs();

    let claims = serde_json::json!({
        "iss": "https://securetoken.google.com/test-project",
        "aud": "test-project",
        "sub": uid,
        "iat": now,
        "exp": now + 3600,
        "auth_time": now,
        "email": format!("{uid}@example.com"),
        "name": name,
        "firebase": { "sign_in_provider": provider }
    });

    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(TEST_KID.to_string());
    encode(
        &header,
        &claims,
        &EncodingKey::from_rsa_pem(FIREBASE_TEST_PRIVATE_PEM).unwrap(),
    )
    .unwrap()
}

/// Read a JSON response body.
#[allow(dead_code)]
pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
