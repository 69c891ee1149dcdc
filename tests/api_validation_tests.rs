// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Request validation tests.
//!
//! Invalid input must be rejected with 400 before any database access, so
//! these run against the offline mock.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use tower::ServiceExt;

mod common;

async fn send(method: &str, uri: &str, body: Option<serde_json::Value>) -> Response {
    let (app, state) = common::create_test_app();
    let token = common::create_test_jwt("uid-validation", &state.config.jwt_signing_key);

    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, "application/json");

    let body = body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty);
    app.oneshot(request.body(body).unwrap()).await.unwrap()
}

#[tokio::test]
async fn test_history_day_rejects_bad_date() {
    for uri in [
        "/api/history/05-01-2025",
        "/api/history/2025-13-01",
        "/api/history/yesterday",
    ] {
        let response = send("GET", uri, None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
    }
}

#[tokio::test]
async fn test_history_day_rejects_bad_cursor() {
    let response = send("GET", "/api/history/2025-01-05?cursor=%%%", None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send("GET", "/api/history/2025-01-05?cursor=bm90LWEtY3Vyc29y", None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_history_day_rejects_last_representable_date() {
    let response = send("GET", "/api/history/+262142-12-31", None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = common::body_json(response).await;
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn test_history_day_rejects_cursor_from_other_day() {
    // 2025-01-04T10:00:00Z, one day before the requested date
    let cursor = URL_SAFE_NO_PAD.encode("1735984800:0:msg-jan4");
    let response = send("GET", &format!("/api/history/2025-01-05?cursor={cursor}"), None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // 2025-01-06T00:00:00Z, just past the end of the day
    let cursor = URL_SAFE_NO_PAD.encode("1736121600:0:msg-jan6");
    let response = send("GET", &format!("/api/history/2025-01-05?cursor={cursor}"), None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_history_day_cursor_inside_day_reaches_database() {
    // 2025-01-05T09:00:00Z
    let cursor = URL_SAFE_NO_PAD.encode("1736067600:0:msg-jan5");
    let response = send("GET", &format!("/api/history/2025-01-05?cursor={cursor}"), None).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_history_day_clamps_large_limit() {
    let response = send("GET", "/api/history/2025-01-05?limit=10000", None).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let response = send("GET", "/api/history/2025-01-05?limit=-1", None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_history_day_rejects_zero_limit() {
    let response = send("GET", "/api/history/2025-01-05?limit=0", None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_history_day_valid_input_reaches_database() {
    let response = send("GET", "/api/history/2025-01-05?limit=10", None).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_profile_update_rejects_unknown_country() {
    let response = send(
        "PUT",
        "/api/me",
        Some(serde_json::json!({ "country": "atlantis" })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = common::body_json(response).await;
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn test_profile_update_rejects_bad_email_and_school() {
    let response = send(
        "PUT",
        "/api/me",
        Some(serde_json::json!({ "email": "not-an-email" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(
        "PUT",
        "/api/me",
        Some(serde_json::json!({ "psychologySchool": "astrology" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_profile_update_failure_message_is_localized() {
    let response = send(
        "PUT",
        "/api/me?language=en-US",
        Some(serde_json::json!({ "country": "pt", "newsletter": true })),
    )
    .await;

    // Valid update; the offline database fails the write.
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = common::body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(
        body["message"],
        "An error occurred while saving your changes. Please try again."
    );
}
