// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore integration tests.
//!
//! These tests require the Firestore emulator to be running
//! (`FIRESTORE_EMULATOR_HOST`). Each test uses its own uid.

use chrono::{Duration, TimeZone, Utc};
use psaich_api::db::{ChatQueryCursor, FirestoreDb};
use psaich_api::models::{ChatMessage, LoginIdentity, ProfileUpdate, UserProfile};
use psaich_api::services::quota::{Consumption, FREE_MESSAGES_PER_MONTH, UPGRADED_ALLOWANCE};
use psaich_api::services::streak::StreakUpdate;

mod common;
use common::{test_db, unique_uid};

fn identity(uid: &str) -> LoginIdentity {
    LoginIdentity {
        uid: uid.to_string(),
        email: Some(format!("{uid}@example.com")),
        display_name: Some("Ana Maria Souza".to_string()),
        photo_url: Some("https://example.com/ana.png".to_string()),
        phone_number: None,
    }
}

/// Store a user whose quota fields are set directly.
async fn seed_user(
    db: &FirestoreDb,
    uid: &str,
    free_messages: u32,
    reset: Option<chrono::DateTime<Utc>>,
) -> UserProfile {
    let mut profile = UserProfile::merge_login(None, &identity(uid), Some("br"), Utc::now());
    profile.free_messages = free_messages;
    profile.last_free_messages_reset = reset;
    db.upsert_user(uid, &profile).await.unwrap();
    profile
}

fn message_at(text: &str, timestamp: chrono::DateTime<Utc>) -> ChatMessage {
    ChatMessage {
        id: None,
        user_message: text.to_string(),
        ai_response: format!("reply to {text}"),
        timestamp,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// USER TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_first_login_creates_user_with_full_quota() {
    require_emulator!();

    let db = test_db().await;
    let uid = unique_uid("login");

    assert!(db.get_user(&uid).await.unwrap().is_none());

    db.save_user_on_login(&identity(&uid), Some("pt"))
        .await
        .unwrap();

    let user = db.get_user(&uid).await.unwrap().expect("user saved");
    assert_eq!(user.free_messages, FREE_MESSAGES_PER_MONTH);
    assert!(user.last_free_messages_reset.is_some());
    assert_eq!(user.first_name, "Ana");
    assert_eq!(user.last_name, "Maria Souza");
    assert_eq!(user.country, "pt");
}

#[tokio::test]
async fn test_repeat_login_keeps_quota_and_settings() {
    require_emulator!();

    let db = test_db().await;
    let uid = unique_uid("relogin");
    seed_user(&db, &uid, 4, Some(Utc::now())).await;
    db.update_profile(
        &uid,
        &ProfileUpdate {
            psychology_school: Some("humanistic".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    db.save_user_on_login(&identity(&uid), None).await.unwrap();

    let user = db.get_user(&uid).await.unwrap().unwrap();
    assert_eq!(user.free_messages, 4);
    assert_eq!(user.psychology_school.as_deref(), Some("humanistic"));
    assert_eq!(user.country, "br");
}

#[tokio::test]
async fn test_profile_update_writes_only_given_fields() {
    require_emulator!();

    let db = test_db().await;
    let uid = unique_uid("profile");
    seed_user(&db, &uid, 9, Some(Utc::now())).await;

    db.update_profile(
        &uid,
        &ProfileUpdate {
            address: Some("Rua das Flores 10".to_string()),
            newsletter: Some(true),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let user = db.get_user(&uid).await.unwrap().unwrap();
    assert_eq!(user.address.as_deref(), Some("Rua das Flores 10"));
    assert_eq!(user.newsletter, Some(true));
    assert_eq!(user.free_messages, 9);
    assert_eq!(user.email, format!("{uid}@example.com"));
}

// ═══════════════════════════════════════════════════════════════════════════
// QUOTA TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_new_month_resets_quota() {
    require_emulator!();

    let db = test_db().await;
    let uid = unique_uid("reset");
    seed_user(&db, &uid, 2, Some(Utc::now() - Duration::days(62))).await;

    assert_eq!(
        db.get_free_messages_count(&uid).await.unwrap(),
        FREE_MESSAGES_PER_MONTH
    );

    let user = db.get_user(&uid).await.unwrap().unwrap();
    assert_eq!(user.free_messages, FREE_MESSAGES_PER_MONTH);
    let reset = user.last_free_messages_reset.unwrap();
    assert!(Utc::now() - reset < Duration::minutes(1));
}

#[tokio::test]
async fn test_same_month_returns_stored_count() {
    require_emulator!();

    let db = test_db().await;
    let uid = unique_uid("same-month");
    let reset = Utc::now();
    seed_user(&db, &uid, 7, Some(reset)).await;

    assert_eq!(db.get_free_messages_count(&uid).await.unwrap(), 7);
}

#[tokio::test]
async fn test_missing_reset_date_does_not_reset() {
    require_emulator!();

    let db = test_db().await;
    let uid = unique_uid("no-reset-date");
    seed_user(&db, &uid, 3, None).await;

    assert_eq!(db.get_free_messages_count(&uid).await.unwrap(), 3);
}

#[tokio::test]
async fn test_consuming_last_message_blocks_further_sends() {
    require_emulator!();

    let db = test_db().await;
    let uid = unique_uid("last");
    seed_user(&db, &uid, 1, Some(Utc::now())).await;

    let plan = db.consume_free_message(&uid).await.unwrap();
    assert_eq!(plan.outcome, Consumption::LastMessageUsed);
    assert_eq!(plan.free_messages, 0);

    let plan = db.consume_free_message(&uid).await.unwrap();
    assert_eq!(plan.outcome, Consumption::Exhausted);
    assert_eq!(db.get_free_messages_count(&uid).await.unwrap(), 0);
}

#[tokio::test]
async fn test_stale_month_resets_before_consuming() {
    require_emulator!();

    let db = test_db().await;
    let uid = unique_uid("stale");
    seed_user(&db, &uid, 1, Some(Utc::now() - Duration::days(62))).await;

    let plan = db.consume_free_message(&uid).await.unwrap();
    assert_eq!(plan.outcome, Consumption::Sent { remaining: 14 });
    assert_eq!(db.get_free_messages_count(&uid).await.unwrap(), 14);
}

#[tokio::test]
async fn test_concurrent_consumption_loses_no_decrement() {
    require_emulator!();

    let db = test_db().await;
    let uid = unique_uid("concurrent");
    seed_user(&db, &uid, 10, Some(Utc::now())).await;

    let mut handles = Vec::new();
    for _ in 0..4 {
        let db = db.clone();
        let uid = uid.clone();
        handles.push(tokio::spawn(async move {
            db.consume_free_message(&uid).await
        }));
    }

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(db.get_free_messages_count(&uid).await.unwrap(), 6);
}

#[tokio::test]
async fn test_upgrade_overwrites_count() {
    require_emulator!();

    let db = test_db().await;
    let uid = unique_uid("upgrade");
    seed_user(&db, &uid, 0, Some(Utc::now())).await;

    db.update_free_messages(&uid, UPGRADED_ALLOWANCE)
        .await
        .unwrap();

    assert_eq!(
        db.get_free_messages_count(&uid).await.unwrap(),
        UPGRADED_ALLOWANCE
    );
}

#[tokio::test]
async fn test_consume_for_unknown_user_is_not_found() {
    require_emulator!();

    let db = test_db().await;
    let err = db
        .consume_free_message(&unique_uid("ghost"))
        .await
        .unwrap_err();
    assert!(matches!(err, psaich_api::error::AppError::NotFound(_)));
}

// ═══════════════════════════════════════════════════════════════════════════
// CHAT HISTORY TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_day_query_returns_only_that_day_ascending() {
    require_emulator!();

    let db = test_db().await;
    let uid = unique_uid("history");
    seed_user(&db, &uid, 15, Some(Utc::now())).await;

    let day = chrono::NaiveDate::from_ymd_opt(2025, 1, 5).unwrap();
    let inside = [
        Utc.with_ymd_and_hms(2025, 1, 5, 18, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2025, 1, 5, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2025, 1, 5, 23, 59, 59).unwrap(),
    ];
    let outside = [
        Utc.with_ymd_and_hms(2025, 1, 4, 23, 59, 59).unwrap(),
        Utc.with_ymd_and_hms(2025, 1, 6, 0, 0, 0).unwrap(),
    ];

    for (i, ts) in inside.iter().chain(outside.iter()).enumerate() {
        db.save_chat_message(&uid, &message_at(&format!("m{i}"), *ts))
            .await
            .unwrap();
    }

    let messages = db
        .get_chat_messages_for_day(&uid, day, None, 100)
        .await
        .unwrap();

    let timestamps: Vec<_> = messages.iter().map(|m| m.timestamp).collect();
    assert_eq!(timestamps, vec![inside[1], inside[0], inside[2]]);
    assert!(messages.iter().all(|m| m.id.is_some()));
}

#[tokio::test]
async fn test_day_query_paginates_with_cursor() {
    require_emulator!();

    let db = test_db().await;
    let uid = unique_uid("paging");
    seed_user(&db, &uid, 15, Some(Utc::now())).await;

    let day = chrono::NaiveDate::from_ymd_opt(2025, 2, 14).unwrap();
    for hour in 8..13 {
        let ts = Utc.with_ymd_and_hms(2025, 2, 14, hour, 0, 0).unwrap();
        db.save_chat_message(&uid, &message_at(&format!("h{hour}"), ts))
            .await
            .unwrap();
    }

    let first = db
        .get_chat_messages_for_day(&uid, day, None, 2)
        .await
        .unwrap();
    assert_eq!(first.len(), 2);

    let last = first.last().unwrap();
    let cursor = ChatQueryCursor {
        timestamp: last.timestamp,
        message_id: last.id.clone().unwrap(),
    };

    let rest = db
        .get_chat_messages_for_day(&uid, day, Some(&cursor), 10)
        .await
        .unwrap();

    let texts: Vec<_> = rest.iter().map(|m| m.user_message.as_str()).collect();
    assert_eq!(texts, vec!["h10", "h11", "h12"]);
}

#[tokio::test]
async fn test_day_query_rejects_cursor_from_other_day() {
    require_emulator!();

    let db = test_db().await;
    let uid = unique_uid("stale-cursor");
    seed_user(&db, &uid, 15, Some(Utc::now())).await;

    let stamps = [
        ("jan4-10", Utc.with_ymd_and_hms(2025, 1, 4, 10, 0, 0).unwrap()),
        ("jan4-14", Utc.with_ymd_and_hms(2025, 1, 4, 14, 0, 0).unwrap()),
        ("jan5-09", Utc.with_ymd_and_hms(2025, 1, 5, 9, 0, 0).unwrap()),
    ];
    let mut saved = Vec::new();
    for (text, ts) in stamps {
        saved.push(db.save_chat_message(&uid, &message_at(text, ts)).await.unwrap());
    }

    let day = chrono::NaiveDate::from_ymd_opt(2025, 1, 5).unwrap();
    let cursor = ChatQueryCursor {
        timestamp: saved[0].timestamp,
        message_id: saved[0].id.clone().unwrap(),
    };

    let err = db
        .get_chat_messages_for_day(&uid, day, Some(&cursor), 10)
        .await
        .unwrap_err();
    assert!(matches!(err, psaich_api::error::AppError::BadRequest(_)));

    let messages = db
        .get_chat_messages_for_day(&uid, day, None, 10)
        .await
        .unwrap();
    let texts: Vec<_> = messages.iter().map(|m| m.user_message.as_str()).collect();
    assert_eq!(texts, vec!["jan5-09"]);
}

#[tokio::test]
async fn test_chat_timestamps_listed_for_dates() {
    require_emulator!();

    let db = test_db().await;
    let uid = unique_uid("dates");
    seed_user(&db, &uid, 15, Some(Utc::now())).await;

    let ts = Utc.with_ymd_and_hms(2025, 3, 2, 9, 30, 0).unwrap();
    db.save_chat_message(&uid, &message_at("hello", ts))
        .await
        .unwrap();

    let timestamps = db.list_chat_timestamps(&uid).await.unwrap();
    assert_eq!(timestamps, vec![ts]);
}

// ═══════════════════════════════════════════════════════════════════════════
// STREAK TESTS
// ═══════════════════════════════════════════════════════════════════════════

async fn seed_streak(db: &FirestoreDb, uid: &str, streak: u32, last_login_days_ago: i64) {
    let mut profile = seed_user(db, uid, 15, Some(Utc::now())).await;
    profile.streak = Some(streak);
    profile.last_login = Some(Utc::now() - Duration::days(last_login_days_ago));
    db.upsert_user(uid, &profile).await.unwrap();
}

#[tokio::test]
async fn test_streak_rules() {
    require_emulator!();

    let db = test_db().await;

    let uid = unique_uid("streak-today");
    seed_streak(&db, &uid, 4, 0).await;
    assert_eq!(
        db.update_streak(&uid).await.unwrap(),
        StreakUpdate::Unchanged(4)
    );

    let uid = unique_uid("streak-yesterday");
    seed_streak(&db, &uid, 4, 1).await;
    assert_eq!(db.update_streak(&uid).await.unwrap(), StreakUpdate::Set(5));
    assert_eq!(db.get_streak(&uid).await.unwrap(), 5);

    let uid = unique_uid("streak-gap");
    seed_streak(&db, &uid, 4, 3).await;
    assert_eq!(db.update_streak(&uid).await.unwrap(), StreakUpdate::Set(1));
}

#[tokio::test]
async fn test_streak_without_prior_login_starts_at_one() {
    require_emulator!();

    let db = test_db().await;
    let uid = unique_uid("streak-new");
    let mut profile = seed_user(&db, &uid, 15, Some(Utc::now())).await;
    profile.last_login = None;
    db.upsert_user(&uid, &profile).await.unwrap();

    assert_eq!(db.update_streak(&uid).await.unwrap(), StreakUpdate::Set(1));

    let user = db.get_user(&uid).await.unwrap().unwrap();
    assert_eq!(user.streak, Some(1));
    assert!(user.last_login.is_some());
}
