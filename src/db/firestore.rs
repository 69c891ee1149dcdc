// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (profile, free-message quota, streak)
//! - Chat (append-only `users/{uid}/chat` sub-collection)

use chrono::{DateTime, NaiveDate, Utc};
use firestore::{FirestoreQueryDirection, FirestoreTimestamp};
use serde::{Deserialize, Serialize};

use crate::db::collections;
use crate::error::AppError;
use crate::models::{ChatMessage, LoginIdentity, ProfileUpdate, UserProfile};
use crate::services::quota::{self, ConsumptionPlan, QuotaState};
use crate::services::streak::{self, StreakUpdate};
use crate::time_utils::day_window;

/// Position of the last message on a history page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatQueryCursor {
    pub timestamp: DateTime<Utc>,
    pub message_id: String,
}

impl ChatQueryCursor {
    /// Whether the cursor points inside the inclusive `[start, end]` window.
    pub fn is_within(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        start <= self.timestamp && self.timestamp <= end
    }
}

/// Quota fields of the user document.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuotaFields {
    free_messages: u32,
    #[serde(with = "firestore::serialize_as_optional_timestamp")]
    last_free_messages_reset: Option<DateTime<Utc>>,
}

/// Streak fields of the user document.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StreakFields {
    streak: u32,
    #[serde(with = "firestore::serialize_as_timestamp")]
    last_login: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LastLoginField {
    #[serde(with = "firestore::serialize_as_timestamp")]
    last_login: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct ChatTimestamp {
    #[serde(with = "firestore::serialize_as_timestamp")]
    timestamp: DateTime<Utc>,
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // The emulator takes any bearer token, so skip local credentials.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Get a user by Firebase uid.
    pub async fn get_user(&self, uid: &str) -> Result<Option<UserProfile>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(uid)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a user, failing with `NotFound` when the document is missing.
    pub async fn require_user(&self, uid: &str) -> Result<UserProfile, AppError> {
        self.get_user(uid)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", uid)))
    }

    /// Write a full user document.
    pub async fn upsert_user(&self, uid: &str, user: &UserProfile) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(uid)
            .object(user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Create the user on first login, or refresh identity fields.
    ///
    /// Existing quota, streak and settings are preserved.
    pub async fn save_user_on_login(
        &self,
        identity: &LoginIdentity,
        country: Option<&str>,
    ) -> Result<UserProfile, AppError> {
        let existing = self.get_user(&identity.uid).await?;
        let is_new = existing.is_none();
        let profile = UserProfile::merge_login(existing, identity, country, Utc::now());

        if is_new {
            self.upsert_user(&identity.uid, &profile).await?;
        } else {
            // Only identity fields; quota is owned by the consumption transaction.
            let _: () = self
                .get_client()?
                .fluent()
                .update()
                .fields(identity.login_field_paths(country))
                .in_col(collections::USERS)
                .document_id(&identity.uid)
                .object(&profile)
                .execute()
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }

        tracing::info!(uid = %identity.uid, is_new, "User saved on login");
        Ok(profile)
    }

    /// Stamp `lastLogin` with the current time.
    pub async fn update_last_login(&self, uid: &str) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .fields(["lastLogin"])
            .in_col(collections::USERS)
            .document_id(uid)
            .object(&LastLoginField {
                last_login: Utc::now(),
            })
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Merge-write only the fields present in a settings update.
    pub async fn update_profile(&self, uid: &str, update: &ProfileUpdate) -> Result<(), AppError> {
        let fields = update.field_paths();
        if fields.is_empty() {
            return Ok(());
        }

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .fields(fields)
            .in_col(collections::USERS)
            .document_id(uid)
            .object(update)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        tracing::debug!(uid, "Profile updated");
        Ok(())
    }

    // ─── Quota Operations ────────────────────────────────────────

    /// Current free-message count, applying the monthly reset.
    ///
    /// A reset is written back before the count is returned.
    pub async fn get_free_messages_count(&self, uid: &str) -> Result<u32, AppError> {
        let user = self.require_user(uid).await?;
        let now = Utc::now();
        let checked = quota::check(QuotaState::from(&user), now);

        if checked.reset {
            self.write_quota(uid, checked.free_messages, Some(now))
                .await?;
            tracing::info!(uid, "Monthly free-message quota reset");
        }

        Ok(checked.free_messages)
    }

    /// Overwrite the stored count (last write wins).
    pub async fn update_free_messages(&self, uid: &str, count: u32) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .fields(["freeMessages"])
            .in_col(collections::USERS)
            .document_id(uid)
            .object(&QuotaFields {
                free_messages: count,
                last_free_messages_reset: None,
            })
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn write_quota(
        &self,
        uid: &str,
        free_messages: u32,
        reset: Option<DateTime<Utc>>,
    ) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .fields(["freeMessages", "lastFreeMessagesReset"])
            .in_col(collections::USERS)
            .document_id(uid)
            .object(&QuotaFields {
                free_messages,
                last_free_messages_reset: reset,
            })
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Atomically apply the monthly reset and take one free message.
    ///
    /// Runs as a Firestore transaction: if another session changes the user
    /// document between the read and the commit, Firestore retries with fresh
    /// data, so no decrement is lost or spent twice.
    pub async fn consume_free_message(&self, uid: &str) -> Result<ConsumptionPlan, AppError> {
        let uid_owned = uid.to_string();

        let plan = self
            .get_client()?
            .run_transaction(|db, transaction| {
                let uid = uid_owned.clone();
                Box::pin(async move {
                    let user: Option<UserProfile> = db
                        .fluent()
                        .select()
                        .by_id_in(collections::USERS)
                        .obj()
                        .one(&uid)
                        .await?;

                    let Some(user) = user else {
                        return Ok(None);
                    };

                    let now = Utc::now();
                    let plan = quota::plan_consumption(QuotaState::from(&user), now);

                    if plan.needs_write() {
                        let reset = if plan.reset {
                            Some(now)
                        } else {
                            user.last_free_messages_reset
                        };

                        db.fluent()
                            .update()
                            .fields(["freeMessages", "lastFreeMessagesReset"])
                            .in_col(collections::USERS)
                            .document_id(&uid)
                            .object(&QuotaFields {
                                free_messages: plan.free_messages,
                                last_free_messages_reset: reset,
                            })
                            .add_to_transaction(transaction)?;
                    }

                    Ok(Some(plan))
                })
            })
            .await
            .map_err(|e| AppError::Database(format!("Quota transaction failed: {}", e)))?;

        let plan = plan.ok_or_else(|| AppError::NotFound(format!("User {} not found", uid)))?;

        tracing::debug!(
            uid,
            outcome = ?plan.outcome,
            free_messages = plan.free_messages,
            reset = plan.reset,
            "Free message consumption"
        );

        Ok(plan)
    }

    // ─── Chat Operations ─────────────────────────────────────────

    /// Append a chat exchange to `users/{uid}/chat`.
    pub async fn save_chat_message(
        &self,
        uid: &str,
        message: &ChatMessage,
    ) -> Result<ChatMessage, AppError> {
        let client = self.get_client()?;
        let parent_path = client
            .parent_path(collections::USERS, uid)
            .map_err(|e| AppError::Database(e.to_string()))?;

        client
            .fluent()
            .insert()
            .into(collections::CHAT)
            .generate_document_id()
            .parent(&parent_path)
            .object(message)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Messages of one calendar day (UTC), oldest first.
    ///
    /// Returns at most `limit` messages after `cursor`.
    pub async fn get_chat_messages_for_day(
        &self,
        uid: &str,
        day: NaiveDate,
        cursor: Option<&ChatQueryCursor>,
        limit: u32,
    ) -> Result<Vec<ChatMessage>, AppError> {
        let (start, end) = day_window(day)
            .ok_or_else(|| AppError::BadRequest(format!("Day {} is out of range", day)))?;
        if cursor.is_some_and(|c| !c.is_within(start, end)) {
            return Err(AppError::BadRequest(
                "Cursor does not belong to the requested day".to_string(),
            ));
        }
        let client = self.get_client()?;
        let parent_path = client
            .parent_path(collections::USERS, uid)
            .map_err(|e| AppError::Database(e.to_string()))?;

        let mut messages = Vec::new();

        // Messages sharing the cursor's timestamp are ordered by document id.
        let lower = match cursor {
            Some(cursor) => {
                let tied: Vec<ChatMessage> = client
                    .fluent()
                    .select()
                    .from(collections::CHAT)
                    .parent(&parent_path)
                    .filter(|q| {
                        q.for_all([q
                            .field("timestamp")
                            .eq(FirestoreTimestamp(cursor.timestamp))])
                    })
                    .obj()
                    .query()
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;

                let mut tied: Vec<ChatMessage> = tied
                    .into_iter()
                    .filter(|m| {
                        m.id.as_deref()
                            .is_some_and(|id| id > cursor.message_id.as_str())
                    })
                    .collect();
                tied.sort_by(|a, b| a.id.cmp(&b.id));
                messages.extend(tied);

                cursor.timestamp
            }
            None => start,
        };

        if messages.len() >= limit as usize {
            messages.truncate(limit as usize);
            return Ok(messages);
        }

        let remaining = limit - messages.len() as u32;
        let include_lower = cursor.is_none();

        let page: Vec<ChatMessage> = client
            .fluent()
            .select()
            .from(collections::CHAT)
            .parent(&parent_path)
            .filter(|q| {
                let lower_bound = if include_lower {
                    q.field("timestamp")
                        .greater_than_or_equal(FirestoreTimestamp(lower))
                } else {
                    q.field("timestamp").greater_than(FirestoreTimestamp(lower))
                };
                q.for_all([
                    lower_bound,
                    q.field("timestamp")
                        .less_than_or_equal(FirestoreTimestamp(end)),
                ])
            })
            .order_by([("timestamp", FirestoreQueryDirection::Ascending)])
            .limit(remaining)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        messages.extend(page);
        Ok(messages)
    }

    /// Timestamps of every stored message of a user.
    pub async fn list_chat_timestamps(&self, uid: &str) -> Result<Vec<DateTime<Utc>>, AppError> {
        let client = self.get_client()?;
        let parent_path = client
            .parent_path(collections::USERS, uid)
            .map_err(|e| AppError::Database(e.to_string()))?;

        let rows: Vec<ChatTimestamp> = client
            .fluent()
            .select()
            .fields(["timestamp"])
            .from(collections::CHAT)
            .parent(&parent_path)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(rows.into_iter().map(|row| row.timestamp).collect())
    }

    // ─── Streak Operations ───────────────────────────────────────

    /// Check in for today and update the consecutive-day streak.
    pub async fn update_streak(&self, uid: &str) -> Result<StreakUpdate, AppError> {
        let user = self.require_user(uid).await?;
        let now = Utc::now();
        let update = streak::next_streak(user.last_login, user.streak, now);

        if let StreakUpdate::Set(value) = update {
            let _: () = self
                .get_client()?
                .fluent()
                .update()
                .fields(["streak", "lastLogin"])
                .in_col(collections::USERS)
                .document_id(uid)
                .object(&StreakFields {
                    streak: value,
                    last_login: now,
                })
                .execute()
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }

        tracing::debug!(uid, update = ?update, "Streak checked");
        Ok(update)
    }

    /// Stored streak, zero when never set.
    pub async fn get_streak(&self, uid: &str) -> Result<u32, AppError> {
        Ok(self.require_user(uid).await?.streak.unwrap_or(0))
    }
}
