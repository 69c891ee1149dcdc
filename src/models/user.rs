//! User model for storage and API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::services::quota::FREE_MESSAGES_PER_MONTH;

/// Countries offered by the settings form.
pub const COUNTRIES: [&str; 5] = ["us", "ca", "uk", "br", "pt"];

/// Psychology frameworks a user can prefer.
pub const PSYCHOLOGY_SCHOOLS: [&str; 5] = [
    "cognitive",
    "behavioral",
    "psychoanalytic",
    "humanistic",
    "biological",
];

fn default_free_messages() -> u32 {
    FREE_MESSAGES_PER_MONTH
}

/// User profile stored in Firestore at `users/{uid}`.
///
/// Field names are camelCase in the document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Email address (may be empty if the provider did not share it)
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
    /// Profile picture URL
    #[serde(default, rename = "photoURL")]
    pub photo_url: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub newsletter: Option<bool>,
    #[serde(default)]
    pub psychology_school: Option<String>,
    /// Remaining free chat exchanges this month
    #[serde(default = "default_free_messages")]
    pub free_messages: u32,
    /// When the free-message quota was last reset
    #[serde(default, with = "firestore::serialize_as_optional_timestamp")]
    pub last_free_messages_reset: Option<DateTime<Utc>>,
    /// Consecutive-day usage counter
    #[serde(default)]
    pub streak: Option<u32>,
    #[serde(default, with = "firestore::serialize_as_optional_timestamp")]
    pub last_login: Option<DateTime<Utc>>,
}

/// Identity fields taken from a verified Firebase ID token.
#[derive(Debug, Clone, Default)]
pub struct LoginIdentity {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    pub phone_number: Option<String>,
}

impl LoginIdentity {
    /// Document fields a repeat login refreshes on an existing user.
    ///
    /// Quota, streak and settings are never among them, so the write cannot
    /// clobber a concurrent quota transaction.
    pub fn login_field_paths(&self, country: Option<&str>) -> Vec<&'static str> {
        let mut fields = vec!["lastLogin"];
        if self.email.is_some() {
            fields.push("email");
        }
        if self.photo_url.is_some() {
            fields.push("photoURL");
        }
        if country.is_some() {
            fields.push("country");
        }
        fields
    }

    /// Split the display name into first name and the remaining words.
    pub fn split_name(&self) -> (String, String) {
        let name = self.display_name.as_deref().unwrap_or("").trim();
        match name.split_once(char::is_whitespace) {
            Some((first, rest)) => (first.to_string(), rest.trim().to_string()),
            None => (name.to_string(), String::new()),
        }
    }
}

impl UserProfile {
    /// Build the document written on login.
    ///
    /// Existing users keep their data; identity fields and `lastLogin` are
    /// refreshed and a supplied country overrides the stored one. New users
    /// start with a full monthly allowance.
    pub fn merge_login(
        existing: Option<UserProfile>,
        identity: &LoginIdentity,
        country: Option<&str>,
        now: DateTime<Utc>,
    ) -> UserProfile {
        match existing {
            Some(mut profile) => {
                if let Some(email) = &identity.email {
                    profile.email = email.clone();
                }
                if let Some(photo) = &identity.photo_url {
                    profile.photo_url = photo.clone();
                }
                if let Some(country) = country {
                    profile.country = country.to_string();
                }
                profile.last_login = Some(now);
                profile
            }
            None => {
                let (first_name, last_name) = identity.split_name();
                UserProfile {
                    email: identity.email.clone().unwrap_or_default(),
                    display_name: identity.display_name.clone(),
                    photo_url: identity.photo_url.clone().unwrap_or_default(),
                    phone_number: identity.phone_number.clone().unwrap_or_default(),
                    first_name,
                    last_name,
                    country: country.unwrap_or_default().to_string(),
                    address: None,
                    newsletter: None,
                    psychology_school: None,
                    free_messages: FREE_MESSAGES_PER_MONTH,
                    last_free_messages_reset: Some(now),
                    streak: None,
                    last_login: Some(now),
                }
            }
        }
    }
}

/// Partial profile update from the settings form.
///
/// Only fields that are present are written.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[validate(length(max = 100))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[validate(url)]
    #[serde(rename = "photoURL", skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[validate(email)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[validate(length(max = 32))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[validate(length(max = 200))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[validate(custom(function = "validate_country"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub newsletter: Option<bool>,
    #[validate(custom(function = "validate_psychology_school"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub psychology_school: Option<String>,
}

impl ProfileUpdate {
    /// Document field paths carried by this update.
    pub fn field_paths(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.display_name.is_some() {
            fields.push("displayName");
        }
        if self.photo_url.is_some() {
            fields.push("photoURL");
        }
        if self.email.is_some() {
            fields.push("email");
        }
        if self.phone_number.is_some() {
            fields.push("phoneNumber");
        }
        if self.address.is_some() {
            fields.push("address");
        }
        if self.country.is_some() {
            fields.push("country");
        }
        if self.newsletter.is_some() {
            fields.push("newsletter");
        }
        if self.psychology_school.is_some() {
            fields.push("psychologySchool");
        }
        fields
    }
}

fn validate_country(country: &str) -> Result<(), validator::ValidationError> {
    if COUNTRIES.contains(&country) {
        Ok(())
    } else {
        Err(validator::ValidationError::new("unknown_country"))
    }
}

fn validate_psychology_school(school: &str) -> Result<(), validator::ValidationError> {
    if PSYCHOLOGY_SCHOOLS.contains(&school) {
        Ok(())
    } else {
        Err(validator::ValidationError::new("unknown_psychology_school"))
    }
}
