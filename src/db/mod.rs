//! Database layer (Firestore).

pub mod firestore;

pub use firestore::{ChatQueryCursor, FirestoreDb};

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    /// Per-user sub-collection under `users/{uid}`
    pub const CHAT: &str = "chat";
}
