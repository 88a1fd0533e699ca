//! Persistence boundary
//!
//! The document store is an external collaborator reduced to three narrow
//! repository traits. Two backends ship: a Redis-backed store for
//! deployment and an in-memory store for tests and local development.
//! Store failures are never fatal to a conversation turn; callers log them
//! and continue with in-memory defaults where possible.

mod memory;
mod redis;

pub use memory::MemoryStore;
pub use redis::RedisStore;

use crate::error::AppResult;
use crate::platform::Platform;
use crate::session::Session;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[cfg(test)]
use mockall::automock;

/// One persisted request/response exchange (append-only, never mutated)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnRecord {
    pub user_id: String,
    pub message: String,
    pub response: String,
    pub platform: String,
    pub timestamp: DateTime<Utc>,
}

impl TurnRecord {
    pub fn new(user_id: &str, message: &str, response: &str, platform: Platform) -> Self {
        Self {
            user_id: user_id.to_string(),
            message: message.to_string(),
            response: response.to_string(),
            platform: platform.as_str().to_string(),
            timestamp: Utc::now(),
        }
    }

    #[cfg(test)]
    pub fn for_test(user_id: &str, message: &str, response: &str) -> Self {
        Self::new(user_id, message, response, Platform::Web)
    }
}

/// The one-per-user "final model" document, overwritten on every report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalModelRecord {
    pub user_id: String,
    /// The requirement text that produced the recommendation, verbatim
    pub requirement: String,
    pub model_name: String,
}

/// A registered user (web signup or messaging-platform auto-registration)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub user_id: String,
    pub username: String,
    /// "auto_generated" for messaging-platform users
    pub password: String,
    pub platform: String,
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    /// Record minted when a messaging platform user first writes in
    pub fn auto_registered(user_id: &str, username: &str, platform: Platform) -> Self {
        Self {
            user_id: user_id.to_string(),
            username: username.to_string(),
            password: "auto_generated".to_string(),
            platform: platform.as_str().to_string(),
            created_at: Utc::now(),
        }
    }
}

/// One row of the model catalog fed to the recommendation pipeline
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Stable lookup key, as stored in session shortlists
    pub key: String,
    /// Full display name shown to users
    pub name: String,
    #[serde(default)]
    pub accuracy: Option<String>,
    #[serde(default)]
    pub speed: Option<String>,
    #[serde(default)]
    pub cloud: Option<String>,
    #[serde(default, rename = "type")]
    pub model_type: Option<String>,
    #[serde(default)]
    pub pricing: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
}

/// Session and final-model documents, keyed by user
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn get_session(&self, user_id: &str) -> AppResult<Option<Session>>;
    async fn put_session(&self, user_id: &str, session: &Session) -> AppResult<()>;
    async fn get_final_model(&self, user_id: &str) -> AppResult<Option<FinalModelRecord>>;
    /// Upsert: overwritten on every new report generation
    async fn set_final_model(&self, record: &FinalModelRecord) -> AppResult<()>;
    /// Logout purge of the session and final-model documents
    async fn clear_user(&self, user_id: &str) -> AppResult<u64>;
}

/// Append-only chat log plus the user registry
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ChatRepository: Send + Sync {
    async fn append_turn(&self, turn: &TurnRecord) -> AppResult<()>;
    /// Most recent `limit` turns, returned oldest first
    async fn recent_turns(&self, user_id: &str, limit: usize) -> AppResult<Vec<TurnRecord>>;
    async fn full_history(&self, user_id: &str) -> AppResult<Vec<TurnRecord>>;
    /// Returns the number of deleted turns
    async fn clear_history(&self, user_id: &str) -> AppResult<u64>;
    /// Insert if absent; returns true when a new user was created
    async fn register_user(&self, user: &UserRecord) -> AppResult<bool>;
    async fn find_user(&self, user_id: &str) -> AppResult<Option<UserRecord>>;
    async fn user_count(&self, platform: Platform) -> AppResult<u64>;
    async fn turn_count(&self) -> AppResult<u64>;
}

/// Read-only model catalog
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Resolve a shortlist key to its full display name
    async fn display_name(&self, key: &str) -> AppResult<Option<String>>;
    async fn all_models(&self) -> AppResult<Vec<CatalogEntry>>;
}
