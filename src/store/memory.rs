//! In-memory store backend
//!
//! Used by the test suite and when no Redis URL is configured. Data does
//! not survive a restart; sessions never expire.

use super::{
    CatalogEntry, CatalogRepository, ChatRepository, FinalModelRecord, SessionRepository,
    TurnRecord, UserRecord,
};
use crate::error::AppResult;
use crate::platform::Platform;
use crate::session::Session;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
struct Inner {
    sessions: HashMap<String, Session>,
    final_models: HashMap<String, FinalModelRecord>,
    turns: Vec<TurnRecord>,
    users: HashMap<String, UserRecord>,
    catalog: Vec<CatalogEntry>,
}

/// Store backend holding everything behind one RwLock
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Preload catalog entries (the Redis backend reads these from the
    /// deployment's seeded documents instead)
    pub async fn seed_catalog(&self, entries: Vec<CatalogEntry>) {
        self.inner.write().await.catalog = entries;
    }
}

#[async_trait]
impl SessionRepository for MemoryStore {
    async fn get_session(&self, user_id: &str) -> AppResult<Option<Session>> {
        Ok(self.inner.read().await.sessions.get(user_id).cloned())
    }

    async fn put_session(&self, user_id: &str, session: &Session) -> AppResult<()> {
        self.inner
            .write()
            .await
            .sessions
            .insert(user_id.to_string(), session.clone());
        Ok(())
    }

    async fn get_final_model(&self, user_id: &str) -> AppResult<Option<FinalModelRecord>> {
        Ok(self.inner.read().await.final_models.get(user_id).cloned())
    }

    async fn set_final_model(&self, record: &FinalModelRecord) -> AppResult<()> {
        self.inner
            .write()
            .await
            .final_models
            .insert(record.user_id.clone(), record.clone());
        Ok(())
    }

    async fn clear_user(&self, user_id: &str) -> AppResult<u64> {
        let mut inner = self.inner.write().await;
        let mut deleted = 0;
        if inner.sessions.remove(user_id).is_some() {
            deleted += 1;
        }
        if inner.final_models.remove(user_id).is_some() {
            deleted += 1;
        }
        Ok(deleted)
    }
}

#[async_trait]
impl ChatRepository for MemoryStore {
    async fn append_turn(&self, turn: &TurnRecord) -> AppResult<()> {
        self.inner.write().await.turns.push(turn.clone());
        Ok(())
    }

    async fn recent_turns(&self, user_id: &str, limit: usize) -> AppResult<Vec<TurnRecord>> {
        let inner = self.inner.read().await;
        let mut turns: Vec<TurnRecord> = inner
            .turns
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        if turns.len() > limit {
            turns.drain(..turns.len() - limit);
        }
        Ok(turns)
    }

    async fn full_history(&self, user_id: &str) -> AppResult<Vec<TurnRecord>> {
        Ok(self
            .inner
            .read()
            .await
            .turns
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn clear_history(&self, user_id: &str) -> AppResult<u64> {
        let mut inner = self.inner.write().await;
        let before = inner.turns.len();
        inner.turns.retain(|t| t.user_id != user_id);
        Ok((before - inner.turns.len()) as u64)
    }

    async fn register_user(&self, user: &UserRecord) -> AppResult<bool> {
        let mut inner = self.inner.write().await;
        if inner.users.contains_key(&user.user_id) {
            return Ok(false);
        }
        inner.users.insert(user.user_id.clone(), user.clone());
        Ok(true)
    }

    async fn find_user(&self, user_id: &str) -> AppResult<Option<UserRecord>> {
        Ok(self.inner.read().await.users.get(user_id).cloned())
    }

    async fn user_count(&self, platform: Platform) -> AppResult<u64> {
        Ok(self
            .inner
            .read()
            .await
            .users
            .values()
            .filter(|u| u.platform == platform.as_str())
            .count() as u64)
    }

    async fn turn_count(&self) -> AppResult<u64> {
        Ok(self.inner.read().await.turns.len() as u64)
    }
}

#[async_trait]
impl CatalogRepository for MemoryStore {
    async fn display_name(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self
            .inner
            .read()
            .await
            .catalog
            .iter()
            .find(|e| e.key == key || e.name == key)
            .map(|e| e.name.clone()))
    }

    async fn all_models(&self) -> AppResult<Vec<CatalogEntry>> {
        Ok(self.inner.read().await.catalog.clone())
    }
}
