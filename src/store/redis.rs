//! Redis store backend
//!
//! Documents are serialized as JSON strings. Session and final-model keys
//! carry a TTL, which implements the session-expiry lifecycle; the chat
//! log and user registry are durable keys.
//!
//! Key layout:
//! - `session:{user}`   session document (TTL)
//! - `final:{user}`     final-model document (TTL)
//! - `chats:{user}`     list of turn documents, append order
//! - `chats:total`      global turn counter
//! - `user:{user}`      user document
//! - `users:{platform}` set of user ids per platform
//! - `model:{key}`      catalog entry
//! - `models:index`     set of catalog keys

use super::{
    CatalogEntry, CatalogRepository, ChatRepository, FinalModelRecord, SessionRepository,
    TurnRecord, UserRecord,
};
use crate::config::StoreConfig;
use crate::error::{AppError, AppResult};
use crate::platform::Platform;
use crate::session::Session;
use async_trait::async_trait;
use deadpool_redis::{Config as DeadpoolConfig, Pool, PoolConfig, Runtime};
use redis::AsyncCommands;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Connection-pooled Redis document store
#[derive(Clone, Debug)]
pub struct RedisStore {
    pool: Arc<Pool>,
    ttl_seconds: u64,
}

impl RedisStore {
    /// Create a store from config and verify the connection with PING
    pub async fn connect(config: &StoreConfig) -> AppResult<Self> {
        let url = config
            .redis_url
            .as_deref()
            .ok_or_else(|| AppError::Config("store.redis_url is not set".into()))?;

        tracing::info!("Connecting to Redis");

        let mut cfg = DeadpoolConfig::from_url(url);
        cfg.pool = Some(PoolConfig::new(config.pool_size));
        let pool = cfg
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| AppError::Persistence(format!("failed to create Redis pool: {e}")))?;

        let mut conn = pool
            .get()
            .await
            .map_err(|e| AppError::Persistence(format!("failed to get Redis connection: {e}")))?;
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| AppError::Persistence(format!("Redis PING failed: {e}")))?;
        tracing::info!("Redis connection established");

        Ok(Self {
            pool: Arc::new(pool),
            ttl_seconds: config.session_ttl_seconds as u64,
        })
    }

    async fn conn(&self) -> AppResult<deadpool_redis::Connection> {
        self.pool
            .get()
            .await
            .map_err(|e| AppError::Persistence(format!("Redis pool exhausted: {e}")))
    }

    fn encode<T: Serialize>(value: &T) -> AppResult<String> {
        serde_json::to_string(value)
            .map_err(|e| AppError::Persistence(format!("failed to encode document: {e}")))
    }

    fn decode<T: DeserializeOwned>(raw: &str) -> AppResult<T> {
        serde_json::from_str(raw)
            .map_err(|e| AppError::Persistence(format!("failed to decode document: {e}")))
    }

    async fn get_doc<T: DeserializeOwned>(&self, key: &str) -> AppResult<Option<T>> {
        let mut conn = self.conn().await?;
        let raw: Option<String> = conn
            .get(key)
            .await
            .map_err(|e| AppError::Persistence(format!("GET {key} failed: {e}")))?;
        raw.as_deref().map(Self::decode).transpose()
    }

    async fn put_doc_with_ttl<T: Serialize>(&self, key: &str, value: &T) -> AppResult<()> {
        let encoded = Self::encode(value)?;
        let mut conn = self.conn().await?;
        let _: () = conn
            .set_ex(key, encoded, self.ttl_seconds)
            .await
            .map_err(|e| AppError::Persistence(format!("SET {key} failed: {e}")))?;
        Ok(())
    }
}

fn session_key(user_id: &str) -> String {
    format!("session:{user_id}")
}

fn final_key(user_id: &str) -> String {
    format!("final:{user_id}")
}

fn chats_key(user_id: &str) -> String {
    format!("chats:{user_id}")
}

fn user_key(user_id: &str) -> String {
    format!("user:{user_id}")
}

fn platform_set_key(platform: &str) -> String {
    format!("users:{platform}")
}

fn model_key(key: &str) -> String {
    format!("model:{key}")
}

const MODELS_INDEX_KEY: &str = "models:index";
const TURN_COUNTER_KEY: &str = "chats:total";

#[async_trait]
impl SessionRepository for RedisStore {
    async fn get_session(&self, user_id: &str) -> AppResult<Option<Session>> {
        self.get_doc(&session_key(user_id)).await
    }

    async fn put_session(&self, user_id: &str, session: &Session) -> AppResult<()> {
        self.put_doc_with_ttl(&session_key(user_id), session).await
    }

    async fn get_final_model(&self, user_id: &str) -> AppResult<Option<FinalModelRecord>> {
        self.get_doc(&final_key(user_id)).await
    }

    async fn set_final_model(&self, record: &FinalModelRecord) -> AppResult<()> {
        self.put_doc_with_ttl(&final_key(&record.user_id), record)
            .await
    }

    async fn clear_user(&self, user_id: &str) -> AppResult<u64> {
        let mut conn = self.conn().await?;
        let deleted: u64 = conn
            .del(&[session_key(user_id), final_key(user_id)])
            .await
            .map_err(|e| AppError::Persistence(format!("DEL session/final failed: {e}")))?;
        Ok(deleted)
    }
}

#[async_trait]
impl ChatRepository for RedisStore {
    async fn append_turn(&self, turn: &TurnRecord) -> AppResult<()> {
        let encoded = Self::encode(turn)?;
        let key = chats_key(&turn.user_id);
        let mut conn = self.conn().await?;
        let _: () = conn
            .rpush(&key, encoded)
            .await
            .map_err(|e| AppError::Persistence(format!("RPUSH {key} failed: {e}")))?;
        let _: () = conn
            .incr(TURN_COUNTER_KEY, 1)
            .await
            .map_err(|e| AppError::Persistence(format!("INCR turn counter failed: {e}")))?;
        Ok(())
    }

    async fn recent_turns(&self, user_id: &str, limit: usize) -> AppResult<Vec<TurnRecord>> {
        let key = chats_key(user_id);
        let mut conn = self.conn().await?;
        let raw: Vec<String> = conn
            .lrange(&key, -(limit as isize), -1)
            .await
            .map_err(|e| AppError::Persistence(format!("LRANGE {key} failed: {e}")))?;
        raw.iter().map(|r| Self::decode(r)).collect()
    }

    async fn full_history(&self, user_id: &str) -> AppResult<Vec<TurnRecord>> {
        let key = chats_key(user_id);
        let mut conn = self.conn().await?;
        let raw: Vec<String> = conn
            .lrange(&key, 0, -1)
            .await
            .map_err(|e| AppError::Persistence(format!("LRANGE {key} failed: {e}")))?;
        raw.iter().map(|r| Self::decode(r)).collect()
    }

    async fn clear_history(&self, user_id: &str) -> AppResult<u64> {
        let key = chats_key(user_id);
        let mut conn = self.conn().await?;
        let count: u64 = conn
            .llen(&key)
            .await
            .map_err(|e| AppError::Persistence(format!("LLEN {key} failed: {e}")))?;
        let _: () = conn
            .del(&key)
            .await
            .map_err(|e| AppError::Persistence(format!("DEL {key} failed: {e}")))?;
        Ok(count)
    }

    async fn register_user(&self, user: &UserRecord) -> AppResult<bool> {
        let encoded = Self::encode(user)?;
        let key = user_key(&user.user_id);
        let mut conn = self.conn().await?;
        let created: bool = conn
            .set_nx(&key, encoded)
            .await
            .map_err(|e| AppError::Persistence(format!("SETNX {key} failed: {e}")))?;
        if created {
            let _: () = conn
                .sadd(platform_set_key(&user.platform), &user.user_id)
                .await
                .map_err(|e| AppError::Persistence(format!("SADD platform set failed: {e}")))?;
        }
        Ok(created)
    }

    async fn find_user(&self, user_id: &str) -> AppResult<Option<UserRecord>> {
        self.get_doc(&user_key(user_id)).await
    }

    async fn user_count(&self, platform: Platform) -> AppResult<u64> {
        let key = platform_set_key(platform.as_str());
        let mut conn = self.conn().await?;
        conn.scard(&key)
            .await
            .map_err(|e| AppError::Persistence(format!("SCARD {key} failed: {e}")))
    }

    async fn turn_count(&self) -> AppResult<u64> {
        let mut conn = self.conn().await?;
        let count: Option<u64> = conn
            .get(TURN_COUNTER_KEY)
            .await
            .map_err(|e| AppError::Persistence(format!("GET turn counter failed: {e}")))?;
        Ok(count.unwrap_or(0))
    }
}

#[async_trait]
impl CatalogRepository for RedisStore {
    async fn display_name(&self, key: &str) -> AppResult<Option<String>> {
        if let Some(entry) = self.get_doc::<CatalogEntry>(&model_key(key)).await? {
            return Ok(Some(entry.name));
        }
        // Shortlists sometimes carry the display name itself
        Ok(self
            .all_models()
            .await?
            .into_iter()
            .find(|e| e.name == key)
            .map(|e| e.name))
    }

    async fn all_models(&self) -> AppResult<Vec<CatalogEntry>> {
        let mut conn = self.conn().await?;
        let keys: Vec<String> = conn
            .smembers(MODELS_INDEX_KEY)
            .await
            .map_err(|e| AppError::Persistence(format!("SMEMBERS models index failed: {e}")))?;
        let mut entries = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(entry) = self.get_doc::<CatalogEntry>(&model_key(&key)).await? {
                entries.push(entry);
            }
        }
        Ok(entries)
    }
}
