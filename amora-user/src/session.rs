use async_trait::async_trait;
use chrono::Duration;
use uuid::Uuid;

use amora_shared::clients::redis::RedisClient;
use amora_shared::errors::{AppError, AppResult};

/// Key/value store holding the live session token of each logged-in user.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()>;

    async fn del(&self, key: &str) -> AppResult<()>;
}

pub fn session_key(user_id: Uuid) -> String {
    format!("session:{user_id}")
}

#[async_trait]
impl SessionStore for RedisClient {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        RedisClient::get(self, key)
            .await
            .map_err(|e| AppError::internal(format!("session lookup failed: {e}")))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        let ttl = ttl.to_std().unwrap_or_default();
        self.put(key, value, ttl)
            .await
            .map_err(|e| AppError::internal(format!("session write failed: {e}")))
    }

    async fn del(&self, key: &str) -> AppResult<()> {
        let removed = self
            .remove(key)
            .await
            .map_err(|e| AppError::internal(format!("session delete failed: {e}")))?;
        if !removed {
            tracing::debug!(key, "no session to drop");
        }
        Ok(())
    }
}
