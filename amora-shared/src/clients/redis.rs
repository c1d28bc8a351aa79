use std::time::Duration;

use redis::aio::ConnectionManager;
use redis::{AsyncCommands, RedisResult};

/// Thin async handle over a multiplexed Redis connection. Cloning shares the
/// underlying connection.
#[derive(Clone)]
pub struct RedisClient {
    conn: ConnectionManager,
}

impl RedisClient {
    pub async fn connect(url: &str) -> RedisResult<Self> {
        let conn = redis::Client::open(url)?.get_connection_manager().await?;
        Ok(Self { conn })
    }

    pub async fn get(&self, key: &str) -> RedisResult<Option<String>> {
        self.conn.clone().get(key).await
    }

    /// Stores `value` under `key`, expiring after `ttl`. Sub-second TTLs are
    /// rounded up so the key never outlives less than one second.
    pub async fn put(&self, key: &str, value: &str, ttl: Duration) -> RedisResult<()> {
        self.conn.clone().set_ex(key, value, expiry_secs(ttl)).await
    }

    /// Returns whether a key was actually removed.
    pub async fn remove(&self, key: &str) -> RedisResult<bool> {
        let removed: u64 = self.conn.clone().del(key).await?;
        Ok(removed > 0)
    }

    pub async fn ping(&self) -> RedisResult<()> {
        let mut conn = self.conn.clone();
        redis::cmd("PING").query_async::<_, String>(&mut conn).await?;
        Ok(())
    }
}

fn expiry_secs(ttl: Duration) -> u64 {
    let secs = ttl.as_secs();
    if ttl.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_rounds_up_partial_seconds() {
        assert_eq!(expiry_secs(Duration::from_secs(300)), 300);
        assert_eq!(expiry_secs(Duration::from_millis(1500)), 2);
        assert_eq!(expiry_secs(Duration::from_millis(10)), 1);
        assert_eq!(expiry_secs(Duration::ZERO), 1);
    }
}
