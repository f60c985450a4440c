use std::time::Duration;

use async_trait::async_trait;
use redis::{AsyncCommands, aio::ConnectionManager};

use crate::cache::models::rate_limit::CachedRateLimit;
use crate::cache::store::{CounterStore, StoreError};

/// Redis 限流计数存储，所有调用共享同一个自动重连的多路复用连接
#[derive(Clone)]
pub struct RedisCounterStore {
    conn: ConnectionManager,
}

impl RedisCounterStore {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    /// 获取速率限制计数
    async fn get(&self, key: &str) -> Result<Option<u64>, StoreError> {
        let mut conn = self.conn.clone();

        let result: Option<String> = conn.get(key).await?;

        match result {
            Some(json) => {
                let cached: CachedRateLimit = serde_json::from_str(&json)?;
                Ok(Some(cached.count))
            }
            None => Ok(None),
        }
    }

    /// 设置速率限制计数，并重置过期时间
    async fn put(&self, key: &str, count: u64, ttl: Duration) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();

        let ttl = ttl.as_secs().max(1);
        let cached = CachedRateLimit {
            key: key.to_string(),
            count,
            reset_at: chrono::Utc::now().timestamp() + ttl as i64,
        };

        let json = serde_json::to_string(&cached)?;
        let _: () = conn.set_ex(key, json, ttl).await?;

        Ok(())
    }
}
