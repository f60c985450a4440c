use std::time::Duration;

use async_trait::async_trait;
use redis::{AsyncCommands, aio::ConnectionManager};

use crate::cache::keys::redis_response_key;
use crate::cache::models::CachedResponse;
use crate::cache::store::{ResponseStore, StoreError};

/// Redis 响应缓存存储。条目以单个 JSON 值写入，SET 是原子的
#[derive(Clone)]
pub struct RedisResponseStore {
    conn: ConnectionManager,
    ttl: Duration,
}

impl RedisResponseStore {
    pub fn new(conn: ConnectionManager, ttl: Duration) -> Self {
        Self { conn, ttl }
    }
}

#[async_trait]
impl ResponseStore for RedisResponseStore {
    async fn lookup(&self, key: &str) -> Result<Option<CachedResponse>, StoreError> {
        let mut conn = self.conn.clone();

        let result: Option<String> = conn.get(redis_response_key(key)).await?;

        match result {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn store(&self, key: &str, response: CachedResponse) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();

        let json = serde_json::to_string(&response)?;
        let _: () = conn
            .set_ex(redis_response_key(key), json, self.ttl.as_secs().max(1))
            .await?;

        Ok(())
    }
}
