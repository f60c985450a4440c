use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::cache::models::CachedResponse;

/// 存储调用失败。网关从不把它暴露给调用方
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<redis::RedisError> for StoreError {
    fn from(e: redis::RedisError) -> Self {
        StoreError::Unavailable(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Unavailable(format!("serialization error: {}", e))
    }
}

/// 带 TTL 的共享计数存储
#[async_trait]
pub trait CounterStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<u64>, StoreError>;

    async fn put(&self, key: &str, count: u64, ttl: Duration) -> Result<(), StoreError>;
}

/// 完整 HTTP 响应的缓存存储。`store` 整体替换同键的旧条目
#[async_trait]
pub trait ResponseStore: Send + Sync {
    async fn lookup(&self, key: &str) -> Result<Option<CachedResponse>, StoreError>;

    async fn store(&self, key: &str, response: CachedResponse) -> Result<(), StoreError>;
}
