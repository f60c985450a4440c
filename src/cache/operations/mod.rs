/// 缓存操作
/// 基于 Redis 的存储后端实现

// 限流计数
pub mod rate_limit;

// 响应缓存
pub mod response;

// 重新导出常用操作
pub use rate_limit::RedisCounterStore;
pub use response::RedisResponseStore;

use redis::{Client as RedisClient, RedisResult, aio::ConnectionManager};

/// 启动时建立一次连接，两个存储克隆共享
pub async fn connect(redis: RedisClient) -> RedisResult<ConnectionManager> {
    ConnectionManager::new(redis).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::models::CachedResponse;
    use crate::cache::store::{CounterStore, ResponseStore};
    use std::time::Duration;

    // 需要本地 Redis：REDIS_URL=redis://127.0.0.1/ cargo test -- --ignored
    #[tokio::test]
    #[ignore]
    async fn stores_share_one_connection() {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1/".into());
        let conn = connect(RedisClient::open(url).unwrap()).await.unwrap();

        let counters = RedisCounterStore::new(conn.clone());
        let responses = RedisResponseStore::new(conn, Duration::from_secs(30));

        let key = format!("rate_limit:test-{}", chrono::Utc::now().timestamp_micros());
        for count in 1..=20 {
            counters.put(&key, count, Duration::from_secs(30)).await.unwrap();
        }
        assert_eq!(counters.get(&key).await.unwrap(), Some(20));

        let entry = CachedResponse {
            status: 200,
            headers: vec![],
            body: b"ok".to_vec(),
            stored_at: 0,
        };
        responses.store("GET /shared", entry.clone()).await.unwrap();
        assert_eq!(responses.lookup("GET /shared").await.unwrap(), Some(entry));
    }
}
