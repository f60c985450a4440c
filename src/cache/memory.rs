//! 进程内存储后端，未配置 Redis 时使用。
//!
//! 条目带 TTL，读取时惰性淘汰，另由 [`spawn_sweeper`] 定期清理
//! 不再被读取的过期条目。写入总是整体替换条目，读取方不会看到
//! 写了一半的值。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::{task::JoinHandle, time::Instant};
use tracing::debug;

use crate::cache::models::CachedResponse;
use crate::cache::store::{CounterStore, ResponseStore, StoreError};

#[derive(Debug, Clone)]
struct Entry<T> {
    value: T,
    expires_at: Option<Instant>,
}

impl<T> Entry<T> {
    fn new(value: T, ttl: Option<Duration>) -> Self {
        Self {
            value,
            expires_at: ttl.map(|d| Instant::now() + d),
        }
    }

    fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|deadline| Instant::now() >= deadline)
    }
}

fn read_live<T: Clone>(data: &DashMap<String, Entry<T>>, key: &str) -> Option<T> {
    if let Some(entry) = data.get(key) {
        if !entry.is_expired() {
            return Some(entry.value.clone());
        }
    }
    // 读锁已释放，再清理过期条目
    data.remove_if(key, |_, entry| entry.is_expired());
    None
}

fn purge<T>(data: &DashMap<String, Entry<T>>) -> usize {
    let before = data.len();
    data.retain(|_, entry| !entry.is_expired());
    before.saturating_sub(data.len())
}

/// 内存限流计数存储
#[derive(Debug, Default)]
pub struct MemoryCounterStore {
    data: DashMap<String, Entry<u64>>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 删除所有过期条目，返回删除数量
    pub fn purge_expired(&self) -> usize {
        purge(&self.data)
    }

    /// 底层条目数，包含尚未清理的过期条目
    pub fn entry_count(&self) -> usize {
        self.data.len()
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn get(&self, key: &str) -> Result<Option<u64>, StoreError> {
        Ok(read_live(&self.data, key))
    }

    async fn put(&self, key: &str, count: u64, ttl: Duration) -> Result<(), StoreError> {
        self.data.insert(key.to_string(), Entry::new(count, Some(ttl)));
        Ok(())
    }
}

/// 内存响应缓存存储
#[derive(Debug, Default)]
pub struct MemoryResponseStore {
    data: DashMap<String, Entry<CachedResponse>>,
    ttl: Option<Duration>,
}

impl MemoryResponseStore {
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            data: DashMap::new(),
            ttl,
        }
    }

    pub fn len(&self) -> usize {
        self.data.iter().filter(|entry| !entry.is_expired()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn purge_expired(&self) -> usize {
        purge(&self.data)
    }

    pub fn entry_count(&self) -> usize {
        self.data.len()
    }
}

/// 后台定期清理两个内存存储中的过期条目
pub fn spawn_sweeper(
    counters: Arc<MemoryCounterStore>,
    responses: Arc<MemoryResponseStore>,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            let removed = counters.purge_expired() + responses.purge_expired();
            if removed > 0 {
                debug!("swept {} expired in-memory entries", removed);
            }
        }
    })
}

#[async_trait]
impl ResponseStore for MemoryResponseStore {
    async fn lookup(&self, key: &str) -> Result<Option<CachedResponse>, StoreError> {
        Ok(read_live(&self.data, key))
    }

    async fn store(&self, key: &str, response: CachedResponse) -> Result<(), StoreError> {
        self.data
            .insert(key.to_string(), Entry::new(response, self.ttl));
        Ok(())
    }
}
