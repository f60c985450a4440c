use serde::{Deserialize, Serialize};

/// 速率限制计数数据模型
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CachedRateLimit {
    pub key: String,
    pub count: u64,
    pub reset_at: i64, // Unix timestamp
}
