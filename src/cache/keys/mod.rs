/// 缓存键模块
/// 提供限流计数键和响应缓存键的生成函数
use axum::http::{Method, Uri};
use sha2::{Digest, Sha256};

pub const RATE_LIMIT_PREFIX: &str = "rate_limit:";
pub const RESPONSE_CACHE_PREFIX: &str = "response_cache:";

/// 限流计数键，按客户端身份分区
pub fn rate_limit_key(client_identity: &str) -> String {
    format!("{}{}", RATE_LIMIT_PREFIX, client_identity)
}

/// 响应缓存键：方法 + 路径 + 查询串。请求头不参与
pub fn response_cache_key(method: &Method, uri: &Uri) -> String {
    let path_and_query = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());
    format!("{} {}", method, path_and_query)
}

/// Redis 中的响应缓存键，对规范化键取 SHA-256 以限制长度
pub fn redis_response_key(cache_key: &str) -> String {
    format!(
        "{}{:x}",
        RESPONSE_CACHE_PREFIX,
        Sha256::digest(cache_key.as_bytes())
    )
}
