use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_ORIGIN_URL: &str = "http://localhost:8000";

/// 存储不可用时限流器的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailMode {
    /// 放行：视为没有历史计数
    Open,
    /// 拒绝：直接返回 429
    Closed,
}

impl FromStr for FailMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(FailMode::Open),
            "closed" => Ok(FailMode::Closed),
            other => Err(format!("unknown fail mode: {}", other)),
        }
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    pub origin_url: String,
    pub redis_url: Option<String>,
    pub rate_limit_window_secs: u64,
    pub rate_limit_requests: u64,
    pub rate_limit_fail_mode: FailMode,
    pub cache_ttl_secs: u64,
    pub cache_max_body_bytes: usize,
    pub memory_sweep_interval_secs: u64,
    pub server_host: String,
    pub server_port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            origin_url: DEFAULT_ORIGIN_URL.to_string(),
            redis_url: None,
            rate_limit_window_secs: 60,
            rate_limit_requests: 60,
            rate_limit_fail_mode: FailMode::Open,
            cache_ttl_secs: 300,
            cache_max_body_bytes: 1024 * 1024,
            memory_sweep_interval_secs: 60,
            server_host: "0.0.0.0".to_string(),
            server_port: 8787,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        let defaults = Config::default();
        let origin_url = env::var("ORIGIN_URL")
            .ok()
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or(defaults.origin_url);

        Config {
            origin_url,
            redis_url: env::var("REDIS_URL").ok().filter(|url| !url.trim().is_empty()),
            rate_limit_window_secs: parse_or("RATE_LIMIT_WINDOW", defaults.rate_limit_window_secs),
            rate_limit_requests: parse_or("RATE_LIMIT_REQUESTS", defaults.rate_limit_requests),
            rate_limit_fail_mode: parse_or("RATE_LIMIT_FAIL_MODE", defaults.rate_limit_fail_mode),
            cache_ttl_secs: parse_or("CACHE_TTL", defaults.cache_ttl_secs),
            cache_max_body_bytes: parse_or("CACHE_MAX_BODY_BYTES", defaults.cache_max_body_bytes),
            memory_sweep_interval_secs: parse_or(
                "MEMORY_SWEEP_INTERVAL",
                defaults.memory_sweep_interval_secs,
            ),
            server_host: env::var("SERVER_HOST").unwrap_or(defaults.server_host),
            server_port: parse_or("SERVER_PORT", defaults.server_port),
        }
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn memory_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.memory_sweep_interval_secs.max(1))
    }
}

// 未设置或格式错误时使用默认值
fn parse_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}
