use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, warn};

use crate::{
    cache::{CounterStore, keys::rate_limit_key},
    config::{Config, FailMode},
    error::GatewayError,
    utils::client_ip,
};

/// 限流判定结果，`count` 为本次请求计入后的窗口计数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed { count: u64 },
    Denied { count: u64 },
}

impl Admission {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Admission::Allowed { .. })
    }
}

/// 固定窗口限流器
///
/// 每个请求都会读一次、写一次计数，被拒绝的请求同样计入。
/// 计数在窗口内只增不减，由存储的 TTL 负责清零；每次写入都会
/// 重新设置完整的窗口 TTL。读后写不是原子的：同一客户端同一时刻
/// 的并发请求可能读到相同的旧计数并同时放行。
pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
    ceiling: u64,
    window: Duration,
    fail_mode: FailMode,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn CounterStore>, config: &Config) -> Self {
        Self {
            store,
            ceiling: config.rate_limit_requests,
            window: config.rate_limit_window(),
            fail_mode: config.rate_limit_fail_mode,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub async fn admit(&self, client_identity: &str) -> Admission {
        let key = rate_limit_key(client_identity);

        let previous = match self.store.get(&key).await {
            Ok(count) => count.unwrap_or(0),
            Err(e) => match self.fail_mode {
                FailMode::Open => {
                    warn!("rate limit store unavailable, admitting {}: {}", client_identity, e);
                    0
                }
                FailMode::Closed => {
                    warn!("rate limit store unavailable, denying {}: {}", client_identity, e);
                    return Admission::Denied { count: 0 };
                }
            },
        };

        let count = previous.saturating_add(1);
        if let Err(e) = self.store.put(&key, count, self.window).await {
            warn!("failed to record request for {}: {}", client_identity, e);
        }

        if count > self.ceiling {
            Admission::Denied { count }
        } else {
            Admission::Allowed { count }
        }
    }

    pub async fn check_rate_limit(self: Arc<Self>, req: Request<Body>, next: Next) -> Response {
        let remote_ip = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ci| ci.0.ip().to_string());
        let ip = client_ip(req.headers(), remote_ip.as_deref());

        match self.admit(&ip).await {
            Admission::Allowed { count } => {
                debug!("admitted {} ({}/{})", ip, count, self.ceiling);
                next.run(req).await
            }
            Admission::Denied { count } => {
                warn!("rate limit exceeded for {} ({}/{})", ip, count, self.ceiling);
                GatewayError::RateLimited {
                    retry_after_secs: self.window.as_secs(),
                }
                .into_response()
            }
        }
    }
}

pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    limiter.check_rate_limit(req, next).await
}
