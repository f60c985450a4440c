use std::sync::Arc;

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::{
    AppState,
    cache::{CounterStore, ResponseCache, ResponseStore},
    config::Config,
    middleware::{RateLimiter, log_errors, preflight, rate_limit, shape_response},
    proxy::ProxyForwarder,
    routes,
};

/// 组装网关：预检 -> 限流 -> 路由（信息 / 健康检查 / 代理）
///
/// 中间件由外到内：请求追踪、响应整形、错误日志、预检、限流。
/// `/` 和 `/health` 只处理 GET，其他方法与其余路径一样走代理。
pub fn create_router(
    config: Config,
    counters: Arc<dyn CounterStore>,
    responses: Arc<dyn ResponseStore>,
) -> Result<Router, reqwest::Error> {
    let forwarder = ProxyForwarder::new(ProxyForwarder::build_client()?, config.origin_url.clone());
    let rate_limiter = Arc::new(RateLimiter::new(counters, &config));
    let cache = ResponseCache::new(responses, config.cache_max_body_bytes);

    let state = AppState {
        config: Arc::new(config),
        forwarder,
        cache,
    };

    let router = Router::new()
        .route(
            "/",
            get(routes::info::root).fallback(routes::proxy::proxy),
        )
        .route(
            routes::health::HEALTH_PATH,
            get(routes::health::health).fallback(routes::proxy::proxy),
        )
        .fallback(routes::proxy::proxy)
        .layer(axum::middleware::from_fn_with_state(rate_limiter, rate_limit))
        .layer(axum::middleware::from_fn(preflight))
        .layer(axum::middleware::from_fn(log_errors))
        .layer(axum::middleware::from_fn(shape_response))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(router)
}
