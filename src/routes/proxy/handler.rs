use axum::{
    body::Body,
    extract::{Request, State},
    http::HeaderValue,
    response::{IntoResponse, Response},
};
use tracing::debug;

use crate::{
    AppState,
    cache::{ResponseCache, keys::response_cache_key},
    error::GatewayError,
    proxy::response_headers,
    utils::{
        EdgeContext,
        headers::{CACHE_HIT, CACHE_MISS, X_CACHE},
    },
};

/// 通用代理：查缓存 -> 转发 -> 流式返回，同时写缓存
pub async fn proxy(
    State(state): State<AppState>,
    edge: EdgeContext,
    req: Request,
) -> Response {
    let method = req.method().clone();
    let cache_key =
        ResponseCache::participates(&method).then(|| response_cache_key(&method, req.uri()));

    if let Some(key) = &cache_key {
        if let Some(hit) = state.cache.lookup(key).await {
            let mut response = hit.into_response();
            response
                .headers_mut()
                .insert(X_CACHE, HeaderValue::from_static(CACHE_HIT));
            return response;
        }
    }

    let pathname = req.uri().path().to_string();
    let origin = match state.forwarder.forward(req, &edge).await {
        Ok(origin) => origin,
        Err(failure) => return GatewayError::from(failure).into_response(),
    };

    let status = origin.status();
    let headers = response_headers(origin.headers());

    let body = match cache_key {
        Some(key) if ResponseCache::is_cacheable(&method, status) => {
            // 边转发边复制，流正常结束后才写缓存
            Body::from_stream(state.cache.tee(
                key,
                &method,
                status,
                &headers,
                origin.bytes_stream(),
            ))
        }
        _ => {
            debug!("streaming uncached response for {} {}", method, pathname);
            Body::from_stream(origin.bytes_stream())
        }
    };

    let mut response = Response::new(body);
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
        .headers_mut()
        .insert(X_CACHE, HeaderValue::from_static(CACHE_MISS));
    response
}
