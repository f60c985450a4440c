use axum::{
    body::Body,
    http::{HeaderMap, HeaderValue, Method, Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::utils::{
    EdgeContext,
    headers::{CACHE_MISS, X_CACHE, X_EDGE_COUNTRY, X_EDGE_LOCATION},
};

pub const ALLOW_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";
pub const ALLOW_HEADERS: &str = "Content-Type, Authorization, X-API-Key";
pub const MAX_AGE_SECS: &str = "86400";

/// 写入完整的 CORS 头，覆盖源站返回的同名头
pub fn apply_cors(headers: &mut HeaderMap) {
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOW_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOW_HEADERS),
    );
    headers.insert(
        header::ACCESS_CONTROL_MAX_AGE,
        HeaderValue::from_static(MAX_AGE_SECS),
    );
}

/// 统一的响应整形：所有响应都带 CORS 头；非预检响应再带边缘节点标记，
/// 并在处理器未设置缓存状态时标记为 MISS
pub fn shape(response: &mut Response, edge: &EdgeContext, preflight: bool) {
    let headers = response.headers_mut();
    apply_cors(headers);
    if preflight {
        return;
    }

    if let Ok(location) = HeaderValue::from_str(&edge.location) {
        headers.insert(X_EDGE_LOCATION, location);
    }
    if let Ok(country) = HeaderValue::from_str(&edge.country) {
        headers.insert(X_EDGE_COUNTRY, country);
    }
    if !headers.contains_key(X_CACHE) {
        headers.insert(X_CACHE, HeaderValue::from_static(CACHE_MISS));
    }
}

/// 最外层中间件，保证任何分支返回的响应都经过 [`shape`]
pub async fn shape_response(req: Request<Body>, next: Next) -> Response {
    let (parts, body) = req.into_parts();
    let edge = EdgeContext::from_parts(&parts);
    let preflight = parts.method == Method::OPTIONS;

    let mut response = next.run(Request::from_parts(parts, body)).await;
    shape(&mut response, &edge, preflight);
    response
}

/// OPTIONS 预检请求直接返回空响应，不进入后续任何阶段
pub async fn preflight(req: Request<Body>, next: Next) -> Response {
    if req.method() == Method::OPTIONS {
        return StatusCode::NO_CONTENT.into_response();
    }
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::headers::CACHE_HIT;

    fn edge() -> EdgeContext {
        EdgeContext {
            client_ip: "198.51.100.1".into(),
            location: "SJC".into(),
            country: "US".into(),
        }
    }

    #[test]
    fn preflight_gets_only_cors_headers() {
        let mut response = StatusCode::NO_CONTENT.into_response();
        shape(&mut response, &edge(), true);

        let headers = response.headers();
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_METHODS], ALLOW_METHODS);
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_HEADERS], ALLOW_HEADERS);
        assert_eq!(headers[header::ACCESS_CONTROL_MAX_AGE], MAX_AGE_SECS);
        assert!(!headers.contains_key(X_CACHE));
        assert!(!headers.contains_key(X_EDGE_LOCATION));
    }

    #[test]
    fn defaults_cache_marker_to_miss() {
        let mut response = StatusCode::TOO_MANY_REQUESTS.into_response();
        shape(&mut response, &edge(), false);

        let headers = response.headers();
        assert_eq!(headers[X_CACHE], CACHE_MISS);
        assert_eq!(headers[X_EDGE_LOCATION], "SJC");
        assert_eq!(headers[X_EDGE_COUNTRY], "US");
    }

    #[test]
    fn keeps_hit_marker_and_overrides_origin_cors() {
        let mut response = StatusCode::OK.into_response();
        response
            .headers_mut()
            .insert(X_CACHE, HeaderValue::from_static(CACHE_HIT));
        response.headers_mut().insert(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("https://example.com"),
        );
        shape(&mut response, &edge(), false);

        assert_eq!(response.headers()[X_CACHE], CACHE_HIT);
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }
}
