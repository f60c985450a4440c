use std::convert::Infallible;
use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{HeaderMap, request::Parts},
};
use serde::Serialize;

pub const UNKNOWN: &str = "unknown";

pub mod headers {
    pub const X_CACHE: &str = "x-cache";
    pub const X_FORWARDED_BY: &str = "x-forwarded-by";
    pub const X_EDGE_LOCATION: &str = "x-edge-location";
    pub const X_EDGE_COUNTRY: &str = "x-edge-country";

    pub const CF_CONNECTING_IP: &str = "cf-connecting-ip";
    pub const CF_RAY: &str = "cf-ray";
    pub const CF_IPCOUNTRY: &str = "cf-ipcountry";
    pub const X_REAL_IP: &str = "x-real-ip";
    pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

    pub const FORWARDED_BY_VALUE: &str = "edge-gateway";
    pub const CACHE_HIT: &str = "HIT";
    pub const CACHE_MISS: &str = "MISS";
}

/// 边缘平台注入的请求元数据
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EdgeContext {
    #[serde(skip)]
    pub client_ip: String,
    pub location: String,
    pub country: String,
}

impl EdgeContext {
    pub fn from_parts(parts: &Parts) -> Self {
        let remote_ip = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ci| ci.0.ip().to_string());

        Self {
            client_ip: client_ip(&parts.headers, remote_ip.as_deref()),
            location: edge_location(&parts.headers),
            country: header_str(&parts.headers, headers::CF_IPCOUNTRY)
                .unwrap_or(UNKNOWN)
                .to_string(),
        }
    }
}

impl<S: Send + Sync> FromRequestParts<S> for EdgeContext {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_parts(parts))
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// 客户端地址：平台头优先，其次代理头，最后降级使用连接地址
pub fn client_ip(headers: &HeaderMap, remote_ip: Option<&str>) -> String {
    header_str(headers, headers::CF_CONNECTING_IP)
        .or_else(|| header_str(headers, headers::X_REAL_IP))
        .or_else(|| {
            header_str(headers, headers::X_FORWARDED_FOR)
                .and_then(|s| s.split(',').map(str::trim).find(|ip| !ip.is_empty()))
        })
        .or(remote_ip)
        .unwrap_or(UNKNOWN)
        .to_string()
}

/// 边缘节点代码取自 CF-Ray 的后缀，例如 `8a1b2c3d4e5f-SJC`
pub fn edge_location(headers: &HeaderMap) -> String {
    header_str(headers, headers::CF_RAY)
        .and_then(|ray| ray.rsplit_once('-'))
        .map(|(_, colo)| colo.trim())
        .filter(|colo| !colo.is_empty())
        .unwrap_or(UNKNOWN)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, Request};

    fn parts(pairs: &[(&'static str, &'static str)]) -> Parts {
        let mut builder = Request::builder().uri("/");
        for (name, value) in pairs {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn prefers_platform_client_ip() {
        let parts = parts(&[
            (headers::CF_CONNECTING_IP, "198.51.100.1"),
            (headers::X_REAL_IP, "10.0.0.1"),
        ]);
        assert_eq!(EdgeContext::from_parts(&parts).client_ip, "198.51.100.1");
    }

    #[test]
    fn falls_back_to_first_forwarded_for_entry() {
        let mut headers = HeaderMap::new();
        headers.insert(
            headers::X_FORWARDED_FOR,
            HeaderValue::from_static(" , 203.0.113.9, 10.0.0.2"),
        );
        assert_eq!(client_ip(&headers, Some("127.0.0.1")), "203.0.113.9");
    }

    #[test]
    fn falls_back_to_connection_address_then_unknown() {
        let headers = HeaderMap::new();
        assert_eq!(client_ip(&headers, Some("127.0.0.1")), "127.0.0.1");
        assert_eq!(client_ip(&headers, None), UNKNOWN);
    }

    #[test]
    fn reads_location_and_country() {
        let parts = parts(&[
            (headers::CF_RAY, "8a1b2c3d4e5f6789-SJC"),
            (headers::CF_IPCOUNTRY, "US"),
        ]);
        let edge = EdgeContext::from_parts(&parts);
        assert_eq!(edge.location, "SJC");
        assert_eq!(edge.country, "US");
    }

    #[test]
    fn missing_metadata_is_unknown() {
        let edge = EdgeContext::from_parts(&parts(&[(headers::CF_RAY, "8a1b2c3d4e5f6789")]));
        assert_eq!(edge.location, UNKNOWN);
        assert_eq!(edge.country, UNKNOWN);
        assert_eq!(edge.client_ip, UNKNOWN);
    }
}
