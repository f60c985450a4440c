//! 源站转发。
//!
//! 每个入站请求只转发一次，不重试。网络错误转换为 [`ForwardFailure`]，
//! 由调用方决定返回 502 还是 503。

use axum::{
    body::Body,
    http::{HeaderMap, HeaderValue, Method, Request, Uri, header},
};
use thiserror::Error;
use tracing::{debug, error};

use crate::error::GatewayError;
use crate::utils::{
    EdgeContext,
    headers::{FORWARDED_BY_VALUE, X_EDGE_LOCATION, X_FORWARDED_BY},
};

/// 转发失败，携带失败的路径和底层错误信息
#[derive(Debug, Error)]
#[error("forwarding {pathname} failed: {message}")]
pub struct ForwardFailure {
    pub pathname: String,
    pub message: String,
}

impl From<ForwardFailure> for GatewayError {
    fn from(failure: ForwardFailure) -> Self {
        GatewayError::OriginUnreachable {
            pathname: failure.pathname,
            message: failure.message,
        }
    }
}

#[derive(Clone)]
pub struct ProxyForwarder {
    client: reqwest::Client,
    origin_url: String,
}

impl ProxyForwarder {
    pub fn new(client: reqwest::Client, origin_url: impl Into<String>) -> Self {
        let origin_url = origin_url.into().trim_end_matches('/').to_string();
        Self { client, origin_url }
    }

    /// 直连源站，不跟随重定向，3xx 原样交给调用方
    pub fn build_client() -> reqwest::Result<reqwest::Client> {
        reqwest::Client::builder()
            .no_proxy()
            .redirect(reqwest::redirect::Policy::none())
            .build()
    }

    /// 源站地址 + 原始路径和查询串
    pub fn destination(&self, uri: &Uri) -> String {
        let path_and_query = uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or_else(|| uri.path());
        format!("{}{}", self.origin_url, path_and_query)
    }

    /// 转发入站请求：方法和请求头原样复制，GET/HEAD 不带请求体
    pub async fn forward(
        &self,
        req: Request<Body>,
        edge: &EdgeContext,
    ) -> Result<reqwest::Response, ForwardFailure> {
        let (parts, body) = req.into_parts();
        let pathname = parts.uri.path().to_string();
        let url = self.destination(&parts.uri);

        let mut headers = parts.headers;
        headers.remove(header::HOST);
        add_diagnostic_headers(&mut headers, edge);

        let mut builder = self
            .client
            .request(parts.method.clone(), &url)
            .headers(headers);
        if has_body(&parts.method) {
            builder = builder.body(reqwest::Body::wrap_stream(body.into_data_stream()));
        }

        debug!("forwarding {} {}", parts.method, url);
        builder.send().await.map_err(|e| {
            error!("origin request failed for {}: {}", pathname, e);
            ForwardFailure {
                pathname,
                message: e.to_string(),
            }
        })
    }

    /// 由网关自己发起的 GET 请求，例如健康检查
    pub async fn fetch(
        &self,
        path: &str,
        edge: &EdgeContext,
    ) -> Result<reqwest::Response, ForwardFailure> {
        let mut headers = HeaderMap::new();
        add_diagnostic_headers(&mut headers, edge);

        let url = format!("{}{}", self.origin_url, path);
        self.client
            .get(&url)
            .headers(headers)
            .send()
            .await
            .map_err(|e| {
                error!("origin request failed for {}: {}", path, e);
                ForwardFailure {
                    pathname: path.to_string(),
                    message: e.to_string(),
                }
            })
    }
}

fn has_body(method: &Method) -> bool {
    method != Method::GET && method != Method::HEAD
}

fn add_diagnostic_headers(headers: &mut HeaderMap, edge: &EdgeContext) {
    headers.insert(X_FORWARDED_BY, HeaderValue::from_static(FORWARDED_BY_VALUE));
    if let Ok(location) = HeaderValue::from_str(&edge.location) {
        headers.insert(X_EDGE_LOCATION, location);
    }
}

/// 源站响应头去掉逐跳头后返回给调用方
pub fn response_headers(origin: &HeaderMap) -> HeaderMap {
    let mut headers = origin.clone();
    headers.remove(header::CONNECTION);
    headers.remove(header::TRANSFER_ENCODING);
    headers
}
