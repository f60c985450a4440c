use axum::{
    body::Body,
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::utils::headers::X_CACHE;

/// 缓存的单个响应头。值按原始字节保存，不要求是 UTF-8
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedHeader {
    pub name: String,
    #[serde(with = "base64_bytes")]
    pub value: Vec<u8>,
}

/// 缓存的完整响应。写入后不可修改，只能被整体替换
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedResponse {
    pub status: u16,
    pub headers: Vec<CachedHeader>,
    #[serde(with = "base64_bytes")]
    pub body: Vec<u8>,
    pub stored_at: i64, // Unix timestamp
}

impl CachedResponse {
    /// 从源站响应构造缓存条目，去掉缓存状态标记和逐跳头
    pub fn from_parts(status: StatusCode, headers: &HeaderMap, body: Vec<u8>) -> Self {
        let headers = headers
            .iter()
            .filter(|(name, _)| !is_excluded(name))
            .map(|(name, value)| CachedHeader {
                name: name.as_str().to_string(),
                value: value.as_bytes().to_vec(),
            })
            .collect();

        Self {
            status: status.as_u16(),
            headers,
            body,
            stored_at: chrono::Utc::now().timestamp(),
        }
    }
}

fn is_excluded(name: &HeaderName) -> bool {
    name.as_str().eq_ignore_ascii_case(X_CACHE)
        || *name == header::CONNECTION
        || *name == header::TRANSFER_ENCODING
}

impl IntoResponse for CachedResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = StatusCode::from_u16(self.status).unwrap_or(StatusCode::OK);

        let headers = response.headers_mut();
        for cached in self.headers {
            if let (Ok(name), Ok(value)) = (
                HeaderName::try_from(cached.name.as_str()),
                HeaderValue::from_bytes(&cached.value),
            ) {
                headers.append(name, value);
            }
        }
        response
    }
}

// 二进制内容以 base64 字符串形式序列化
mod base64_bytes {
    use base64::{Engine, engine::general_purpose::STANDARD};
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(D::Error::custom)
    }
}
