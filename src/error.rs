use axum::Json;
use axum::{
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

pub const RATE_LIMIT_MESSAGE: &str = "Rate limit exceeded";

/// 对调用方可见的网关错误
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("rate limit exceeded")]
    RateLimited { retry_after_secs: u64 },

    #[error("origin unreachable for {pathname}: {message}")]
    OriginUnreachable { pathname: String, message: String },

    #[error("origin health check unreachable: {message}")]
    HealthUnreachable { pathname: String, message: String },

    #[error("origin reported unhealthy: {message}")]
    HealthDegraded { pathname: String, message: String },
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
    pub pathname: String,
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::OriginUnreachable { .. } => StatusCode::BAD_GATEWAY,
            GatewayError::HealthUnreachable { .. } | GatewayError::HealthDegraded { .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            }
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (error, message, pathname) = match self {
            GatewayError::RateLimited { retry_after_secs } => {
                let mut response = (status, RATE_LIMIT_MESSAGE).into_response();
                response.headers_mut().insert(
                    header::RETRY_AFTER,
                    HeaderValue::from(retry_after_secs),
                );
                return response;
            }
            GatewayError::OriginUnreachable { pathname, message } => {
                ("Origin unreachable", message, pathname)
            }
            GatewayError::HealthUnreachable { pathname, message } => {
                ("Origin unreachable", message, pathname)
            }
            GatewayError::HealthDegraded { pathname, message } => {
                ("Origin unhealthy", message, pathname)
            }
        };

        let body = Json(ErrorBody {
            error: error.to_string(),
            message,
            pathname,
        });

        (status, body).into_response()
    }
}
