use axum::{Json, extract::State};
use tracing::warn;

use crate::{AppState, error::GatewayError, utils::EdgeContext};

use super::model::HealthResponse;

pub const HEALTH_PATH: &str = "/health";

/// 代理源站健康检查。源站不可达或返回异常都报告为 503
pub async fn health(
    State(state): State<AppState>,
    edge: EdgeContext,
) -> Result<Json<HealthResponse>, GatewayError> {
    let response = state
        .forwarder
        .fetch(HEALTH_PATH, &edge)
        .await
        .map_err(|failure| GatewayError::HealthUnreachable {
            pathname: failure.pathname,
            message: failure.message,
        })?;

    let status = response.status();
    if !status.is_success() {
        warn!("origin health check returned {}", status);
        return Err(GatewayError::HealthDegraded {
            pathname: HEALTH_PATH.to_string(),
            message: format!("origin returned status {}", status.as_u16()),
        });
    }

    let payload: serde_json::Value =
        response.json().await.map_err(|e| GatewayError::HealthDegraded {
            pathname: HEALTH_PATH.to_string(),
            message: format!("invalid health payload: {}", e),
        })?;

    Ok(Json(HealthResponse {
        status: "healthy",
        gateway: "ok",
        origin: payload,
        edge,
        timestamp: chrono::Utc::now().to_rfc3339(),
    }))
}
