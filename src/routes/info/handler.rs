use axum::{Json, extract::State};

use crate::{AppState, utils::EdgeContext};

use super::model::InfoResponse;

/// 网关自身信息，本地生成，不访问源站
pub async fn root(State(state): State<AppState>, edge: EdgeContext) -> Json<InfoResponse> {
    Json(InfoResponse {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        status: "ok",
        origin: state.config.origin_url.clone(),
        endpoints: vec!["/", "/health", "/{*path}"],
        edge,
    })
}
