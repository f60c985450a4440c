use serde::Serialize;

use crate::utils::EdgeContext;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub gateway: &'static str,
    pub origin: serde_json::Value,
    pub edge: EdgeContext,
    pub timestamp: String,
}
