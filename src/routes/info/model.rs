use serde::Serialize;

use crate::utils::EdgeContext;

#[derive(Debug, Serialize)]
pub struct InfoResponse {
    pub name: &'static str,
    pub version: &'static str,
    pub status: &'static str,
    pub origin: String,
    pub endpoints: Vec<&'static str>,
    pub edge: EdgeContext,
}
