//! Health check endpoints
//!
//! Kubernetes-style probes:
//! - /health, /healthz - liveness (is the service running?)
//! - /ready, /readyz   - readiness (can the entity store answer?)
//! - /version          - build info for deployment verification

use hyper::{Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;

use crate::routes::{json_response, BoxBody};
use crate::server::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub healthy: bool,
    pub version: &'static str,
    pub mode: String,
    pub node_id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadyResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionResponse {
    pub name: &'static str,
    pub version: &'static str,
}

/// GET /health (liveness)
pub fn health_check(state: Arc<AppState>) -> Response<BoxBody> {
    json_response(
        StatusCode::OK,
        &HealthResponse {
            healthy: true,
            version: env!("CARGO_PKG_VERSION"),
            mode: if state.args.dev_mode {
                "development".to_string()
            } else {
                "production".to_string()
            },
            node_id: state.args.node_id.to_string(),
        },
    )
}

/// GET /ready (readiness); a cheap store read must succeed
pub async fn readiness_check(state: Arc<AppState>) -> Response<BoxBody> {
    match state.store.requests.count_all().await {
        Ok(_) => json_response(
            StatusCode::OK,
            &ReadyResponse {
                ready: true,
                error: None,
            },
        ),
        Err(e) => json_response(
            StatusCode::SERVICE_UNAVAILABLE,
            &ReadyResponse {
                ready: false,
                error: Some(e.to_string()),
            },
        ),
    }
}

/// GET /version
pub fn version_info() -> Response<BoxBody> {
    json_response(
        StatusCode::OK,
        &VersionResponse {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
        },
    )
}
