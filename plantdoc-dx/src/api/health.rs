//! Health check endpoint

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    /// Always "plantdoc-dx"
    pub module: String,
    pub version: String,
    /// Short git commit hash the binary was built from
    pub git_hash: String,
    pub build_profile: String,
    pub uptime_seconds: u64,
    /// Most recent diagnosis failure, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime = Utc::now().signed_duration_since(state.startup_time);
    let uptime_seconds = uptime.num_seconds().max(0) as u64;

    let last_error = state.last_error.read().await.clone();

    Json(HealthResponse {
        status: "ok".to_string(),
        module: "plantdoc-dx".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_hash: env!("PLANTDOC_GIT_HASH").to_string(),
        build_profile: env!("PLANTDOC_BUILD_PROFILE").to_string(),
        uptime_seconds,
        last_error,
    })
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
