//! plantdoc-dx library interface
//!
//! Plant disease diagnosis service: validates that an image shows a plant,
//! classifies it with a hosted disease model, reconciles the labels with a
//! fixed taxonomy and stores the result.

pub mod api;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod taxonomy;
pub mod utils;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::services::{DiagnosisService, ImageLoader};
use crate::taxonomy::Taxonomy;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<DiagnosisService>,
    pub image_loader: Arc<ImageLoader>,
    pub taxonomy: Arc<Taxonomy>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last diagnosis failure, reported by /health
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(
        service: Arc<DiagnosisService>,
        image_loader: Arc<ImageLoader>,
        taxonomy: Arc<Taxonomy>,
    ) -> Self {
        Self {
            service,
            image_loader,
            taxonomy,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::diagnosis_routes())
        .merge(api::taxonomy_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
