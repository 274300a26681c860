//! Router and state construction for HTTP tests

use axum::body::Body;
use axum::http::Response;
use axum::Router;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::Arc;
use std::time::Duration;

use plantdoc_dx::db::{init_tables, SqliteDiagnosisStore};
use plantdoc_dx::services::{DiagnosisService, ImageClassifier, ImageLoader, ModelSet};
use plantdoc_dx::taxonomy::Taxonomy;
use plantdoc_dx::{build_router, AppState};

pub const GENERAL_MODEL: &str = "test/general";
pub const PLANT_MODEL: &str = "test/plant";
pub const DISEASE_MODEL: &str = "test/disease";

pub fn models() -> ModelSet {
    ModelSet {
        general: GENERAL_MODEL.to_string(),
        plant: PLANT_MODEL.to_string(),
        disease: DISEASE_MODEL.to_string(),
    }
}

/// App state over an in-memory database
pub async fn test_app_state(classifier: Arc<dyn ImageClassifier>) -> AppState {
    // One connection, or every query sees a different empty database
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    init_tables(&pool).await.unwrap();

    let taxonomy = Arc::new(Taxonomy::builtin());
    let service = DiagnosisService::new(
        classifier,
        Arc::new(SqliteDiagnosisStore::new(pool)),
        taxonomy.clone(),
        models(),
    );
    let image_loader = ImageLoader::new(Duration::from_secs(2)).unwrap();

    AppState::new(Arc::new(service), Arc::new(image_loader), taxonomy)
}

pub async fn test_app(classifier: Arc<dyn ImageClassifier>) -> Router {
    build_router(test_app_state(classifier).await)
}

/// Any non-empty bytes will do; the classifier never decodes them
pub fn tiny_image_base64() -> String {
    format!("data:image/jpeg;base64,{}", STANDARD.encode(b"\xff\xd8\xff\xe0fake-jpeg"))
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
