//! Diagnosis endpoints
//!
//! POST /api/diagnose, GET /api/diagnoses, GET /api/diagnoses/:id

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use plantdoc_common::time::{now, to_iso8601};

use crate::models::{DiagnosisRecord, EnhancedPrediction};
use crate::services::ImageSource;
use crate::{ApiError, ApiResult, AppState};

/// Request payload for a diagnosis. Exactly one image field must be set.
#[derive(Debug, Deserialize)]
pub struct DiagnoseRequest {
    #[serde(default)]
    pub image_url: Option<String>,
    /// Base64 image, with or without a `data:` URI prefix
    #[serde(default)]
    pub image_base64: Option<String>,
    #[serde(default)]
    pub plant_name: Option<String>,
}

impl DiagnoseRequest {
    fn image_source(self) -> ApiResult<(ImageSource, Option<String>)> {
        let url = self.image_url.filter(|s| !s.trim().is_empty());
        let inline = self.image_base64.filter(|s| !s.trim().is_empty());

        let source = match (url, inline) {
            (Some(url), None) => ImageSource::Url(url),
            (None, Some(data)) => ImageSource::Base64(data),
            (Some(_), Some(_)) => {
                return Err(ApiError::BadRequest(
                    "Provide either image_url or image_base64, not both".to_string(),
                ))
            }
            (None, None) => {
                return Err(ApiError::BadRequest(
                    "An image is required (image_url or image_base64)".to_string(),
                ))
            }
        };

        Ok((source, self.plant_name))
    }
}

/// Prediction as presented to clients
#[derive(Debug, Serialize)]
pub struct PredictionView {
    pub disease: String,
    /// Percentage with two decimals, e.g. "77.00%"
    pub confidence: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl From<&EnhancedPrediction> for PredictionView {
    fn from(p: &EnhancedPrediction) -> Self {
        Self {
            disease: p.formatted_label.clone(),
            confidence: p.confidence_percent(),
            description: p.treatment.clone(),
            note: p.note.clone(),
        }
    }
}

/// Response payload for a completed diagnosis
#[derive(Debug, Serialize)]
pub struct DiagnosisResponse {
    pub success: bool,
    pub timestamp: String,
    pub model: String,
    pub id: Uuid,
    pub plant_name: String,
    pub predictions: Vec<PredictionView>,
    pub disease_name: String,
    pub treatment: String,
    pub image_path: String,
}

/// Response payload for diagnosis history
#[derive(Debug, Serialize)]
pub struct DiagnosisListResponse {
    pub success: bool,
    pub timestamp: String,
    pub count: usize,
    pub diagnoses: Vec<DiagnosisRecord>,
}

/// POST /api/diagnose
///
/// **Errors:**
/// - 400: malformed body, bad image, or not a plant
/// - 503: inference service still warming up after retries
/// - 500: anything else
pub async fn diagnose(
    State(state): State<AppState>,
    payload: Result<Json<DiagnoseRequest>, JsonRejection>,
) -> ApiResult<Json<DiagnosisResponse>> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let (source, plant_name) = request.image_source()?;

    let image = state.image_loader.load(source).await?;

    let outcome = match state.service.diagnose(&image, plant_name.as_deref()).await {
        Ok(outcome) => outcome,
        Err(e) => {
            let err = ApiError::from(e);
            // Client-side outcomes such as "not a plant" are not service failures
            if err.status_code().is_server_error() {
                *state.last_error.write().await = Some(err.to_string());
            }
            return Err(err);
        }
    };

    let record = outcome.record;
    info!(id = %record.id, disease = %record.disease_name, "Diagnosis created");

    Ok(Json(DiagnosisResponse {
        success: true,
        timestamp: to_iso8601(&outcome.timestamp),
        model: outcome.model,
        id: record.id,
        predictions: record.predictions.iter().map(PredictionView::from).collect(),
        plant_name: record.plant_name,
        disease_name: record.disease_name,
        treatment: record.treatment,
        image_path: record.image_path,
    }))
}

/// GET /api/diagnoses
pub async fn list_diagnoses(
    State(state): State<AppState>,
) -> ApiResult<Json<DiagnosisListResponse>> {
    let diagnoses = state.service.list().await?;

    Ok(Json(DiagnosisListResponse {
        success: true,
        timestamp: to_iso8601(&now()),
        count: diagnoses.len(),
        diagnoses,
    }))
}

/// GET /api/diagnoses/:id
pub async fn get_diagnosis(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<DiagnosisRecord>> {
    let id = Uuid::parse_str(&id)
        .map_err(|_| ApiError::BadRequest(format!("Invalid diagnosis id: {}", id)))?;

    state
        .service
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Diagnosis {}", id)))
}

/// Build diagnosis routes
pub fn diagnosis_routes() -> Router<AppState> {
    Router::new()
        .route("/api/diagnose", post(diagnose))
        .route("/api/diagnoses", get(list_diagnoses))
        .route("/api/diagnoses/:id", get(get_diagnosis))
}
