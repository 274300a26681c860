//! Persisted diagnosis records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::EnhancedPrediction;

/// How the disease-model output was reconciled with the validated plant type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconciliationKind {
    /// Pepper with bacterial symptoms, replaced by a single bacterial-spot prediction
    PepperOverride,
    /// Predictions filtered down to the validated plant type
    Filtered,
    /// Model does not know the plant type; a healthy prediction was synthesized
    SynthesizedHealthy,
    /// Model knows the plant type but none of its predictions matched; kept with a warning
    KeptWithWarning,
}

impl ReconciliationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PepperOverride => "pepper_override",
            Self::Filtered => "filtered",
            Self::SynthesizedHealthy => "synthesized_healthy",
            Self::KeptWithWarning => "kept_with_warning",
        }
    }
}

/// A completed diagnosis. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosisRecord {
    pub id: Uuid,
    pub plant_name: String,
    /// Ordered by confidence, highest first
    pub predictions: Vec<EnhancedPrediction>,
    pub disease_name: String,
    pub image_path: String,
    pub treatment: String,
    pub additional_info: Map<String, Value>,
    pub created_at: DateTime<Utc>,
}
