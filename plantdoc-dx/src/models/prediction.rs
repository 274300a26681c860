//! Classifier predictions and validation results

use serde::{Deserialize, Serialize};

/// One label/score pair returned by a hosted classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: String,
    /// Confidence in [0, 1]
    pub score: f64,
    /// Warning or provenance note attached during reconciliation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl Prediction {
    pub fn new(label: impl Into<String>, score: f64) -> Self {
        Self {
            label: label.into(),
            score,
            note: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Prediction after reconciliation against the taxonomy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhancedPrediction {
    pub label: String,
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Human-readable label, e.g. "Tomato - Late Blight"
    pub formatted_label: String,
    pub treatment: String,
}

impl EnhancedPrediction {
    /// Confidence rendered as a percentage with two decimals ("77.00%")
    pub fn confidence_percent(&self) -> String {
        format!("{:.2}%", self.score * 100.0)
    }
}

/// Which classifier supplied the plant evidence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationSource {
    /// General-purpose image classifier
    General,
    /// Plant-specific classifier (fallback pass)
    Plant,
}

/// Outcome of plant validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plant_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<ValidationSource>,
}

impl ValidationResult {
    pub fn accepted(plant_type: impl Into<String>, confidence: f64, source: ValidationSource) -> Self {
        Self {
            is_valid: true,
            reason: None,
            plant_type: Some(plant_type.into()),
            confidence: Some(confidence),
            source: Some(source),
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            reason: Some(reason.into()),
            plant_type: None,
            confidence: None,
            source: None,
        }
    }
}
