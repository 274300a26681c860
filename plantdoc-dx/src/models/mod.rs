//! Data models for plantdoc-dx
//!
//! - Classifier predictions and their taxonomy-enhanced form
//! - Plant validation outcome
//! - Persisted diagnosis records

pub mod diagnosis;
pub mod prediction;

pub use diagnosis::{DiagnosisRecord, ReconciliationKind};
pub use prediction::{EnhancedPrediction, Prediction, ValidationResult, ValidationSource};
