//! Diagnosis pipeline services
//!
//! Image acquisition, hosted classification, plant validation, label
//! reconciliation and the orchestrator tying them together.

pub mod diagnosis_service;
pub mod image_loader;
pub mod inference_client;
pub mod label_matcher;
pub mod plant_validator;
pub mod vocabulary;

pub use diagnosis_service::{DiagnosisError, DiagnosisOutcome, DiagnosisService, ModelSet};
pub use image_loader::{ImageError, ImageLoader, ImagePayload, ImageSource};
pub use inference_client::{ImageClassifier, InferenceClient, InferenceError};
pub use label_matcher::LabelMatcher;
pub use plant_validator::{PlantValidator, ValidationError};
