//! Diagnosis orchestration
//!
//! validate plant → classify disease → reconcile labels with the validated
//! plant type → enhance → persist.
//!
//! Reconciliation, first applicable rule wins:
//! 1. Pepper override: pepper plant with any bacterial symptom label becomes a
//!    single bell pepper bacterial spot prediction
//! 2. Filter: keep predictions whose label mentions the plant type
//! 3. Nothing survives and the disease model does not know the plant type:
//!    synthesize one healthy prediction for it
//! 4. Nothing survives but the model knows the plant type: keep everything,
//!    each prediction carrying a warning note

use chrono::{DateTime, SubsecRound, Utc};
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use plantdoc_common::config::InferenceConfig;

use crate::db::DiagnosisStore;
use crate::models::{DiagnosisRecord, EnhancedPrediction, Prediction, ReconciliationKind};
use crate::services::image_loader::ImagePayload;
use crate::services::inference_client::{ImageClassifier, InferenceError};
use crate::services::label_matcher::{has_bacterial_symptom, LabelMatcher};
use crate::services::plant_validator::{
    extract_plant_type, PlantValidator, ValidationError, NO_PLANT_REASON,
};
use crate::taxonomy::{Taxonomy, TaxonomyEntry, GENERIC_CARE_ADVICE, PEPPER_BACTERIAL_SPOT};
use crate::utils::text::{contains_phrase, spaced, title_case};

/// Confidence assigned to the pepper bacterial spot override
pub const PEPPER_OVERRIDE_CONFIDENCE: f64 = 0.85;

/// Confidence assigned to a synthesized healthy prediction
pub const SYNTHESIZED_HEALTHY_CONFIDENCE: f64 = 0.9;

/// Diagnosis failures
#[derive(Debug, Error)]
pub enum DiagnosisError {
    /// Validation ran and decided the image is not a plant
    #[error("{0}")]
    NotAPlant(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Disease classification failed: {0}")]
    Classification(#[source] InferenceError),

    #[error("Disease model returned no predictions")]
    NoPredictions,

    #[error("Failed to access diagnosis history: {0}")]
    Persistence(#[from] plantdoc_common::Error),
}

impl DiagnosisError {
    /// Upstream was temporarily unavailable; the request may succeed later
    pub fn is_retryable(&self) -> bool {
        match self {
            DiagnosisError::Validation(ValidationError(e)) | DiagnosisError::Classification(e) => {
                e.is_retryable()
            }
            _ => false,
        }
    }
}

/// Model identifiers used by the pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSet {
    pub general: String,
    pub plant: String,
    pub disease: String,
}

impl ModelSet {
    pub fn from_config(config: &InferenceConfig) -> Self {
        Self {
            general: config.general_model.clone(),
            plant: config.plant_model.clone(),
            disease: config.disease_model.clone(),
        }
    }
}

/// A stored diagnosis plus response metadata
#[derive(Debug, Clone)]
pub struct DiagnosisOutcome {
    pub record: DiagnosisRecord,
    /// Disease model that produced the predictions
    pub model: String,
    pub timestamp: DateTime<Utc>,
}

/// Reconciled predictions, highest confidence first
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    pub predictions: Vec<EnhancedPrediction>,
    pub kind: ReconciliationKind,
}

/// Whole-word match in either direction (`"cherry tomato"` ~ `"tomato"`)
fn plant_types_match(a: &str, b: &str) -> bool {
    let (a, b) = (spaced(a), spaced(b));
    !a.is_empty() && !b.is_empty() && (contains_phrase(&a, &b) || contains_phrase(&b, &a))
}

pub struct DiagnosisService {
    classifier: Arc<dyn ImageClassifier>,
    validator: PlantValidator,
    matcher: LabelMatcher,
    store: Arc<dyn DiagnosisStore>,
    disease_model: String,
}

impl DiagnosisService {
    pub fn new(
        classifier: Arc<dyn ImageClassifier>,
        store: Arc<dyn DiagnosisStore>,
        taxonomy: Arc<Taxonomy>,
        models: ModelSet,
    ) -> Self {
        let validator = PlantValidator::new(classifier.clone(), models.general, models.plant);

        Self {
            classifier,
            validator,
            matcher: LabelMatcher::new(taxonomy),
            store,
            disease_model: models.disease,
        }
    }

    pub fn matcher(&self) -> &LabelMatcher {
        &self.matcher
    }

    /// Run the full pipeline on one image and persist the result
    pub async fn diagnose(
        &self,
        image: &ImagePayload,
        plant_name_hint: Option<&str>,
    ) -> Result<DiagnosisOutcome, DiagnosisError> {
        let validation = self.validator.validate(image).await?;
        if !validation.is_valid {
            let reason = validation
                .reason
                .unwrap_or_else(|| NO_PLANT_REASON.to_string());
            tracing::info!(reason = %reason, "Image rejected: not a plant");
            return Err(DiagnosisError::NotAPlant(reason));
        }

        let plant_type = validation.plant_type.clone().unwrap_or_default();

        let raw = self
            .classifier
            .classify(image, &self.disease_model)
            .await
            .map_err(DiagnosisError::Classification)?;
        if raw.is_empty() {
            return Err(DiagnosisError::NoPredictions);
        }

        let Reconciliation { predictions, kind } = self.reconcile(&plant_type, raw);
        let Some(top) = predictions.first() else {
            return Err(DiagnosisError::NoPredictions);
        };

        tracing::info!(
            plant_type = %plant_type,
            disease = %top.formatted_label,
            score = top.score,
            reconciliation = kind.as_str(),
            "Diagnosis complete"
        );

        let plant_name = plant_name_hint
            .map(str::trim)
            .filter(|hint| !hint.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| title_case(&plant_type));

        let mut additional_info = Map::new();
        additional_info.insert("plant_type".to_string(), Value::from(plant_type.clone()));
        if let Some(confidence) = validation.confidence {
            additional_info.insert("validation_confidence".to_string(), Value::from(confidence));
        }
        if let Some(source) = validation.source {
            additional_info.insert(
                "validation_source".to_string(),
                serde_json::to_value(source).unwrap_or(Value::Null),
            );
        }
        additional_info.insert("model".to_string(), Value::from(self.disease_model.clone()));
        additional_info.insert("reconciliation".to_string(), Value::from(kind.as_str()));

        // Storage keeps millisecond precision
        let timestamp = Utc::now().trunc_subsecs(3);

        let record = DiagnosisRecord {
            id: Uuid::new_v4(),
            plant_name,
            disease_name: top.formatted_label.clone(),
            treatment: top.treatment.clone(),
            predictions,
            image_path: image.reference.clone(),
            additional_info,
            created_at: timestamp,
        };

        let record = self.store.save(record).await?;

        Ok(DiagnosisOutcome {
            record,
            model: self.disease_model.clone(),
            timestamp,
        })
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<DiagnosisRecord>, DiagnosisError> {
        Ok(self.store.get_by_id(id).await?)
    }

    /// Diagnosis history, newest first
    pub async fn list(&self) -> Result<Vec<DiagnosisRecord>, DiagnosisError> {
        Ok(self.store.list_all().await?)
    }

    /// Reconcile raw disease-model output with the validated plant type
    pub fn reconcile(&self, plant_type: &str, raw: Vec<Prediction>) -> Reconciliation {
        let plant_lower = plant_type.to_lowercase();
        let is_pepper = plant_lower.contains("pepper");

        if is_pepper && raw.iter().any(|p| has_bacterial_symptom(&p.label.to_lowercase())) {
            tracing::debug!(plant_type = %plant_type, "Pepper with bacterial symptoms");
            let prediction = Prediction::new(PEPPER_BACTERIAL_SPOT, PEPPER_OVERRIDE_CONFIDENCE)
                .with_note("Bacterial symptoms detected on a pepper plant");
            return self.finish(vec![prediction], ReconciliationKind::PepperOverride);
        }

        let plant_spaced = spaced(plant_type);
        let relevant: Vec<Prediction> = raw
            .iter()
            .filter(|p| {
                let label = spaced(&p.label);
                if is_pepper {
                    contains_phrase(&label, "pepper")
                } else {
                    contains_phrase(&label, &plant_spaced)
                }
            })
            .cloned()
            .collect();

        if !relevant.is_empty() {
            return self.finish(relevant, ReconciliationKind::Filtered);
        }

        let implied = self.implied_plant_types(&raw);
        let known = implied.iter().any(|t| plant_types_match(t, plant_type));

        if !known {
            tracing::info!(
                plant_type = %plant_type,
                implied = ?implied,
                "Disease model does not cover plant type; assuming healthy"
            );
            return self.synthesize_healthy(plant_type);
        }

        tracing::info!(plant_type = %plant_type, "No prediction names the plant type; keeping all with warning");
        let note = format!("This prediction may not apply to {} plants", plant_type);
        let warned = raw
            .into_iter()
            .map(|p| p.with_note(note.clone()))
            .collect();
        self.finish(warned, ReconciliationKind::KeptWithWarning)
    }

    /// Plant types the disease model's labels refer to
    fn implied_plant_types(&self, raw: &[Prediction]) -> Vec<String> {
        let mut types: Vec<String> = Vec::new();
        for prediction in raw {
            let plant = match self.matcher.find(&prediction.label) {
                Some(entry) => entry.plant_name().to_lowercase(),
                None => extract_plant_type(&prediction.label).to_lowercase(),
            };
            if !plant.is_empty() && !types.contains(&plant) {
                types.push(plant);
            }
        }
        types
    }

    fn closest_healthy_entry(&self, plant_type: &str) -> Option<&TaxonomyEntry> {
        self.matcher.taxonomy().entries().iter().find(|e| {
            e.is_healthy()
                && (plant_types_match(e.plant_name(), plant_type)
                    || plant_types_match(&e.plant_key, plant_type))
        })
    }

    fn synthesize_healthy(&self, plant_type: &str) -> Reconciliation {
        let note = format!("No disease detected for {}", plant_type);

        if let Some(entry) = self.closest_healthy_entry(plant_type) {
            let prediction = Prediction::new(
                format!("Healthy {}", entry.plant_name()),
                SYNTHESIZED_HEALTHY_CONFIDENCE,
            )
            .with_note(note);
            return self.finish(vec![prediction], ReconciliationKind::SynthesizedHealthy);
        }

        // Not in the taxonomy; the matcher would only find a wrong plant
        let label = format!("Healthy {}", title_case(plant_type));
        Reconciliation {
            predictions: vec![EnhancedPrediction {
                formatted_label: label.clone(),
                label,
                score: SYNTHESIZED_HEALTHY_CONFIDENCE,
                note: Some(note),
                treatment: GENERIC_CARE_ADVICE.to_string(),
            }],
            kind: ReconciliationKind::SynthesizedHealthy,
        }
    }

    fn finish(&self, predictions: Vec<Prediction>, kind: ReconciliationKind) -> Reconciliation {
        let mut predictions: Vec<EnhancedPrediction> = predictions
            .into_iter()
            .map(|p| self.matcher.enhance(p))
            .collect();
        predictions.sort_by(|a, b| b.score.total_cmp(&a.score));

        Reconciliation { predictions, kind }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sqlx::sqlite::SqlitePoolOptions;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use crate::db::SqliteDiagnosisStore;
    use crate::models::ValidationSource;

    /// Returns canned predictions per model and records every call
    #[derive(Default)]
    struct ScriptedClassifier {
        responses: HashMap<String, Vec<Prediction>>,
        unavailable: Option<String>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedClassifier {
        fn with(mut self, model: &str, items: &[(&str, f64)]) -> Self {
            self.responses.insert(
                model.to_string(),
                items.iter().map(|(l, s)| Prediction::new(*l, *s)).collect(),
            );
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ImageClassifier for ScriptedClassifier {
        async fn classify(
            &self,
            _image: &ImagePayload,
            model_id: &str,
        ) -> Result<Vec<Prediction>, InferenceError> {
            self.calls.lock().unwrap().push(model_id.to_string());
            if self.unavailable.as_deref() == Some(model_id) {
                return Err(InferenceError::RetriesExhausted {
                    attempts: 4,
                    message: "Model is currently loading".to_string(),
                });
            }
            Ok(self.responses.get(model_id).cloned().unwrap_or_default())
        }
    }

    fn models() -> ModelSet {
        ModelSet {
            general: "general".to_string(),
            plant: "plant".to_string(),
            disease: "disease".to_string(),
        }
    }

    fn image() -> ImagePayload {
        ImagePayload::from_bytes(b"jpeg", "https://example.com/leaf.jpg")
    }

    async fn service(classifier: Arc<ScriptedClassifier>) -> DiagnosisService {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::db::init_tables(&pool).await.unwrap();

        DiagnosisService::new(
            classifier,
            Arc::new(SqliteDiagnosisStore::new(pool)),
            Arc::new(Taxonomy::builtin()),
            models(),
        )
    }

    fn offline_service() -> DiagnosisService {
        struct NoStore;

        #[async_trait]
        impl DiagnosisStore for NoStore {
            async fn save(&self, record: DiagnosisRecord) -> plantdoc_common::Result<DiagnosisRecord> {
                Ok(record)
            }
            async fn get_by_id(&self, _id: Uuid) -> plantdoc_common::Result<Option<DiagnosisRecord>> {
                Ok(None)
            }
            async fn list_all(&self) -> plantdoc_common::Result<Vec<DiagnosisRecord>> {
                Ok(Vec::new())
            }
        }

        DiagnosisService::new(
            Arc::new(ScriptedClassifier::default()),
            Arc::new(NoStore),
            Arc::new(Taxonomy::builtin()),
            models(),
        )
    }

    fn preds(items: &[(&str, f64)]) -> Vec<Prediction> {
        items.iter().map(|(l, s)| Prediction::new(*l, *s)).collect()
    }

    #[tokio::test]
    async fn test_tomato_late_blight_end_to_end() {
        let classifier = Arc::new(
            ScriptedClassifier::default()
                .with("general", &[("tomato plant", 0.82), ("pot", 0.1)])
                .with("disease", &[("Tomato___Late_blight", 0.77)]),
        );
        let svc = service(classifier.clone()).await;

        let outcome = svc.diagnose(&image(), None).await.unwrap();
        let record = &outcome.record;

        assert_eq!(record.disease_name, "Tomato - Late Blight");
        assert_eq!(record.predictions[0].confidence_percent(), "77.00%");
        assert_eq!(record.plant_name, "Tomato");
        assert_eq!(record.image_path, "https://example.com/leaf.jpg");
        assert_eq!(record.treatment, record.predictions[0].treatment);
        assert_eq!(record.additional_info["plant_type"], "tomato");
        assert_eq!(record.additional_info["reconciliation"], "filtered");
        assert_eq!(record.additional_info["validation_source"], "general");
        assert_eq!(outcome.model, "disease");
        assert_eq!(classifier.calls(), vec!["general", "disease"]);

        assert_eq!(svc.get(record.id).await.unwrap().as_ref(), Some(record));
        assert_eq!(svc.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_plant_synthesizes_healthy() {
        let classifier = Arc::new(
            ScriptedClassifier::default()
                .with("general", &[("Healthy tomato", 0.88)])
                .with("disease", &[("Corn___Common_rust", 0.6)]),
        );
        let svc = service(classifier).await;

        let record = svc.diagnose(&image(), None).await.unwrap().record;

        assert_eq!(record.predictions.len(), 1);
        assert_eq!(record.disease_name, "Tomato - Healthy");
        assert_eq!(record.predictions[0].score, SYNTHESIZED_HEALTHY_CONFIDENCE);
        assert_eq!(record.additional_info["reconciliation"], "synthesized_healthy");
    }

    #[tokio::test]
    async fn test_named_virus_is_not_reported_healthy() {
        let classifier = Arc::new(
            ScriptedClassifier::default()
                .with("general", &[("tomato plant", 0.8)])
                .with(
                    "disease",
                    &[("Tomato Yellow Leaf Curl Virus", 0.93), ("Healthy Tomato Plant", 0.04)],
                ),
        );
        let svc = service(classifier).await;

        let record = svc.diagnose(&image(), None).await.unwrap().record;

        assert_eq!(record.disease_name, "Tomato - Yellow Leaf Curl Virus");
        assert_eq!(record.predictions[1].formatted_label, "Tomato - Healthy");
        assert_ne!(record.treatment, record.predictions[1].treatment);
    }

    #[tokio::test]
    async fn test_not_a_plant_skips_disease_model() {
        let classifier = Arc::new(
            ScriptedClassifier::default()
                .with("general", &[("German shepherd, alsatian", 0.91)])
                .with("disease", &[("Tomato___Late_blight", 0.77)]),
        );
        let svc = service(classifier.clone()).await;

        let err = svc.diagnose(&image(), None).await.unwrap_err();
        match err {
            DiagnosisError::NotAPlant(reason) => assert!(reason.contains("German shepherd")),
            other => panic!("expected NotAPlant, got {:?}", other),
        }
        assert_eq!(classifier.calls(), vec!["general"]);
        assert!(svc.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_plant_model_fallback_and_name_hint() {
        let classifier = Arc::new(
            ScriptedClassifier::default()
                .with("general", &[("pot", 0.4), ("vase", 0.3)])
                .with("plant", &[("Potato___Early_blight", 0.7)])
                .with("disease", &[("Potato___Early_blight", 0.66)]),
        );
        let svc = service(classifier.clone()).await;

        let record = svc
            .diagnose(&image(), Some("  Backyard potatoes "))
            .await
            .unwrap()
            .record;

        assert_eq!(record.plant_name, "Backyard potatoes");
        assert_eq!(
            record.additional_info["validation_source"],
            serde_json::to_value(ValidationSource::Plant).unwrap()
        );
        assert_eq!(classifier.calls(), vec!["general", "plant", "disease"]);
    }

    #[tokio::test]
    async fn test_empty_disease_output_is_error() {
        let classifier = Arc::new(
            ScriptedClassifier::default().with("general", &[("tomato plant", 0.8)]),
        );
        let svc = service(classifier).await;

        let err = svc.diagnose(&image(), None).await.unwrap_err();
        assert!(matches!(err, DiagnosisError::NoPredictions));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_validation_outage_is_retryable_error() {
        let mut classifier = ScriptedClassifier::default();
        classifier.unavailable = Some("general".to_string());
        let svc = service(Arc::new(classifier)).await;

        let err = svc.diagnose(&image(), None).await.unwrap_err();
        assert!(matches!(err, DiagnosisError::Validation(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_pepper_override() {
        let svc = offline_service();
        let result = svc.reconcile(
            "Bell Pepper",
            preds(&[("Tomato___Bacterial_spot", 0.7), ("Pepper_bell___healthy", 0.2)]),
        );

        assert_eq!(result.kind, ReconciliationKind::PepperOverride);
        assert_eq!(result.predictions.len(), 1);
        assert_eq!(result.predictions[0].label, PEPPER_BACTERIAL_SPOT);
        assert_eq!(result.predictions[0].score, PEPPER_OVERRIDE_CONFIDENCE);
    }

    #[test]
    fn test_filter_keeps_only_matching_plant() {
        let svc = offline_service();
        let result = svc.reconcile(
            "potato",
            preds(&[
                ("Tomato___Late_blight", 0.5),
                ("Potato___Late_blight", 0.3),
                ("Potato___healthy", 0.2),
            ]),
        );

        assert_eq!(result.kind, ReconciliationKind::Filtered);
        let labels: Vec<&str> = result.predictions.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, vec!["Potato___Late_blight", "Potato___healthy"]);
    }

    #[test]
    fn test_filter_matches_whole_words() {
        let svc = offline_service();
        let result = svc.reconcile(
            "pot",
            preds(&[("Potato___Late_blight", 0.5), ("Potato___healthy", 0.2)]),
        );

        assert_eq!(result.kind, ReconciliationKind::SynthesizedHealthy);
        assert_eq!(result.predictions[0].formatted_label, "Healthy Pot");
    }

    #[test]
    fn test_known_plant_without_match_keeps_all_with_warning() {
        let svc = offline_service();
        let result = svc.reconcile(
            "Bell Pepper",
            preds(&[("Healthy Capsicum", 0.6), ("Tomato___healthy", 0.3)]),
        );

        assert_eq!(result.kind, ReconciliationKind::KeptWithWarning);
        assert_eq!(result.predictions.len(), 2);
        assert_eq!(result.predictions[0].formatted_label, "Bell Pepper - Healthy");
        for p in &result.predictions {
            assert_eq!(
                p.note.as_deref(),
                Some("This prediction may not apply to Bell Pepper plants")
            );
        }
    }

    #[test]
    fn test_untaxonomized_plant_gets_generic_care() {
        let svc = offline_service();
        let result = svc.reconcile("pineapple", preds(&[("Corn___Common_rust", 0.6)]));

        assert_eq!(result.kind, ReconciliationKind::SynthesizedHealthy);
        assert_eq!(result.predictions[0].formatted_label, "Healthy Pineapple");
        assert_eq!(result.predictions[0].treatment, GENERIC_CARE_ADVICE);
    }

    #[test]
    fn test_plant_types_match_is_word_bounded() {
        assert!(plant_types_match("cherry tomato", "Tomato"));
        assert!(plant_types_match("bell pepper", "Bell Pepper"));
        assert!(!plant_types_match("pineapple", "apple"));
        assert!(!plant_types_match("", "apple"));
    }
}
