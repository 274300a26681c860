//! Plant Validator
//!
//! Decides whether an image plausibly shows a plant before any disease
//! classification is attempted, and extracts a normalized plant type.
//!
//! Two-stage cascade:
//! 1. General-purpose classifier: reject confident non-plant detections,
//!    accept the best plant-like label in the top-K
//! 2. Plant-specific classifier, only if stage 1 found no plant evidence
//!
//! Classifier failures are errors, never a silent "not a plant".

use std::sync::Arc;
use thiserror::Error;

use crate::models::{Prediction, ValidationResult, ValidationSource};
use crate::services::image_loader::ImagePayload;
use crate::services::inference_client::{ImageClassifier, InferenceError};
use crate::services::label_matcher::is_pepper_label;
use crate::services::vocabulary::{
    has_plant_keyword, is_healthy_known_plant, is_plant_category, mentions_non_plant,
    non_plant_term, PLANT_CONTAINERS, PLANT_TYPE_SUFFIXES,
};
use crate::utils::text::{spaced, strip_parenthetical};

/// Predictions inspected per model
pub const DEFAULT_TOP_K: usize = 3;

/// Non-plant detections at or below this score do not reject the image
pub const DEFAULT_REJECTION_THRESHOLD: f64 = 0.6;

/// Plant type reported for every pepper-family detection
pub const BELL_PEPPER: &str = "Bell Pepper";

pub const NO_PLANT_REASON: &str =
    "No plant could be identified in the image. Please upload a clearer image of a plant.";

/// Validation could not be performed
#[derive(Debug, Error)]
#[error("Unable to validate image content: {0}")]
pub struct ValidationError(#[source] pub InferenceError);

/// Result of inspecting one model's output
#[derive(Debug, Clone, PartialEq)]
pub enum Assessment {
    /// Confident non-plant detection; carries the user-facing reason
    NonPlant(String),
    /// Plant evidence with extracted plant type and its score
    Plant { plant_type: String, confidence: f64 },
    /// Neither
    Inconclusive,
}

/// Inspect the top-K predictions of one model
pub fn assess(predictions: &[Prediction], top_k: usize, rejection_threshold: f64) -> Assessment {
    let mut ranked: Vec<&Prediction> = predictions.iter().collect();
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked.truncate(top_k);

    for prediction in &ranked {
        let text = spaced(&prediction.label);
        if prediction.score > rejection_threshold
            && mentions_non_plant(&text)
            && !is_healthy_known_plant(&text)
        {
            let detected = primary_name(&prediction.label);
            tracing::info!(
                label = %prediction.label,
                score = prediction.score,
                term = non_plant_term(&text).unwrap_or_default(),
                "Non-plant object detected"
            );
            return Assessment::NonPlant(format!(
                "The image appears to show a {} ({:.0}% confidence) rather than a plant. \
                 Please upload a clear photo of a plant.",
                detected,
                prediction.score * 100.0
            ));
        }
    }

    // ranked is sorted, so the first plant-like label is the highest-scoring one
    ranked
        .iter()
        .find(|p| is_plant_evidence(&p.label))
        .map(|p| Assessment::Plant {
            plant_type: extract_plant_type(&p.label),
            confidence: p.score,
        })
        .unwrap_or(Assessment::Inconclusive)
}

/// Label names a plant and nothing that contradicts it
pub fn is_plant_evidence(label: &str) -> bool {
    let text = spaced(label);
    (is_plant_category(&text) || has_plant_keyword(&label.to_lowercase()))
        && !mentions_non_plant(&text)
}

/// First comma-separated name of an ImageNet-style label ("German shepherd, alsatian")
fn primary_name(label: &str) -> &str {
    label.split(',').next().unwrap_or(label).trim()
}

/// `"flower pot"` -> `"flower"`
fn without_containers(text: &str) -> String {
    text.split(' ')
        .filter(|word| !word.is_empty() && !PLANT_CONTAINERS.contains(word))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalize a classifier label into a bare plant type
///
/// `"Healthy tomato"` -> `"tomato"`, `"maple leaf"` -> `"maple"`,
/// `"Corn_(maize)___Common_rust_"` -> `"corn"`, any pepper -> `"Bell Pepper"`.
pub fn extract_plant_type(label: &str) -> String {
    let lower = label.to_lowercase();

    if is_pepper_label(&lower) {
        return BELL_PEPPER.to_string();
    }

    let mut name = primary_name(&lower);
    if let Some((plant, _)) = name.split_once("___") {
        name = plant;
    }
    if let Some((plant, _)) = name.split_once(" with ") {
        name = plant;
    }

    let mut plant_type = without_containers(&spaced(&strip_parenthetical(name)));

    if let Some(rest) = plant_type.strip_prefix("healthy ") {
        plant_type = rest.to_string();
    }

    loop {
        let Some(stripped) = PLANT_TYPE_SUFFIXES
            .iter()
            .find_map(|suffix| plant_type.strip_suffix(suffix))
        else {
            break;
        };
        plant_type = stripped.to_string();
    }

    if plant_type.is_empty() {
        without_containers(&spaced(primary_name(&lower)))
    } else {
        plant_type
    }
}

/// Two-stage plant validator
pub struct PlantValidator {
    classifier: Arc<dyn ImageClassifier>,
    general_model: String,
    plant_model: String,
    top_k: usize,
    rejection_threshold: f64,
}

impl PlantValidator {
    pub fn new(
        classifier: Arc<dyn ImageClassifier>,
        general_model: impl Into<String>,
        plant_model: impl Into<String>,
    ) -> Self {
        Self {
            classifier,
            general_model: general_model.into(),
            plant_model: plant_model.into(),
            top_k: DEFAULT_TOP_K,
            rejection_threshold: DEFAULT_REJECTION_THRESHOLD,
        }
    }

    /// Validate that `image` shows a plant
    pub async fn validate(&self, image: &ImagePayload) -> Result<ValidationResult, ValidationError> {
        let stages = [
            (&self.general_model, ValidationSource::General),
            (&self.plant_model, ValidationSource::Plant),
        ];

        for (model, source) in stages {
            let predictions = self
                .classifier
                .classify(image, model)
                .await
                .map_err(ValidationError)?;

            match assess(&predictions, self.top_k, self.rejection_threshold) {
                Assessment::NonPlant(reason) => {
                    return Ok(ValidationResult::rejected(reason));
                }
                Assessment::Plant {
                    plant_type,
                    confidence,
                } => {
                    tracing::info!(
                        model = %model,
                        plant_type = %plant_type,
                        confidence,
                        "Plant validated"
                    );
                    return Ok(ValidationResult::accepted(plant_type, confidence, source));
                }
                Assessment::Inconclusive => {
                    tracing::debug!(model = %model, "No plant evidence in top predictions");
                }
            }
        }

        Ok(ValidationResult::rejected(NO_PLANT_REASON))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn preds(items: &[(&str, f64)]) -> Vec<Prediction> {
        items.iter().map(|(l, s)| Prediction::new(*l, *s)).collect()
    }

    #[test]
    fn test_rejects_confident_dog() {
        let result = assess(
            &preds(&[("german shepherd", 0.91), ("malinois", 0.05), ("pot", 0.01)]),
            3,
            0.6,
        );
        match result {
            Assessment::NonPlant(reason) => assert!(reason.contains("german shepherd")),
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_low_confidence_non_plant_is_not_rejected() {
        let result = assess(&preds(&[("daisy", 0.5), ("cat", 0.4)]), 3, 0.6);
        assert_eq!(
            result,
            Assessment::Plant {
                plant_type: "daisy".to_string(),
                confidence: 0.5
            }
        );
    }

    #[test]
    fn test_accepts_healthy_tomato() {
        let result = assess(
            &preds(&[("Healthy tomato", 0.88), ("pot", 0.05), ("vase", 0.02)]),
            3,
            0.6,
        );
        assert_eq!(
            result,
            Assessment::Plant {
                plant_type: "tomato".to_string(),
                confidence: 0.88
            }
        );
    }

    #[test]
    fn test_only_top_k_are_inspected() {
        let result = assess(
            &preds(&[("pot", 0.4), ("vase", 0.3), ("tray", 0.2), ("daisy", 0.1)]),
            3,
            0.6,
        );
        assert_eq!(result, Assessment::Inconclusive);
    }

    #[test]
    fn test_healthy_plant_label_is_never_rejected() {
        // Exempt despite the non-plant term
        let result = assess(&preds(&[("healthy corn, mouse", 0.9), ("corn", 0.3)]), 3, 0.6);
        assert_eq!(
            result,
            Assessment::Plant {
                plant_type: "corn".to_string(),
                confidence: 0.3
            }
        );

        let result = assess(&preds(&[("healthy tomato, mouse", 0.9)]), 3, 0.6);
        assert_eq!(result, Assessment::Inconclusive);

        let result = assess(&preds(&[("tomato, mouse", 0.9)]), 3, 0.6);
        assert!(matches!(result, Assessment::NonPlant(_)));

        let result = assess(&preds(&[("healthy corn, ear", 0.9)]), 3, 0.6);
        assert_eq!(
            result,
            Assessment::Plant {
                plant_type: "corn".to_string(),
                confidence: 0.9
            }
        );
    }

    #[test]
    fn test_lookalike_words_are_not_plant_evidence() {
        for label in ["spotlight, spot", "rotisserie", "pot, flowerpot"] {
            assert_eq!(
                assess(&preds(&[(label, 0.9)]), 3, 0.6),
                Assessment::Inconclusive,
                "{}",
                label
            );
        }
    }

    #[test]
    fn test_mixed_label_is_not_plant_evidence() {
        assert!(!is_plant_evidence("leaf beetle"));
        assert!(is_plant_evidence("maple leaves"));
        assert!(is_plant_evidence("Tomato___Late_blight"));
        assert!(!is_plant_evidence("sports car"));
    }

    #[test]
    fn test_extract_plant_type() {
        assert_eq!(extract_plant_type("Healthy tomato"), "tomato");
        assert_eq!(extract_plant_type("maple leaf"), "maple");
        assert_eq!(extract_plant_type("apple tree"), "apple");
        assert_eq!(extract_plant_type("Corn_(maize)___Common_rust_"), "corn");
        assert_eq!(extract_plant_type("Tomato with Late Blight"), "tomato");
        assert_eq!(extract_plant_type("bell pepper"), BELL_PEPPER);
        assert_eq!(extract_plant_type("Healthy Chili Plant"), BELL_PEPPER);
        assert_eq!(extract_plant_type("daisy, oxeye daisy"), "daisy");
        assert_eq!(extract_plant_type("healthy basil plant leaf"), "basil");
        assert_eq!(extract_plant_type("tomato plant, pot"), "tomato");
        assert_eq!(extract_plant_type("flower pot"), "flower");
        assert_eq!(extract_plant_type("pot, flowerpot"), "");
    }

    mod cascade {
        use super::*;
        use async_trait::async_trait;
        use std::collections::HashMap;
        use std::sync::Mutex;

        const GENERAL: &str = "general";
        const PLANT: &str = "plant";

        /// Canned predictions per model, recording every call
        #[derive(Default)]
        struct ScriptedClassifier {
            responses: HashMap<String, Vec<Prediction>>,
            calls: Mutex<Vec<String>>,
        }

        impl ScriptedClassifier {
            fn with(mut self, model: &str, items: &[(&str, f64)]) -> Self {
                self.responses.insert(model.to_string(), preds(items));
                self
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
                Ok(self.responses.get(model_id).cloned().unwrap_or_default())
            }
        }

        fn image() -> ImagePayload {
            ImagePayload::from_bytes(b"jpeg", "https://example.com/leaf.jpg")
        }

        #[tokio::test]
        async fn test_plant_model_rejects_confident_rodent() {
            let classifier = Arc::new(
                ScriptedClassifier::default()
                    .with(GENERAL, &[("pot, flowerpot", 0.5), ("vase", 0.2)])
                    .with(PLANT, &[("rat", 0.8), ("Tomato___healthy", 0.1)]),
            );
            let validator = PlantValidator::new(classifier.clone(), GENERAL, PLANT);

            let result = validator.validate(&image()).await.unwrap();

            assert!(!result.is_valid);
            assert!(result.reason.as_deref().unwrap().contains("rat"));
            assert!(result.plant_type.is_none());
            assert_eq!(*classifier.calls.lock().unwrap(), vec![GENERAL, PLANT]);
        }

        #[tokio::test]
        async fn test_plant_model_accepts_after_inconclusive_general() {
            let classifier = Arc::new(
                ScriptedClassifier::default()
                    .with(GENERAL, &[("spotlight, spot", 0.7)])
                    .with(PLANT, &[("Corn_(maize)___Common_rust_", 0.85)]),
            );
            let validator = PlantValidator::new(classifier, GENERAL, PLANT);

            let result = validator.validate(&image()).await.unwrap();

            assert!(result.is_valid);
            assert_eq!(result.plant_type.as_deref(), Some("corn"));
            assert_eq!(result.source, Some(ValidationSource::Plant));
        }

        #[tokio::test]
        async fn test_no_evidence_from_either_model() {
            let classifier = Arc::new(
                ScriptedClassifier::default()
                    .with(GENERAL, &[("rotisserie", 0.9)])
                    .with(PLANT, &[]),
            );
            let validator = PlantValidator::new(classifier, GENERAL, PLANT);

            let result = validator.validate(&image()).await.unwrap();

            assert!(!result.is_valid);
            assert_eq!(result.reason.as_deref(), Some(NO_PLANT_REASON));
        }
    }
}
