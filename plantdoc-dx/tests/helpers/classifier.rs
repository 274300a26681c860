//! Canned image classifier

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use plantdoc_dx::models::Prediction;
use plantdoc_dx::services::{ImageClassifier, ImagePayload, InferenceError};

/// Returns fixed predictions per model id and records every call.
/// Models without a script return an empty list.
#[derive(Default)]
pub struct ScriptedClassifier {
    responses: HashMap<String, Vec<Prediction>>,
    unavailable: Vec<String>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, model: &str, items: &[(&str, f64)]) -> Self {
        self.responses.insert(
            model.to_string(),
            items.iter().map(|(l, s)| Prediction::new(*l, *s)).collect(),
        );
        self
    }

    /// Model behaves as if it never finished warming up
    pub fn unavailable(mut self, model: &str) -> Self {
        self.unavailable.push(model.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
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

        if self.unavailable.iter().any(|m| m == model_id) {
            return Err(InferenceError::RetriesExhausted {
                attempts: 4,
                message: "Model is currently loading".to_string(),
            });
        }

        Ok(self.responses.get(model_id).cloned().unwrap_or_default())
    }
}
