//! Label Matcher
//!
//! Reconciles free-text classifier labels with the supported taxonomy.
//!
//! Rules are applied in order, first hit wins:
//! 1. Exact (case-insensitive) canonical label
//! 2. Pepper family: any pepper/capsicum/chili label maps onto the bell pepper
//!    entries, bacterial spot if a bacterial symptom is mentioned
//! 3. Separator normalization (`Tomato_Late_blight`, `tomato late blight`)
//! 4. `<plant> with <condition>` decomposition
//! 5. Condition words: the label names the plant and every word of the
//!    condition (or of its parenthetical alias), in any order
//! 6. `<plant>___healthy` when the plant name appears anywhere in the label
//!
//! A miss returns `None`; `enhance` then falls back to generic advice.

use std::collections::HashSet;
use std::sync::Arc;

use crate::models::{EnhancedPrediction, Prediction};
use crate::taxonomy::{
    Taxonomy, TaxonomyEntry, CONSULT_EXPERT_TREATMENT, PEPPER_BACTERIAL_SPOT, PEPPER_HEALTHY,
};
use crate::utils::text::{
    contains_phrase, parenthetical_contents, spaced, squash, strip_parenthetical, tidy_label,
};

/// Labels containing any of these are treated as bell pepper
pub const PEPPER_TERMS: &[&str] = &["pepper", "capsicum", "chili"];

/// Symptoms that indicate bacterial spot on peppers
pub const BACTERIAL_TERMS: &[&str] = &["bacterial", "spot", "blight", "lesion"];

/// Whether the lowercased label names a pepper-family plant
pub fn is_pepper_label(lowercase_label: &str) -> bool {
    PEPPER_TERMS.iter().any(|t| lowercase_label.contains(t))
}

/// Whether the lowercased label mentions a bacterial symptom
pub fn has_bacterial_symptom(lowercase_label: &str) -> bool {
    BACTERIAL_TERMS.iter().any(|t| lowercase_label.contains(t))
}

/// Joining words that never identify a condition
const FILLER_WORDS: &[&str] = &["a", "and", "or", "with", "of", "on", "the", "including"];

/// Words of `s` that can identify a condition, minus the plant's own name
fn condition_words(s: &str, plant_words: &HashSet<String>) -> Vec<String> {
    let mut words: Vec<String> = spaced(s)
        .split(' ')
        .filter(|w| !w.is_empty() && !FILLER_WORDS.contains(w) && !plant_words.contains(*w))
        .map(String::from)
        .collect();
    words.sort();
    words.dedup();
    words
}

/// Matches classifier labels against a shared taxonomy
#[derive(Debug, Clone)]
pub struct LabelMatcher {
    taxonomy: Arc<Taxonomy>,
}

impl LabelMatcher {
    pub fn new(taxonomy: Arc<Taxonomy>) -> Self {
        Self { taxonomy }
    }

    pub fn taxonomy(&self) -> &Taxonomy {
        &self.taxonomy
    }

    /// Find the taxonomy entry closest to `raw_label`
    pub fn find(&self, raw_label: &str) -> Option<&TaxonomyEntry> {
        let label = raw_label.trim();
        if label.is_empty() {
            return None;
        }

        if let Some(entry) = self.taxonomy.get(label) {
            return Some(entry);
        }

        let lower = label.to_lowercase();

        if is_pepper_label(&lower) {
            let key = if has_bacterial_symptom(&lower) {
                PEPPER_BACTERIAL_SPOT
            } else {
                PEPPER_HEALTHY
            };
            return self.taxonomy.get(key);
        }

        let squashed = squash(label);
        if let Some(entry) = self
            .taxonomy
            .entries()
            .iter()
            .find(|e| squash(&e.canonical_label) == squashed)
        {
            return Some(entry);
        }

        if let Some(entry) = self.find_plant_with_condition(&lower) {
            return Some(entry);
        }

        if let Some(entry) = self.find_by_condition_words(&lower) {
            return Some(entry);
        }

        self.find_healthy_plant(&lower)
    }

    /// `"Corn (maize) with Common Rust"` -> `Corn___Common_rust`
    fn find_plant_with_condition(&self, lower: &str) -> Option<&TaxonomyEntry> {
        let (plant, condition) = lower.split_once(" with ")?;
        let plant = spaced(&strip_parenthetical(plant));
        let condition = spaced(condition);

        if plant.is_empty() || condition.is_empty() {
            return None;
        }

        self.taxonomy.entries().iter().find(|e| {
            let key = spaced(&e.canonical_label);
            contains_phrase(&key, &plant) && contains_phrase(&key, &condition)
        })
    }

    /// `"Tomato Yellow Leaf Curl Virus"` -> `Tomato___Tomato_Yellow_Leaf_Curl_Virus`
    ///
    /// The entry whose condition contributes the most matched words wins;
    /// ties go to the earlier entry.
    fn find_by_condition_words(&self, lower: &str) -> Option<&TaxonomyEntry> {
        let label = spaced(lower);
        let label_words: HashSet<&str> = label.split(' ').filter(|w| !w.is_empty()).collect();

        let mut best: Option<(usize, &TaxonomyEntry)> = None;
        for entry in self.taxonomy.entries().iter().filter(|e| !e.is_healthy()) {
            let plant_key = spaced(&entry.plant_key);
            let plant_name = spaced(entry.plant_name());
            if !contains_phrase(&label, &plant_key) && !contains_phrase(&label, &plant_name) {
                continue;
            }

            let plant_words: HashSet<String> = plant_key
                .split(' ')
                .chain(plant_name.split(' '))
                .map(String::from)
                .collect();

            let mut variants = vec![strip_parenthetical(&entry.condition_key)];
            variants.extend(parenthetical_contents(&entry.condition_key));

            let score = variants
                .iter()
                .map(|v| condition_words(v, &plant_words))
                .filter(|words| {
                    !words.is_empty() && words.iter().all(|w| label_words.contains(w.as_str()))
                })
                .map(|words| words.len())
                .max();

            if let Some(score) = score {
                if best.map_or(true, |(top, _)| score > top) {
                    best = Some((score, entry));
                }
            }
        }

        best.map(|(_, entry)| entry)
    }

    /// `"Healthy Tomato"` -> `Tomato___healthy`
    fn find_healthy_plant(&self, lower: &str) -> Option<&TaxonomyEntry> {
        let label = spaced(lower);

        self.taxonomy.entries().iter().filter(|e| e.is_healthy()).find(|e| {
            let key = spaced(&e.plant_key);
            let name = spaced(e.plant_name());
            label.contains(&key) || label.contains(&name)
        })
    }

    /// Attach a human-readable label and treatment to a prediction
    pub fn enhance(&self, prediction: Prediction) -> EnhancedPrediction {
        let (formatted_label, treatment) = match self.find(&prediction.label) {
            Some(entry) => (entry.human_label.clone(), entry.treatment.clone()),
            None => {
                tracing::debug!(label = %prediction.label, "No taxonomy match for label");
                let tidy = tidy_label(&prediction.label);
                let formatted = if tidy.is_empty() {
                    "Unknown condition".to_string()
                } else {
                    tidy
                };
                (formatted, CONSULT_EXPERT_TREATMENT.to_string())
            }
        };

        EnhancedPrediction {
            label: prediction.label,
            score: prediction.score,
            note: prediction.note,
            formatted_label,
            treatment,
        }
    }
}
