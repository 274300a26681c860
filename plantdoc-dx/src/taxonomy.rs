//! Supported plant/condition taxonomy
//!
//! Static table of the PlantVillage plant/condition classes the diagnosis
//! service can report, each with a human-readable label and canned treatment
//! text. Built once at startup and shared read-only as `Arc<Taxonomy>`.
//!
//! Canonical labels use the composite `Plant___Condition` form.

use serde::Serialize;
use std::collections::HashMap;

/// Separator between plant key and condition key in canonical labels
pub const KEY_SEPARATOR: &str = "___";

/// Condition key used by every healthy entry
pub const HEALTHY_CONDITION: &str = "healthy";

/// The only pepper entries the disease models can produce
pub const PEPPER_BACTERIAL_SPOT: &str = "Pepper_bell___Bacterial_spot";
pub const PEPPER_HEALTHY: &str = "Pepper_bell___healthy";

/// Treatment text used when a label cannot be reconciled with the taxonomy
pub const CONSULT_EXPERT_TREATMENT: &str = "No specific treatment information is available for this condition. \
     Please consult a local agricultural extension office or plant pathology expert for an accurate diagnosis.";

/// Care advice for a healthy plant that is not part of the taxonomy
pub const GENERIC_CARE_ADVICE: &str = "Your plant appears healthy. Continue regular care: water at the base, \
     provide adequate sunlight, keep foliage dry, and inspect leaves weekly for spots, discoloration or pests.";

/// One supported plant/condition pair
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaxonomyEntry {
    pub plant_key: String,
    pub condition_key: String,
    /// `plant_key + "___" + condition_key`
    pub canonical_label: String,
    /// e.g. "Tomato - Late Blight"
    pub human_label: String,
    pub treatment: String,
}

impl TaxonomyEntry {
    /// Display name of the plant ("Bell Pepper", "Tomato")
    pub fn plant_name(&self) -> &str {
        self.human_label
            .split(" - ")
            .next()
            .unwrap_or(&self.human_label)
    }

    pub fn is_healthy(&self) -> bool {
        self.condition_key.eq_ignore_ascii_case(HEALTHY_CONDITION)
    }
}

// (plant_key, condition_key, human_label, treatment)
const ENTRIES: &[(&str, &str, &str, &str)] = &[
    ("Apple", "Apple_scab", "Apple - Apple Scab",
     "Rake and destroy fallen leaves to reduce overwintering spores. Apply a captan or myclobutanil fungicide from green tip through petal fall, and prune to improve air circulation. Plant scab-resistant varieties where possible."),
    ("Apple", "Black_rot", "Apple - Black Rot",
     "Prune out dead wood, cankers and mummified fruit during dormancy. Apply captan or a strobilurin fungicide during the growing season and remove infected fruit promptly."),
    ("Apple", "Cedar_apple_rust", "Apple - Cedar Apple Rust",
     "Remove nearby juniper (eastern red cedar) hosts where practical. Apply myclobutanil or another labeled fungicide from pink bud until two weeks after petal fall, and favor resistant cultivars."),
    ("Apple", "healthy", "Apple - Healthy",
     "Your apple tree looks healthy. Keep up regular watering, annual dormant pruning, balanced fertilization and routine scouting for pests and disease."),
    ("Blueberry", "healthy", "Blueberry - Healthy",
     "Your blueberry looks healthy. Maintain acidic soil (pH 4.5-5.5), mulch to keep roots cool and moist, and prune old canes in late winter."),
    ("Cherry", "Powdery_mildew", "Cherry - Powdery Mildew",
     "Prune to open the canopy and improve airflow. Apply sulfur, potassium bicarbonate or a labeled fungicide at first sign of white growth, and avoid excess nitrogen fertilizer."),
    ("Cherry", "healthy", "Cherry - Healthy",
     "Your cherry tree looks healthy. Water deeply during dry spells, prune after harvest and monitor for leaf spot and fruit flies."),
    ("Corn", "Cercospora_leaf_spot_Gray_leaf_spot", "Corn - Cercospora Leaf Spot (Gray Leaf Spot)",
     "Rotate away from corn for at least one year and till under infected residue. Plant resistant hybrids and apply a strobilurin or triazole fungicide if lesions reach the upper leaves before tasseling."),
    ("Corn", "Common_rust", "Corn - Common Rust",
     "Plant resistant hybrids. If pustules spread rapidly before silking, apply a labeled foliar fungicide such as azoxystrobin or propiconazole."),
    ("Corn", "Northern_Leaf_Blight", "Corn - Northern Leaf Blight",
     "Use resistant hybrids, rotate crops and manage residue. Apply a foliar fungicide at early tassel if lesions are present on the third leaf below the ear or higher."),
    ("Corn", "healthy", "Corn - Healthy",
     "Your corn looks healthy. Keep soil evenly moist during tasseling and silking, side-dress nitrogen as needed and scout for rust and blight."),
    ("Grape", "Black_rot", "Grape - Black Rot",
     "Remove mummified berries and infected canes. Apply mancozeb, captan or myclobutanil from bud break through four weeks after bloom, and keep the canopy open."),
    ("Grape", "Esca_(Black_Measles)", "Grape - Esca (Black Measles)",
     "Prune out and destroy affected wood during dry weather and protect pruning wounds with a sealant or fungicide. Avoid vine stress from drought; badly affected vines may need to be replaced."),
    ("Grape", "Leaf_blight_(Isariopsis_Leaf_Spot)", "Grape - Leaf Blight (Isariopsis Leaf Spot)",
     "Remove infected leaves and improve canopy airflow. Apply a copper-based or mancozeb fungicide and avoid overhead irrigation."),
    ("Grape", "healthy", "Grape - Healthy",
     "Your grapevine looks healthy. Train and prune for good airflow, water at the base and scout regularly during wet weather."),
    ("Orange", "Haunglongbing_(Citrus_greening)", "Orange - Huanglongbing (Citrus Greening)",
     "There is no cure. Remove and destroy infected trees to protect nearby citrus, control Asian citrus psyllids with approved insecticides, and plant certified disease-free nursery stock. Report suspected cases to your local agriculture authority."),
    ("Peach", "Bacterial_spot", "Peach - Bacterial Spot",
     "Apply copper sprays during dormancy and oxytetracycline during the season where permitted. Plant tolerant varieties and avoid excessive nitrogen."),
    ("Peach", "healthy", "Peach - Healthy",
     "Your peach tree looks healthy. Thin fruit, prune to an open center and apply a dormant spray to prevent leaf curl."),
    ("Pepper_bell", "Bacterial_spot", "Bell Pepper - Bacterial Spot",
     "Remove and destroy infected leaves and fruit. Apply copper-based bactericides combined with mancozeb, avoid overhead watering, and rotate away from peppers and tomatoes for two to three years. Use certified disease-free seed."),
    ("Pepper_bell", "healthy", "Bell Pepper - Healthy",
     "Your bell pepper looks healthy. Water consistently at the base, mulch to retain moisture, and support heavy plants."),
    ("Potato", "Early_blight", "Potato - Early Blight",
     "Remove infected lower leaves and rotate crops. Apply chlorothalonil or mancozeb at first symptoms and keep plants well fertilized to reduce stress."),
    ("Potato", "Late_blight", "Potato - Late Blight",
     "Destroy infected plants immediately to limit spread. Apply a protectant fungicide such as chlorothalonil or a systemic such as mefenoxam, avoid overhead watering, and harvest tubers only after vines are dead."),
    ("Potato", "healthy", "Potato - Healthy",
     "Your potato plants look healthy. Hill soil around stems, water evenly and scout for beetles and blight."),
    ("Raspberry", "healthy", "Raspberry - Healthy",
     "Your raspberry looks healthy. Remove spent floricanes after harvest and keep rows narrow for airflow."),
    ("Soybean", "healthy", "Soybean - Healthy",
     "Your soybean looks healthy. Scout regularly for aphids and leaf diseases and rotate with non-legume crops."),
    ("Squash", "Powdery_mildew", "Squash - Powdery Mildew",
     "Remove heavily infected leaves. Apply sulfur, potassium bicarbonate or neem oil at first sign, and space plants for airflow. Choose resistant varieties next season."),
    ("Strawberry", "Leaf_scorch", "Strawberry - Leaf Scorch",
     "Remove infected leaves after harvest and renovate beds. Avoid overhead irrigation and apply a labeled fungicide such as captan during bloom."),
    ("Strawberry", "healthy", "Strawberry - Healthy",
     "Your strawberry looks healthy. Mulch with straw, water in the morning and renew beds every three to four years."),
    ("Tomato", "Bacterial_spot", "Tomato - Bacterial Spot",
     "Remove infected plant parts and avoid working with wet plants. Apply copper-based bactericides with mancozeb, use disease-free seed and transplants, and rotate crops."),
    ("Tomato", "Early_blight", "Tomato - Early Blight",
     "Remove infected lower leaves and mulch to prevent soil splash. Apply chlorothalonil, mancozeb or copper fungicide every 7-10 days and rotate crops for three years."),
    ("Tomato", "Late_blight", "Tomato - Late Blight",
     "Remove and destroy infected plants immediately; do not compost them. Apply a fungicide containing chlorothalonil, mancozeb or copper to protect healthy plants, water at the base, and improve air circulation."),
    ("Tomato", "Leaf_Mold", "Tomato - Leaf Mold",
     "Lower humidity by venting greenhouses and spacing plants. Remove infected leaves and apply chlorothalonil or copper fungicide."),
    ("Tomato", "Septoria_leaf_spot", "Tomato - Septoria Leaf Spot",
     "Remove infected leaves, mulch around plants and avoid overhead watering. Apply chlorothalonil or copper fungicide at first symptoms."),
    ("Tomato", "Spider_mites_Two-spotted_spider_mite", "Tomato - Spider Mites (Two-spotted Spider Mite)",
     "Spray leaf undersides with water to dislodge mites. Apply insecticidal soap, horticultural oil or neem oil, and encourage predatory mites."),
    ("Tomato", "Target_Spot", "Tomato - Target Spot",
     "Remove infected leaves and improve airflow. Apply chlorothalonil, mancozeb or azoxystrobin and avoid leaf wetness."),
    ("Tomato", "Tomato_Yellow_Leaf_Curl_Virus", "Tomato - Yellow Leaf Curl Virus",
     "Remove and destroy infected plants. Control whiteflies with reflective mulch, insecticidal soap or approved insecticides, and plant resistant varieties."),
    ("Tomato", "Tomato_mosaic_virus", "Tomato - Mosaic Virus",
     "Remove infected plants and disinfect tools. Wash hands after handling tobacco, control weeds and plant resistant varieties."),
    ("Tomato", "healthy", "Tomato - Healthy",
     "Your tomato looks healthy. Water consistently at the base, stake or cage plants, and scout weekly for early blight and pests."),
];

/// Immutable taxonomy of supported plant/condition pairs
#[derive(Debug, Clone)]
pub struct Taxonomy {
    entries: Vec<TaxonomyEntry>,
    /// Lowercased canonical label -> index into `entries`
    index: HashMap<String, usize>,
}

impl Taxonomy {
    /// Build the built-in PlantVillage taxonomy
    pub fn builtin() -> Self {
        let entries = ENTRIES
            .iter()
            .map(|(plant, condition, human, treatment)| TaxonomyEntry {
                plant_key: plant.to_string(),
                condition_key: condition.to_string(),
                canonical_label: format!("{}{}{}", plant, KEY_SEPARATOR, condition),
                human_label: human.to_string(),
                treatment: treatment.to_string(),
            })
            .collect();

        Self::from_entries(entries)
    }

    pub fn from_entries(entries: Vec<TaxonomyEntry>) -> Self {
        let index = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.canonical_label.to_lowercase(), i))
            .collect();

        Self { entries, index }
    }

    /// Case-insensitive lookup by canonical label
    pub fn get(&self, canonical_label: &str) -> Option<&TaxonomyEntry> {
        self.index
            .get(&canonical_label.to_lowercase())
            .map(|&i| &self.entries[i])
    }

    pub fn entries(&self) -> &[TaxonomyEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Distinct plant display names, in table order
    pub fn plant_types(&self) -> Vec<&str> {
        let mut plants: Vec<&str> = Vec::new();
        for entry in &self.entries {
            let name = entry.plant_name();
            if !plants.contains(&name) {
                plants.push(name);
            }
        }
        plants
    }

    /// Healthy entry for a plant display name or plant key (case-insensitive)
    pub fn healthy_entry_for(&self, plant: &str) -> Option<&TaxonomyEntry> {
        self.entries.iter().find(|e| {
            e.is_healthy()
                && (e.plant_name().eq_ignore_ascii_case(plant)
                    || e.plant_key.eq_ignore_ascii_case(plant))
        })
    }
}

impl Default for Taxonomy {
    fn default() -> Self {
        Self::builtin()
    }
}
