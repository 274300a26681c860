//! Vocabularies used to decide whether classifier labels describe a plant
//!
//! Terms are lowercase and space-separated; multi-word entries are matched as
//! whole-word phrases against `spaced` label text.

use crate::taxonomy::KEY_SEPARATOR;
use crate::utils::text::{contains_phrase, spaced};

/// Objects that rule out a plant photo when detected with high confidence
pub const NON_PLANT_OBJECTS: &[&str] = &[
    // animals
    "dog", "puppy", "cat", "kitten", "german shepherd", "golden retriever",
    "labrador retriever", "retriever", "terrier", "spaniel", "hound",
    "beagle", "poodle", "chihuahua", "pug", "husky",
    "tabby", "tiger cat", "persian cat", "siamese cat", "egyptian cat",
    "horse", "cow", "ox", "sheep", "ram", "goat", "pig", "hog", "bird",
    "parrot", "macaw", "chicken", "hen", "cock", "duck", "goose", "owl",
    "fish", "goldfish", "shark", "snake", "lizard", "frog", "turtle",
    "tiger", "lion", "bear", "elephant", "zebra", "giraffe", "monkey",
    "gorilla", "chimpanzee", "rabbit", "hare", "fox", "wolf", "deer",
    // people
    "person", "people", "man", "woman", "boy", "girl", "child", "baby",
    "face", "groom", "bride", "scuba diver", "ballplayer",
    // vehicles
    "car", "sports car", "convertible", "minivan", "jeep", "limousine",
    "cab", "taxi", "truck", "pickup", "bus", "school bus", "trolleybus",
    "motorcycle", "moped", "bicycle", "mountain bike", "tractor", "train",
    "locomotive", "airliner", "airplane", "aircraft", "boat", "canoe",
    "speedboat", "ship",
    // furniture
    "chair", "rocking chair", "folding chair", "table", "dining table",
    "desk", "sofa", "couch", "studio couch", "bed", "four poster",
    "wardrobe", "bookcase", "cabinet", "dresser",
    // electronics
    "computer", "laptop", "notebook computer", "desktop computer",
    "monitor", "screen", "television", "tv", "cellular telephone",
    "cell phone", "mobile phone", "smartphone", "ipod", "keyboard",
    "computer keyboard", "remote control", "camera", "printer",
    "loudspeaker", "microwave", "refrigerator", "joystick",
    // containers
    "bottle", "water bottle", "wine bottle", "beer bottle", "pop bottle",
    "cup", "coffee mug", "mug", "bowl", "mixing bowl", "bucket", "pail",
    "barrel", "box", "carton", "crate", "jar", "water jug", "tray",
    // street
    "street sign", "traffic light", "parking meter",
];

/// Single words that indicate insects, rodents or inanimate objects
pub const ISOLATED_NON_PLANT_TERMS: &[&str] = &[
    "insect", "bee", "ant", "fly", "beetle", "ladybug", "butterfly", "moth",
    "mosquito", "cockroach", "grasshopper", "cricket", "leafhopper",
    "caterpillar", "rat", "mouse", "hamster", "squirrel", "rodent", "rock",
    "stone", "brick", "plastic", "metal", "toy", "ball", "shoe", "sneaker",
    "shirt", "jersey", "book", "pen", "building", "house", "fence", "envelope",
    "background",
];

/// Plant categories: trees, flowers, fruits, vegetables, herbs and generic plant words
pub const PLANT_CATEGORIES: &[&str] = &[
    // trees and shrubs
    "tree", "oak", "maple", "pine", "palm", "willow", "birch", "cedar",
    "fir", "spruce", "bonsai", "shrub", "bush", "hedge", "vine", "buckeye",
    "acorn",
    // flowers
    "flower", "daisy", "rose", "rose hip", "hip", "tulip", "sunflower",
    "orchid", "lily", "dandelion", "hibiscus", "lavender", "marigold",
    "yellow lady s slipper", "lady s slipper", "rapeseed",
    // fruits
    "apple", "granny smith", "orange", "lemon", "lime", "banana",
    "strawberry", "pineapple", "fig", "pomegranate", "grape", "cherry",
    "peach", "pear", "custard apple", "jackfruit", "blueberry", "raspberry",
    "citrus", "melon",
    // vegetables
    "tomato", "potato", "corn", "maize", "ear", "bell pepper", "pepper",
    "capsicum", "chili", "cabbage", "head cabbage", "broccoli",
    "cauliflower", "zucchini", "squash", "spaghetti squash", "acorn squash",
    "butternut squash", "cucumber", "artichoke", "cardoon", "eggplant",
    "lettuce", "spinach", "carrot", "onion", "soybean", "bean", "pea",
    // herbs
    "basil", "mint", "parsley", "rosemary", "thyme", "sage", "cilantro",
    "oregano", "dill",
    // generic
    "plant", "leaf", "leaves", "foliage", "seedling", "sapling", "grass",
    "fern", "moss", "cactus", "succulent", "houseplant", "crop", "hay",
];

/// Words that mark a label as plant-related
pub const PLANT_KEYWORDS: &[&str] = &["plant", "leaf", "leaves", "flower", "tree", "healthy"];

/// Symptom words; only trusted inside composite `Plant___Condition` labels
pub const DISEASE_KEYWORDS: &[&str] = &[
    "blight", "mildew", "rust", "scab", "rot", "mosaic", "wilt", "spot",
    "mold", "scorch", "greening", "curl",
];

/// Things plants are grown in; never a plant type
pub const PLANT_CONTAINERS: &[&str] = &["pot", "flowerpot", "vase", "planter"];

/// Trailing descriptors removed when extracting a plant type
pub const PLANT_TYPE_SUFFIXES: &[&str] = &[" leaf", " leaves", " plant", " tree", " flower", " fruit"];

/// Whether `spaced_label` mentions any non-plant object or term
pub fn mentions_non_plant(spaced_label: &str) -> bool {
    non_plant_term(spaced_label).is_some()
}

/// First non-plant object or term found in `spaced_label`
pub fn non_plant_term(spaced_label: &str) -> Option<&'static str> {
    NON_PLANT_OBJECTS
        .iter()
        .chain(ISOLATED_NON_PLANT_TERMS.iter())
        .copied()
        .find(|term| contains_phrase(spaced_label, term))
}

/// Whether `spaced_label` names a known plant category
pub fn is_plant_category(spaced_label: &str) -> bool {
    PLANT_CATEGORIES
        .iter()
        .any(|term| contains_phrase(spaced_label, term))
}

/// Whether `lowercase_label` contains a plant keyword
///
/// Composite labels (`tomato___late_blight`) match plant and symptom keywords
/// as substrings. Anything else needs a plant keyword as a whole word, so
/// `"spotlight, spot"` and `"pot, flowerpot"` do not count.
pub fn has_plant_keyword(lowercase_label: &str) -> bool {
    if lowercase_label.contains(KEY_SEPARATOR) {
        return PLANT_KEYWORDS
            .iter()
            .chain(DISEASE_KEYWORDS)
            .any(|kw| lowercase_label.contains(kw));
    }

    let text = spaced(lowercase_label);
    PLANT_KEYWORDS.iter().any(|kw| contains_phrase(&text, kw))
}

/// `"healthy <word>"` where `<word>` is a known plant
pub fn is_healthy_known_plant(spaced_label: &str) -> bool {
    spaced_label
        .strip_prefix("healthy ")
        .and_then(|rest| rest.split_whitespace().next())
        .map(|word| PLANT_CATEGORIES.contains(&word))
        .unwrap_or(false)
}
