//! HTTP API handlers for plantdoc-dx

pub mod diagnosis;
pub mod health;
pub mod taxonomy;

pub use diagnosis::diagnosis_routes;
pub use health::health_routes;
pub use taxonomy::taxonomy_routes;
