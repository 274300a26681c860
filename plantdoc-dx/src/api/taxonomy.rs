//! Supported plant/condition pairs

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct TaxonomyEntryView {
    pub label: String,
    pub plant: String,
    pub name: String,
    pub healthy: bool,
}

#[derive(Debug, Serialize)]
pub struct TaxonomyResponse {
    pub count: usize,
    pub plants: Vec<String>,
    pub entries: Vec<TaxonomyEntryView>,
}

/// GET /api/taxonomy
pub async fn get_taxonomy(State(state): State<AppState>) -> Json<TaxonomyResponse> {
    let taxonomy = &state.taxonomy;

    let entries: Vec<TaxonomyEntryView> = taxonomy
        .entries()
        .iter()
        .map(|e| TaxonomyEntryView {
            label: e.canonical_label.clone(),
            plant: e.plant_name().to_string(),
            name: e.human_label.clone(),
            healthy: e.is_healthy(),
        })
        .collect();

    Json(TaxonomyResponse {
        count: entries.len(),
        plants: taxonomy.plant_types().into_iter().map(str::to_string).collect(),
        entries,
    })
}

pub fn taxonomy_routes() -> Router<AppState> {
    Router::new().route("/api/taxonomy", get(get_taxonomy))
}
