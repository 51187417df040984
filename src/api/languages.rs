use axum::{extract::State, Json};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct LanguagesResponse {
    pub languages: BTreeMap<String, Vec<String>>,
}

/// Supported pairs as source -> targets
pub async fn list_languages(State(state): State<AppState>) -> Json<LanguagesResponse> {
    Json(LanguagesResponse {
        languages: state.registry.list_pairs().clone(),
    })
}
