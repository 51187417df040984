//! Translation endpoint

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::api::error::ApiError;
use crate::error::RelayError;
use crate::pair::LanguagePair;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TranslateRequest {
    pub from: String,
    pub to: String,
    pub source: String,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum TranslateResponse {
    Translation { translation: String },
    /// Unknown pairs are answered in-band rather than with an HTTP error
    Unsupported { error: String },
}

pub async fn translate(
    State(state): State<AppState>,
    payload: Result<Json<TranslateRequest>, JsonRejection>,
) -> Result<Json<TranslateResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| {
        ApiError::from(RelayError::MalformedRequest(e.body_text()))
    })?;

    let pair = LanguagePair::new(&request.from, &request.to);
    let Some(worker) = state.registry.lookup(&pair.id()) else {
        info!("Rejected translation for unsupported pair {}", pair);
        return Ok(Json(TranslateResponse::Unsupported {
            error: RelayError::UnsupportedPair(pair.id()).to_string(),
        }));
    };

    match worker.translate(&request.source).await {
        Ok(translation) => Ok(Json(TranslateResponse::Translation { translation })),
        Err(e) => {
            warn!("{}: translation failed: {}", pair, e);
            Err(e.into())
        }
    }
}
