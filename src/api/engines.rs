//! Engine health and recovery endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use tracing::info;

use crate::api::error::ApiError;
use crate::error::RelayError;
use crate::registry::EngineStatus;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct EnginesResponse {
    pub engines: Vec<EngineStatus>,
}

pub async fn list_engines(State(state): State<AppState>) -> Json<EnginesResponse> {
    Json(EnginesResponse {
        engines: state.registry.engine_statuses(),
    })
}

/// Relaunch the engine of a pair whose previous engine exited
pub async fn restart_engine(
    State(state): State<AppState>,
    Path(pair): Path<String>,
) -> Result<Json<EngineStatus>, ApiError> {
    let worker = state
        .registry
        .lookup(&pair)
        .ok_or_else(|| ApiError::from(RelayError::UnsupportedPair(pair.clone())))?;

    info!("{}: restart requested", pair);
    let engine_state = worker.supervisor().restart().map_err(|e| match e {
        RelayError::Launch(_) | RelayError::EngineUnavailable { .. } => {
            ApiError::conflict(e.to_string())
        }
        other => ApiError::from(other),
    })?;

    Ok(Json(EngineStatus {
        pair: worker.pair().id(),
        endpoint: worker.endpoint(),
        state: engine_state,
    }))
}
