//! API error handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::error::RelayError;

/// Error rendered as `{"error": message}`
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, msg)
    }

}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<RelayError> for ApiError {
    fn from(err: RelayError) -> Self {
        let status = match &err {
            RelayError::UnsupportedPair(_) => StatusCode::NOT_FOUND,
            RelayError::MalformedRequest(_) => StatusCode::BAD_REQUEST,
            RelayError::EngineUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            RelayError::Transport(_)
            | RelayError::WebSocket(_)
            | RelayError::BatchMismatch { .. } => StatusCode::BAD_GATEWAY,
            RelayError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineState;
    use std::time::Duration;

    #[test]
    fn test_status_mapping() {
        let unavailable: ApiError = RelayError::EngineUnavailable {
            pair: "en-de".into(),
            state: EngineState::Unconfigured,
        }
        .into();
        assert_eq!(unavailable.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(unavailable.message, "Engine for en-de unavailable: no engine configured");

        let mismatch: ApiError = RelayError::BatchMismatch { sent: 3, received: 2 }.into();
        assert_eq!(mismatch.status, StatusCode::BAD_GATEWAY);

        let timeout: ApiError = RelayError::Timeout(Duration::from_secs(60)).into();
        assert_eq!(timeout.status, StatusCode::GATEWAY_TIMEOUT);
    }
}
