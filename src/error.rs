use std::time::Duration;

use thiserror::Error;

use crate::engine::EngineState;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Language pair {0} not supported")]
    UnsupportedPair(String),

    #[error("Engine for {pair} unavailable: {state}")]
    EngineUnavailable { pair: String, state: EngineState },

    #[error("Engine launch error: {0}")]
    Launch(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Session timed out after {0:?}")]
    Timeout(Duration),

    #[error("Engine returned {received} lines for a batch of {sent}")]
    BatchMismatch { sent: usize, received: usize },

    #[error("Malformed request: {0}")]
    MalformedRequest(String),
}

impl RelayError {
    /// Session failures that may succeed on a later attempt, e.g. an engine
    /// that was launched but is not listening yet.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::Timeout(_) | Self::WebSocket(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, RelayError>;
