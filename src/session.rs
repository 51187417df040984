//! Engine session client.
//!
//! A session is one WebSocket connection carrying exactly one request batch
//! and its response batch. Sessions are never shared, so concurrent
//! translations against the same engine each get their own connection.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, Instrument};
use uuid::Uuid;

use crate::error::{Result, RelayError};

type EngineSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Strategy for exchanging one framed batch with an engine.
///
/// Implementations must return exactly one line per request line, in
/// request order.
#[async_trait]
pub trait SessionTransport: Send + Sync {
    async fn exchange(&self, endpoint: &str, lines: &[String]) -> Result<Vec<String>>;
}

/// Opens a fresh connection per call and closes it afterwards
#[derive(Debug, Clone)]
pub struct WebSocketSession {
    timeout: Duration,
}

impl WebSocketSession {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    async fn run(&self, endpoint: &str, lines: &[String]) -> Result<Vec<String>> {
        let (mut socket, _) = connect_async(endpoint)
            .await
            .map_err(|e| RelayError::Transport(format!("Failed to connect to {}: {}", endpoint, e)))?;

        let outcome = round_trip(&mut socket, lines).await;

        if let Err(e) = socket.close(None).await {
            debug!("Closing engine connection failed: {}", e);
        }

        let reply = outcome?;
        decode_batch(&reply, lines.len())
    }
}

#[async_trait]
impl SessionTransport for WebSocketSession {
    async fn exchange(&self, endpoint: &str, lines: &[String]) -> Result<Vec<String>> {
        let span = tracing::debug_span!("session", id = %Uuid::new_v4(), endpoint);

        async {
            debug!("Sending batch of {} lines", lines.len());
            // Dropping the session future on expiry drops the socket with it
            let reply = tokio::time::timeout(self.timeout, self.run(endpoint, lines))
                .await
                .map_err(|_| RelayError::Timeout(self.timeout))??;
            debug!("Received batch of {} lines", reply.len());
            Ok::<_, RelayError>(reply)
        }
        .instrument(span)
        .await
    }
}

async fn round_trip(socket: &mut EngineSocket, lines: &[String]) -> Result<String> {
    socket.send(WsMessage::Text(encode_batch(lines))).await?;

    while let Some(message) = socket.next().await {
        match message.map_err(|e| RelayError::Transport(e.to_string()))? {
            WsMessage::Text(text) => return Ok(text),
            WsMessage::Binary(bytes) => {
                return String::from_utf8(bytes)
                    .map_err(|e| RelayError::Transport(format!("Engine reply is not UTF-8: {}", e)));
            }
            WsMessage::Close(_) => break,
            WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_) => continue,
        }
    }

    Err(RelayError::Transport(
        "Engine closed the connection before replying".to_string(),
    ))
}

/// Request wire format: one message, lines joined by newline
pub fn encode_batch(lines: &[String]) -> String {
    lines.join("\n")
}

/// Split a reply into lines and check it lines up with the request.
///
/// A single trailing newline is tolerated; any other count difference is a
/// `BatchMismatch`.
pub fn decode_batch(reply: &str, expected: usize) -> Result<Vec<String>> {
    let mut lines: Vec<String> = reply.split('\n').map(str::to_string).collect();
    if lines.len() == expected + 1 && lines.last().is_some_and(String::is_empty) {
        lines.pop();
    }

    if lines.len() != expected {
        return Err(RelayError::BatchMismatch {
            sent: expected,
            received: lines.len(),
        });
    }
    Ok(lines)
}
