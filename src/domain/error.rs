// Error taxonomy
use thiserror::Error;

/// Failure in the embedded store. Fatal for the operation in progress and
/// surfaced to the caller; never retried automatically.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("store lock poisoned")]
    Poisoned,

    #[error("invalid metric point: {0}")]
    InvalidPoint(String),
}

/// Client-side transport failure. Absorbed by the sync layer: push errors
/// drive the reconnection state machine, poll errors are logged while the
/// loop keeps its cadence.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("poll request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server rejected poll: {0}")]
    Rejected(String),

    #[error("malformed message: {0}")]
    Decode(#[from] serde_json::Error),
}
