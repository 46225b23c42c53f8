//! Error types for aria-live

use thiserror::Error;

/// Result type alias for aria-live operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in aria-live
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Audio device error
    #[error("audio error: {0}")]
    Audio(String),

    /// Microphone capture outpaced the reader; the affected frame is lost
    #[error("capture buffer overflow")]
    CaptureOverflow,

    /// Live session error
    #[error("session error: {0}")]
    Session(String),

    /// Setup handshake with the live endpoint failed
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// The server closed the live connection
    #[error("live connection closed by server")]
    ConnectionClosed,

    /// WebSocket transport error
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A pipeline task panicked or was lost
    #[error("task error: {0}")]
    Task(String),
}
