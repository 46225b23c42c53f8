//! Live session layer: transport seam and wire protocol for Gemini Live

pub mod protocol;
pub mod session;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::Result;

pub use session::{LiveSession, connect};

/// Mime type tag for raw PCM microphone audio
pub const PCM_MIME_TYPE: &str = "audio/pcm";

/// One chunk of captured microphone audio plus its wire format tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioChunk {
    /// Raw little-endian 16-bit PCM bytes
    pub data: Vec<u8>,

    /// Format tag sent with the realtime input event
    pub mime_type: String,
}

impl AudioChunk {
    /// Wrap a raw PCM frame
    #[must_use]
    pub fn pcm(data: Vec<u8>) -> Self {
        Self {
            data,
            mime_type: PCM_MIME_TYPE.to_string(),
        }
    }
}

/// One fragment of a model response turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerFragment {
    /// Decoded response audio (16-bit PCM at the playback rate)
    Audio(Vec<u8>),

    /// Incremental response text
    Text(String),
}

/// Connection lifecycle states
///
/// `Connected` is entered only once the setup handshake has been
/// acknowledged; the shared session slot is bound at that point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Failed,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Lazy stream of fragments for one response turn; finite, not restartable
pub type TurnStream = BoxStream<'static, Result<ServerFragment>>;

/// The transport seam the pipeline activities talk to
///
/// Implemented by [`LiveSession`] over a websocket, and by mock transports
/// in tests.
#[async_trait]
pub trait LiveTransport: Send + Sync {
    /// Send one user text turn
    ///
    /// # Errors
    ///
    /// Returns error if the transport rejects the message.
    async fn send_text(&self, text: &str) -> Result<()>;

    /// Send one chunk of captured audio as a realtime input event
    ///
    /// # Errors
    ///
    /// Returns error if the transport rejects the chunk.
    async fn send_realtime_audio(&self, chunk: AudioChunk) -> Result<()>;

    /// Open the next response turn
    ///
    /// The returned stream yields fragments until the server marks the turn
    /// complete. A new turn requires a new call.
    ///
    /// # Errors
    ///
    /// Returns error if the connection is closed or failing.
    async fn receive_turn(&self) -> Result<TurnStream>;
}
