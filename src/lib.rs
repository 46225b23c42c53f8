//! aria-live - Realtime voice conversation client for the Gemini Live API
//!
//! This library provides the concurrent pipeline behind the `aria` binary:
//! - Microphone capture and speaker playback (cpal)
//! - A Gemini Live websocket session (text + realtime PCM audio)
//! - Five cooperating activities with shared queues and group cancellation
//!
//! # Architecture
//!
//! ```text
//! keyboard ──────────────────────────┐
//!                                    ▼
//! microphone ──▶ bounded queue ──▶ LiveSession ──▶ playback queue ──▶ speaker
//!                 (capacity 5)      (websocket)     (drained per turn)
//!                                    │
//!                                    └──▶ console text
//! ```
//!
//! The first activity to finish (user quit) or fail tears the group down.

pub mod audio;
pub mod config;
pub mod error;
pub mod live;
pub mod pipeline;

pub use config::{AudioConfig, Config, LiveConfig};
pub use error::{Error, Result};
pub use live::{AudioChunk, ConnectionState, LiveTransport, ServerFragment, TurnStream};
pub use pipeline::{PlaybackQueue, SessionSlot};
