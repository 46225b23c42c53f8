//! Configuration for aria-live

use crate::{Error, Result};

/// Sample rate for microphone capture (16kHz for speech input)
pub const CAPTURE_SAMPLE_RATE: u32 = 16_000;

/// Sample rate for playback (the live endpoint answers at 24kHz)
pub const PLAYBACK_SAMPLE_RATE: u32 = 24_000;

/// Samples per captured frame (64ms at 16kHz)
pub const FRAME_SAMPLES: usize = 1024;

/// Default live model identifier
pub const DEFAULT_MODEL: &str = "models/gemini-2.0-flash-live-001";

/// Default prebuilt voice for audio responses
pub const DEFAULT_VOICE: &str = "Leda";

/// Default API host
pub const DEFAULT_HOST: &str = "generativelanguage.googleapis.com";

/// aria-live configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Audio device configuration
    pub audio: AudioConfig,

    /// Live session configuration
    pub live: LiveConfig,
}

/// Audio device configuration
#[derive(Debug, Clone)]
pub struct AudioConfig {
    /// Capture sample rate in Hz
    pub capture_sample_rate: u32,

    /// Playback sample rate in Hz (the response format differs from capture)
    pub playback_sample_rate: u32,

    /// Channel count (mono for speech)
    pub channels: u16,

    /// Samples per capture frame
    pub frame_samples: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            capture_sample_rate: CAPTURE_SAMPLE_RATE,
            playback_sample_rate: PLAYBACK_SAMPLE_RATE,
            channels: 1,
            frame_samples: FRAME_SAMPLES,
        }
    }
}

/// Live session configuration
#[derive(Debug, Clone)]
pub struct LiveConfig {
    /// API key (from `GEMINI_API_KEY`)
    pub api_key: String,

    /// API host
    pub host: String,

    /// Model identifier
    pub model: String,

    /// Prebuilt voice name for audio responses
    pub voice: String,

    /// Enable the google-search tool for grounded answers
    pub search_grounding: bool,
}

impl LiveConfig {
    /// Create a live configuration, validating the API key
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the API key is empty
    pub fn new(api_key: String, model: String, voice: String) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config(
                "GEMINI_API_KEY is required for the live session".to_string(),
            ));
        }

        Ok(Self {
            api_key,
            host: DEFAULT_HOST.to_string(),
            model,
            voice,
            search_grounding: true,
        })
    }
}

impl Config {
    /// Load configuration from the environment
    ///
    /// # Errors
    ///
    /// Returns error if `GEMINI_API_KEY` is unset or empty
    pub fn load(model: String, voice: String) -> Result<Self> {
        let api_key = std::env::var("GEMINI_API_KEY").unwrap_or_default();

        Ok(Self {
            audio: AudioConfig::default(),
            live: LiveConfig::new(api_key, model, voice)?,
        })
    }
}
