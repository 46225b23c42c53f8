//! Audio device layer: microphone capture and speaker playback

pub mod capture;
pub mod playback;

pub use capture::{AudioCapture, FrameSource};
pub use playback::{AudioPlayback, PlaybackSink};
