//! Audio playback to speakers

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, SampleRate, Stream};

use crate::config::AudioConfig;
use crate::{Error, Result};

/// Sink for decoded response audio
///
/// Seam between the playback loop and the device; tests substitute a
/// recording sink.
pub trait PlaybackSink {
    /// Blocking write of little-endian 16-bit PCM to the device
    ///
    /// # Errors
    ///
    /// Returns error if the device rejects the write.
    fn write(&mut self, pcm: &[u8]) -> Result<()>;
}

/// Sample buffer shared with the device callback
struct SharedBuffer {
    samples: Mutex<VecDeque<f32>>,
    space: Condvar,
}

/// Plays audio to the default output device
///
/// Owns the cpal stream, so the value must stay on the thread that created
/// it. Dropping it releases the device.
pub struct AudioPlayback {
    _stream: Stream,
    shared: Arc<SharedBuffer>,
    high_water: usize,
}

impl AudioPlayback {
    /// Open the default output device for 16-bit PCM playback
    ///
    /// Prefers a mono configuration at the playback rate, falling back to
    /// stereo with the mono signal duplicated per channel.
    ///
    /// # Errors
    ///
    /// Returns error if no output device is available or no supported
    /// configuration matches the playback rate.
    pub fn open(config: &AudioConfig) -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or_else(|| Error::Audio("no output device available".to_string()))?;

        let rate = SampleRate(config.playback_sample_rate);
        let supports = |channels: u16| {
            move |c: &cpal::SupportedStreamConfigRange| {
                c.channels() == channels
                    && c.sample_format() == SampleFormat::F32
                    && c.min_sample_rate() <= rate
                    && c.max_sample_rate() >= rate
            }
        };

        let supported = device
            .supported_output_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .find(supports(1))
            .or_else(|| {
                // Fallback: stereo, duplicating the mono signal
                device.supported_output_configs().ok()?.find(supports(2))
            })
            .ok_or_else(|| Error::Audio("no suitable output config found".to_string()))?;

        let stream_config = supported.with_sample_rate(rate).config();
        let channels = usize::from(stream_config.channels);

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate = config.playback_sample_rate,
            channels = stream_config.channels,
            "audio playback initialized"
        );

        let shared = Arc::new(SharedBuffer {
            samples: Mutex::new(VecDeque::new()),
            space: Condvar::new(),
        });

        let callback_shared = Arc::clone(&shared);
        let stream = device
            .build_output_stream(
                &stream_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let mut samples = callback_shared.samples.lock().unwrap();
                    for frame in data.chunks_mut(channels) {
                        let sample = samples.pop_front().unwrap_or(0.0);
                        for out in frame.iter_mut() {
                            *out = sample;
                        }
                    }
                    drop(samples);
                    callback_shared.space.notify_all();
                },
                |err| {
                    tracing::error!(error = %err, "audio playback error");
                },
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))?;

        stream.play().map_err(|e| Error::Audio(e.to_string()))?;

        // One second of backlog before writers are made to wait
        #[allow(clippy::cast_possible_truncation)]
        let high_water = config.playback_sample_rate as usize;

        Ok(Self {
            _stream: stream,
            shared,
            high_water,
        })
    }

    /// Samples queued but not yet played
    #[must_use]
    pub fn backlog(&self) -> usize {
        self.shared.samples.lock().unwrap().len()
    }
}

impl PlaybackSink for AudioPlayback {
    fn write(&mut self, pcm: &[u8]) -> Result<()> {
        let decoded = pcm_to_samples(pcm);

        let mut samples = self.shared.samples.lock().unwrap();
        while samples.len() > self.high_water {
            samples = self.shared.space.wait(samples).unwrap();
        }
        samples.extend(decoded);
        Ok(())
    }
}

/// Decode little-endian 16-bit PCM into f32 samples; a trailing odd byte is
/// ignored
fn pcm_to_samples(pcm: &[u8]) -> Vec<f32> {
    pcm.chunks_exact(2)
        .map(|pair| f32::from(i16::from_le_bytes([pair[0], pair[1]])) / 32768.0)
        .collect()
}
