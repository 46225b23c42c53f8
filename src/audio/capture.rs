//! Audio capture from microphone

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, SampleRate, Stream, StreamConfig};
use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};

use crate::config::AudioConfig;
use crate::{Error, Result};

/// Sample batches buffered between the device callback and the reader
const CALLBACK_CHANNEL_CAPACITY: usize = 32;

/// Source of fixed-size PCM frames
///
/// Seam between the capture loop and the device; tests substitute a
/// scripted source.
pub trait FrameSource {
    /// Blocking read of one frame of little-endian 16-bit PCM
    ///
    /// # Errors
    ///
    /// Returns [`Error::CaptureOverflow`] when the device outpaced the
    /// reader since the last read (that frame is lost); any other error is
    /// fatal to the capture loop.
    fn read_frame(&mut self) -> Result<Vec<u8>>;
}

/// Captures audio from the default input device
///
/// Owns the cpal stream, so the value must stay on the thread that created
/// it. Dropping it releases the device.
pub struct AudioCapture {
    _stream: Stream,
    samples: Receiver<Vec<i16>>,
    overflowed: Arc<AtomicBool>,
    pending: Vec<i16>,
    frame_samples: usize,
}

impl AudioCapture {
    /// Open the default input device for mono 16-bit capture
    ///
    /// # Errors
    ///
    /// Returns error if no input device is available or no supported
    /// configuration matches the requested rate.
    pub fn open(config: &AudioConfig) -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_input_device()
            .ok_or_else(|| Error::Audio("no input device available".to_string()))?;

        let rate = SampleRate(config.capture_sample_rate);
        let supported = device
            .supported_input_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .find(|c| {
                c.channels() == config.channels
                    && c.min_sample_rate() <= rate
                    && c.max_sample_rate() >= rate
            })
            .ok_or_else(|| Error::Audio("no suitable input config found".to_string()))?;

        let sample_format = supported.sample_format();
        let stream_config = supported.with_sample_rate(rate).config();

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate = config.capture_sample_rate,
            channels = stream_config.channels,
            format = ?sample_format,
            "audio capture initialized"
        );

        let (tx, samples) = bounded(CALLBACK_CHANNEL_CAPACITY);
        let overflowed = Arc::new(AtomicBool::new(false));

        let stream = build_input_stream(&device, &stream_config, sample_format, tx, &overflowed)?;
        stream.play().map_err(|e| Error::Audio(e.to_string()))?;

        Ok(Self {
            _stream: stream,
            samples,
            overflowed,
            pending: Vec::new(),
            frame_samples: config.frame_samples,
        })
    }
}

impl FrameSource for AudioCapture {
    fn read_frame(&mut self) -> Result<Vec<u8>> {
        if self.overflowed.swap(false, Ordering::Relaxed) {
            return Err(Error::CaptureOverflow);
        }

        while self.pending.len() < self.frame_samples {
            let batch = self.samples.recv().map_err(|_| {
                Error::Audio("capture stream stopped delivering samples".to_string())
            })?;
            self.pending.extend(batch);
        }

        let frame: Vec<i16> = self.pending.drain(..self.frame_samples).collect();
        Ok(samples_to_bytes(&frame))
    }
}

/// Build the input stream for the negotiated sample format
fn build_input_stream(
    device: &cpal::Device,
    config: &StreamConfig,
    format: SampleFormat,
    tx: Sender<Vec<i16>>,
    overflowed: &Arc<AtomicBool>,
) -> Result<Stream> {
    let err_callback = |err| {
        tracing::error!(error = %err, "audio capture error");
    };

    let overflowed = Arc::clone(overflowed);
    let stream = match format {
        SampleFormat::I16 => device.build_input_stream(
            config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                forward_batch(&tx, &overflowed, data.to_vec());
            },
            err_callback,
            None,
        ),
        SampleFormat::F32 => device.build_input_stream(
            config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                forward_batch(&tx, &overflowed, convert_f32_batch(data));
            },
            err_callback,
            None,
        ),
        other => {
            return Err(Error::Audio(format!(
                "unsupported input sample format: {other:?}"
            )));
        }
    };

    stream.map_err(|e| Error::Audio(e.to_string()))
}

/// Hand one callback batch to the reader; a full channel marks an overflow
/// and the batch is lost
fn forward_batch(tx: &Sender<Vec<i16>>, overflowed: &AtomicBool, batch: Vec<i16>) {
    match tx.try_send(batch) {
        Ok(()) => {}
        Err(TrySendError::Full(_)) => overflowed.store(true, Ordering::Relaxed),
        // Reader is gone; shutdown is already in progress
        Err(TrySendError::Disconnected(_)) => {}
    }
}

/// Convert f32 samples in [-1.0, 1.0] to i16
fn convert_f32_batch(data: &[f32]) -> Vec<i16> {
    data.iter()
        .map(|&sample| {
            #[allow(clippy::cast_possible_truncation)]
            let converted = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
            converted
        })
        .collect()
}

/// Serialize samples as little-endian PCM bytes
fn samples_to_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}
