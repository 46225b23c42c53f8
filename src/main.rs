use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use aria_live::audio::{AudioCapture, AudioPlayback, FrameSource, PlaybackSink};
use aria_live::{AudioConfig, Config};

/// aria - Realtime voice conversation client for the Gemini Live API
#[derive(Parser)]
#[command(name = "aria", version, about)]
struct Cli {
    /// Live model identifier
    #[arg(long, env = "ARIA_MODEL", default_value = aria_live::config::DEFAULT_MODEL)]
    model: String,

    /// Prebuilt voice for audio responses
    #[arg(long, env = "ARIA_VOICE", default_value = aria_live::config::DEFAULT_VOICE)]
    voice: String,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Test speaker output
    TestSpeaker,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,aria_live=info",
        1 => "info,aria_live=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Some(cmd) = cli.command {
        return match cmd {
            Command::TestMic { duration } => {
                tokio::task::spawn_blocking(move || test_mic(duration)).await?
            }
            Command::TestSpeaker => tokio::task::spawn_blocking(test_speaker).await?,
        };
    }

    let config = Config::load(cli.model, cli.voice)?;
    tracing::info!(
        model = %config.live.model,
        voice = %config.live.voice,
        "starting aria"
    );

    println!("Speak any time, or type a message and press enter. Type q to quit.");
    aria_live::pipeline::run(config).await?;

    Ok(())
}

/// Test microphone input
fn test_mic(duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let audio = AudioConfig::default();
    let mut capture = AudioCapture::open(&audio)?;

    println!("Sample rate: {} Hz", audio.capture_sample_rate);
    println!("---");

    #[allow(clippy::cast_possible_truncation)]
    let frames_per_second = (audio.capture_sample_rate as usize / audio.frame_samples).max(1);

    for second in 0..duration {
        let mut samples = Vec::new();
        for _ in 0..frames_per_second {
            match capture.read_frame() {
                Ok(frame) => samples.extend(decode_pcm(&frame)),
                Err(aria_live::Error::CaptureOverflow) => {
                    println!("(overflow, frame lost)");
                }
                Err(e) => return Err(e.into()),
            }
        }

        let energy = calculate_rms(&samples);
        let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);

        // Visual meter
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let meter_len = (energy * 100.0).min(50.0) as usize;
        let meter: String = "█".repeat(meter_len) + &" ".repeat(50 - meter_len);

        println!(
            "[{:2}s] RMS: {:.4} | Peak: {:.4} | [{}]",
            second + 1,
            energy,
            peak,
            meter
        );
    }

    println!("\n---");
    println!("If you saw movement in the meter, your mic is working!");
    println!("If RMS stayed near 0, check:");
    println!("  1. Is your mic plugged in?");
    println!("  2. Run: pactl info | grep 'Default Source'");
    println!("  3. Run: arecord -l (to list devices)");
    println!("  4. Try: pavucontrol (to check levels)");

    Ok(())
}

/// Test speaker output with a sine wave
fn test_speaker() -> anyhow::Result<()> {
    println!("Testing speaker output...");
    println!("You should hear a 440Hz tone for 2 seconds\n");

    let audio = AudioConfig::default();
    let mut playback = AudioPlayback::open(&audio)?;

    let rate = audio.playback_sample_rate;
    let frequency = 440.0_f32;
    let num_samples = rate * 2;

    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    let pcm: Vec<u8> = (0..num_samples)
        .flat_map(|i| {
            let t = i as f32 / rate as f32;
            let sample = (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.3; // 30% volume
            ((sample * 32767.0) as i16).to_le_bytes()
        })
        .collect();

    println!("Playing {num_samples} samples at {rate} Hz...");

    for chunk in pcm.chunks(2048) {
        playback.write(chunk)?;
    }

    // Let the backlog play out before dropping the stream
    let deadline = Instant::now() + Duration::from_secs(3);
    while playback.backlog() > 0 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(50));
    }
    std::thread::sleep(Duration::from_millis(100));

    println!("\n---");
    println!("If you heard the tone, your speakers are working!");
    println!("If you didn't hear anything, check:");
    println!("  1. Run: pactl info | grep 'Default Sink'");
    println!("  2. Run: pactl list sinks short");
    println!("  3. Try: pavucontrol (to check output levels)");

    Ok(())
}

/// Decode little-endian PCM16 to normalized samples
fn decode_pcm(pcm: &[u8]) -> Vec<f32> {
    pcm.chunks_exact(2)
        .map(|pair| f32::from(i16::from_le_bytes([pair[0], pair[1]])) / 32768.0)
        .collect()
}

/// Calculate RMS energy
#[allow(clippy::cast_precision_loss)]
fn calculate_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}
