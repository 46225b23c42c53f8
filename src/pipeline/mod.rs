//! The concurrent pipeline: five activities over two queues and one shared
//! session

pub mod activities;
pub mod queue;
pub mod slot;

pub use queue::PlaybackQueue;
pub use slot::SessionSlot;

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};

use crate::audio::{AudioCapture, AudioPlayback};
use crate::live::{self, ConnectionState};
use crate::{Config, Error, Result};
use activities::{
    run_capture_loop, run_keyboard_loop, run_playback_loop, run_receive_loop, run_send_loop,
};

/// Outbound queue capacity: bounds memory and pushes backpressure into the
/// microphone reader
pub const OUTBOUND_QUEUE_CAPACITY: usize = 5;

/// Run the pipeline until the user quits or an activity fails
///
/// Connects the live session, binds the shared slot, then supervises the
/// four background activities plus the keyboard reader as the primary one.
/// Whichever finishes first — the primary completing normally or any
/// activity failing — tears the group down. Device streams are owned by
/// their blocking loops and released during teardown, before any error is
/// reported.
///
/// # Errors
///
/// Returns the first unrecovered activity failure, or the connect error if
/// the session never comes up.
pub async fn run(config: Config) -> Result<()> {
    let slot = Arc::new(SessionSlot::new());
    let playback_queue = Arc::new(PlaybackQueue::new());
    let (chunk_tx, chunk_rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);

    tracing::info!(model = %config.live.model, "connecting live session");
    let session = match live::connect(&config.live).await {
        Ok(session) => Arc::new(session),
        Err(e) => {
            tracing::debug!(state = %ConnectionState::Failed, "live session state");
            return Err(e);
        }
    };
    slot.bind(session)?;

    let mut background = JoinSet::new();

    background.spawn(run_send_loop(Arc::clone(&slot), chunk_rx));
    background.spawn(run_receive_loop(
        Arc::clone(&slot),
        Arc::clone(&playback_queue),
    ));

    let capture_audio = config.audio.clone();
    background.spawn_blocking(move || {
        let capture = AudioCapture::open(&capture_audio)?;
        run_capture_loop(capture, chunk_tx)
    });

    let playback_audio = config.audio.clone();
    let speaker_queue = Arc::clone(&playback_queue);
    background.spawn_blocking(move || {
        let playback = AudioPlayback::open(&playback_audio)?;
        run_playback_loop(playback, speaker_queue)
    });

    // The keyboard reader is the primary activity: its normal completion
    // ends the run.
    let mut primary = tokio::spawn(run_keyboard_loop(Arc::clone(&slot)));

    let outcome = tokio::select! {
        res = &mut primary => flatten(res),
        Some(res) = background.join_next() => flatten(res),
    };

    // Cooperative teardown. Aborting the sender drops the outbound
    // receiver, which unblocks the capture thread and makes it drop the
    // microphone stream; closing the playback queue wakes the speaker
    // thread. The join drain below waits for both device threads, so the
    // hardware is released before any failure is surfaced.
    primary.abort();
    background.abort_all();
    playback_queue.close();
    while background.join_next().await.is_some() {}
    tracing::debug!(state = %ConnectionState::Disconnected, "live session state");

    match outcome {
        Ok(()) => {
            tracing::info!("session ended by user");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Collapse a join result into the activity's own result; a cancelled task
/// is a clean exit, not a failure
fn flatten(res: std::result::Result<Result<()>, JoinError>) -> Result<()> {
    match res {
        Ok(inner) => inner,
        Err(e) if e.is_cancelled() => Ok(()),
        Err(e) => Err(Error::Task(e.to_string())),
    }
}
