//! The five pipeline activities

use std::io::Write as _;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::mpsc;

use crate::audio::{FrameSource, PlaybackSink};
use crate::live::{AudioChunk, ServerFragment};
use crate::pipeline::{PlaybackQueue, SessionSlot};
use crate::{Error, Result};

/// How long the receiver idles between checks while the session is unbound
const RECEIVER_IDLE_POLL: Duration = Duration::from_secs(1);

/// Keyboard reader: the primary activity
///
/// Blocks for console lines and forwards each as one text turn. Completes
/// normally on the quit sentinel (`q`, any case) or stdin EOF; the
/// orchestrator treats that completion as the signal to shut the whole
/// pipeline down.
///
/// # Errors
///
/// Returns error if the console read fails or a send on a bound session
/// fails.
pub async fn run_keyboard_loop(slot: Arc<SessionSlot>) -> Result<()> {
    loop {
        let line = tokio::task::spawn_blocking(read_line)
            .await
            .map_err(|e| Error::Task(e.to_string()))??;

        let Some(line) = line else {
            tracing::info!("stdin closed, shutting down");
            return Ok(());
        };

        if handle_line(&line, &slot).await?.is_break() {
            return Ok(());
        }
    }
}

/// Process one console line
///
/// The quit sentinel breaks the loop without touching the session. Empty
/// input is normalized to a placeholder period. When the session is not
/// bound yet, the message is dropped rather than queued.
///
/// # Errors
///
/// Returns error if a send on a bound session fails.
pub async fn handle_line(line: &str, slot: &SessionSlot) -> Result<ControlFlow<()>> {
    if line.eq_ignore_ascii_case("q") {
        tracing::info!("user requested exit");
        return Ok(ControlFlow::Break(()));
    }

    let text = if line.is_empty() { "." } else { line };
    match slot.get() {
        Some(session) => {
            tracing::info!(text = %text, "sending user text");
            session.send_text(text).await?;
        }
        None => {
            tracing::warn!("session not ready, dropping text message");
        }
    }

    Ok(ControlFlow::Continue(()))
}

/// Blocking console line read; `None` on EOF
fn read_line() -> Result<Option<String>> {
    let mut stdout = std::io::stdout();
    stdout.write_all(b"message > ")?;
    stdout.flush()?;

    let mut line = String::new();
    let read = std::io::stdin().read_line(&mut line)?;
    if read == 0 {
        return Ok(None);
    }

    while line.ends_with(['\n', '\r']) {
        line.pop();
    }
    Ok(Some(line))
}

/// Microphone reader
///
/// Runs on a blocking thread that owns the device stream. Each captured
/// frame is pushed onto the bounded outbound queue with a blocking send, so
/// capture pauses instead of buffering when the sender falls behind. A
/// capture overflow costs one frame and a warning; the loop continues.
/// Exits cleanly when the queue's consumer is gone.
///
/// # Errors
///
/// Returns error if the device fails in any way other than overflow.
pub fn run_capture_loop<S: FrameSource>(
    mut source: S,
    chunks: mpsc::Sender<AudioChunk>,
) -> Result<()> {
    loop {
        match source.read_frame() {
            Ok(frame) => {
                if chunks.blocking_send(AudioChunk::pcm(frame)).is_err() {
                    // Pipeline is shutting down; drop the stream and leave
                    tracing::debug!("outbound queue closed, stopping capture");
                    return Ok(());
                }
            }
            Err(Error::CaptureOverflow) => {
                tracing::warn!("capture overflow, frame lost");
            }
            Err(e) => return Err(e),
        }
    }
}

/// Network sender
///
/// Forwards outbound chunks one at a time. Chunks that arrive before the
/// session is bound are dropped with a warning — blocking here would
/// deadlock the microphone reader behind a queue that never drains.
///
/// # Errors
///
/// Returns error if a send on a bound session fails.
pub async fn run_send_loop(
    slot: Arc<SessionSlot>,
    mut chunks: mpsc::Receiver<AudioChunk>,
) -> Result<()> {
    while let Some(chunk) = chunks.recv().await {
        match slot.get() {
            Some(session) => session.send_realtime_audio(chunk).await?,
            None => {
                tracing::warn!("session not ready, dropping audio chunk");
            }
        }
    }
    Ok(())
}

/// Network receiver
///
/// Idles while the session is unbound, then consumes response turns. Each
/// new turn first drains unplayed audio left over from the previous one
/// (interruption semantics), then streams fragments: audio into the
/// playback queue, text straight to the console.
///
/// # Errors
///
/// Returns error when the transport fails or the server closes the
/// connection.
pub async fn run_receive_loop(slot: Arc<SessionSlot>, queue: Arc<PlaybackQueue>) -> Result<()> {
    loop {
        let Some(session) = slot.get() else {
            tokio::time::sleep(RECEIVER_IDLE_POLL).await;
            continue;
        };

        let mut turn = session.receive_turn().await?;

        // A new turn preempts whatever the speaker has not played yet
        let discarded = queue.drain();
        if !discarded.is_empty() {
            tracing::debug!(items = discarded.len(), "discarded unplayed audio");
        }

        while let Some(fragment) = turn.next().await {
            match fragment? {
                ServerFragment::Audio(data) => queue.push(data),
                ServerFragment::Text(text) => {
                    tracing::debug!(text = %text.trim(), "model text");
                    let mut stdout = std::io::stdout();
                    stdout.write_all(text.as_bytes())?;
                    stdout.flush()?;
                }
            }
        }
    }
}

/// Speaker writer
///
/// Runs on a blocking thread that owns the device stream. Plays queued
/// items in strict FIFO order; exits when the queue is closed.
///
/// # Errors
///
/// Returns error if a device write fails.
pub fn run_playback_loop<S: PlaybackSink>(mut sink: S, queue: Arc<PlaybackQueue>) -> Result<()> {
    while let Some(item) = queue.pop() {
        sink.write(&item)?;
    }
    tracing::debug!("playback queue closed, stopping speaker");
    Ok(())
}
