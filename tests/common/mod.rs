//! Shared test utilities

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use futures::StreamExt;

use aria_live::audio::FrameSource;
use aria_live::{AudioChunk, Error, LiveTransport, Result, ServerFragment, TurnStream};

/// Mock transport: records sends and replays scripted response turns
pub struct MockTransport {
    pub sent_texts: Mutex<Vec<String>>,
    pub sent_audio: Mutex<Vec<AudioChunk>>,
    turns: Mutex<VecDeque<Vec<ServerFragment>>>,
}

impl MockTransport {
    /// Build a mock that will serve the given turns, then report the
    /// connection closed
    pub fn with_turns(turns: Vec<Vec<ServerFragment>>) -> Self {
        Self {
            sent_texts: Mutex::new(Vec::new()),
            sent_audio: Mutex::new(Vec::new()),
            turns: Mutex::new(turns.into()),
        }
    }
}

#[async_trait]
impl LiveTransport for MockTransport {
    async fn send_text(&self, text: &str) -> Result<()> {
        self.sent_texts.lock().unwrap().push(text.to_string());
        Ok(())
    }

    async fn send_realtime_audio(&self, chunk: AudioChunk) -> Result<()> {
        self.sent_audio.lock().unwrap().push(chunk);
        Ok(())
    }

    async fn receive_turn(&self) -> Result<TurnStream> {
        let Some(fragments) = self.turns.lock().unwrap().pop_front() else {
            return Err(Error::ConnectionClosed);
        };
        Ok(futures::stream::iter(fragments.into_iter().map(Ok)).boxed())
    }
}

/// Frame source replaying a fixed script of reads
pub struct ScriptedFrames {
    script: VecDeque<Result<Vec<u8>>>,
}

impl ScriptedFrames {
    pub fn new(script: Vec<Result<Vec<u8>>>) -> Self {
        Self {
            script: script.into(),
        }
    }
}

impl FrameSource for ScriptedFrames {
    fn read_frame(&mut self) -> Result<Vec<u8>> {
        self.script
            .pop_front()
            .unwrap_or_else(|| Err(Error::Audio("frame script exhausted".to_string())))
    }
}
