//! Websocket-backed live session

use std::collections::VecDeque;
use std::sync::Arc;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use crate::config::LiveConfig;
use crate::live::protocol::{ClientMessage, ServerMessage};
use crate::live::{AudioChunk, ConnectionState, LiveTransport, ServerFragment, TurnStream};
use crate::{Error, Result};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// RPC path of the bidirectional generation endpoint
const BIDI_PATH: &str =
    "/ws/google.ai.generativelanguage.v1alpha.GenerativeService.BidiGenerateContent";

/// An established live session
///
/// The socket halves are guarded independently: the keyboard and sender
/// activities share the sink, while the receiver alone consumes the source.
pub struct LiveSession {
    sink: Mutex<SplitSink<WsStream, Message>>,
    source: Arc<Mutex<SplitStream<WsStream>>>,
}

/// Connect to the live endpoint and complete the setup handshake
///
/// # Errors
///
/// Returns error if the websocket dial fails or the server does not
/// acknowledge the setup message.
pub async fn connect(config: &LiveConfig) -> Result<LiveSession> {
    tracing::debug!(
        state = %ConnectionState::Connecting,
        host = %config.host,
        "live session state"
    );

    let url = format!("wss://{}{}?key={}", config.host, BIDI_PATH, config.api_key);
    let (ws, _response) = connect_async(url).await?;
    let (mut sink, mut source) = ws.split();

    let setup = ClientMessage::setup(&config.model, &config.voice, config.search_grounding);
    sink.send(Message::Text(serde_json::to_string(&setup)?))
        .await?;

    // The server must acknowledge setup before any activity may use the
    // session; data frames are not valid until then.
    loop {
        let payload = match source.next().await {
            None => {
                return Err(Error::Handshake(
                    "connection closed during setup".to_string(),
                ));
            }
            Some(Err(e)) => return Err(e.into()),
            Some(Ok(Message::Text(text))) => text.into_bytes(),
            Some(Ok(Message::Binary(bytes))) => bytes,
            Some(Ok(Message::Close(frame))) => {
                return Err(Error::Handshake(format!(
                    "server rejected setup: {frame:?}"
                )));
            }
            Some(Ok(_)) => continue,
        };

        let message: ServerMessage = serde_json::from_slice(&payload)?;
        if message.setup_complete.is_some() {
            break;
        }
        return Err(Error::Handshake(
            "unexpected message before setup acknowledgement".to_string(),
        ));
    }

    tracing::info!(
        state = %ConnectionState::Connected,
        model = %config.model,
        voice = %config.voice,
        "live session established"
    );

    Ok(LiveSession {
        sink: Mutex::new(sink),
        source: Arc::new(Mutex::new(source)),
    })
}

impl LiveSession {
    async fn send(&self, message: &ClientMessage) -> Result<()> {
        let json = serde_json::to_string(message)?;
        self.sink.lock().await.send(Message::Text(json)).await?;
        Ok(())
    }
}

/// Receiver-side state for one turn
struct TurnState {
    source: Arc<Mutex<SplitStream<WsStream>>>,
    pending: VecDeque<ServerFragment>,
    done: bool,
}

impl TurnState {
    /// Produce the next fragment of the turn, or `None` once it is over
    async fn next_fragment(&mut self) -> Option<Result<ServerFragment>> {
        loop {
            if let Some(fragment) = self.pending.pop_front() {
                return Some(Ok(fragment));
            }
            if self.done {
                return None;
            }

            let message = self.source.lock().await.next().await;
            let payload = match message {
                None | Some(Ok(Message::Close(_))) => {
                    self.done = true;
                    return Some(Err(Error::ConnectionClosed));
                }
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e.into()));
                }
                Some(Ok(Message::Text(text))) => text.into_bytes(),
                Some(Ok(Message::Binary(bytes))) => bytes,
                Some(Ok(_)) => continue,
            };

            let parsed: ServerMessage = match serde_json::from_slice(&payload) {
                Ok(parsed) => parsed,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e.into()));
                }
            };

            if let Some(content) = parsed.server_content {
                self.pending.extend(content.fragments());
                if content.turn_complete {
                    self.done = true;
                }
            }
        }
    }
}

#[async_trait::async_trait]
impl LiveTransport for LiveSession {
    async fn send_text(&self, text: &str) -> Result<()> {
        self.send(&ClientMessage::user_text(text)).await
    }

    async fn send_realtime_audio(&self, chunk: AudioChunk) -> Result<()> {
        self.send(&ClientMessage::realtime_audio(&chunk.data, &chunk.mime_type))
            .await
    }

    async fn receive_turn(&self) -> Result<TurnStream> {
        let state = TurnState {
            source: Arc::clone(&self.source),
            pending: VecDeque::new(),
            done: false,
        };

        Ok(futures::stream::unfold(state, |mut state| async move {
            state.next_fragment().await.map(|item| (item, state))
        })
        .boxed())
    }
}
