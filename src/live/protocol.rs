//! Wire types for the `BidiGenerateContent` v1alpha websocket protocol
//!
//! Every client message is a single-key JSON object; the externally tagged
//! [`ClientMessage`] enum mirrors that shape directly.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};

use crate::live::ServerFragment;

/// Message from client to server
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ClientMessage {
    /// Session handshake; must be the first message on the socket
    Setup(Setup),

    /// One complete user text turn
    ClientContent(ClientContent),

    /// Realtime media input (captured microphone audio)
    RealtimeInput(RealtimeInput),
}

/// Session setup payload
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Setup {
    pub model: String,
    pub generation_config: GenerationConfig,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Tool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    /// Requested response modalities; this client always asks for audio
    pub response_modalities: Vec<String>,
    pub speech_config: SpeechConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechConfig {
    pub voice_config: VoiceConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceConfig {
    pub prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrebuiltVoiceConfig {
    pub voice_name: String,
}

/// Tool capability granted to the model
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google_search: Option<GoogleSearch>,
}

#[derive(Debug, Serialize)]
pub struct GoogleSearch {}

/// One or more content turns from the user
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientContent {
    pub turns: Vec<Content>,
    pub turn_complete: bool,
}

#[derive(Debug, Serialize)]
pub struct Content {
    pub role: String,
    pub parts: Vec<ClientPart>,
}

#[derive(Debug, Serialize)]
pub struct ClientPart {
    pub text: String,
}

/// Realtime media payload
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInput {
    pub media_chunks: Vec<MediaChunk>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaChunk {
    pub mime_type: String,
    /// Base64-encoded payload bytes
    pub data: String,
}

impl ClientMessage {
    /// Build the handshake message
    #[must_use]
    pub fn setup(model: &str, voice: &str, search_grounding: bool) -> Self {
        let tools = if search_grounding {
            vec![Tool {
                google_search: Some(GoogleSearch {}),
            }]
        } else {
            Vec::new()
        };

        Self::Setup(Setup {
            model: model.to_string(),
            generation_config: GenerationConfig {
                response_modalities: vec!["AUDIO".to_string()],
                speech_config: SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig {
                            voice_name: voice.to_string(),
                        },
                    },
                },
            },
            tools,
        })
    }

    /// Build one user text turn
    #[must_use]
    pub fn user_text(text: &str) -> Self {
        Self::ClientContent(ClientContent {
            turns: vec![Content {
                role: "user".to_string(),
                parts: vec![ClientPart {
                    text: text.to_string(),
                }],
            }],
            turn_complete: true,
        })
    }

    /// Build a realtime audio input event
    #[must_use]
    pub fn realtime_audio(data: &[u8], mime_type: &str) -> Self {
        Self::RealtimeInput(RealtimeInput {
            media_chunks: vec![MediaChunk {
                mime_type: mime_type.to_string(),
                data: BASE64.encode(data),
            }],
        })
    }
}

/// Message from server to client
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerMessage {
    #[serde(default)]
    pub setup_complete: Option<SetupComplete>,

    #[serde(default)]
    pub server_content: Option<ServerContent>,
}

#[derive(Debug, Deserialize)]
pub struct SetupComplete {}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerContent {
    #[serde(default)]
    pub model_turn: Option<ModelTurn>,

    /// Set on the final message of a turn
    #[serde(default)]
    pub turn_complete: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct ModelTurn {
    #[serde(default)]
    pub parts: Vec<ServerPart>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerPart {
    #[serde(default)]
    pub text: Option<String>,

    #[serde(default)]
    pub inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    /// Base64-encoded payload bytes
    pub data: String,
}

impl ServerContent {
    /// Extract the fragments carried by this message, in part order
    ///
    /// Audio parts that fail to decode are skipped with a warning rather
    /// than aborting the turn.
    #[must_use]
    pub fn fragments(&self) -> Vec<ServerFragment> {
        let Some(turn) = &self.model_turn else {
            return Vec::new();
        };

        let mut fragments = Vec::with_capacity(turn.parts.len());
        for part in &turn.parts {
            if let Some(inline) = &part.inline_data {
                match BASE64.decode(&inline.data) {
                    Ok(bytes) => fragments.push(ServerFragment::Audio(bytes)),
                    Err(e) => {
                        tracing::warn!(
                            error = %e,
                            mime_type = %inline.mime_type,
                            "undecodable inline data, skipping part"
                        );
                    }
                }
            }
            if let Some(text) = &part.text {
                fragments.push(ServerFragment::Text(text.clone()));
            }
        }
        fragments
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setup_message_shape() {
        let msg = ClientMessage::setup("models/test-live", "Leda", true);
        let json = serde_json::to_value(&msg).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({
                "setup": {
                    "model": "models/test-live",
                    "generationConfig": {
                        "responseModalities": ["AUDIO"],
                        "speechConfig": {
                            "voiceConfig": {
                                "prebuiltVoiceConfig": { "voiceName": "Leda" }
                            }
                        }
                    },
                    "tools": [{ "googleSearch": {} }]
                }
            })
        );
    }

    #[test]
    fn setup_without_search_omits_tools() {
        let msg = ClientMessage::setup("models/test-live", "Leda", false);
        let json = serde_json::to_value(&msg).expect("serialize");
        assert!(json["setup"].get("tools").is_none());
    }

    #[test]
    fn user_text_is_one_complete_turn() {
        let msg = ClientMessage::user_text("hello");
        let json = serde_json::to_value(&msg).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({
                "clientContent": {
                    "turns": [{ "role": "user", "parts": [{ "text": "hello" }] }],
                    "turnComplete": true
                }
            })
        );
    }

    #[test]
    fn realtime_audio_is_base64_tagged() {
        let msg = ClientMessage::realtime_audio(&[1, 2, 3], "audio/pcm");
        let json = serde_json::to_value(&msg).expect("serialize");
        let chunk = &json["realtimeInput"]["mediaChunks"][0];
        assert_eq!(chunk["mimeType"], "audio/pcm");
        assert_eq!(chunk["data"], BASE64.encode([1, 2, 3]));
    }

    #[test]
    fn parses_server_content_with_audio_and_text() {
        let raw = serde_json::json!({
            "serverContent": {
                "modelTurn": {
                    "parts": [
                        { "inlineData": { "mimeType": "audio/pcm;rate=24000", "data": BASE64.encode([9, 9]) } },
                        { "text": "partial" }
                    ]
                },
                "turnComplete": true
            }
        });
        let msg: ServerMessage = serde_json::from_value(raw).expect("parse");
        let content = msg.server_content.expect("server content");
        assert!(content.turn_complete);
        assert_eq!(
            content.fragments(),
            vec![
                ServerFragment::Audio(vec![9, 9]),
                ServerFragment::Text("partial".to_string()),
            ]
        );
    }

    #[test]
    fn parses_setup_complete_ack() {
        let msg: ServerMessage =
            serde_json::from_str(r#"{"setupComplete": {}}"#).expect("parse");
        assert!(msg.setup_complete.is_some());
        assert!(msg.server_content.is_none());
    }

    #[test]
    fn tolerates_unknown_fields() {
        let msg: ServerMessage = serde_json::from_str(
            r#"{"serverContent": {"turnComplete": false, "usageMetadata": {"tokens": 3}}}"#,
        )
        .expect("parse");
        let content = msg.server_content.expect("server content");
        assert!(!content.turn_complete);
        assert!(content.fragments().is_empty());
    }
}
