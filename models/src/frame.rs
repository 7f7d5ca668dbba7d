//! JSON wire frames exchanged over the channel.
//!
//! Outbound (client → server):
//!
//! ```json
//! { "type": "text", "content": "hello", "session_id": "s1" }
//! { "type": "heartbeat", "session_id": "s1" }
//! ```
//!
//! Inbound (server → client):
//!
//! ```json
//! { "type": "message", "content": "hi", "user_id": 7, "timestamp": "T", "session_id": "s1" }
//! { "type": "system", "content": "tutor joined", "timestamp": "T" }
//! { "type": "heartbeat", "status": "alive" }
//! ```

use serde::{Deserialize, Serialize};

/// Frame sent from the client to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundFrame {
    Text {
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_id: Option<String>,
    },
    Heartbeat {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_id: Option<String>,
    },
}

impl OutboundFrame {
    pub fn text(content: impl Into<String>) -> Self {
        OutboundFrame::Text {
            content: content.into(),
            session_id: None,
        }
    }

    pub fn heartbeat(session_id: Option<String>) -> Self {
        OutboundFrame::Heartbeat { session_id }
    }

    pub fn session_id(&self) -> Option<&str> {
        match self {
            OutboundFrame::Text { session_id, .. } | OutboundFrame::Heartbeat { session_id } => {
                session_id.as_deref()
            }
        }
    }

    /// Fill in the channel's session id when the caller left it blank.
    pub fn with_default_session(self, default: Option<&str>) -> Self {
        let fill = |current: Option<String>| current.or_else(|| default.map(str::to_string));
        match self {
            OutboundFrame::Text {
                content,
                session_id,
            } => OutboundFrame::Text {
                content,
                session_id: fill(session_id),
            },
            OutboundFrame::Heartbeat { session_id } => OutboundFrame::Heartbeat {
                session_id: fill(session_id),
            },
        }
    }
}

/// Body shared by `message` and `system` frames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatPayload {
    pub content: String,
    #[serde(default)]
    pub user_id: Option<i64>,
    pub timestamp: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default, alias = "audioUrl")]
    pub audio_url: Option<String>,
}

/// Frame delivered by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum InboundFrame {
    #[serde(rename = "message")]
    Message(ChatPayload),

    #[serde(rename = "system")]
    System(ChatPayload),

    /// The server answers heartbeats with `{"type":"heartbeat","status":"alive"}`.
    #[serde(rename = "heartbeat-ack", alias = "heartbeat")]
    HeartbeatAck {
        #[serde(default)]
        status: Option<String>,
    },
}

impl InboundFrame {
    /// Wire tags this crate knows how to decode.
    pub const KNOWN_KINDS: [&'static str; 4] = ["message", "system", "heartbeat-ack", "heartbeat"];
}
