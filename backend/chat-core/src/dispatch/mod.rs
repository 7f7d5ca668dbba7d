//! Inbound frame decoding and routing.

use crate::error::dispatch::DecodeError;
use crate::message_log::MessageLog;
use crate::observers::{Observers, SubscriptionId};

use common::ErrorLocation;
use models::{ChatEntry, ChatPayload, EntryOrigin, InboundFrame};

use std::panic::Location;
use std::sync::Arc;
use std::time::SystemTime;

use log::{debug, warn};
use serde::Deserialize;

/// What a successfully decoded frame turned into.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatched {
    Entry(ChatEntry),
    HeartbeatAck,
}

#[derive(Deserialize)]
struct FrameHeader {
    #[serde(rename = "type")]
    kind: String,
}

/// Decodes frames and is the single writer of the [`MessageLog`].
#[derive(Clone)]
pub struct Dispatcher {
    log: MessageLog,
    playback: Arc<Observers<ChatEntry>>,
}

impl Dispatcher {
    pub fn new(log: MessageLog) -> Self {
        Self {
            log,
            playback: Arc::new(Observers::new()),
        }
    }

    pub fn log(&self) -> &MessageLog {
        &self.log
    }

    /// Decode one raw frame and route it.
    ///
    /// `message`/`system` frames are appended to the log. Heartbeat acks are
    /// consumed here. Nothing is appended when an error is returned.
    ///
    /// # Errors
    ///
    /// - [`DecodeError::Malformed`] if the text is not JSON or lacks required fields
    /// - [`DecodeError::UnknownKind`] if the `type` tag is not recognized
    /// - [`DecodeError::InvalidEntry`] if the payload cannot form a valid entry
    ///
    /// Frames with empty `content` are well formed and are appended as-is.
    pub fn dispatch(&self, raw: &str) -> Result<Dispatched, DecodeError> {
        let header: FrameHeader = serde_json::from_str(raw)?;
        if !InboundFrame::KNOWN_KINDS.contains(&header.kind.as_str()) {
            return Err(DecodeError::UnknownKind {
                kind: header.kind,
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let frame: InboundFrame = serde_json::from_str(raw)?;
        match frame {
            InboundFrame::Message(payload) => {
                let origin = match payload.user_id {
                    Some(user_id) if user_id != 0 => EntryOrigin::User,
                    _ => EntryOrigin::Assistant,
                };
                self.append_payload(payload, origin)
            }
            InboundFrame::System(payload) => self.append_payload(payload, EntryOrigin::System),
            InboundFrame::HeartbeatAck { status } => {
                debug!("Heartbeat acknowledged (status: {status:?})");
                Ok(Dispatched::HeartbeatAck)
            }
        }
    }

    /// Record an entry authored on this client, stamped with the current time.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::InvalidEntry`] for blank content without audio.
    pub fn record_local(
        &self,
        content: impl Into<String>,
        origin: EntryOrigin,
        audio_ref: Option<String>,
    ) -> Result<ChatEntry, DecodeError> {
        let content = content.into();
        let has_audio = audio_ref.as_deref().is_some_and(|uri| !uri.trim().is_empty());
        if content.trim().is_empty() && !has_audio {
            return Err(DecodeError::InvalidEntry {
                message: String::from("Content cannot be empty without an audio reference"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let entry = ChatEntry::builder()
            .with_content(content)
            .with_origin(origin)
            .with_timestamp(humantime::format_rfc3339_millis(SystemTime::now()).to_string())
            .with_audio_ref(audio_ref)
            .build()?;

        self.publish(entry.clone());
        Ok(entry)
    }

    /// Observe entries that carry an audio reference to play back.
    pub fn on_playback<F>(&self, observer: F) -> SubscriptionId
    where
        F: Fn(&ChatEntry) + Send + Sync + 'static,
    {
        self.playback.subscribe(observer)
    }

    pub fn unsubscribe_playback(&self, id: SubscriptionId) -> bool {
        self.playback.unsubscribe(id)
    }

    fn append_payload(
        &self,
        payload: ChatPayload,
        origin: EntryOrigin,
    ) -> Result<Dispatched, DecodeError> {
        let entry = ChatEntry::builder()
            .with_content(payload.content)
            .with_origin(origin)
            .with_timestamp(payload.timestamp)
            .with_audio_ref(payload.audio_url)
            .with_user_id(payload.user_id)
            .with_session_id(payload.session_id)
            .build()
            .inspect_err(|e| warn!("Dropping {origin} frame: {e}"))?;

        self.publish(entry.clone());
        Ok(Dispatched::Entry(entry))
    }

    fn publish(&self, entry: ChatEntry) {
        let has_audio = entry.audio_ref().is_some();
        self.log.append(entry.clone());
        if has_audio {
            self.playback.notify(&entry);
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("log", &self.log)
            .field("playback", &self.playback)
            .finish()
    }
}
