use crate::ErrorLocation;
use crate::error::model_error::ModelError;

use std::fmt;
use std::panic::Location;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who authored a conversation entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryOrigin {
    User,
    Assistant,
    System,
}

impl fmt::Display for EntryOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EntryOrigin::User => "user",
            EntryOrigin::Assistant => "assistant",
            EntryOrigin::System => "system",
        };
        f.write_str(label)
    }
}

/// One unit of conversation content.
///
/// The `id` is assigned on the client when the entry is created, for both
/// locally authored and server-delivered entries. Entries are immutable once
/// built; there are no setters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatEntry {
    id: Uuid,
    content: String,
    origin: EntryOrigin,
    timestamp: String,
    audio_ref: Option<String>,
    user_id: Option<i64>,
    session_id: Option<String>,
}

impl ChatEntry {
    pub fn builder() -> ChatEntryBuilder {
        ChatEntryBuilder::default()
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn origin(&self) -> EntryOrigin {
        self.origin
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn audio_ref(&self) -> Option<&str> {
        self.audio_ref.as_deref()
    }

    pub fn user_id(&self) -> Option<i64> {
        self.user_id
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }
}

/// Builder for creating validated [`ChatEntry`] instances.
///
/// A fresh v4 id is generated at `build()` time unless one was supplied.
#[derive(Debug, Default)]
pub struct ChatEntryBuilder {
    id: Option<Uuid>,
    content: Option<String>,
    origin: Option<EntryOrigin>,
    timestamp: Option<String>,
    audio_ref: Option<String>,
    user_id: Option<i64>,
    session_id: Option<String>,
}

impl ChatEntryBuilder {
    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_origin(mut self, origin: EntryOrigin) -> Self {
        self.origin = Some(origin);
        self
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    pub fn with_audio_ref(mut self, audio_ref: Option<String>) -> Self {
        self.audio_ref = audio_ref;
        self
    }

    pub fn with_user_id(mut self, user_id: Option<i64>) -> Self {
        self.user_id = user_id;
        self
    }

    pub fn with_session_id(mut self, session_id: Option<String>) -> Self {
        self.session_id = session_id;
        self
    }

    /// Build the entry with validation.
    ///
    /// Content may be empty: the server relays whatever text a client sent.
    /// A blank audio reference is treated as none.
    #[track_caller]
    pub fn build(self) -> Result<ChatEntry, ModelError> {
        let content = self.content.ok_or_else(|| ModelError::Validation {
            message: String::from("Content is required"),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let audio_ref = self.audio_ref.filter(|uri| !uri.trim().is_empty());

        let origin = self.origin.ok_or_else(|| ModelError::Validation {
            message: String::from("Origin is required"),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let timestamp = self.timestamp.ok_or_else(|| ModelError::Validation {
            message: String::from("Timestamp is required"),
            location: ErrorLocation::from(Location::caller()),
        })?;

        Ok(ChatEntry {
            id: self.id.unwrap_or_else(Uuid::new_v4),
            content,
            origin,
            timestamp,
            audio_ref,
            user_id: self.user_id,
            session_id: self.session_id,
        })
    }
}
