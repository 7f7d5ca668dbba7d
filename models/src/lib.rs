//! Domain models for the tutor chat core.
//!
//! This crate contains pure data structures representing the core
//! concepts of a tutoring conversation. Models carry validation but no
//! channel or I/O logic - they're data passed between layers.
//!
//! - [`ChatEntry`]: one unit of conversation content
//! - [`SessionCredential`]: the `(token, session id)` pair the channel authenticates with
//! - [`OutboundFrame`] / [`InboundFrame`]: the JSON wire frames
//! - [`AudioSettings`]: voice options sent with an audio submission

pub mod audio_settings;
pub mod chat_entry;
pub mod credential;
pub mod error;
pub mod frame;


pub use audio_settings::{AudioSettings, SUPPORTED_VOICES};
pub use chat_entry::{ChatEntry, ChatEntryBuilder, EntryOrigin};
pub use credential::SessionCredential;
pub use error::model_error::ModelError;
pub use frame::{ChatPayload, InboundFrame, OutboundFrame};

pub use common::ErrorLocation;
