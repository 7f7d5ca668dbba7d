//! Real-time communication core of the tutor chat client.
//!
//! The core keeps one authenticated WebSocket channel alive, reconnects with
//! exponential backoff after transient failures, decodes server frames into an
//! ordered conversation log, and captures microphone audio for submission.
//!
//! - [`channel::ConnectionManager`]: channel lifecycle (connect, heartbeat, reconnect, teardown)
//! - [`dispatch::Dispatcher`]: inbound frame decoding, the single writer of the log
//! - [`message_log::MessageLog`]: append-only, observable conversation log
//! - [`capture::AudioCapturePipeline`]: microphone acquisition with guaranteed release
//! - [`upload::AudioUploader`]: multipart submission of finished captures

pub mod auth;
pub mod capture;
pub mod channel;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod message_log;
pub mod observers;
pub mod upload;

#[cfg(test)]
mod tests;

use const_format::concatcp;

pub const API_PREFIX: &str = "/api";
pub const DEFAULT_PAGE_ORIGIN: &str = "http://localhost:8001";
pub const DEFAULT_CHANNEL_PATH: &str = concatcp!(API_PREFIX, "/ws");
pub const DEFAULT_AUDIO_UPLOAD_PATH: &str = concatcp!(API_PREFIX, "/chat/audio");

/// Close code the server uses for a missing, invalid or expired session.
pub const AUTH_REJECTED_CLOSE_CODE: u16 = 4001;
