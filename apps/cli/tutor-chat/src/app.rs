//! Console session wiring the chat core together.

use crate::device::WavFileDevice;
use crate::error::TutorChatError;
use crate::repl::{HELP_TEXT, ReplCommand};

use chat_core::auth::{AuthSessionProvider, SharedSessionProvider};
use chat_core::capture::AudioCapturePipeline;
use chat_core::channel::{Connector, ConnectionManager, WsConnector};
use chat_core::config::ChatCoreConfig;
use chat_core::dispatch::Dispatcher;
use chat_core::error::ConnectionError;
use chat_core::message_log::MessageLog;
use chat_core::upload::AudioUploader;

use common::ErrorLocation;
use models::{AudioSettings, ChatEntry, EntryOrigin, SessionCredential};

use std::panic::Location;
use std::path::Path;
use std::sync::Arc;

use log::{info, warn};
use serde_json::Value;

pub const ENV_TOKEN: &str = "TUTOR_CHAT_TOKEN";
pub const ENV_SESSION: &str = "TUTOR_CHAT_SESSION";

/// What the console loop should do after a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Print(String),
    Quit,
}

pub struct TutorChat {
    manager: ConnectionManager,
    dispatcher: Dispatcher,
    provider: Arc<SharedSessionProvider>,
    uploader: AudioUploader,
    audio_settings: AudioSettings,
}

impl TutorChat {
    /// Build a session talking to the configured server over WebSockets.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(
        config: &ChatCoreConfig,
        credential: SessionCredential,
    ) -> Result<Self, TutorChatError> {
        Self::with_connector(config, credential, WsConnector)
    }

    pub fn with_connector<C: Connector>(
        config: &ChatCoreConfig,
        credential: SessionCredential,
        connector: C,
    ) -> Result<Self, TutorChatError> {
        let uploader = AudioUploader::new(&config.channel.page_origin, &config.upload)?;
        let provider = Arc::new(SharedSessionProvider::new(credential));
        let dispatcher = Dispatcher::new(MessageLog::new());

        let manager = ConnectionManager::spawn(
            config.channel.clone(),
            config.reconnect,
            connector,
            Arc::clone(&provider),
            dispatcher.clone(),
        );

        Ok(Self {
            manager,
            dispatcher,
            provider,
            uploader,
            audio_settings: config.audio.clone(),
        })
    }

    pub fn manager(&self) -> &ConnectionManager {
        &self.manager
    }

    pub fn log(&self) -> &MessageLog {
        self.dispatcher.log()
    }

    pub async fn connect(&self) -> Result<(), TutorChatError> {
        Ok(self.manager.connect().await?)
    }

    /// Stop the channel actor. Safe to call more than once.
    pub async fn shutdown(&self) {
        match self.manager.shutdown().await {
            Ok(()) | Err(ConnectionError::ActorStopped { .. }) => {}
            Err(e) => warn!("Shutdown failed: {e}"),
        }
    }

    pub async fn handle(&self, command: ReplCommand) -> Result<Flow, TutorChatError> {
        match command {
            ReplCommand::Say(text) => {
                self.manager.send_text(text)?;
                Ok(Flow::Continue)
            }
            ReplCommand::Audio(path) => {
                self.send_audio(&path).await?;
                Ok(Flow::Continue)
            }
            ReplCommand::Connect => {
                self.connect().await?;
                Ok(Flow::Print(self.status_line()))
            }
            ReplCommand::Disconnect => {
                self.manager.disconnect().await?;
                Ok(Flow::Print(self.status_line()))
            }
            ReplCommand::Status => Ok(Flow::Print(self.status_line())),
            ReplCommand::Help => Ok(Flow::Print(HELP_TEXT.to_string())),
            ReplCommand::Quit => {
                self.shutdown().await;
                Ok(Flow::Quit)
            }
        }
    }

    /// Capture a WAV file, upload it and record the exchange in the log.
    ///
    /// Returns the local user entry. When the server answers with a reply
    /// text, it is appended as an assistant entry after it.
    pub async fn send_audio(&self, path: &Path) -> Result<ChatEntry, TutorChatError> {
        let token = self
            .provider
            .credential()
            .filter(SessionCredential::has_token)
            .map(|credential| credential.token)
            .ok_or_else(|| TutorChatError::TutorChat {
                message: String::from("Not logged in: no token to upload with"),
                location: ErrorLocation::from(Location::caller()),
            })?;

        let mut pipeline = AudioCapturePipeline::new(WavFileDevice::new(path));
        pipeline.start_capture().await?;
        let capture = pipeline
            .stop_capture()?
            .ok_or_else(|| TutorChatError::TutorChat {
                message: String::from("Capture ended before it was finalized"),
                location: ErrorLocation::from(Location::caller()),
            })?;

        let response = self
            .uploader
            .submit(&token, &capture, &self.audio_settings)
            .await?;
        info!("Voice message uploaded ({} bytes)", capture.len());

        let label = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let entry = self.dispatcher.record_local(
            format!("[voice message: {label}]"),
            EntryOrigin::User,
            response_audio_ref(&response),
        )?;

        if let Some(reply) = response_reply(&response) {
            self.dispatcher
                .record_local(reply, EntryOrigin::Assistant, None)?;
        }

        Ok(entry)
    }

    pub fn status_line(&self) -> String {
        let status = self.manager.status();
        format!(
            "channel {} (reconnect attempt {}, next delay {}), {} messages",
            status.state,
            status.reconnect.attempt,
            humantime::format_duration(status.reconnect.next_delay),
            self.log().len()
        )
    }
}

/// Build the session credential from `TUTOR_CHAT_TOKEN` / `TUTOR_CHAT_SESSION` values.
#[track_caller]
pub fn credential_from_vars(
    token: Option<String>,
    session_id: Option<String>,
) -> Result<SessionCredential, TutorChatError> {
    let token = token
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| TutorChatError::TutorChat {
            message: format!("{ENV_TOKEN} is not set"),
            location: ErrorLocation::from(Location::caller()),
        })?;
    let session_id = session_id
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    Ok(SessionCredential::from_parts(token, session_id.as_deref()))
}

pub fn credential_from_env() -> Result<SessionCredential, TutorChatError> {
    credential_from_vars(
        std::env::var(ENV_TOKEN).ok(),
        std::env::var(ENV_SESSION).ok(),
    )
}

/// One printable line per log entry.
pub fn format_entry(entry: &ChatEntry) -> String {
    let mut line = format!(
        "[{}] {}: {}",
        entry.timestamp(),
        entry.origin(),
        entry.content()
    );
    if let Some(audio) = entry.audio_ref() {
        line.push_str(&format!(" (audio: {audio})"));
    }
    line
}

fn response_audio_ref(response: &Value) -> Option<String> {
    ["audio_url", "audioUrl"]
        .iter()
        .find_map(|key| response.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}

fn response_reply(response: &Value) -> Option<String> {
    response
        .get("response")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|reply| !reply.is_empty())
        .map(str::to_string)
}
