use crate::error::config::ConfigError;
use crate::{DEFAULT_AUDIO_UPLOAD_PATH, DEFAULT_CHANNEL_PATH, DEFAULT_PAGE_ORIGIN};

use common::ErrorLocation;
use models::AudioSettings;

use std::panic::Location;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

const CONFIG_FILE_NAME: &str = "config.json";
const CONFIG_DIR_NAME: &str = "tutor-chat";
const CONFIG_VERSION: u32 = 1;

pub const ENV_PAGE_ORIGIN: &str = "TUTOR_CHAT_ORIGIN";
pub const ENV_HEARTBEAT_MS: &str = "TUTOR_CHAT_HEARTBEAT_MS";
pub const ENV_RECONNECT_BASE_MS: &str = "TUTOR_CHAT_RECONNECT_BASE_MS";
pub const ENV_RECONNECT_MAX_ATTEMPTS: &str = "TUTOR_CHAT_RECONNECT_MAX_ATTEMPTS";

// ============================================
// CONFIG STRUCTS
// ============================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Origin of the page/app the channel belongs to; decides `ws` vs `wss`.
    #[serde(default = "default_page_origin")]
    pub page_origin: String,
    #[serde(default = "default_channel_path")]
    pub channel_path: String,
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
    #[serde(default = "default_handshake_timeout_ms")]
    pub handshake_timeout_ms: u64,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            page_origin: default_page_origin(),
            channel_path: default_channel_path(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            handshake_timeout_ms: default_handshake_timeout_ms(),
        }
    }
}

impl ChannelConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }
}

/// Backoff policy: the k-th consecutive failure waits `base_delay * 2^k`,
/// and more than `max_attempts` failures give up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconnectPolicy {
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay_ms: default_base_delay_ms(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl ReconnectPolicy {
    pub fn new(base_delay: Duration, max_attempts: u32) -> Self {
        Self {
            base_delay_ms: u64::try_from(base_delay.as_millis()).unwrap_or(u64::MAX),
            max_attempts,
        }
    }

    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadConfig {
    #[serde(default = "default_audio_path")]
    pub audio_path: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            audio_path: default_audio_path(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl UploadConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCoreConfig {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub channel: ChannelConfig,

    #[serde(default)]
    pub reconnect: ReconnectPolicy,

    #[serde(default)]
    pub upload: UploadConfig,

    #[serde(default)]
    pub audio: AudioSettings,
}

impl Default for ChatCoreConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            channel: ChannelConfig::default(),
            reconnect: ReconnectPolicy::default(),
            upload: UploadConfig::default(),
            audio: AudioSettings::default(),
        }
    }
}

// ============================================
// DEFAULT FUNCTIONS
// ============================================

fn default_version() -> u32 {
    CONFIG_VERSION
}
fn default_page_origin() -> String {
    DEFAULT_PAGE_ORIGIN.to_string()
}
fn default_channel_path() -> String {
    DEFAULT_CHANNEL_PATH.to_string()
}
fn default_heartbeat_interval_ms() -> u64 {
    30_000
}
fn default_handshake_timeout_ms() -> u64 {
    10_000
}
fn default_base_delay_ms() -> u64 {
    1_000
}
fn default_max_attempts() -> u32 {
    5
}
fn default_audio_path() -> String {
    DEFAULT_AUDIO_UPLOAD_PATH.to_string()
}
fn default_request_timeout_ms() -> u64 {
    30_000
}

// ============================================
// IMPLEMENTATION
// ============================================

/// `{platform config dir}/tutor-chat`, if the platform has one.
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME))
}

/// Load `.env` from the working directory if present.
///
/// Returns whether a file was loaded. A missing file is not an error.
pub fn load_dotenv() -> bool {
    match dotenvy::dotenv() {
        Ok(path) => {
            info!("Loaded environment from {}", path.display());
            true
        }
        Err(e) if e.not_found() => false,
        Err(e) => {
            warn!("Ignoring unreadable .env file: {e}");
            false
        }
    }
}

impl ChatCoreConfig {
    /// Load config from {config_dir}/config.json.
    ///
    /// A missing file yields defaults; a present but corrupt or invalid file is an error.
    pub fn load(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            info!(
                "Config file not found at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path).map_err(|e| ConfigError::Read {
            path: config_path.clone(),
            source: e,
            location: ErrorLocation::from(Location::caller()),
        })?;

        let config: ChatCoreConfig =
            serde_json::from_str(&contents).map_err(|e| ConfigError::Parse {
                path: config_path.clone(),
                message: e.to_string(),
                location: ErrorLocation::from(Location::caller()),
            })?;

        config.validate()?;

        info!("Config loaded from {}", config_path.display());
        Ok(config)
    }

    /// Save config to {config_dir}/config.json (temp file + rename).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if validation, directory creation, serialization,
    /// the write or the rename fails.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        self.validate()?;

        std::fs::create_dir_all(config_dir).map_err(|e| ConfigError::Write {
            path: config_dir.to_path_buf(),
            source: e,
            location: ErrorLocation::from(Location::caller()),
        })?;

        let config_path = config_dir.join(CONFIG_FILE_NAME);
        let temp_path = config_dir.join(format!("{CONFIG_FILE_NAME}.tmp"));

        let json = serde_json::to_string_pretty(self).map_err(|e| ConfigError::Serialize {
            message: e.to_string(),
            location: ErrorLocation::from(Location::caller()),
        })?;

        std::fs::write(&temp_path, json).map_err(|e| ConfigError::Write {
            path: temp_path.clone(),
            source: e,
            location: ErrorLocation::from(Location::caller()),
        })?;

        std::fs::rename(&temp_path, &config_path).map_err(|e| ConfigError::Write {
            path: config_path.clone(),
            source: e,
            location: ErrorLocation::from(Location::caller()),
        })?;

        info!("Config saved to {}", config_path.display());
        Ok(())
    }

    /// Overlay `TUTOR_CHAT_*` environment variables, then re-validate.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(origin) = read_env(ENV_PAGE_ORIGIN) {
            debug!("{ENV_PAGE_ORIGIN} overrides page origin");
            self.channel.page_origin = origin;
        }
        if let Some(ms) = parse_env::<u64>(ENV_HEARTBEAT_MS)? {
            self.channel.heartbeat_interval_ms = ms;
        }
        if let Some(ms) = parse_env::<u64>(ENV_RECONNECT_BASE_MS)? {
            self.reconnect.base_delay_ms = ms;
        }
        if let Some(attempts) = parse_env::<u32>(ENV_RECONNECT_MAX_ATTEMPTS)? {
            self.reconnect.max_attempts = attempts;
        }

        self.validate()
    }

    /// Validate config values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] for the first out-of-range value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version == 0 || self.version > CONFIG_VERSION {
            return Err(validation(format!(
                "Invalid version: {} (expected 1-{CONFIG_VERSION})",
                self.version
            )));
        }

        let origin = &self.channel.page_origin;
        match url::Url::parse(origin) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https" | "ws" | "wss") => {}
            _ => return Err(validation(format!("Invalid page origin: {origin}"))),
        }

        for (name, path) in [
            ("channel_path", &self.channel.channel_path),
            ("audio_path", &self.upload.audio_path),
        ] {
            if !path.starts_with('/') {
                return Err(validation(format!("{name} must start with '/': {path}")));
            }
        }

        if !(1_000..=300_000).contains(&self.channel.heartbeat_interval_ms) {
            return Err(validation(format!(
                "Invalid heartbeat interval: {}ms (must be 1000-300000)",
                self.channel.heartbeat_interval_ms
            )));
        }

        if self.channel.handshake_timeout_ms == 0 || self.upload.request_timeout_ms == 0 {
            return Err(validation(String::from("Timeouts must be greater than zero")));
        }

        if self.reconnect.base_delay_ms == 0 || self.reconnect.base_delay_ms > 60_000 {
            return Err(validation(format!(
                "Invalid reconnect base delay: {}ms (must be 1-60000)",
                self.reconnect.base_delay_ms
            )));
        }

        if self.reconnect.max_attempts > 16 {
            return Err(validation(format!(
                "Invalid reconnect attempts: {} (must be 0-16)",
                self.reconnect.max_attempts
            )));
        }

        self.audio.validate().map_err(|e| validation(e.to_string()))?;

        Ok(())
    }
}

#[track_caller]
fn validation(message: String) -> ConfigError {
    ConfigError::Validation {
        message,
        location: ErrorLocation::from(Location::caller()),
    }
}

fn read_env(variable: &str) -> Option<String> {
    std::env::var(variable)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_env<T>(variable: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let Some(raw) = read_env(variable) else {
        return Ok(None);
    };

    raw.parse::<T>()
        .map(Some)
        .map_err(|e| ConfigError::Environment {
            variable: variable.to_string(),
            message: format!("{raw:?}: {e}"),
            location: ErrorLocation::from(Location::caller()),
        })
}
