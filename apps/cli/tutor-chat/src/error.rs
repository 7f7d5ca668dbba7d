use chat_core::error::{
    CaptureError, ConfigError, ConnectionError, CoreError, DecodeError, UploadError,
};

use common::ErrorLocation;

use std::panic::Location;

use thiserror::Error;

/// Errors surfaced by the `tutor-chat` binary.
///
/// Core failures are flattened into [`TutorChatError::Core`] with the location
/// of the conversion, so the message still names where the app gave up.
#[derive(Debug, Error)]
pub enum TutorChatError {
    /// Error from this App
    #[error("Tutor Chat Error: {message} {location}")]
    TutorChat {
        message: String,
        location: ErrorLocation,
    },

    /// Error from chat-core operations (channel, capture, upload, config)
    #[error("Core Error: {message} {location}")]
    Core {
        message: String,
        location: ErrorLocation,
    },

    /// A WAV file could not be read or re-encoded
    #[error("Audio File Error: {message} {location}")]
    AudioFile {
        message: String,
        location: ErrorLocation,
    },

    /// A console command could not be parsed
    #[error("Command Error: {message} {location}")]
    Command {
        message: String,
        location: ErrorLocation,
    },
}

impl From<CoreError> for TutorChatError {
    #[track_caller]
    fn from(error: CoreError) -> Self {
        TutorChatError::Core {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<ConnectionError> for TutorChatError {
    #[track_caller]
    fn from(error: ConnectionError) -> Self {
        TutorChatError::from(CoreError::from(error))
    }
}

impl From<CaptureError> for TutorChatError {
    #[track_caller]
    fn from(error: CaptureError) -> Self {
        TutorChatError::from(CoreError::from(error))
    }
}

impl From<UploadError> for TutorChatError {
    #[track_caller]
    fn from(error: UploadError) -> Self {
        TutorChatError::from(CoreError::from(error))
    }
}

impl From<ConfigError> for TutorChatError {
    #[track_caller]
    fn from(error: ConfigError) -> Self {
        TutorChatError::from(CoreError::from(error))
    }
}

impl From<DecodeError> for TutorChatError {
    #[track_caller]
    fn from(error: DecodeError) -> Self {
        TutorChatError::from(CoreError::from(error))
    }
}

impl From<hound::Error> for TutorChatError {
    #[track_caller]
    fn from(error: hound::Error) -> Self {
        TutorChatError::AudioFile {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<std::io::Error> for TutorChatError {
    #[track_caller]
    fn from(error: std::io::Error) -> Self {
        TutorChatError::TutorChat {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
