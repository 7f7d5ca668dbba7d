use crate::ErrorLocation;
use crate::error::model_error::ModelError;

use std::panic::Location;

use serde::{Deserialize, Serialize};

/// Voices the tutoring server can synthesize replies with.
pub const SUPPORTED_VOICES: [&str; 6] = ["alloy", "echo", "fable", "onyx", "nova", "shimmer"];

const MIN_SPEED: f32 = 0.25;
const MAX_SPEED: f32 = 4.0;

/// Playback options sent alongside an audio submission.
///
/// Serialized as the JSON `settings` part of the multipart upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioSettings {
    #[serde(default = "default_voice")]
    pub voice: String,
    #[serde(default = "default_speed")]
    pub speed: f32,
    /// Ask the server for a text-only reply (no synthesized audio).
    #[serde(default)]
    pub silent_mode: bool,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            voice: default_voice(),
            speed: default_speed(),
            silent_mode: false,
        }
    }
}

fn default_voice() -> String {
    String::from("alloy")
}

fn default_speed() -> f32 {
    1.0
}

impl AudioSettings {
    /// Validate the settings against what the server accepts.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Validation`] for an unknown voice or a speed
    /// outside `0.25..=4.0`.
    #[track_caller]
    pub fn validate(&self) -> Result<(), ModelError> {
        if !SUPPORTED_VOICES.contains(&self.voice.as_str()) {
            return Err(ModelError::Validation {
                message: format!("Unsupported voice: {}", self.voice),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        if !(MIN_SPEED..=MAX_SPEED).contains(&self.speed) {
            return Err(ModelError::Validation {
                message: format!(
                    "Invalid speed: {} (must be {MIN_SPEED}-{MAX_SPEED})",
                    self.speed
                ),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        Ok(())
    }
}
