use common::ErrorLocation;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum CaptureError {
    /// Microphone access was denied or no input device exists.
    #[error("Device Unavailable Error: {message} {location}")]
    DeviceUnavailable {
        message: String,
        location: ErrorLocation,
    },

    #[error("Already Capturing Error: {message} {location}")]
    AlreadyCapturing {
        message: String,
        location: ErrorLocation,
    },

    /// The device failed while recording or while flushing its last chunk.
    #[error("Device Error: {message} {location}")]
    Device {
        message: String,
        location: ErrorLocation,
    },

    #[error("Finalize Error: {message} {location}")]
    Finalize {
        message: String,
        location: ErrorLocation,
    },
}
