use common::ErrorLocation;

use std::panic::Location;

use thiserror::Error as ThisError;

/// A single inbound frame could not be decoded.
///
/// Never fatal: the frame is skipped and delivery continues with the next one.
#[derive(Debug, ThisError)]
pub enum DecodeError {
    #[error("Malformed Frame Error: {message} {location}")]
    Malformed {
        message: String,
        location: ErrorLocation,
    },

    #[error("Unknown Frame Kind Error: {kind} {location}")]
    UnknownKind {
        kind: String,
        location: ErrorLocation,
    },

    #[error("Invalid Entry Error: {message} {location}")]
    InvalidEntry {
        message: String,
        location: ErrorLocation,
    },
}

impl From<serde_json::Error> for DecodeError {
    #[track_caller]
    fn from(error: serde_json::Error) -> Self {
        DecodeError::Malformed {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<models::ModelError> for DecodeError {
    #[track_caller]
    fn from(error: models::ModelError) -> Self {
        DecodeError::InvalidEntry {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
