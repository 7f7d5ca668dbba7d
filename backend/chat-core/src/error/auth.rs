use common::ErrorLocation;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum AuthError {
    /// The credential source refused to issue a new token. Terminal for the session.
    #[error("Refresh Denied Error: {message} {location}")]
    RefreshDenied {
        message: String,
        location: ErrorLocation,
    },
}
