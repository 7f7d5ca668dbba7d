use common::{ErrorLocation, HttpStatusCode};

use std::panic::Location;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum ConnectionError {
    /// No credential, or a credential with a blank token.
    #[error("Missing Credential Error: {message} {location}")]
    MissingCredential {
        message: String,
        location: ErrorLocation,
    },

    #[error("Channel Not Open Error: channel is {state} {location}")]
    ChannelNotOpen {
        state: String,
        location: ErrorLocation,
    },

    #[error("Invalid State Error: {message} (state: {state}) {location}")]
    InvalidState {
        state: String,
        message: String,
        location: ErrorLocation,
    },

    #[error("Channel Address Error: {message} {location}")]
    Address {
        message: String,
        location: ErrorLocation,
    },

    #[error("Handshake Error: {message} {location}")]
    Handshake {
        message: String,
        location: ErrorLocation,
    },

    /// The server answered the upgrade request with an HTTP error status.
    #[error("Handshake Rejected Error: HTTP {status} {location}")]
    Rejected {
        status: HttpStatusCode,
        location: ErrorLocation,
    },

    #[error("Handshake Timeout Error: {message} {location}")]
    Timeout {
        message: String,
        location: ErrorLocation,
    },

    #[error("Transport Error: {message} {location}")]
    Transport {
        message: String,
        location: ErrorLocation,
    },

    #[error("Refresh Denied Error: {message} {location}")]
    RefreshDenied {
        message: String,
        location: ErrorLocation,
    },

    #[error("Reconnect Exhausted Error: gave up after {attempts} attempts {location}")]
    ReconnectExhausted {
        attempts: u32,
        location: ErrorLocation,
    },

    /// The pending connect was abandoned by `disconnect()` or `shutdown()`.
    #[error("Connect Cancelled Error: {message} {location}")]
    Cancelled {
        message: String,
        location: ErrorLocation,
    },

    #[error("Connection Actor Stopped Error: {message} {location}")]
    ActorStopped {
        message: String,
        location: ErrorLocation,
    },
}

impl ConnectionError {
    /// True for failures that mean the credential itself was refused.
    pub fn is_auth_rejection(&self) -> bool {
        matches!(self, ConnectionError::Rejected { status, .. } if status.is_auth_rejection())
    }
}

impl From<url::ParseError> for ConnectionError {
    #[track_caller]
    fn from(error: url::ParseError) -> Self {
        ConnectionError::Address {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for ConnectionError {
    #[track_caller]
    fn from(error: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::Error as WsError;

        let location = ErrorLocation::from(Location::caller());
        match error {
            WsError::Http(response) => ConnectionError::Rejected {
                status: HttpStatusCode(response.status().as_u16()),
                location,
            },
            closed @ (WsError::ConnectionClosed | WsError::AlreadyClosed) => {
                ConnectionError::Transport {
                    message: closed.to_string(),
                    location,
                }
            }
            other => ConnectionError::Handshake {
                message: other.to_string(),
                location,
            },
        }
    }
}

impl From<crate::error::auth::AuthError> for ConnectionError {
    #[track_caller]
    fn from(error: crate::error::auth::AuthError) -> Self {
        ConnectionError::RefreshDenied {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
