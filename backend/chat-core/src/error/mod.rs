pub mod auth;
pub mod capture;
pub mod config;
pub mod connection;
pub mod dispatch;
pub mod upload;

pub use auth::AuthError;
pub use capture::CaptureError;
pub use config::ConfigError;
pub use connection::ConnectionError;
pub use dispatch::DecodeError;
pub use upload::UploadError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Auth(#[from] auth::AuthError),

    #[error(transparent)]
    Capture(#[from] capture::CaptureError),

    #[error(transparent)]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Connection(#[from] connection::ConnectionError),

    #[error(transparent)]
    Decode(#[from] dispatch::DecodeError),

    #[error(transparent)]
    Upload(#[from] upload::UploadError),

    #[error(transparent)]
    Model(#[from] models::ModelError),
}
