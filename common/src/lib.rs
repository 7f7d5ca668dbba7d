//! Shared building blocks for the tutor chat workspace.
//!
//! This crate holds the small types every other crate leans on:
//!
//! - [`ErrorLocation`]: call-site capture used by every error enum
//! - [`RedactedToken`]: session tokens that never leak into logs
//! - [`HttpStatusCode`]: status classification for HTTP failures
//!
//! ## Architecture
//!
//! - **common** (this crate): error plumbing and secret handling
//! - **models**: pure data structures (entries, frames, credentials)
//! - **chat-core**: the real-time channel, dispatch, log and capture logic
//! - **tutor-chat**: the command-line host wiring everything together

pub mod error;
pub mod http_status;
pub mod redacted_token;


pub use error::error_location::ErrorLocation;
pub use error::redact_error::RedactError;
pub use http_status::HttpStatusCode;
pub use redacted_token::RedactedToken;
