//! Credential source seam.
//!
//! The host's login flow produces the credential; the core only reads it and,
//! after the server refuses it, asks for a fresh token.

use crate::error::auth::AuthError;

use common::{ErrorLocation, RedactedToken};
use models::SessionCredential;

use std::future::Future;
use std::panic::Location;
use std::sync::{PoisonError, RwLock};

use log::info;

pub trait AuthSessionProvider: Send + Sync + 'static {
    /// The current `(token, session id)` pair, if the user is logged in.
    fn credential(&self) -> Option<SessionCredential>;

    /// Obtain a replacement token after the server rejected the current one.
    ///
    /// # Errors
    ///
    /// [`AuthError::RefreshDenied`] is terminal for the session: the manager
    /// stops retrying and goes idle.
    fn refresh(&self) -> impl Future<Output = Result<RedactedToken, AuthError>> + Send;
}

/// In-memory provider for hosts that manage credentials out of band.
///
/// `refresh` hands back whatever token is currently stored, so a host that
/// calls [`SharedSessionProvider::replace`] after re-login makes the next
/// retry pick up the new credential.
#[derive(Debug, Default)]
pub struct SharedSessionProvider {
    current: RwLock<Option<SessionCredential>>,
}

impl SharedSessionProvider {
    pub fn new(credential: SessionCredential) -> Self {
        Self {
            current: RwLock::new(Some(credential)),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn replace(&self, credential: SessionCredential) {
        info!(
            "Session credential replaced (session: {})",
            credential.session_id.as_deref().unwrap_or("none")
        );
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(credential);
    }

    pub fn clear(&self) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl AuthSessionProvider for SharedSessionProvider {
    fn credential(&self) -> Option<SessionCredential> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn refresh(&self) -> Result<RedactedToken, AuthError> {
        match self.credential() {
            Some(credential) if credential.has_token() => Ok(credential.token),
            _ => Err(AuthError::RefreshDenied {
                message: String::from("No stored credential to refresh"),
                location: ErrorLocation::from(Location::caller()),
            }),
        }
    }
}
