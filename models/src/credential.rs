use common::RedactedToken;

/// The `(token, session id)` pair the channel authenticates with.
///
/// Produced by the host's login flow and handed to the core through an
/// auth session provider. The core never mutates it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCredential {
    pub token: RedactedToken,
    pub session_id: Option<String>,
}

impl SessionCredential {
    pub fn new(token: RedactedToken, session_id: Option<String>) -> Self {
        Self { token, session_id }
    }

    /// Convenience constructor for hosts holding plain strings.
    pub fn from_parts(token: impl Into<String>, session_id: Option<&str>) -> Self {
        Self {
            token: RedactedToken::new(token),
            session_id: session_id.map(str::to_string),
        }
    }

    /// A credential is usable only with a non-blank token.
    pub fn has_token(&self) -> bool {
        !self.token.is_empty()
    }
}
