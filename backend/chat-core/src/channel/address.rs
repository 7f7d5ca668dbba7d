use crate::config::ChannelConfig;
use crate::error::connection::ConnectionError;

use common::ErrorLocation;
use models::SessionCredential;

use std::panic::Location;

use url::Url;

const REDACTED_SEGMENT: &str = "[REDACTED]";

/// Build `scheme://host/{channel_path}/{token}?session={session_id}`.
///
/// The scheme follows the page origin: `https`/`wss` give `wss`, `http`/`ws`
/// give `ws`. The `session` query is left out when there is no session id.
///
/// # Errors
///
/// - [`ConnectionError::MissingCredential`] for a blank token
/// - [`ConnectionError::Address`] for an unparseable or unsupported origin
pub fn channel_address(
    config: &ChannelConfig,
    credential: &SessionCredential,
) -> Result<Url, ConnectionError> {
    if !credential.has_token() {
        return Err(ConnectionError::MissingCredential {
            message: String::from("Session token is empty"),
            location: ErrorLocation::from(Location::caller()),
        });
    }

    let mut url = Url::parse(&config.page_origin)?;

    let scheme = match url.scheme() {
        "https" | "wss" => "wss",
        "http" | "ws" => "ws",
        other => {
            return Err(ConnectionError::Address {
                message: format!("Unsupported page origin scheme: {other}"),
                location: ErrorLocation::from(Location::caller()),
            });
        }
    };
    url.set_scheme(scheme).map_err(|()| ConnectionError::Address {
        message: format!("Cannot switch {} to {scheme}", config.page_origin),
        location: ErrorLocation::from(Location::caller()),
    })?;

    url.set_query(None);
    url.set_fragment(None);
    {
        let mut segments = url.path_segments_mut().map_err(|()| ConnectionError::Address {
            message: format!("Page origin cannot be a base: {}", config.page_origin),
            location: ErrorLocation::from(Location::caller()),
        })?;
        segments.clear();
        segments.extend(
            config
                .channel_path
                .split('/')
                .filter(|segment| !segment.is_empty()),
        );
        segments.push(credential.token.as_str().trim());
    }

    if let Some(session_id) = credential
        .session_id
        .as_deref()
        .filter(|session| !session.is_empty())
    {
        url.query_pairs_mut().append_pair("session", session_id);
    }

    Ok(url)
}

/// The address with its token segment masked, for logs.
pub fn redacted_address(address: &Url) -> String {
    let mut redacted = address.clone();
    if let Ok(mut segments) = redacted.path_segments_mut() {
        segments.pop().push(REDACTED_SEGMENT);
    }
    redacted.to_string()
}
