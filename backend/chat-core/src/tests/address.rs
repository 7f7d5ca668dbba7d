use crate::channel::address::{channel_address, redacted_address};
use crate::config::ChannelConfig;
use crate::error::connection::ConnectionError;

use models::SessionCredential;

fn config(origin: &str) -> ChannelConfig {
    ChannelConfig {
        page_origin: origin.to_string(),
        ..ChannelConfig::default()
    }
}

/// **VALUE**: Verifies the scheme follows the page origin.
///
/// **WHY THIS MATTERS**: A page served over https that dials `ws://` is blocked as
/// mixed content; an http page dialing `wss://` fails TLS against a dev server.
///
/// **BUG THIS CATCHES**: Would catch a hard-coded scheme.
#[test]
fn given_page_origins_when_building_address_then_scheme_matches() {
    let credential = SessionCredential::from_parts("tok", Some("s1"));
    let cases = [
        ("http://localhost:8001", "ws://localhost:8001/api/ws/tok?session=s1"),
        ("https://tutor.example.com", "wss://tutor.example.com/api/ws/tok?session=s1"),
        ("wss://tutor.example.com:9443/", "wss://tutor.example.com:9443/api/ws/tok?session=s1"),
    ];

    for (origin, expected) in cases {
        let address = channel_address(&config(origin), &credential).unwrap();
        assert_eq!(address.as_str(), expected, "origin {origin}");
    }
}

/// **VALUE**: Verifies the session query is omitted without a session id.
#[test]
fn given_no_session_when_building_address_then_no_query() {
    let credential = SessionCredential::from_parts("tok", None);

    let address = channel_address(&config("http://localhost:8001"), &credential).unwrap();

    assert_eq!(address.as_str(), "ws://localhost:8001/api/ws/tok");
    assert!(address.query().is_none());
}

/// **VALUE**: Verifies that tokens with reserved characters stay inside one segment.
///
/// **BUG THIS CATCHES**: Would catch string concatenation that lets a `/` or `?` in a
/// token change the path or the query.
#[test]
fn given_token_with_reserved_chars_when_building_address_then_percent_encoded() {
    let credential = SessionCredential::from_parts("a/b?c", Some("s 1"));

    let address = channel_address(&config("http://localhost:8001"), &credential).unwrap();

    assert_eq!(address.path(), "/api/ws/a%2Fb%3Fc");
    assert_eq!(address.query(), Some("session=s+1"));
}

/// **VALUE**: Verifies blank tokens and unsupported origins are rejected.
#[test]
fn given_invalid_inputs_when_building_address_then_error() {
    let blank = SessionCredential::from_parts("   ", None);
    let valid = SessionCredential::from_parts("tok", None);

    assert!(matches!(
        channel_address(&config("http://localhost:8001"), &blank),
        Err(ConnectionError::MissingCredential { .. })
    ));
    assert!(matches!(
        channel_address(&config("ftp://localhost"), &valid),
        Err(ConnectionError::Address { .. })
    ));
    assert!(matches!(
        channel_address(&config("not a url"), &valid),
        Err(ConnectionError::Address { .. })
    ));
}

/// **VALUE**: Verifies the logged address never contains the token.
///
/// **BUG THIS CATCHES**: Would catch credentials leaking into log files.
#[test]
fn given_address_when_redacted_then_token_hidden() {
    let credential = SessionCredential::from_parts("super-secret", Some("s1"));
    let address = channel_address(&config("https://tutor.example.com"), &credential).unwrap();

    let logged = redacted_address(&address);

    assert!(!logged.contains("super-secret"));
    assert!(logged.contains("REDACTED"));
    assert!(logged.starts_with("wss://tutor.example.com/api/ws/"));
    assert!(logged.ends_with("?session=s1"));
}
