use chat_core::error::{ConnectionError, CoreError, DecodeError};

use common::{ErrorLocation, HttpStatusCode};

use std::panic::Location;

/// **VALUE**: Verifies errors carry the location they were raised at.
///
/// **WHY THIS MATTERS**: A reconnect failure in a log file is only actionable if it
/// says which call site produced it.
///
/// **BUG THIS CATCHES**: Would catch the location being dropped from the Display format.
#[test]
#[track_caller]
fn given_connection_error_when_formatted_then_includes_kind_and_location() {
    // GIVEN: A rejection raised here
    let err = ConnectionError::Rejected {
        status: HttpStatusCode(403),
        location: ErrorLocation::from(Location::caller()),
    };

    // WHEN: Formatting
    let text = err.to_string();

    // THEN: Kind, status and file are present
    assert!(text.contains("Handshake Rejected Error"));
    assert!(text.contains("403"));
    assert!(text.contains("errors.rs"));
    assert!(err.is_auth_rejection());
}

/// **VALUE**: Verifies JSON failures convert into decode errors at the conversion site.
#[test]
fn given_json_error_when_converted_then_malformed_with_this_file() {
    let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();

    let err = DecodeError::from(json_err);

    assert!(matches!(err, DecodeError::Malformed { .. }));
    assert!(err.to_string().contains("errors.rs"));
}

/// **VALUE**: Verifies the aggregate error is a transparent wrapper.
#[test]
fn given_module_error_when_wrapped_then_message_unchanged() {
    let inner = ConnectionError::MissingCredential {
        message: String::from("No session token available"),
        location: ErrorLocation::from(Location::caller()),
    };
    let expected = inner.to_string();

    let wrapped = CoreError::from(inner);

    assert_eq!(wrapped.to_string(), expected);
}
