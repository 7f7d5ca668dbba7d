use crate::error::TutorChatError;

use chat_core::error::{ConnectionError, CoreError, UploadError};

use common::{ErrorLocation, HttpStatusCode};

use std::panic::Location;

/// **VALUE**: Verifies core errors keep their message when flattened for the console.
///
/// **BUG THIS CATCHES**: Would catch a conversion that drops the cause, leaving the
/// user with "Core Error" and nothing else.
#[test]
fn given_connection_error_when_converted_then_core_variant_keeps_message() {
    // GIVEN: A channel-not-open error
    let source = ConnectionError::ChannelNotOpen {
        state: String::from("reconnecting"),
        location: ErrorLocation::from(Location::caller()),
    };

    // WHEN: Converting to the app error
    let err = TutorChatError::from(source);

    // THEN: Core variant, message preserved
    assert!(matches!(err, TutorChatError::Core { .. }));
    assert!(err.to_string().starts_with("Core Error: "));
    assert!(err.to_string().contains("channel is reconnecting"));
}

/// **VALUE**: Verifies the conversion location points at the call site.
///
/// **WHY THIS MATTERS**: `#[track_caller]` must reach through the nested
/// `CoreError` conversion, or every error reports `error.rs` as its origin.
#[test]
fn given_upload_error_when_converted_then_location_is_caller() {
    let source = UploadError::Server {
        status: HttpStatusCode(500),
        message: String::from("boom"),
        location: ErrorLocation::from(Location::caller()),
    };

    let err = TutorChatError::from(source);

    let TutorChatError::Core { location, .. } = err else {
        panic!("expected Core variant");
    };
    assert!(location.to_string().contains("tests/error.rs"));
}

#[test]
fn given_core_error_when_displayed_then_prefixed() {
    let source = CoreError::from(ConnectionError::Timeout {
        message: String::from("no answer"),
        location: ErrorLocation::from(Location::caller()),
    });

    let err = TutorChatError::from(source);

    assert!(err.to_string().contains("Handshake Timeout Error: no answer"));
}

#[test]
fn given_io_error_when_converted_then_app_variant() {
    let err = TutorChatError::from(std::io::Error::other("disk gone"));

    assert!(matches!(err, TutorChatError::TutorChat { .. }));
    assert!(err.to_string().contains("disk gone"));
}
