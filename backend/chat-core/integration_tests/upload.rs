use chat_core::capture::AudioCapture;
use chat_core::config::UploadConfig;
use chat_core::error::UploadError;
use chat_core::upload::AudioUploader;

use common::RedactedToken;
use models::AudioSettings;

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn capture() -> AudioCapture {
    AudioCapture::new(b"RIFF....WAVEfmt ".to_vec(), "audio/wav", 2, Duration::from_millis(800))
}

/// **VALUE**: Verifies the multipart shape the server parses: bearer auth, an `audio`
/// file part named `recording.wav`, and a JSON `settings` part.
///
/// **WHY THIS MATTERS**: The server rejects uploads whose part names or auth header
/// differ; nothing else in the client would notice until a user tried to talk.
///
/// **BUG THIS CATCHES**: Would catch a renamed form field, a missing file name, or the
/// settings sent as query parameters instead of a part.
#[tokio::test]
async fn given_valid_capture_when_submitted_then_multipart_posted_and_json_returned() {
    // GIVEN: A server accepting the upload
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat/audio"))
        .and(header("authorization", "Bearer t1"))
        .and(body_string_contains("name=\"audio\"; filename=\"recording.wav\""))
        .and(body_string_contains("name=\"settings\""))
        .and(body_string_contains("\"voice\":\"nova\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "transcript": "hello",
            "audio_url": "/media/reply-1.mp3"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let uploader = AudioUploader::new(&server.uri(), &UploadConfig::default()).unwrap();
    let settings = AudioSettings {
        voice: String::from("nova"),
        ..AudioSettings::default()
    };

    // WHEN: Submitting
    let response = uploader
        .submit(&RedactedToken::new("t1"), &capture(), &settings)
        .await
        .unwrap();

    // THEN: The response is forwarded as-is
    assert_eq!(response["transcript"], "hello");
    assert_eq!(response["audio_url"], "/media/reply-1.mp3");
}

/// **VALUE**: Verifies non-2xx responses keep their status code.
///
/// **BUG THIS CATCHES**: Would catch a 401 flattened into a generic HTTP error, which
/// would hide that the user must log in again.
#[tokio::test]
async fn given_server_rejects_when_submitted_then_server_error_with_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat/audio"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Invalid authentication"))
        .mount(&server)
        .await;
    let uploader = AudioUploader::new(&server.uri(), &UploadConfig::default()).unwrap();

    let result = uploader
        .submit(&RedactedToken::new("expired"), &capture(), &AudioSettings::default())
        .await;

    match result {
        Err(UploadError::Server { status, message, .. }) => {
            assert!(status.is_auth_rejection());
            assert_eq!(message, "Invalid authentication");
        }
        other => panic!("expected Server error, got {other:?}"),
    }
}

/// **VALUE**: Verifies a failure status without a body still yields a Server error.
///
/// **BUG THIS CATCHES**: Would catch a missing or unreadable error body being turned
/// into an HTTP or JSON error, which would lose the status code.
#[tokio::test]
async fn given_server_error_without_body_when_submitted_then_server_error_with_empty_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat/audio"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    let uploader = AudioUploader::new(&server.uri(), &UploadConfig::default()).unwrap();

    let result = uploader
        .submit(&RedactedToken::new("t1"), &capture(), &AudioSettings::default())
        .await;

    match result {
        Err(UploadError::Server { status, message, .. }) => {
            assert!(status.is_server_error());
            assert!(message.is_empty());
        }
        other => panic!("expected Server error, got {other:?}"),
    }
}

/// **VALUE**: Verifies invalid settings never leave the client.
#[tokio::test]
async fn given_invalid_settings_when_submitted_then_validation_error_without_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let uploader = AudioUploader::new(&server.uri(), &UploadConfig::default()).unwrap();
    let settings = AudioSettings {
        speed: 9.0,
        ..AudioSettings::default()
    };

    let result = uploader
        .submit(&RedactedToken::new("t1"), &capture(), &settings)
        .await;

    assert!(matches!(result, Err(UploadError::Validation { .. })));
}

/// **VALUE**: Verifies a websocket-style origin maps back to HTTP for uploads.
#[test]
fn given_ws_origin_when_building_uploader_then_http_endpoint() {
    let uploader = AudioUploader::new("wss://tutor.example.com", &UploadConfig::default()).unwrap();

    assert_eq!(
        uploader.endpoint().as_str(),
        "https://tutor.example.com/api/chat/audio"
    );
}
