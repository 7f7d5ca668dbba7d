use tutor_chat::app::TutorChat;
use tutor_chat::error::TutorChatError;
use tutor_chat::repl::ReplCommand;

use chat_core::config::ChatCoreConfig;

use models::{EntryOrigin, SessionCredential};

use std::path::Path;

use hound::{SampleFormat, WavSpec, WavWriter};
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn write_wav(path: &Path) {
    let spec = WavSpec {
        channels: 2,
        sample_rate: 22_050,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec).unwrap();
    for i in 0..22_050i32 {
        let sample = ((i % 64) * 256) as i16;
        writer.write_sample(sample).unwrap();
        writer.write_sample(sample).unwrap();
    }
    writer.finalize().unwrap();
}

fn config_for(server: &MockServer) -> ChatCoreConfig {
    let mut config = ChatCoreConfig::default();
    config.channel.page_origin = server.uri();
    config
}

/// **VALUE**: Verifies `/audio` uploads the file and records the exchange in order.
///
/// **WHY THIS MATTERS**: This is the full voice path of the console: device,
/// capture pipeline, multipart upload and the local log entries built from the
/// server's answer.
///
/// **BUG THIS CATCHES**: Would catch the user entry missing the server's audio
/// reference, the reply being dropped, or the token not reaching the server.
#[tokio::test]
async fn given_wav_file_when_audio_command_then_uploaded_and_logged() {
    // GIVEN: A server accepting the upload
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat/audio"))
        .and(header("authorization", "Bearer t1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": "Nice pronunciation!",
            "audio_url": "/audio/recording.wav"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("take.wav");
    write_wav(&file);

    let chat = TutorChat::new(
        &config_for(&server),
        SessionCredential::from_parts("t1", Some("s1")),
    )
    .unwrap();

    // WHEN: Running the command
    chat.handle(ReplCommand::Audio(file)).await.unwrap();

    // THEN: User entry with the audio ref, then the assistant reply
    let entries = chat.log().snapshot();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].origin(), EntryOrigin::User);
    assert_eq!(entries[0].content(), "[voice message: take.wav]");
    assert_eq!(entries[0].audio_ref(), Some("/audio/recording.wav"));
    assert_eq!(entries[1].origin(), EntryOrigin::Assistant);
    assert_eq!(entries[1].content(), "Nice pronunciation!");

    // AND: The multipart body carried the re-encoded WAV and the settings
    let requests = server.received_requests().await.unwrap();
    let body = &requests[0].body;
    assert!(contains(body, b"filename=\"recording.wav\""));
    assert!(contains(body, b"RIFF"));
    assert!(contains(body, b"\"voice\":\"alloy\""));
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}

/// **VALUE**: Verifies a rejected upload leaves the log untouched.
///
/// **BUG THIS CATCHES**: Would catch a voice message appearing as sent when the
/// server refused it.
#[tokio::test]
async fn given_server_rejects_upload_when_audio_command_then_error_and_no_entries() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat/audio"))
        .respond_with(ResponseTemplate::new(400).set_body_string("Unsupported audio format"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("take.wav");
    write_wav(&file);

    let chat = TutorChat::new(
        &config_for(&server),
        SessionCredential::from_parts("t1", None),
    )
    .unwrap();

    let err = chat.send_audio(&file).await.unwrap_err();

    assert!(matches!(err, TutorChatError::Core { .. }));
    assert!(err.to_string().contains("Unsupported audio format"));
    assert!(chat.log().is_empty());
}

/// **VALUE**: Verifies nothing is uploaded without a token.
#[tokio::test]
async fn given_blank_token_when_audio_sent_then_not_uploaded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("take.wav");
    write_wav(&file);

    let chat = TutorChat::new(
        &config_for(&server),
        SessionCredential::from_parts("", None),
    )
    .unwrap();

    let err = chat.send_audio(&file).await.unwrap_err();

    assert!(err.to_string().contains("Not logged in"));
}

/// **VALUE**: Verifies a missing file never reaches the network.
#[tokio::test]
async fn given_missing_file_when_audio_sent_then_device_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let chat = TutorChat::new(
        &config_for(&server),
        SessionCredential::from_parts("t1", None),
    )
    .unwrap();

    let err = chat
        .send_audio(Path::new("/definitely/not/here.wav"))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("Device Unavailable Error"));
}
