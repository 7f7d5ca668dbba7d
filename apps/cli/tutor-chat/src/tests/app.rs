use crate::app::{Flow, TutorChat, credential_from_vars, format_entry};
use crate::error::TutorChatError;
use crate::repl::{HELP_TEXT, ReplCommand};

use chat_core::channel::ChannelState;
use chat_core::config::ChatCoreConfig;

use models::{ChatEntry, EntryOrigin, SessionCredential};

fn session() -> TutorChat {
    TutorChat::new(
        &ChatCoreConfig::default(),
        SessionCredential::from_parts("t1", Some("s1")),
    )
    .unwrap()
}

/// **VALUE**: Verifies the credential is built from the environment values, trimmed.
#[test]
fn given_token_and_session_when_credential_built_then_both_kept() {
    let credential =
        credential_from_vars(Some(String::from(" t1 ")), Some(String::from("s1"))).unwrap();

    assert_eq!(credential.token.as_str(), "t1");
    assert_eq!(credential.session_id.as_deref(), Some("s1"));
}

/// **VALUE**: Verifies a blank session id means "no session" rather than `?session=`.
#[test]
fn given_blank_session_when_credential_built_then_no_session() {
    let credential =
        credential_from_vars(Some(String::from("t1")), Some(String::from("  "))).unwrap();

    assert_eq!(credential.session_id, None);
}

/// **VALUE**: Verifies startup fails clearly without a token.
///
/// **BUG THIS CATCHES**: Would catch the client connecting with an empty token
/// and looping through rejected handshakes.
#[test]
fn given_missing_token_when_credential_built_then_error_names_variable() {
    let err = credential_from_vars(None, Some(String::from("s1"))).unwrap_err();

    assert!(matches!(err, TutorChatError::TutorChat { .. }));
    assert!(err.to_string().contains("TUTOR_CHAT_TOKEN"));

    assert!(credential_from_vars(Some(String::from("   ")), None).is_err());
}

#[test]
fn given_entry_with_audio_when_formatted_then_audio_shown() {
    let entry = ChatEntry::builder()
        .with_content("hi")
        .with_origin(EntryOrigin::User)
        .with_timestamp("T")
        .with_audio_ref(Some(String::from("/audio/recording.wav")))
        .build()
        .unwrap();

    assert_eq!(
        format_entry(&entry),
        "[T] user: hi (audio: /audio/recording.wav)"
    );
}

/// **VALUE**: Verifies typing while offline reports the channel state instead of
/// silently dropping the message.
#[tokio::test]
async fn given_idle_channel_when_text_sent_then_core_error() {
    let chat = session();

    let result = chat.handle(ReplCommand::Say(String::from("hello"))).await;

    let err = result.unwrap_err();
    assert!(matches!(err, TutorChatError::Core { .. }));
    assert!(err.to_string().contains("idle"));
    assert!(chat.log().is_empty());
}

#[tokio::test]
async fn given_session_when_status_and_help_then_printed() {
    let chat = session();

    let status = chat.handle(ReplCommand::Status).await.unwrap();
    let help = chat.handle(ReplCommand::Help).await.unwrap();

    let Flow::Print(line) = status else {
        panic!("status should print");
    };
    assert!(line.starts_with("channel idle"));
    assert!(line.contains("0 messages"));
    assert_eq!(help, Flow::Print(HELP_TEXT.to_string()));
}

/// **VALUE**: Verifies `/quit` stops the channel actor and can be repeated.
#[tokio::test]
async fn given_session_when_quit_then_actor_stopped_and_flow_quits() {
    let chat = session();

    assert_eq!(chat.handle(ReplCommand::Quit).await.unwrap(), Flow::Quit);
    assert_eq!(chat.handle(ReplCommand::Quit).await.unwrap(), Flow::Quit);
    assert_eq!(chat.manager().state(), ChannelState::Idle);
}
