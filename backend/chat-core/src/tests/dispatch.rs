use crate::dispatch::{Dispatched, Dispatcher};
use crate::error::dispatch::DecodeError;
use crate::message_log::MessageLog;

use models::EntryOrigin;

use std::sync::{Arc, Mutex};

fn dispatcher() -> (Dispatcher, MessageLog) {
    let log = MessageLog::new();
    (Dispatcher::new(log.clone()), log)
}

/// **VALUE**: Verifies how `message` frames pick their origin from `user_id`.
///
/// **WHY THIS MATTERS**: The server uses `user_id` to mark student messages; tutor
/// replies carry no id or a zero id. Getting this wrong flips sides in the chat.
///
/// **BUG THIS CATCHES**: Would catch treating `user_id: 0` as a user message.
#[test]
fn given_message_frames_when_dispatched_then_origin_follows_user_id() {
    // GIVEN: Frames with a user id, a zero id and no id
    let (dispatcher, log) = dispatcher();
    let frames = [
        r#"{"type":"message","content":"from user","user_id":7,"timestamp":"T1","session_id":"s1"}"#,
        r#"{"type":"message","content":"zero","user_id":0,"timestamp":"T2"}"#,
        r#"{"type":"message","content":"from tutor","timestamp":"T3"}"#,
    ];

    // WHEN: Dispatching them
    for frame in frames {
        dispatcher.dispatch(frame).unwrap();
    }

    // THEN: User, Assistant, Assistant, with wire fields kept
    let entries = log.snapshot();
    let origins: Vec<EntryOrigin> = entries.iter().map(|e| e.origin()).collect();
    assert_eq!(
        origins,
        vec![EntryOrigin::User, EntryOrigin::Assistant, EntryOrigin::Assistant]
    );
    assert_eq!(entries[0].user_id(), Some(7));
    assert_eq!(entries[0].session_id(), Some("s1"));
    assert_eq!(entries[0].timestamp(), "T1");
}

/// **VALUE**: Verifies that `system` frames become system entries.
#[test]
fn given_system_frame_when_dispatched_then_system_entry() {
    let (dispatcher, log) = dispatcher();

    let result = dispatcher
        .dispatch(r#"{"type":"system","content":"Tutor joined","timestamp":"T"}"#)
        .unwrap();

    let Dispatched::Entry(entry) = result else {
        panic!("expected an entry, got {result:?}");
    };
    assert_eq!(entry.origin(), EntryOrigin::System);
    assert_eq!(log.snapshot(), vec![entry]);
}

/// **VALUE**: Verifies heartbeat acks are consumed without touching the log.
///
/// **BUG THIS CATCHES**: Would catch the server's `{"type":"heartbeat","status":"alive"}`
/// echo being reported as an unknown frame every 30 seconds.
#[test]
fn given_heartbeat_acks_when_dispatched_then_log_untouched() {
    let (dispatcher, log) = dispatcher();

    assert_eq!(
        dispatcher.dispatch(r#"{"type":"heartbeat","status":"alive"}"#).unwrap(),
        Dispatched::HeartbeatAck
    );
    assert_eq!(
        dispatcher.dispatch(r#"{"type":"heartbeat-ack"}"#).unwrap(),
        Dispatched::HeartbeatAck
    );
    assert!(log.is_empty());
}

/// **VALUE**: Verifies each malformed shape maps to the right non-fatal error.
///
/// **BUG THIS CATCHES**: Would catch partially built entries being appended, or an
/// unknown kind reported as a parse failure.
#[test]
fn given_malformed_frames_when_dispatched_then_decode_error_and_nothing_appended() {
    let (dispatcher, log) = dispatcher();

    assert!(matches!(
        dispatcher.dispatch("{not json"),
        Err(DecodeError::Malformed { .. })
    ));
    assert!(matches!(
        dispatcher.dispatch(r#"{"content":"no type"}"#),
        Err(DecodeError::Malformed { .. })
    ));
    assert!(matches!(
        dispatcher.dispatch(r#"{"type":"message","timestamp":"T"}"#),
        Err(DecodeError::Malformed { .. })
    ));
    match dispatcher.dispatch(r#"{"type":"typing"}"#) {
        Err(DecodeError::UnknownKind { kind, .. }) => assert_eq!(kind, "typing"),
        other => panic!("expected UnknownKind, got {other:?}"),
    }

    assert!(log.is_empty());
}

/// **VALUE**: Verifies a frame with empty content is still appended.
///
/// **WHY THIS MATTERS**: The server relays whatever `content` a client sent, empty
/// strings included. The frame is well formed, so dropping it would open a gap in
/// the conversation that other clients do not have.
///
/// **BUG THIS CATCHES**: Would catch client-side authoring rules (no blank text)
/// being applied to server-delivered frames.
#[test]
fn given_empty_content_frame_when_dispatched_then_one_entry() {
    // GIVEN: An empty log
    let (dispatcher, log) = dispatcher();

    // WHEN: Dispatching message and system frames with empty content
    let dispatched = dispatcher
        .dispatch(r#"{"type":"message","content":"","user_id":7,"timestamp":"T"}"#)
        .unwrap();
    dispatcher
        .dispatch(r#"{"type":"system","content":"  ","timestamp":"T2"}"#)
        .unwrap();

    // THEN: Both are logged, in order, with their content untouched
    assert!(matches!(dispatched, Dispatched::Entry(_)));
    let entries = log.snapshot();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].content(), "");
    assert_eq!(entries[0].origin(), EntryOrigin::User);
    assert_eq!(entries[1].content(), "  ");
    assert_eq!(entries[1].origin(), EntryOrigin::System);
}

/// **VALUE**: Verifies entries with audio reach playback observers, in either spelling.
///
/// **BUG THIS CATCHES**: Would catch the camelCase `audioUrl` alias being dropped, or
/// playback firing for text-only entries.
#[test]
fn given_frames_with_audio_when_dispatched_then_playback_notified() {
    // GIVEN: A playback observer
    let (dispatcher, log) = dispatcher();
    let played = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&played);
    dispatcher.on_playback(move |entry| {
        sink.lock()
            .unwrap()
            .push(entry.audio_ref().unwrap_or_default().to_string());
    });

    // WHEN: Dispatching audio and text-only frames
    dispatcher
        .dispatch(r#"{"type":"message","content":"","audio_url":"/a/1.mp3","timestamp":"T"}"#)
        .unwrap();
    dispatcher
        .dispatch(r#"{"type":"message","content":"text","timestamp":"T"}"#)
        .unwrap();
    dispatcher
        .dispatch(r#"{"type":"message","content":"spoken","audioUrl":"/a/2.mp3","timestamp":"T"}"#)
        .unwrap();

    // THEN: Only the audio entries were played, all three logged
    assert_eq!(*played.lock().unwrap(), vec!["/a/1.mp3", "/a/2.mp3"]);
    assert_eq!(log.len(), 3);
}

/// **VALUE**: Verifies locally authored entries go through the same log.
#[test]
fn given_local_text_when_recorded_then_appended_with_rfc3339_timestamp() {
    let (dispatcher, log) = dispatcher();

    let entry = dispatcher
        .record_local("hello", EntryOrigin::User, None)
        .unwrap();

    assert_eq!(log.snapshot(), vec![entry.clone()]);
    assert!(humantime::parse_rfc3339(entry.timestamp()).is_ok());
    assert!(matches!(
        dispatcher.record_local(" ", EntryOrigin::User, None),
        Err(DecodeError::InvalidEntry { .. })
    ));
    assert!(matches!(
        dispatcher.record_local("", EntryOrigin::User, Some(String::from(" "))),
        Err(DecodeError::InvalidEntry { .. })
    ));
    dispatcher
        .record_local("", EntryOrigin::User, Some(String::from("/audio/r.wav")))
        .unwrap();
    assert_eq!(log.len(), 2);
}

/// **VALUE**: Verifies a log subscriber can record a local entry while a server frame
/// is being dispatched.
///
/// **BUG THIS CATCHES**: Would catch the dispatcher's append path blocking on itself
/// when a subscriber calls `record_local`, which would hang the connection actor.
#[test]
fn given_subscriber_recording_locally_when_frame_dispatched_then_both_entries_logged() {
    // GIVEN: A subscriber that acknowledges every user entry
    let (dispatcher, log) = dispatcher();
    let responder = dispatcher.clone();
    log.subscribe(move |entry| {
        if entry.origin() == EntryOrigin::User {
            responder
                .record_local("auto-ack", EntryOrigin::System, None)
                .unwrap();
        }
    });

    // WHEN: Dispatching one user message on another thread
    let (done_tx, done_rx) = std::sync::mpsc::channel();
    let worker = dispatcher.clone();
    std::thread::spawn(move || {
        let frame = r#"{"type":"message","content":"hi","user_id":7,"timestamp":"T"}"#;
        let _ = done_tx.send(worker.dispatch(frame).is_ok());
    });

    // THEN: Dispatch completes and the acknowledgement follows the message
    let dispatched = done_rx
        .recv_timeout(std::time::Duration::from_secs(5))
        .expect("dispatch deadlocked");
    assert!(dispatched);
    let entries = log.snapshot();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].content(), "hi");
    assert_eq!(entries[1].content(), "auto-ack");
    assert_eq!(entries[1].origin(), EntryOrigin::System);
}
