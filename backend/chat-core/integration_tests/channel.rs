use crate::helpers::{TestServer, client, wait_for_entries, wait_for_state};

use chat_core::channel::transport::Connector;
use chat_core::channel::{ChannelState, WsConnector};
use chat_core::error::ConnectionError;

use models::{EntryOrigin, SessionCredential};

use serde_json::json;
use url::Url;

/// **VALUE**: Exercises the real WebSocket stack end to end: address, handshake,
/// inbound dispatch and outbound text frames.
///
/// **WHY THIS MATTERS**: The unit tests run against an in-memory transport; this is the
/// only place the tungstenite framing is checked against the wire format.
///
/// **BUG THIS CATCHES**: Would catch a wrong request path, frames sent as binary, or
/// the session id missing from outbound text.
#[tokio::test]
async fn given_local_server_when_connected_then_frames_flow_both_ways() {
    // GIVEN: A running server and a client for {t1, s1}
    let mut server = TestServer::start(vec![]).await;
    let c = client(&server.origin, SessionCredential::from_parts("t1", Some("s1")));

    // WHEN: Connecting
    c.manager.connect().await.expect("connect");
    let mut conn = server.accept().await;

    // THEN: The server saw the token path and session query
    assert_eq!(conn.target, "/api/ws/t1?session=s1");
    assert_eq!(c.manager.state(), ChannelState::Open);

    // WHEN: The server sends a message and a heartbeat echo, the client sends text
    conn.send_json(json!({
        "type": "message",
        "content": "hi",
        "user_id": 7,
        "timestamp": "2024-01-01T00:00:00Z"
    }))
    .await;
    conn.send_json(json!({ "type": "heartbeat", "status": "alive" })).await;
    c.manager.send_text("hello tutor").unwrap();

    // THEN: One user entry in the log, one text frame at the server
    wait_for_entries(&c.log, 1).await;
    let entries = c.log.snapshot();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].origin(), EntryOrigin::User);
    assert_eq!(entries[0].content(), "hi");

    assert_eq!(
        conn.next_json().await,
        json!({ "type": "text", "content": "hello tutor", "session_id": "s1" })
    );
}

/// **VALUE**: Verifies a server-side drop is followed by a reconnect on the real stack.
///
/// **BUG THIS CATCHES**: Would catch a close frame from the server being treated as
/// an intentional disconnect.
#[tokio::test]
async fn given_open_channel_when_server_closes_then_client_reconnects() {
    // GIVEN: An open channel
    let mut server = TestServer::start(vec![]).await;
    let c = client(&server.origin, SessionCredential::from_parts("t1", Some("s1")));
    c.manager.connect().await.unwrap();
    let mut first = server.accept().await;

    // WHEN: The credential changes and the server closes the socket
    c.provider
        .replace(SessionCredential::from_parts("t2", Some("s1")));
    first.close_with(1001, "going away").await;

    // THEN: The client dials again with the current credential and is open
    let second = server.accept().await;
    assert_eq!(second.target, "/api/ws/t2?session=s1");
    let status = wait_for_state(&c.manager, ChannelState::Open).await;
    assert_eq!(status.reconnect.attempt, 0);
}

/// **VALUE**: Verifies a 4001 close leads to a refresh and a new handshake.
///
/// **BUG THIS CATCHES**: Would catch the custom close code being lost in the transport
/// (e.g. reported as a plain stream end).
#[tokio::test]
async fn given_session_rejected_close_when_provider_has_token_then_reconnects() {
    let mut server = TestServer::start(vec![]).await;
    let c = client(&server.origin, SessionCredential::from_parts("t1", Some("s1")));
    c.manager.connect().await.unwrap();
    let mut first = server.accept().await;

    first.close_with(4001, "Invalid session").await;

    let second = server.accept().await;
    assert_eq!(second.target, "/api/ws/t1?session=s1");
    wait_for_state(&c.manager, ChannelState::Open).await;
}

/// **VALUE**: Verifies an HTTP 401 on the upgrade becomes `Rejected` with the status.
///
/// **WHY THIS MATTERS**: The manager decides to refresh the token based on this status.
#[tokio::test]
async fn given_server_rejecting_upgrade_when_connector_dials_then_rejected_401() {
    let server = TestServer::start(vec![401]).await;
    let address = Url::parse(&format!("{}/api/ws/bad", server.origin.replace("http", "ws")))
        .unwrap();

    let result = WsConnector.connect(&address).await;

    match result {
        Err(error @ ConnectionError::Rejected { .. }) => {
            assert!(error.is_auth_rejection());
            assert!(error.to_string().contains("401"));
        }
        Err(other) => panic!("expected Rejected, got {other}"),
        Ok(_) => panic!("expected Rejected, got a channel"),
    }
}

/// **VALUE**: Verifies disconnect sends a close frame and does not redial.
#[tokio::test]
async fn given_open_channel_when_disconnecting_then_server_sees_close() {
    let mut server = TestServer::start(vec![]).await;
    let c = client(&server.origin, SessionCredential::from_parts("t1", None));
    c.manager.connect().await.unwrap();
    let mut conn = server.accept().await;
    assert_eq!(conn.target, "/api/ws/t1");

    c.manager.disconnect().await.unwrap();

    conn.expect_closed().await;
    assert_eq!(c.manager.state(), ChannelState::Idle);
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    assert_eq!(c.manager.state(), ChannelState::Idle);
}

/// **VALUE**: Verifies nothing listening means a handshake error, then retries, then exhaustion.
#[tokio::test]
async fn given_no_server_when_connecting_then_error_and_eventually_idle() {
    // GIVEN: A port with nothing listening
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let origin = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);
    let c = client(&origin, SessionCredential::from_parts("t1", None));
    let exhausted = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
    let flag = std::sync::Arc::clone(&exhausted);
    c.manager.on_reconnect_exhausted(move |_| {
        flag.store(true, std::sync::atomic::Ordering::SeqCst);
    });

    // WHEN: Connecting
    let result = c.manager.connect().await;

    // THEN: First failure returned, manager gives up after the short policy
    assert!(result.is_err());
    wait_for_state(&c.manager, ChannelState::Idle).await;
    assert!(exhausted.load(std::sync::atomic::Ordering::SeqCst));
}
