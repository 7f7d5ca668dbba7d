use chat_core::auth::SharedSessionProvider;
use chat_core::channel::{ChannelState, ChannelStatus, ConnectionManager, WsConnector};
use chat_core::config::{ChannelConfig, ReconnectPolicy};
use chat_core::dispatch::Dispatcher;
use chat_core::message_log::MessageLog;

use models::SessionCredential;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{WebSocketStream, accept_hdr_async};

pub const WAIT: Duration = Duration::from_secs(10);

/// A server-side connection accepted by [`TestServer`].
pub struct ServerConnection {
    /// Request path and query, e.g. `/api/ws/t1?session=s1`.
    pub target: String,
    pub ws: WebSocketStream<TcpStream>,
}

impl ServerConnection {
    pub async fn send_json(&mut self, value: serde_json::Value) {
        self.ws
            .send(Message::Text(value.to_string().into()))
            .await
            .expect("server send");
    }

    /// Next text frame from the client, parsed as JSON.
    pub async fn next_json(&mut self) -> serde_json::Value {
        loop {
            let message = tokio::time::timeout(WAIT, self.ws.next())
                .await
                .expect("timed out waiting for client frame")
                .expect("client closed")
                .expect("websocket error");
            if let Message::Text(text) = message {
                return serde_json::from_str(text.as_str()).expect("client frame is JSON");
            }
        }
    }

    pub async fn close_with(&mut self, code: u16, reason: &str) {
        let frame = CloseFrame {
            code: CloseCode::from(code),
            reason: reason.to_string().into(),
        };
        let _ = self.ws.close(Some(frame)).await;
    }

    /// Wait until the client closes its side.
    pub async fn expect_closed(&mut self) {
        loop {
            match tokio::time::timeout(WAIT, self.ws.next())
                .await
                .expect("timed out waiting for client close")
            {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => return,
                Some(Ok(_)) => {}
            }
        }
    }
}

/// Local WebSocket server that hands each accepted connection to the test.
///
/// The first handshakes are answered with the statuses in `reject`, in order.
pub struct TestServer {
    pub origin: String,
    connections: mpsc::UnboundedReceiver<ServerConnection>,
}

impl TestServer {
    pub async fn start(reject: Vec<u16>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let origin = format!("http://{}", listener.local_addr().expect("addr"));
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            let mut rejections = reject.into_iter();
            while let Ok((stream, _)) = listener.accept().await {
                let status = rejections.next();
                let target = Arc::new(Mutex::new(String::new()));
                let seen = Arc::clone(&target);

                let callback = move |request: &Request, response: Response| {
                    *seen.lock().unwrap() = request
                        .uri()
                        .path_and_query()
                        .map(|pq| pq.to_string())
                        .unwrap_or_default();
                    match status {
                        Some(code) => {
                            let rejection: ErrorResponse = http::Response::builder()
                                .status(code)
                                .body(None)
                                .unwrap();
                            Err(rejection)
                        }
                        None => Ok(response),
                    }
                };

                if let Ok(ws) = accept_hdr_async(stream, callback).await {
                    let target = target.lock().unwrap().clone();
                    let _ = tx.send(ServerConnection { target, ws });
                }
            }
        });

        Self {
            origin,
            connections: rx,
        }
    }

    pub async fn accept(&mut self) -> ServerConnection {
        tokio::time::timeout(WAIT, self.connections.recv())
            .await
            .expect("timed out waiting for a client")
            .expect("server task ended")
    }
}

pub struct Client {
    pub manager: ConnectionManager,
    pub log: MessageLog,
    pub provider: Arc<SharedSessionProvider>,
}

/// A manager dialing `origin` with a short backoff.
pub fn client(origin: &str, credential: SessionCredential) -> Client {
    let config = ChannelConfig {
        page_origin: origin.to_string(),
        ..ChannelConfig::default()
    };
    let log = MessageLog::new();
    let provider = Arc::new(SharedSessionProvider::new(credential));
    let manager = ConnectionManager::spawn(
        config,
        ReconnectPolicy::new(Duration::from_millis(20), 3),
        WsConnector,
        Arc::clone(&provider),
        Dispatcher::new(log.clone()),
    );
    Client {
        manager,
        log,
        provider,
    }
}

pub async fn wait_for_state(manager: &ConnectionManager, state: ChannelState) -> ChannelStatus {
    let mut status = manager.watch_status();
    let reached = tokio::time::timeout(WAIT, status.wait_for(|s| s.state == state))
        .await
        .expect("timed out waiting for state")
        .expect("connection actor stopped");
    *reached
}

pub async fn wait_for_entries(log: &MessageLog, count: usize) {
    let deadline = tokio::time::Instant::now() + WAIT;
    while log.len() < count {
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for {count} entries"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
