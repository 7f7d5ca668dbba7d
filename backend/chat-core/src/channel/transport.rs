//! Transport seam between the manager and the socket.
//!
//! The manager only sees text frames and a close/error signal; ping/pong and
//! binary framing stay inside the transport. Tests substitute an in-memory
//! [`Connector`].

use crate::error::connection::ConnectionError;

use common::ErrorLocation;

use std::future::Future;
use std::panic::Location;

use futures_util::{SinkExt, StreamExt};
use log::{debug, warn};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use url::Url;

/// What the transport observed since the last poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Frame(String),
    /// The peer closed the stream. `code` is the close frame's code, if any.
    Closed { code: Option<u16>, reason: String },
    Error(String),
}

pub trait FrameChannel: Send + 'static {
    fn send_text(&mut self, text: String) -> impl Future<Output = Result<(), ConnectionError>> + Send;

    /// Wait for the next inbound event. Must be cancel-safe.
    fn next_event(&mut self) -> impl Future<Output = TransportEvent> + Send;

    fn close(&mut self) -> impl Future<Output = ()> + Send;
}

pub trait Connector: Send + Sync + 'static {
    type Channel: FrameChannel;

    /// Open a channel to `address`, completing the handshake.
    fn connect(
        &self,
        address: &Url,
    ) -> impl Future<Output = Result<Self::Channel, ConnectionError>> + Send;
}

/// Production connector backed by `tokio-tungstenite`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

pub struct WsChannel {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl Connector for WsConnector {
    type Channel = WsChannel;

    async fn connect(&self, address: &Url) -> Result<WsChannel, ConnectionError> {
        let (stream, response) = connect_async(address.as_str()).await?;
        debug!("Handshake completed with HTTP {}", response.status());
        Ok(WsChannel { stream })
    }
}

impl FrameChannel for WsChannel {
    async fn send_text(&mut self, text: String) -> Result<(), ConnectionError> {
        self.stream
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| ConnectionError::Transport {
                message: format!("Failed to send frame: {e}"),
                location: ErrorLocation::from(Location::caller()),
            })
    }

    async fn next_event(&mut self) -> TransportEvent {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return TransportEvent::Frame(text.to_string()),
                Some(Ok(Message::Binary(data))) => match String::from_utf8(data.to_vec()) {
                    Ok(text) => return TransportEvent::Frame(text),
                    Err(_) => warn!("Ignoring non-UTF-8 binary frame ({} bytes)", data.len()),
                },
                Some(Ok(Message::Close(frame))) => {
                    let (code, reason) = frame
                        .map(|f| (Some(u16::from(f.code)), f.reason.to_string()))
                        .unwrap_or((None, String::new()));
                    return TransportEvent::Closed { code, reason };
                }
                // Pongs are queued by tungstenite and flushed on the next read/write.
                Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => {}
                Some(Err(e)) => return TransportEvent::Error(e.to_string()),
                None => {
                    return TransportEvent::Closed {
                        code: None,
                        reason: String::from("stream ended"),
                    };
                }
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            debug!("Close handshake did not complete: {e}");
        }
    }
}
