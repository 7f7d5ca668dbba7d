//! Channel lifecycle: addressing, backoff, transport and the manager actor.

pub mod address;
pub mod manager;
pub mod reconnect;
pub mod transport;

pub use address::{channel_address, redacted_address};
pub use manager::{ChannelState, ChannelStatus, ConnectionManager};
pub use reconnect::ReconnectState;
pub use transport::{Connector, FrameChannel, TransportEvent, WsConnector};
