// relay-api: Async client for the relay backend (REST configuration + live status channel)

pub mod channel;
pub mod client;
pub mod error;
pub mod models;
pub mod transport;

pub use channel::{Connector, Frame, FrameStream, WsConnector};
pub use client::RelayClient;
pub use error::Error;
pub use transport::{TlsMode, TransportConfig};
