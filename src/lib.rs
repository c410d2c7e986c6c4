//! A RakNet-style reliable UDP transport for Pocket Edition game servers.
//!
//! The crate is split in three layers:
//! - [`protocol`]: wire codecs for both packet families, reliability
//!   metadata and the receive windows.
//! - [`session`]: the per-peer state machine and send/receive pipelines.
//!   Sessions do no I/O and can be driven directly.
//! - [`transport`]: a Tokio UDP server that multiplexes sessions and calls
//!   into an application [`Handler`].

pub mod config;
pub mod error;
pub mod protocol;
pub mod session;
pub mod transport;

pub use config::{DEFAULT_PORT, ServerConfig, SessionConfig};
pub use error::RaknetError;
pub use protocol::packet::{ApplicationPacket, TransportPacket};
pub use protocol::reliability::Reliability;
pub use session::{DisconnectReason, SessionHandle, SessionTable};
pub use transport::{Handler, Message, RaknetServer, ServerHandle};
