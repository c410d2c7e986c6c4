//! Tokio-based UDP transport for RakNet sessions.
//!
//! [`RaknetServer`] owns the socket and every session; it multiplexes all
//! peers over one port and drives them from a single task. Applications
//! plug in through [`Handler`] and talk to a running server through the
//! cloneable [`ServerHandle`].
//!
//! All low-level RakNet details (fragmentation, reliability, ordering,
//! ACK/NACK handling) are delegated to the `session` module.

use std::{io, net::SocketAddr};

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::{
    error::RaknetError,
    protocol::{
        packet::{ApplicationPacket, Batch},
        reliability::Reliability,
    },
};

mod handler;
pub mod listener;

pub use handler::Handler;
pub use listener::{ListenerState, RaknetServer};

/// High-level message object for sending data.
/// Wraps an encoded application packet and its delivery options.
#[derive(Debug, Clone)]
pub struct Message {
    pub buffer: Bytes,
    pub reliability: Reliability,
    pub channel: u8,
    /// Send in a datagram of its own instead of waiting for the batch.
    pub immediate: bool,
}

impl Message {
    pub fn new(buffer: impl Into<Bytes>) -> Self {
        Self {
            buffer: buffer.into(),
            reliability: Reliability::ReliableOrdered,
            channel: 0,
            immediate: false,
        }
    }

    pub fn reliability(mut self, reliability: Reliability) -> Self {
        self.reliability = reliability;
        self
    }

    pub fn channel(mut self, channel: u8) -> Self {
        self.channel = channel;
        self
    }

    pub fn immediate(mut self, immediate: bool) -> Self {
        self.immediate = immediate;
        self
    }

    /// Wraps the buffer in a compressed [`Batch`] when it is large enough
    /// to be worth it.
    pub fn compress_if_large(mut self) -> io::Result<Self> {
        self.buffer = Batch::wrap_if_large(self.buffer)?;
        Ok(self)
    }
}

impl From<&ApplicationPacket> for Message {
    fn from(packet: &ApplicationPacket) -> Self {
        Self::new(packet.to_bytes())
    }
}

impl From<ApplicationPacket> for Message {
    fn from(packet: ApplicationPacket) -> Self {
        Self::from(&packet)
    }
}

impl From<Bytes> for Message {
    fn from(buffer: Bytes) -> Self {
        Self::new(buffer)
    }
}

impl From<Vec<u8>> for Message {
    fn from(vec: Vec<u8>) -> Self {
        Self::new(vec)
    }
}

impl From<&'static [u8]> for Message {
    fn from(slice: &'static [u8]) -> Self {
        Self::new(Bytes::from(slice))
    }
}

/// Request from a [`ServerHandle`] to the server loop.
#[derive(Debug)]
pub enum Command {
    Send { peer: SocketAddr, message: Message },
    Disconnect { peer: SocketAddr },
    Terminate,
}

/// Cloneable handle to a running [`RaknetServer`].
#[derive(Debug, Clone)]
pub struct ServerHandle {
    local_addr: SocketAddr,
    commands: mpsc::Sender<Command>,
}

impl ServerHandle {
    pub(crate) fn new(local_addr: SocketAddr, commands: mpsc::Sender<Command>) -> Self {
        Self {
            local_addr,
            commands,
        }
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Queues a message for a connected peer. Messages for unknown or not
    /// yet connected peers are dropped by the server.
    pub async fn send(
        &self,
        peer: SocketAddr,
        message: impl Into<Message>,
    ) -> Result<(), RaknetError> {
        self.command(Command::Send {
            peer,
            message: message.into(),
        })
        .await
    }

    /// Closes the peer's session, notifying the peer.
    pub async fn disconnect(&self, peer: SocketAddr) -> Result<(), RaknetError> {
        self.command(Command::Disconnect { peer }).await
    }

    /// Closes every session and stops the server loop.
    pub async fn terminate(&self) -> Result<(), RaknetError> {
        self.command(Command::Terminate).await
    }

    async fn command(&self, command: Command) -> Result<(), RaknetError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| RaknetError::ServerClosed)
    }
}
