mod offline;
mod online;

use std::collections::VecDeque;
use std::io;
use std::net::SocketAddr;
use std::time::Instant;

use bytes::Bytes;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use crate::config::ServerConfig;
use crate::error::RaknetError;
use crate::protocol::cursor::hex;
use crate::protocol::packet::TransportPacket;
use crate::session::{Session, SessionTable};

use super::{Command, Handler, ServerHandle};

/// Everything the server loop owns apart from the socket.
///
/// Feeding it datagrams, ticks and commands and sending what
/// [`ListenerState::drain_outgoing`] yields is all a driver has to do;
/// [`RaknetServer`] does exactly that over a Tokio socket.
#[derive(Debug)]
pub struct ListenerState<H> {
    config: ServerConfig,
    handler: H,
    sessions: SessionTable,
    next_session_id: u64,
    outgoing: VecDeque<(SocketAddr, Bytes)>,
}

impl<H: Handler> ListenerState<H> {
    pub fn new(config: ServerConfig, handler: H) -> Self {
        Self {
            config,
            handler,
            sessions: SessionTable::new(),
            next_session_id: 0,
            outgoing: VecDeque::new(),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    pub fn into_handler(self) -> H {
        self.handler
    }

    pub fn sessions(&self) -> &SessionTable {
        &self.sessions
    }

    pub fn session(&self, peer: &SocketAddr) -> Option<&Session> {
        self.sessions.session(peer)
    }

    /// Handles one datagram from `peer`.
    ///
    /// Decode errors and packets nobody handles are returned for the caller
    /// to log; whatever the datagram caused to be sent is queued either way.
    pub fn handle_datagram(
        &mut self,
        bytes: &[u8],
        peer: SocketAddr,
        now: Instant,
    ) -> Result<(), RaknetError> {
        let packet = TransportPacket::decode(bytes)?;
        tracing::trace!(
            peer = %peer,
            id = format_args!("0x{:02x}", packet.id()),
            len = bytes.len(),
            "N>"
        );

        let SocketAddr::V4(peer_v4) = peer else {
            tracing::debug!(peer = %peer, "ignoring datagram from non-IPv4 peer");
            return Ok(());
        };

        let result = if self.sessions.contains(&peer) {
            self.handle_online(packet, peer, now)
        } else {
            self.handle_offline(packet, peer_v4, now)
        };
        result.map_err(RaknetError::from)
    }

    /// Takes every datagram queued for sending.
    pub fn drain_outgoing(&mut self) -> impl Iterator<Item = (SocketAddr, Bytes)> + '_ {
        self.outgoing.drain(..)
    }

    fn collect_outbox(&mut self, peer: SocketAddr) {
        if let Some(session) = self.sessions.session_mut(&peer) {
            self.outgoing
                .extend(session.drain_outbox().map(|bytes| (peer, bytes)));
        }
    }
}

/// A RakNet server bound to a UDP socket.
pub struct RaknetServer<H> {
    socket: UdpSocket,
    local_addr: SocketAddr,
    state: ListenerState<H>,
    commands: mpsc::Receiver<Command>,
}

impl<H: Handler> RaknetServer<H> {
    /// Binds the socket from `config.bind_addr`. The server does nothing
    /// until [`RaknetServer::run`] is awaited.
    pub async fn bind(config: ServerConfig, handler: H) -> io::Result<(Self, ServerHandle)> {
        let socket = UdpSocket::bind(config.bind_addr).await?;
        let local_addr = socket.local_addr()?;
        let (tx, rx) = mpsc::channel(config.command_queue);
        tracing::info!(addr = %local_addr, server_id = config.server_id, "listening");

        let server = Self {
            socket,
            local_addr,
            state: ListenerState::new(config, handler),
            commands: rx,
        };
        Ok((server, ServerHandle::new(local_addr, tx)))
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Runs until [`ServerHandle::terminate`] is called, then closes every
    /// session and hands the handler back.
    pub async fn run(mut self) -> H {
        let mut buf = vec![0u8; self.state.config.recv_buffer_size];
        let mut tick = tokio::time::interval(self.state.config.tick_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        self.state.handler.start();

        loop {
            tokio::select! {
                res = self.socket.recv_from(&mut buf) => {
                    match res {
                        Ok((len, peer)) => {
                            let bytes = &buf[..len];
                            match self.state.handle_datagram(bytes, peer, Instant::now()) {
                                Ok(()) => {}
                                Err(RaknetError::Decode(e)) => {
                                    tracing::debug!(
                                        peer = %peer,
                                        error = %e,
                                        dump = %hex(bytes),
                                        "failed to decode datagram"
                                    );
                                }
                                Err(e) => {
                                    tracing::error!(peer = %peer, error = %e, "failed to handle datagram");
                                }
                            }
                        }
                        Err(e) => {
                            if e.kind() == io::ErrorKind::ConnectionReset {
                                // Windows ICMP port unreachable - ignore
                                continue;
                            }
                            tracing::error!("UDP socket error: {}", e);
                            // Don't break on transient errors
                            continue;
                        }
                    }
                }

                Some(command) = self.commands.recv() => {
                    if !self.state.handle_command(command, Instant::now()) {
                        break;
                    }
                }

                _ = tick.tick() => {
                    self.state.tick(Instant::now());
                }
            }

            self.flush().await;
        }

        self.state.shutdown(Instant::now());
        self.flush().await;
        self.state.handler.terminate();
        tracing::info!(addr = %self.local_addr, "stopped");
        self.state.into_handler()
    }

    async fn flush(&mut self) {
        let outgoing: Vec<_> = self.state.drain_outgoing().collect();
        for (peer, bytes) in outgoing {
            if let Err(e) = self.socket.send_to(&bytes, peer).await {
                tracing::error!(peer = %peer, error = %e, "failed to send datagram");
            }
        }
    }
}
