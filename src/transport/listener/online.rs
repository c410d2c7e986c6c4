use std::net::SocketAddr;
use std::time::Instant;

use crate::protocol::dispatch::DispatchError;
use crate::protocol::packet::TransportPacket;
use crate::session::DisconnectReason;
use crate::transport::{Command, Handler};

use super::ListenerState;

impl<H: Handler> ListenerState<H> {
    /// Routes a packet to the peer's session.
    pub(super) fn handle_online(
        &mut self,
        packet: TransportPacket,
        peer: SocketAddr,
        now: Instant,
    ) -> Result<(), DispatchError> {
        let Some(session) = self.sessions.session_mut(&peer) else {
            return Ok(());
        };
        let result = session.handle_packet(packet, now, &mut self.handler);
        self.collect_outbox(peer);
        result
    }

    /// Periodic work: session maintenance, removal of closed sessions, then
    /// the handler's own update.
    pub fn tick(&mut self, now: Instant) {
        for (&peer, session) in self.sessions.iter_mut() {
            session.update(now, &mut self.handler);
            self.outgoing
                .extend(session.drain_outbox().map(|bytes| (peer, bytes)));
        }

        for peer in self.sessions.remove_disconnected() {
            tracing::debug!(peer = %peer, "remove_session");
        }

        self.handler.update(&mut self.sessions);
        for (&peer, session) in self.sessions.iter_mut() {
            self.outgoing
                .extend(session.drain_outbox().map(|bytes| (peer, bytes)));
        }
    }

    /// Applies a command from a [`crate::transport::ServerHandle`]. Returns
    /// `false` once the server should stop.
    pub fn handle_command(&mut self, command: Command, now: Instant) -> bool {
        match command {
            Command::Send { peer, message } => {
                match self.sessions.session_mut(&peer) {
                    Some(session) if session.is_connected() => {
                        session.send_buffer(
                            message.buffer,
                            message.reliability,
                            message.channel,
                            message.immediate,
                        );
                        self.collect_outbox(peer);
                    }
                    _ => tracing::debug!(peer = %peer, "dropping message for unconnected peer"),
                }
                true
            }
            Command::Disconnect { peer } => {
                match self.sessions.session_mut(&peer) {
                    Some(session) => {
                        session.update(now, &mut self.handler);
                        session.disconnect(DisconnectReason::Kicked, &mut self.handler);
                        self.collect_outbox(peer);
                    }
                    None => tracing::debug!(peer = %peer, "disconnect for unknown peer"),
                }
                true
            }
            Command::Terminate => false,
        }
    }

    /// Closes every session, sending each peer a disconnect notification.
    pub fn shutdown(&mut self, now: Instant) {
        for (&peer, session) in self.sessions.iter_mut() {
            session.update(now, &mut self.handler);
            session.disconnect(DisconnectReason::ServerShutdown, &mut self.handler);
            self.outgoing
                .extend(session.drain_outbox().map(|bytes| (peer, bytes)));
        }
        let removed = self.sessions.remove_disconnected();
        tracing::debug!(count = removed.len(), "closed all sessions");
    }
}
