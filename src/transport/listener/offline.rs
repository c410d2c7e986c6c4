use std::net::{SocketAddr, SocketAddrV4};
use std::time::Instant;

use crate::protocol::dispatch::DispatchError;
use crate::protocol::packet::{TransportPacket, UnconnectedPong};
use crate::session::Session;
use crate::transport::Handler;

use super::ListenerState;

impl<H: Handler> ListenerState<H> {
    /// Packets from peers without a session. Pings are answered without
    /// creating one; `OpenConnectionRequest1` starts a new session.
    pub(super) fn handle_offline(
        &mut self,
        packet: TransportPacket,
        peer: SocketAddrV4,
        now: Instant,
    ) -> Result<(), DispatchError> {
        match packet {
            TransportPacket::UnconnectedPing(ping) => {
                self.reply_pong(peer, ping.ping_id);
                Ok(())
            }
            TransportPacket::UnconnectedPingOpenConnections(ping) => {
                self.reply_pong(peer, ping.ping_id);
                Ok(())
            }
            packet @ TransportPacket::OpenConnectionRequest1(_) => {
                let id = self.next_session_id;
                self.next_session_id += 1;
                let session = Session::new(
                    id,
                    peer,
                    self.config.server_id,
                    self.config.session.clone(),
                    now,
                );
                self.sessions.insert(session);
                self.handle_online(packet, SocketAddr::V4(peer), now)
            }
            packet => {
                tracing::debug!(
                    peer = %peer,
                    id = format_args!("0x{:02x}", packet.id()),
                    "unexpected packet from unknown peer"
                );
                Ok(())
            }
        }
    }

    fn reply_pong(&mut self, peer: SocketAddrV4, ping_id: u64) {
        let pong = UnconnectedPong {
            ping_id,
            server_id: self.config.server_id,
            server_info: self.handler.info(),
        };
        self.outgoing
            .push_back((SocketAddr::V4(peer), TransportPacket::from(pong).to_bytes()));
    }
}
