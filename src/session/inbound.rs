use tracing::{debug, info, trace, warn};

use crate::{
    protocol::{
        constants::{MAXIMUM_MTU_SIZE, RAKNET_PROTOCOL_VERSION},
        cursor::hex,
        datagram::DataPacket,
        dispatch::{ApplicationVisitor, DispatchError, TransportVisitor, dispatch_application},
        packet::{
            Ack, AckNackPayload, ApplicationPacket, ClientConnect, ClientDisconnect,
            ClientHandshake, Nack, OpenConnectionReply1, OpenConnectionReply2,
            OpenConnectionRequest1, OpenConnectionRequest2, Ping, Pong, ServerHandshake,
            UnconnectedPing, UnconnectedPingOpenConnections, UnconnectedPong,
        },
        reliability::Reliability,
        types::Sequence24,
    },
    transport::Handler,
};

use super::{DisconnectReason, Session, SessionHandle, SessionState};

/// One inbound datagram's worth of context: the session it belongs to and
/// the handler that receives what comes out of it.
pub(super) struct Inbound<'a, H: ?Sized> {
    pub(super) session: &'a mut Session,
    pub(super) handler: &'a mut H,
}

impl<H: Handler + ?Sized> Inbound<'_, H> {
    fn process_ready_packets(&mut self) -> Result<(), DispatchError> {
        let mut result = Ok(());
        while let Some(packet) = self.session.encap_packets.get() {
            trace!(peer = %self.session.addr, packet = %packet, "N>>");
            let packet = if packet.split.is_some() {
                match self.session.split_packets.concat(packet, self.session.now) {
                    Ok(Some(packet)) => packet,
                    Ok(None) => continue,
                    Err(e) => {
                        warn!(peer = %self.session.addr, error = %e, "dropping split fragment");
                        continue;
                    }
                }
            } else {
                packet
            };

            let app = match ApplicationPacket::decode(&packet.buffer) {
                Ok(app) => app,
                Err(e) => {
                    debug!(
                        peer = %self.session.addr,
                        error = %e,
                        dump = %hex(&packet.buffer),
                        "failed to decode application packet"
                    );
                    continue;
                }
            };
            trace!(
                peer = %self.session.addr,
                id = format_args!("0x{:02x}", app.id()),
                "N>>>"
            );
            if let Err(e) = dispatch_application(self, app)
                && result.is_ok()
            {
                result = Err(e);
            }
            if self.session.is_disconnected() {
                break;
            }
        }
        result
    }
}

impl<H: Handler + ?Sized> TransportVisitor for Inbound<'_, H> {
    fn unconnected_ping(&mut self, packet: UnconnectedPing) -> Result<(), DispatchError> {
        let pong = UnconnectedPong {
            ping_id: packet.ping_id,
            server_id: self.session.server_id,
            server_info: self.handler.info(),
        };
        self.session.send_transport(&pong.into());
        Ok(())
    }

    fn unconnected_ping_open_connections(
        &mut self,
        packet: UnconnectedPingOpenConnections,
    ) -> Result<(), DispatchError> {
        self.unconnected_ping(UnconnectedPing {
            ping_id: packet.ping_id,
            client_guid: packet.client_guid,
        })
    }

    fn open_connection_request_1(
        &mut self,
        packet: OpenConnectionRequest1,
    ) -> Result<(), DispatchError> {
        if matches!(
            self.session.state,
            SessionState::Handshaking | SessionState::Connected | SessionState::Disconnected
        ) {
            info!(peer = %self.session.addr, state = ?self.session.state, "handshake restarted");
            self.session.restart(self.handler);
        }
        let session = &mut *self.session;
        session.touch();
        if packet.protocol != RAKNET_PROTOCOL_VERSION {
            debug!(peer = %session.addr, protocol = packet.protocol, "unexpected protocol version");
        }
        session.mtu = session.config.max_mtu.min(MAXIMUM_MTU_SIZE);
        session.state = SessionState::MtuNegotiated;
        let reply = OpenConnectionReply1 {
            server_id: session.server_id,
            mtu_size: packet.mtu_size,
        };
        session.send_transport(&reply.into());
        Ok(())
    }

    fn open_connection_request_2(
        &mut self,
        packet: OpenConnectionRequest2,
    ) -> Result<(), DispatchError> {
        let session = &mut *self.session;
        // A repeated request is answered again, in case the reply was lost.
        if !matches!(
            session.state,
            SessionState::MtuNegotiated | SessionState::Handshaking
        ) {
            warn!(peer = %session.addr, state = ?session.state, "OpenConnectionRequest2 in illegal state");
            return Ok(());
        }
        session.touch();
        session.client_id = packet.client_id;
        session.mtu = session.mtu.min(packet.mtu_size);
        session.state = SessionState::Handshaking;
        let reply = OpenConnectionReply2 {
            server_id: session.server_id,
            client_addr: session.addr,
            mtu_size: session.mtu,
        };
        session.send_transport(&reply.into());
        Ok(())
    }

    fn ack(&mut self, packet: Ack) -> Result<(), DispatchError> {
        if self.session.has_handshaken() {
            self.session.touch();
            self.session.handle_ack(&packet.0);
        }
        Ok(())
    }

    fn nack(&mut self, packet: Nack) -> Result<(), DispatchError> {
        if self.session.has_handshaken() {
            self.session.touch();
            self.session.handle_nack(&packet.0);
        }
        Ok(())
    }

    fn data(&mut self, packet: DataPacket) -> Result<(), DispatchError> {
        let session = &mut *self.session;
        if matches!(
            session.state,
            SessionState::Unconnected | SessionState::MtuNegotiated
        ) {
            warn!(peer = %session.addr, state = ?session.state, "DataPacket before OpenConnectionRequest2");
            return Ok(());
        }
        if !session.recv_packets.put(packet.seq_num).is_accepted() {
            debug!(peer = %session.addr, seq = %packet.seq_num, "ignore DataPacket");
            return Ok(());
        }
        session.touch();
        for encapsulated in packet.packets {
            session.encap_packets.put(encapsulated);
        }
        self.process_ready_packets()
    }
}

impl<H: Handler + ?Sized> ApplicationVisitor for Inbound<'_, H> {
    /// Everything without a dedicated handler goes to the application once
    /// the session is connected.
    fn fallback(&mut self, packet: ApplicationPacket) -> Result<(), DispatchError> {
        if self.session.is_connected() {
            self.handler
                .handle(&mut SessionHandle::new(self.session), packet);
        } else {
            debug!(
                peer = %self.session.addr,
                id = format_args!("0x{:02x}", packet.id()),
                "application packet before handshake"
            );
        }
        Ok(())
    }

    fn ping(&mut self, packet: Ping) -> Result<(), DispatchError> {
        let ping_id: u64 = rand::random();
        let pong = Pong {
            recv_ping_id: packet.ping_id,
            send_ping_id: ping_id,
        };
        self.session
            .send_application_packet(&pong.into(), Reliability::Unreliable, 0, false);
        self.session.send_application_packet(
            &Ping { ping_id }.into(),
            Reliability::Unreliable,
            0,
            false,
        );
        Ok(())
    }

    fn pong(&mut self, packet: Pong) -> Result<(), DispatchError> {
        trace!(peer = %self.session.addr, ping_id = packet.send_ping_id, "pong");
        Ok(())
    }

    fn client_connect(&mut self, packet: ClientConnect) -> Result<(), DispatchError> {
        let handshake = ServerHandshake::new(self.session.addr, packet.send_ping);
        self.session.send_application_packet(
            &handshake.into(),
            Reliability::Unreliable,
            0,
            true,
        );
        Ok(())
    }

    fn client_handshake(&mut self, _packet: ClientHandshake) -> Result<(), DispatchError> {
        if self.session.state != SessionState::Handshaking {
            warn!(peer = %self.session.addr, state = ?self.session.state, "ClientHandshake in illegal state");
            return Ok(());
        }
        self.session.state = SessionState::Connected;
        info!(peer = %self.session.addr, id = self.session.id, "connection opened");
        self.handler.open(&mut SessionHandle::new(self.session));
        Ok(())
    }

    fn client_disconnect(&mut self, _packet: ClientDisconnect) -> Result<(), DispatchError> {
        self.session
            .close(DisconnectReason::ClientDisconnect, self.handler);
        Ok(())
    }
}

impl Session {
    /// `OpenConnectionRequest2` has been answered and the session not closed.
    fn has_handshaken(&self) -> bool {
        matches!(
            self.state,
            SessionState::Handshaking | SessionState::Connected
        )
    }

    /// Datagrams the peer acknowledged no longer need to be kept.
    pub(super) fn handle_ack(&mut self, payload: &AckNackPayload) {
        self.ack_wait_packets
            .retain(|seq, _| !payload.contains(*seq));
    }

    /// Datagrams the peer reports missing are resent byte for byte under
    /// their original sequence number, lowest sequence number first.
    pub(super) fn handle_nack(&mut self, payload: &AckNackPayload) {
        let mut missing: Vec<Sequence24> = self
            .ack_wait_packets
            .keys()
            .copied()
            .filter(|seq| payload.contains(*seq))
            .collect();
        missing.sort_unstable_by_key(|seq| seq.value());

        let now = self.now;
        for seq in missing {
            if let Some(wait) = self.ack_wait_packets.get_mut(&seq) {
                trace!(peer = %self.addr, seq = %seq, "resend");
                self.outbox.push_back(wait.datagram.clone());
                wait.sent_at = now;
            }
        }
    }
}
