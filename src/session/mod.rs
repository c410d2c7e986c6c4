//! Per-peer connection state: the handshake state machine, the receive
//! pipeline (windows, split reassembly, dispatch) and the send pipeline
//! (index assignment, fragmentation, batching, retransmission).
//!
//! A [`Session`] does no I/O. Outgoing datagrams are queued in an outbox that
//! the transport loop drains, and time is passed in by the caller.

mod container;
mod handle;
mod inbound;
mod outbound;
mod split;

use std::{
    collections::{HashMap, VecDeque},
    fmt,
    net::{SocketAddr, SocketAddrV4},
    time::Instant,
};

use bytes::Bytes;
use tracing::{debug, info};

pub use container::DataPacketContainer;
pub use handle::{SessionHandle, SessionTable};
pub use split::{SplitAssembler, SplitError};

use crate::{
    config::SessionConfig,
    protocol::{
        constants::{DATA_PACKET_QUEUED_ID, MAXIMUM_ORDERING_CHANNELS},
        dispatch::{DispatchError, dispatch_transport},
        packet::TransportPacket,
        types::Sequence24,
        window::{DataPacketWindow, EncapsulatedPacketWindow, WindowIndex},
    },
    transport::Handler,
};

use inbound::Inbound;

/// Connection progress of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created, nothing negotiated yet.
    Unconnected,
    /// `OpenConnectionRequest1` answered.
    MtuNegotiated,
    /// `OpenConnectionRequest2` answered; application handshake running.
    Handshaking,
    /// `ClientHandshake` received; application packets reach the handler.
    Connected,
    /// Terminal. The session is removed on the next tick.
    Disconnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    ClientDisconnect,
    TimedOut,
    ServerShutdown,
    /// Closed through [`crate::transport::ServerHandle::disconnect`].
    Kicked,
    /// The peer started a new handshake on the same address.
    Reconnected,
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisconnectReason::ClientDisconnect => f.write_str("client disconnect"),
            DisconnectReason::TimedOut => f.write_str("timed out"),
            DisconnectReason::ServerShutdown => f.write_str("server shutdown"),
            DisconnectReason::Kicked => f.write_str("kicked"),
            DisconnectReason::Reconnected => f.write_str("reconnected"),
        }
    }
}

/// A sent datagram waiting for its Ack.
#[derive(Debug, Clone)]
struct AckWait {
    datagram: Bytes,
    sent_at: Instant,
}

pub struct Session {
    id: u64,
    addr: SocketAddrV4,
    server_id: u64,
    config: SessionConfig,
    state: SessionState,
    mtu: u16,
    client_id: u64,
    /// Time of the latest call from the transport loop.
    now: Instant,
    last_recv: Instant,

    recv_packets: DataPacketWindow,
    encap_packets: EncapsulatedPacketWindow,
    split_packets: SplitAssembler,

    waiting_packet: DataPacketContainer,
    send_seq_num: WindowIndex,
    send_message_index: WindowIndex,
    channel_index: [WindowIndex; MAXIMUM_ORDERING_CHANNELS],
    split_id: u16,
    ack_wait_packets: HashMap<Sequence24, AckWait>,
    outbox: VecDeque<Bytes>,
}

impl Session {
    pub fn new(
        id: u64,
        addr: SocketAddrV4,
        server_id: u64,
        config: SessionConfig,
        now: Instant,
    ) -> Self {
        debug!(peer = %addr, id, "create_session");
        Self {
            id,
            addr,
            server_id,
            split_packets: SplitAssembler::from_config(&config),
            config,
            state: SessionState::Unconnected,
            mtu: 0,
            client_id: 0,
            now,
            last_recv: now,
            recv_packets: DataPacketWindow::new(),
            encap_packets: EncapsulatedPacketWindow::new(),
            waiting_packet: DataPacketContainer::new(DATA_PACKET_QUEUED_ID),
            send_seq_num: WindowIndex::default(),
            send_message_index: WindowIndex::default(),
            channel_index: [WindowIndex::default(); MAXIMUM_ORDERING_CHANNELS],
            split_id: 0,
            ack_wait_packets: HashMap::new(),
            outbox: VecDeque::new(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn addr(&self) -> SocketAddrV4 {
        self.addr
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::V4(self.addr)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == SessionState::Connected
    }

    pub fn is_disconnected(&self) -> bool {
        self.state == SessionState::Disconnected
    }

    /// Negotiated MTU; zero until `OpenConnectionRequest1`.
    pub fn mtu(&self) -> u16 {
        self.mtu
    }

    /// Client GUID announced in `OpenConnectionRequest2`.
    pub fn client_id(&self) -> u64 {
        self.client_id
    }

    /// Number of sent datagrams still waiting for an Ack.
    pub fn ack_wait_len(&self) -> usize {
        self.ack_wait_packets.len()
    }

    pub fn is_waiting_for_ack(&self, seq: Sequence24) -> bool {
        self.ack_wait_packets.contains_key(&seq)
    }

    /// Handles one decoded datagram from the peer, then queues the Ack and
    /// Nack it calls for. Only packets the session accepts keep it alive.
    pub fn handle_packet<H: Handler + ?Sized>(
        &mut self,
        packet: TransportPacket,
        now: Instant,
        handler: &mut H,
    ) -> Result<(), DispatchError> {
        self.now = now;
        let result = dispatch_transport(
            &mut Inbound {
                session: self,
                handler,
            },
            packet,
        );
        self.send_acknowledge();
        result
    }

    /// Periodic maintenance: liveness timeout, ack-wait expiry, stale split
    /// expiry, and flushing the pending batch.
    pub fn update<H: Handler + ?Sized>(&mut self, now: Instant, handler: &mut H) {
        self.now = now;
        if self.is_disconnected() {
            return;
        }

        if now.saturating_duration_since(self.last_recv) > self.config.session_timeout {
            info!(peer = %self.addr, "session timed out");
            self.close(DisconnectReason::TimedOut, handler);
            return;
        }

        self.expire_ack_wait(now);
        let dropped = self.split_packets.expire(now);
        if dropped > 0 {
            debug!(peer = %self.addr, dropped, "dropped incomplete split packets");
        }
        self.send_waiting_packet();
    }

    /// Closes the session from the server side. The peer is sent a
    /// `ClientDisconnect` if it got far enough to understand one.
    pub fn disconnect<H: Handler + ?Sized>(&mut self, reason: DisconnectReason, handler: &mut H) {
        if self.is_disconnected() {
            return;
        }
        if matches!(
            self.state,
            SessionState::Handshaking | SessionState::Connected
        ) {
            self.send_disconnect_notification();
        }
        self.close(reason, handler);
    }

    /// Moves to `Disconnected`, telling the handler if it saw the session
    /// open. Anything still batched is discarded.
    fn close<H: Handler + ?Sized>(&mut self, reason: DisconnectReason, handler: &mut H) {
        let was_connected = self.is_connected();
        self.state = SessionState::Disconnected;
        self.waiting_packet.clear();
        self.ack_wait_packets.clear();
        if was_connected {
            info!(peer = %self.addr, %reason, "connection closed");
            handler.close(&mut SessionHandle::new(self), reason);
        } else {
            debug!(peer = %self.addr, %reason, "session closed before connecting");
        }
    }

    /// Marks the peer as alive at the time of the current call.
    fn touch(&mut self) {
        self.last_recv = self.now;
    }

    /// Closes the current connection, if any, and clears everything both
    /// pipelines hold so a new handshake starts from scratch.
    fn restart<H: Handler + ?Sized>(&mut self, handler: &mut H) {
        if !self.is_disconnected() {
            self.close(DisconnectReason::Reconnected, handler);
        }
        debug!(peer = %self.addr, id = self.id, "restart_session");
        self.state = SessionState::Unconnected;
        self.mtu = 0;
        self.client_id = 0;
        self.recv_packets = DataPacketWindow::new();
        self.encap_packets = EncapsulatedPacketWindow::new();
        self.split_packets = SplitAssembler::from_config(&self.config);
        self.waiting_packet.clear();
        self.send_seq_num = WindowIndex::default();
        self.send_message_index = WindowIndex::default();
        self.channel_index = [WindowIndex::default(); MAXIMUM_ORDERING_CHANNELS];
        self.split_id = 0;
        self.ack_wait_packets.clear();
    }

    /// Takes every datagram queued for the peer.
    pub fn drain_outbox(&mut self) -> impl Iterator<Item = Bytes> + '_ {
        self.outbox.drain(..)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("addr", &self.addr)
            .field("state", &self.state)
            .field("mtu", &self.mtu)
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::{net::Ipv4Addr, time::Duration};

    use super::*;
    use crate::protocol::{
        constants::LOCAL_IP_ADDRESSES_V4,
        datagram::DataPacket,
        encapsulated_packet::EncapsulatedPacket,
        packet::{
            Ack, AckNackPayload, ApplicationPacket, ClientConnect, ClientDisconnect,
            ClientHandshake, Nack, OpenConnectionRequest1, OpenConnectionRequest2, Ping, Pong,
        },
        reliability::Reliability,
    };

    const PEER: SocketAddrV4 = SocketAddrV4::new(Ipv4Addr::new(10, 0, 0, 1), 19132);
    const SERVER: SocketAddrV4 = SocketAddrV4::new(Ipv4Addr::new(10, 0, 0, 2), 19132);

    #[derive(Default)]
    struct Recorder {
        opened: Vec<u64>,
        closed: Vec<DisconnectReason>,
        packets: Vec<ApplicationPacket>,
    }

    impl Handler for Recorder {
        fn info(&self) -> String {
            "MCPE;test;".to_string()
        }

        fn open(&mut self, session: &mut SessionHandle<'_>) {
            self.opened.push(session.client_id());
        }

        fn close(&mut self, _session: &mut SessionHandle<'_>, reason: DisconnectReason) {
            self.closed.push(reason);
        }

        fn handle(&mut self, _session: &mut SessionHandle<'_>, packet: ApplicationPacket) {
            self.packets.push(packet);
        }
    }

    /// Client-side counters for building datagrams.
    #[derive(Default)]
    struct Client {
        seq: WindowIndex,
        message: WindowIndex,
        order: WindowIndex,
    }

    impl Client {
        fn datagram(&mut self, packets: &[ApplicationPacket]) -> TransportPacket {
            let mut dp = DataPacket::new(DATA_PACKET_QUEUED_ID, self.seq.next());
            for packet in packets {
                dp.packets.push(
                    EncapsulatedPacket::new(Reliability::ReliableOrdered, packet.to_bytes())
                        .with_message(self.message.next())
                        .with_order(self.order.next(), 0),
                );
            }
            dp.into()
        }
    }

    fn new_session(config: SessionConfig, now: Instant) -> Session {
        Session::new(1, PEER, 0xabcd, config, now)
    }

    fn outbox(session: &mut Session) -> Vec<TransportPacket> {
        session
            .drain_outbox()
            .map(|bytes| TransportPacket::decode(&bytes).unwrap())
            .collect()
    }

    fn app_packets(datagrams: &[TransportPacket]) -> Vec<ApplicationPacket> {
        datagrams
            .iter()
            .filter_map(|packet| match packet {
                TransportPacket::Data(dp) => Some(dp),
                _ => None,
            })
            .flat_map(|dp| dp.packets.iter())
            .map(|encap| ApplicationPacket::decode(&encap.buffer).unwrap())
            .collect()
    }

    fn connect(session: &mut Session, client: &mut Client, handler: &mut Recorder, now: Instant) {
        let requests: [TransportPacket; 2] = [
            OpenConnectionRequest1 {
                protocol: 8,
                mtu_size: 1464,
            }
            .into(),
            OpenConnectionRequest2 {
                server_addr: SERVER,
                mtu_size: 1464,
                client_id: 99,
            }
            .into(),
        ];
        for request in requests {
            session.handle_packet(request, now, handler).unwrap();
        }
        let connect = ClientConnect {
            client_id: 99,
            send_ping: 5,
            use_security: false,
        };
        session
            .handle_packet(client.datagram(&[connect.into()]), now, handler)
            .unwrap();
        let handshake = ClientHandshake {
            addr: SERVER,
            system_addrs: LOCAL_IP_ADDRESSES_V4,
            send_ping: 6,
            send_pong: 1005,
        };
        session
            .handle_packet(client.datagram(&[handshake.into()]), now, handler)
            .unwrap();
        assert!(session.is_connected());
        session.drain_outbox().for_each(drop);
    }

    #[test]
    fn handshake_walks_through_states() {
        let now = Instant::now();
        let mut handler = Recorder::default();
        let mut client = Client::default();
        let mut session = new_session(SessionConfig::default(), now);

        let ocr1 = OpenConnectionRequest1 {
            protocol: 8,
            mtu_size: 1200,
        };
        session.handle_packet(ocr1.into(), now, &mut handler).unwrap();
        assert_eq!(session.state(), SessionState::MtuNegotiated);
        assert_eq!(session.mtu(), 1464);
        match outbox(&mut session).as_slice() {
            [TransportPacket::OpenConnectionReply1(reply)] => {
                assert_eq!(reply.server_id, 0xabcd);
                assert_eq!(reply.mtu_size, 1200);
            }
            other => panic!("unexpected replies: {other:?}"),
        }

        let ocr2 = OpenConnectionRequest2 {
            server_addr: SERVER,
            mtu_size: 1200,
            client_id: 99,
        };
        session.handle_packet(ocr2.into(), now, &mut handler).unwrap();
        assert_eq!(session.state(), SessionState::Handshaking);
        assert_eq!(session.mtu(), 1200);
        assert_eq!(session.client_id(), 99);
        match outbox(&mut session).as_slice() {
            [TransportPacket::OpenConnectionReply2(reply)] => {
                assert_eq!(reply.client_addr, PEER);
                assert_eq!(reply.mtu_size, 1200);
            }
            other => panic!("unexpected replies: {other:?}"),
        }

        let connect = ClientConnect {
            client_id: 99,
            send_ping: 5,
            use_security: false,
        };
        session
            .handle_packet(client.datagram(&[connect.into()]), now, &mut handler)
            .unwrap();
        let sent = outbox(&mut session);
        assert!(matches!(sent.last(), Some(TransportPacket::Ack(ack)) if ack.0.contains(Sequence24::new(0))));
        match app_packets(&sent).as_slice() {
            [ApplicationPacket::ServerHandshake(handshake)] => {
                assert_eq!(handshake.addr, PEER);
                assert_eq!(handshake.send_ping, 5);
                assert_eq!(handshake.send_pong, 1005);
            }
            other => panic!("unexpected packets: {other:?}"),
        }
        assert!(handler.opened.is_empty());

        let handshake = ClientHandshake {
            addr: SERVER,
            system_addrs: LOCAL_IP_ADDRESSES_V4,
            send_ping: 6,
            send_pong: 1005,
        };
        session
            .handle_packet(client.datagram(&[handshake.into()]), now, &mut handler)
            .unwrap();
        assert!(session.is_connected());
        assert_eq!(handler.opened, vec![99]);
    }

    #[test]
    fn request_2_before_request_1_is_ignored() {
        let now = Instant::now();
        let mut handler = Recorder::default();
        let mut session = new_session(SessionConfig::default(), now);
        let ocr2 = OpenConnectionRequest2 {
            server_addr: SERVER,
            mtu_size: 1200,
            client_id: 99,
        };
        session.handle_packet(ocr2.into(), now, &mut handler).unwrap();
        assert_eq!(session.state(), SessionState::Unconnected);
        assert!(outbox(&mut session).is_empty());
    }

    #[test]
    fn game_packets_reach_handler_only_when_connected() {
        let now = Instant::now();
        let mut handler = Recorder::default();
        let mut client = Client::default();
        let mut session = new_session(SessionConfig::default(), now);
        let game = ApplicationPacket::Raw {
            id: 0xfe,
            payload: Bytes::from_static(b"hello"),
        };

        let ocr1 = OpenConnectionRequest1 {
            protocol: 8,
            mtu_size: 1464,
        };
        session.handle_packet(ocr1.into(), now, &mut handler).unwrap();
        let ocr2 = OpenConnectionRequest2 {
            server_addr: SERVER,
            mtu_size: 1464,
            client_id: 99,
        };
        session.handle_packet(ocr2.into(), now, &mut handler).unwrap();
        session
            .handle_packet(client.datagram(&[game.clone()]), now, &mut handler)
            .unwrap();
        assert!(handler.packets.is_empty());

        let mut client = Client::default();
        let mut session = new_session(SessionConfig::default(), now);
        connect(&mut session, &mut client, &mut handler, now);
        session
            .handle_packet(client.datagram(&[game.clone()]), now, &mut handler)
            .unwrap();
        assert_eq!(handler.packets, vec![game]);
    }

    #[test]
    fn ack_releases_and_nack_resends_same_bytes() {
        let now = Instant::now();
        let mut handler = Recorder::default();
        let mut client = Client::default();
        let mut session = new_session(SessionConfig::default(), now);
        connect(&mut session, &mut client, &mut handler, now);

        session.send_buffer(
            Bytes::from_static(&[0xfe, 1, 2, 3]),
            Reliability::Reliable,
            0,
            true,
        );
        let sent: Vec<Bytes> = session.drain_outbox().collect();
        assert_eq!(sent.len(), 1);
        let seq = match TransportPacket::decode(&sent[0]).unwrap() {
            TransportPacket::Data(dp) => dp.seq_num,
            other => panic!("unexpected packet: {other:?}"),
        };
        assert!(session.is_waiting_for_ack(seq));

        let nack = Nack(AckNackPayload::from_seq_nums([seq]));
        session.handle_packet(nack.into(), now, &mut handler).unwrap();
        let resent: Vec<Bytes> = session.drain_outbox().collect();
        assert_eq!(resent, sent);
        assert!(session.is_waiting_for_ack(seq));

        let ack = Ack(AckNackPayload::from_seq_nums([seq]));
        session.handle_packet(ack.into(), now, &mut handler).unwrap();
        assert_eq!(session.ack_wait_len(), 0);
        assert!(session.drain_outbox().next().is_none());
    }

    #[test]
    fn nack_resends_in_sequence_order() {
        let now = Instant::now();
        let mut handler = Recorder::default();
        let mut client = Client::default();
        let mut session = new_session(SessionConfig::default(), now);
        connect(&mut session, &mut client, &mut handler, now);

        let mut seqs = Vec::new();
        for n in 0..6u8 {
            session.send_buffer(Bytes::from(vec![0xfe, n]), Reliability::Reliable, 0, true);
            for bytes in session.drain_outbox() {
                if let TransportPacket::Data(dp) = TransportPacket::decode(&bytes).unwrap() {
                    seqs.push(dp.seq_num);
                }
            }
        }
        assert_eq!(seqs.len(), 6);

        let nack = Nack(AckNackPayload::from_seq_nums(seqs.iter().rev().copied()));
        session.handle_packet(nack.into(), now, &mut handler).unwrap();
        let resent: Vec<Sequence24> = outbox(&mut session)
            .into_iter()
            .filter_map(|packet| match packet {
                TransportPacket::Data(dp) => Some(dp.seq_num),
                _ => None,
            })
            .collect();
        assert_eq!(resent, seqs);
    }

    #[test]
    fn ignored_packets_do_not_keep_session_alive() {
        let now = Instant::now();
        let mut handler = Recorder::default();
        let mut client = Client::default();
        let mut session = new_session(SessionConfig::default(), now);
        connect(&mut session, &mut client, &mut handler, now);

        let ocr2 = OpenConnectionRequest2 {
            server_addr: SERVER,
            mtu_size: 1464,
            client_id: 99,
        };
        session
            .handle_packet(ocr2.into(), now + Duration::from_secs(8), &mut handler)
            .unwrap();
        session.update(now + Duration::from_secs(11), &mut handler);
        assert!(session.is_disconnected());
        assert_eq!(handler.closed, vec![DisconnectReason::TimedOut]);
    }

    #[test]
    fn request_1_while_connected_starts_over() {
        let now = Instant::now();
        let mut handler = Recorder::default();
        let mut client = Client::default();
        let mut session = new_session(SessionConfig::default(), now);
        connect(&mut session, &mut client, &mut handler, now);
        session.send_buffer(Bytes::from_static(&[0xfe]), Reliability::Reliable, 0, true);
        outbox(&mut session);
        assert_eq!(session.ack_wait_len(), 1);

        let ocr1 = OpenConnectionRequest1 {
            protocol: 8,
            mtu_size: 1464,
        };
        session.handle_packet(ocr1.into(), now, &mut handler).unwrap();
        assert_eq!(session.state(), SessionState::MtuNegotiated);
        assert_eq!(session.ack_wait_len(), 0);
        assert_eq!(handler.closed, vec![DisconnectReason::Reconnected]);
        assert!(matches!(
            outbox(&mut session).as_slice(),
            [TransportPacket::OpenConnectionReply1(_)]
        ));

        let mut client = Client::default();
        connect(&mut session, &mut client, &mut handler, now);
        assert!(session.is_connected());
        assert_eq!(handler.opened, vec![99, 99]);
    }

    #[test]
    fn unacked_datagrams_expire() {
        let now = Instant::now();
        let mut handler = Recorder::default();
        let mut client = Client::default();
        let config = SessionConfig::default().ack_timeout(Duration::from_secs(1));
        let mut session = new_session(config, now);
        connect(&mut session, &mut client, &mut handler, now);

        session.send_buffer(Bytes::from_static(&[0xfe]), Reliability::Reliable, 0, true);
        assert_eq!(session.ack_wait_len(), 1);
        session.update(now + Duration::from_millis(500), &mut handler);
        assert_eq!(session.ack_wait_len(), 1);
        session.update(now + Duration::from_secs(2), &mut handler);
        assert_eq!(session.ack_wait_len(), 0);
        assert!(session.is_connected());
    }

    #[test]
    fn large_packet_is_split_within_mtu() {
        let now = Instant::now();
        let mut handler = Recorder::default();
        let mut client = Client::default();
        let mut session = new_session(SessionConfig::default(), now);
        connect(&mut session, &mut client, &mut handler, now);

        let mut payload = vec![0xfe];
        payload.extend((0..3999u32).map(|i| (i % 251) as u8));
        let payload = Bytes::from(payload);
        session.send_buffer(payload.clone(), Reliability::ReliableOrdered, 0, false);

        let sent: Vec<Bytes> = session.drain_outbox().collect();
        assert_eq!(sent.len(), 3);
        assert!(sent.iter().all(|bytes| bytes.len() <= 1464));

        let mut fragments: Vec<EncapsulatedPacket> = sent
            .iter()
            .flat_map(|bytes| match TransportPacket::decode(bytes).unwrap() {
                TransportPacket::Data(dp) => {
                    assert_eq!(dp.id, 0x80);
                    dp.packets
                }
                other => panic!("unexpected packet: {other:?}"),
            })
            .collect();
        let order = fragments[0].order;
        assert!(fragments.iter().all(|f| f.order == order));
        let messages: Vec<u32> = fragments
            .iter()
            .map(|f| f.message.unwrap().value())
            .collect();
        assert_eq!(messages, vec![messages[0], messages[0] + 1, messages[0] + 2]);

        fragments.reverse();
        let mut assembler = SplitAssembler::from_config(&SessionConfig::default());
        let mut done = None;
        for fragment in fragments {
            if let Some(packet) = assembler.concat(fragment, now).unwrap() {
                done = Some(packet);
            }
        }
        assert_eq!(done.unwrap().buffer, payload);
        assert!(assembler.is_empty());
    }

    #[test]
    fn split_fragments_out_of_order_reach_handler_once() {
        let now = Instant::now();
        let mut handler = Recorder::default();
        let mut client = Client::default();
        let mut session = new_session(SessionConfig::default(), now);
        connect(&mut session, &mut client, &mut handler, now);

        let payload = Bytes::from_static(b"\xfeabcdefghij");
        let order = client.order.next();
        let mut datagrams: Vec<TransportPacket> = (0..3u32)
            .map(|index| {
                let start = 4 * index as usize;
                let end = (4 * (index as usize + 1)).min(payload.len());
                let fragment =
                    EncapsulatedPacket::new(Reliability::ReliableOrdered, payload.slice(start..end))
                        .with_message(client.message.next())
                        .with_order(order, 0)
                        .with_split(3, 9, index);
                let mut dp = DataPacket::new(DATA_PACKET_QUEUED_ID, client.seq.next());
                dp.packets.push(fragment);
                dp.into()
            })
            .collect();
        datagrams.reverse();
        for datagram in datagrams {
            session.handle_packet(datagram, now, &mut handler).unwrap();
        }

        assert_eq!(
            handler.packets,
            vec![ApplicationPacket::Raw {
                id: 0xfe,
                payload: payload.slice(1..),
            }]
        );
    }

    #[test]
    fn small_packets_are_batched_until_update() {
        let now = Instant::now();
        let mut handler = Recorder::default();
        let mut client = Client::default();
        let mut session = new_session(SessionConfig::default(), now);
        connect(&mut session, &mut client, &mut handler, now);

        for i in 0..3u8 {
            session.send_buffer(Bytes::from(vec![0xfe, i]), Reliability::Reliable, 0, false);
        }
        assert!(session.drain_outbox().next().is_none());

        session.update(now, &mut handler);
        match outbox(&mut session).as_slice() {
            [TransportPacket::Data(dp)] => {
                assert_eq!(dp.id, DATA_PACKET_QUEUED_ID);
                assert_eq!(dp.packets.len(), 3);
                assert!(session.is_waiting_for_ack(dp.seq_num));
            }
            other => panic!("unexpected packets: {other:?}"),
        }
    }

    #[test]
    fn ping_is_answered_with_pong_then_ping() {
        let now = Instant::now();
        let mut handler = Recorder::default();
        let mut client = Client::default();
        let mut session = new_session(SessionConfig::default(), now);
        connect(&mut session, &mut client, &mut handler, now);

        session
            .handle_packet(client.datagram(&[Ping { ping_id: 7 }.into()]), now, &mut handler)
            .unwrap();
        session.update(now, &mut handler);
        let replies = app_packets(&outbox(&mut session));
        match replies.as_slice() {
            [ApplicationPacket::Pong(Pong { recv_ping_id: 7, send_ping_id }), ApplicationPacket::Ping(ping)] => {
                assert_eq!(*send_ping_id, ping.ping_id);
            }
            other => panic!("unexpected packets: {other:?}"),
        }
        assert!(handler.packets.is_empty());
    }

    #[test]
    fn silent_session_times_out() {
        let now = Instant::now();
        let mut handler = Recorder::default();
        let mut client = Client::default();
        let mut session = new_session(SessionConfig::default(), now);
        connect(&mut session, &mut client, &mut handler, now);

        session.update(now + Duration::from_secs(5), &mut handler);
        assert!(session.is_connected());
        session.update(now + Duration::from_secs(11), &mut handler);
        assert!(session.is_disconnected());
        assert_eq!(handler.closed, vec![DisconnectReason::TimedOut]);
    }

    #[test]
    fn client_disconnect_closes_session() {
        let now = Instant::now();
        let mut handler = Recorder::default();
        let mut client = Client::default();
        let mut session = new_session(SessionConfig::default(), now);
        connect(&mut session, &mut client, &mut handler, now);

        session
            .handle_packet(client.datagram(&[ClientDisconnect.into()]), now, &mut handler)
            .unwrap();
        assert!(session.is_disconnected());
        assert_eq!(handler.closed, vec![DisconnectReason::ClientDisconnect]);

        session.send_buffer(Bytes::from_static(&[0xfe]), Reliability::Reliable, 0, true);
        assert_eq!(session.ack_wait_len(), 0);
    }

    #[test]
    fn server_disconnect_notifies_peer() {
        let now = Instant::now();
        let mut handler = Recorder::default();
        let mut client = Client::default();
        let mut session = new_session(SessionConfig::default(), now);
        connect(&mut session, &mut client, &mut handler, now);

        session.disconnect(DisconnectReason::Kicked, &mut handler);
        let sent = app_packets(&outbox(&mut session));
        assert_eq!(sent, vec![ApplicationPacket::ClientDisconnect(ClientDisconnect)]);
        assert_eq!(handler.closed, vec![DisconnectReason::Kicked]);

        session.disconnect(DisconnectReason::Kicked, &mut handler);
        assert_eq!(handler.closed.len(), 1);
    }
}
