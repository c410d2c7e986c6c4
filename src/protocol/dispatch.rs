//! Routes decoded packets to per-variant handler methods.
//!
//! Each family has a visitor trait with one method per packet kind. Every
//! method defaults to [`TransportVisitor::fallback`] /
//! [`ApplicationVisitor::fallback`], and the fallbacks default to
//! [`DispatchError::Unimplemented`]. Implementors override the packets they
//! care about and, optionally, the fallback. The `dispatch_*` functions match
//! exhaustively, so adding a packet kind without a visitor method fails to
//! compile.

use std::fmt;

use bytes::Bytes;
use thiserror::Error;

use crate::protocol::{datagram::DataPacket, packet::*};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketFamily {
    Transport,
    Application,
}

impl fmt::Display for PacketFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PacketFamily::Transport => f.write_str("transport"),
            PacketFamily::Application => f.write_str("application"),
        }
    }
}

#[derive(Error, Debug)]
pub enum DispatchError {
    /// A decoded packet reached a visitor with no handler and no fallback.
    #[error("No handler registered for {family} packet 0x{id:02x}.")]
    Unimplemented { family: PacketFamily, id: u8 },
}

pub trait TransportVisitor {
    /// Receives every packet whose method is not overridden.
    fn fallback(&mut self, packet: TransportPacket) -> Result<(), DispatchError> {
        Err(DispatchError::Unimplemented {
            family: PacketFamily::Transport,
            id: packet.id(),
        })
    }

    fn unconnected_ping(&mut self, packet: UnconnectedPing) -> Result<(), DispatchError> {
        self.fallback(packet.into())
    }

    fn unconnected_ping_open_connections(
        &mut self,
        packet: UnconnectedPingOpenConnections,
    ) -> Result<(), DispatchError> {
        self.fallback(packet.into())
    }

    fn unconnected_pong(&mut self, packet: UnconnectedPong) -> Result<(), DispatchError> {
        self.fallback(packet.into())
    }

    fn advertise_system(&mut self, packet: AdvertiseSystem) -> Result<(), DispatchError> {
        self.fallback(packet.into())
    }

    fn open_connection_request_1(
        &mut self,
        packet: OpenConnectionRequest1,
    ) -> Result<(), DispatchError> {
        self.fallback(packet.into())
    }

    fn open_connection_reply_1(
        &mut self,
        packet: OpenConnectionReply1,
    ) -> Result<(), DispatchError> {
        self.fallback(packet.into())
    }

    fn open_connection_request_2(
        &mut self,
        packet: OpenConnectionRequest2,
    ) -> Result<(), DispatchError> {
        self.fallback(packet.into())
    }

    fn open_connection_reply_2(
        &mut self,
        packet: OpenConnectionReply2,
    ) -> Result<(), DispatchError> {
        self.fallback(packet.into())
    }

    fn ack(&mut self, packet: Ack) -> Result<(), DispatchError> {
        self.fallback(packet.into())
    }

    fn nack(&mut self, packet: Nack) -> Result<(), DispatchError> {
        self.fallback(packet.into())
    }

    fn data(&mut self, packet: DataPacket) -> Result<(), DispatchError> {
        self.fallback(packet.into())
    }

    fn raw(&mut self, id: u8, payload: Bytes) -> Result<(), DispatchError> {
        self.fallback(TransportPacket::Raw { id, payload })
    }
}

pub trait ApplicationVisitor {
    /// Receives every packet whose method is not overridden.
    fn fallback(&mut self, packet: ApplicationPacket) -> Result<(), DispatchError> {
        Err(DispatchError::Unimplemented {
            family: PacketFamily::Application,
            id: packet.id(),
        })
    }

    fn ping(&mut self, packet: Ping) -> Result<(), DispatchError> {
        self.fallback(packet.into())
    }

    fn pong(&mut self, packet: Pong) -> Result<(), DispatchError> {
        self.fallback(packet.into())
    }

    fn client_connect(&mut self, packet: ClientConnect) -> Result<(), DispatchError> {
        self.fallback(packet.into())
    }

    fn server_handshake(&mut self, packet: ServerHandshake) -> Result<(), DispatchError> {
        self.fallback(packet.into())
    }

    fn client_handshake(&mut self, packet: ClientHandshake) -> Result<(), DispatchError> {
        self.fallback(packet.into())
    }

    fn client_disconnect(&mut self, packet: ClientDisconnect) -> Result<(), DispatchError> {
        self.fallback(packet.into())
    }

    fn batch(&mut self, packet: Batch) -> Result<(), DispatchError> {
        self.fallback(packet.into())
    }

    fn raw(&mut self, id: u8, payload: Bytes) -> Result<(), DispatchError> {
        self.fallback(ApplicationPacket::Raw { id, payload })
    }
}

pub fn dispatch_transport<V>(visitor: &mut V, packet: TransportPacket) -> Result<(), DispatchError>
where
    V: TransportVisitor + ?Sized,
{
    match packet {
        TransportPacket::UnconnectedPing(p) => visitor.unconnected_ping(p),
        TransportPacket::UnconnectedPingOpenConnections(p) => {
            visitor.unconnected_ping_open_connections(p)
        }
        TransportPacket::UnconnectedPong(p) => visitor.unconnected_pong(p),
        TransportPacket::AdvertiseSystem(p) => visitor.advertise_system(p),
        TransportPacket::OpenConnectionRequest1(p) => visitor.open_connection_request_1(p),
        TransportPacket::OpenConnectionReply1(p) => visitor.open_connection_reply_1(p),
        TransportPacket::OpenConnectionRequest2(p) => visitor.open_connection_request_2(p),
        TransportPacket::OpenConnectionReply2(p) => visitor.open_connection_reply_2(p),
        TransportPacket::Ack(p) => visitor.ack(p),
        TransportPacket::Nack(p) => visitor.nack(p),
        TransportPacket::Data(p) => visitor.data(p),
        TransportPacket::Raw { id, payload } => visitor.raw(id, payload),
    }
}

pub fn dispatch_application<V>(
    visitor: &mut V,
    packet: ApplicationPacket,
) -> Result<(), DispatchError>
where
    V: ApplicationVisitor + ?Sized,
{
    match packet {
        ApplicationPacket::Ping(p) => visitor.ping(p),
        ApplicationPacket::Pong(p) => visitor.pong(p),
        ApplicationPacket::ClientConnect(p) => visitor.client_connect(p),
        ApplicationPacket::ServerHandshake(p) => visitor.server_handshake(p),
        ApplicationPacket::ClientHandshake(p) => visitor.client_handshake(p),
        ApplicationPacket::ClientDisconnect(p) => visitor.client_disconnect(p),
        ApplicationPacket::Batch(p) => visitor.batch(p),
        ApplicationPacket::Raw { id, payload } => visitor.raw(id, payload),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct PingOnly {
        pings: Vec<u64>,
    }

    impl ApplicationVisitor for PingOnly {
        fn ping(&mut self, packet: Ping) -> Result<(), DispatchError> {
            self.pings.push(packet.ping_id);
            Ok(())
        }
    }

    #[derive(Default)]
    struct CatchAll {
        seen: Vec<u8>,
    }

    impl TransportVisitor for CatchAll {
        fn fallback(&mut self, packet: TransportPacket) -> Result<(), DispatchError> {
            self.seen.push(packet.id());
            Ok(())
        }
    }

    #[test]
    fn overridden_method_is_called() {
        let mut visitor = PingOnly::default();
        dispatch_application(&mut visitor, Ping { ping_id: 3 }.into()).unwrap();
        assert_eq!(visitor.pings, vec![3]);
    }

    #[test]
    fn missing_handler_is_unimplemented() {
        let mut visitor = PingOnly::default();
        let err = dispatch_application(&mut visitor, ClientDisconnect.into()).unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Unimplemented {
                family: PacketFamily::Application,
                id: 0x15
            }
        ));

        let err = dispatch_application(
            &mut visitor,
            ApplicationPacket::Raw {
                id: 0x8e,
                payload: Bytes::new(),
            },
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "No handler registered for application packet 0x8e."
        );
    }

    #[test]
    fn fallback_receives_every_variant() {
        let mut visitor = CatchAll::default();
        dispatch_transport(&mut visitor, Ack::default().into()).unwrap();
        dispatch_transport(
            &mut visitor,
            UnconnectedPing {
                ping_id: 1,
                client_guid: 2,
            }
            .into(),
        )
        .unwrap();
        dispatch_transport(
            &mut visitor,
            TransportPacket::Raw {
                id: 0x33,
                payload: Bytes::new(),
            },
        )
        .unwrap();
        assert_eq!(visitor.seen, vec![0xc0, 0x01, 0x33]);
    }
}
