pub mod ack;
pub mod batch;
pub mod connected;
mod error;
pub mod open_connection;
mod registry;
pub mod unconnected;

pub use ack::*;
pub use batch::Batch;
pub use connected::*;
pub use error::DecodeError;
pub use open_connection::*;
pub use unconnected::*;

use crate::protocol::cursor::ByteCursor;
use crate::protocol::datagram::{DATA_PACKET_IDS, DataPacket};
use registry::define_packets;

/// Trait implemented by all concrete RakNet packet body types.
///
/// Implementations are responsible for encoding/decoding only the
/// packet body – the leading ID byte is handled by the family enums
/// ([`TransportPacket`], [`ApplicationPacket`]).
pub trait Packet: Sized {
    /// The fixed ID byte used to identify this packet on the wire.
    const ID: u8;

    /// Encode the body of this packet into the destination buffer.
    fn encode_body(&self, dst: &mut ByteCursor);

    /// Decode the body of this packet from the source buffer.
    fn decode_body(src: &mut ByteCursor) -> Result<Self, DecodeError>;
}

/// Trait for types that know how to encode/decode themselves using
/// the RakNet wire format.
pub trait RaknetEncodable: Sized {
    /// Encode this value into the destination buffer.
    fn encode_raknet(&self, dst: &mut ByteCursor);

    /// Decode a value of this type from the source buffer.
    fn decode_raknet(src: &mut ByteCursor) -> Result<Self, DecodeError>;
}

define_packets! {
    /// Packets exchanged directly in UDP datagrams: the offline handshake,
    /// acknowledgements, and the DataPacket carriers.
    pub enum TransportPacket {
        UnconnectedPing,
        UnconnectedPingOpenConnections,
        UnconnectedPong,
        AdvertiseSystem,
        OpenConnectionRequest1,
        OpenConnectionReply1,
        OpenConnectionRequest2,
        OpenConnectionReply2,
        Ack,
        Nack,
        @ranged Data(DataPacket) in DATA_PACKET_IDS,
    }
}

define_packets! {
    /// Packets carried inside encapsulated packets once a session exists.
    pub enum ApplicationPacket {
        Ping,
        Pong,
        ClientConnect,
        ServerHandshake,
        ClientHandshake,
        ClientDisconnect,
        Batch,
    }
}

impl From<DataPacket> for TransportPacket {
    fn from(packet: DataPacket) -> Self {
        TransportPacket::Data(packet)
    }
}
