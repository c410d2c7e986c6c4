//! Unconnected (offline) RakNet discovery and ping packets.

use crate::protocol::{
    cursor::ByteCursor,
    packet::{DecodeError, Packet, RaknetEncodable},
    types::OfflineMagic,
};

/// Unconnected ping used by clients to discover RakNet servers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnconnectedPing {
    pub ping_id: u64,
    pub client_guid: u64,
}

impl Packet for UnconnectedPing {
    const ID: u8 = 0x01;

    fn encode_body(&self, dst: &mut ByteCursor) {
        self.ping_id.encode_raknet(dst);
        OfflineMagic.encode_raknet(dst);
        self.client_guid.encode_raknet(dst);
    }

    fn decode_body(src: &mut ByteCursor) -> Result<Self, DecodeError> {
        let ping_id = u64::decode_raknet(src)?;
        OfflineMagic::decode_raknet(src)?;
        Ok(Self {
            ping_id,
            client_guid: u64::decode_raknet(src)?,
        })
    }
}

/// Ping that only wants an answer from servers with open slots. Same layout
/// as [`UnconnectedPing`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnconnectedPingOpenConnections {
    pub ping_id: u64,
    pub client_guid: u64,
}

impl Packet for UnconnectedPingOpenConnections {
    const ID: u8 = 0x02;

    fn encode_body(&self, dst: &mut ByteCursor) {
        self.ping_id.encode_raknet(dst);
        OfflineMagic.encode_raknet(dst);
        self.client_guid.encode_raknet(dst);
    }

    fn decode_body(src: &mut ByteCursor) -> Result<Self, DecodeError> {
        let ping_id = u64::decode_raknet(src)?;
        OfflineMagic::decode_raknet(src)?;
        Ok(Self {
            ping_id,
            client_guid: u64::decode_raknet(src)?,
        })
    }
}

/// Unconnected pong sent by servers in response to `UnconnectedPing`.
///
/// `server_info` is the `;`-delimited status line produced by the handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnconnectedPong {
    pub ping_id: u64,
    pub server_id: u64,
    pub server_info: String,
}

impl Packet for UnconnectedPong {
    const ID: u8 = 0x1c;

    fn encode_body(&self, dst: &mut ByteCursor) {
        self.ping_id.encode_raknet(dst);
        self.server_id.encode_raknet(dst);
        OfflineMagic.encode_raknet(dst);
        dst.put_str(&self.server_info);
    }

    fn decode_body(src: &mut ByteCursor) -> Result<Self, DecodeError> {
        let ping_id = u64::decode_raknet(src)?;
        let server_id = u64::decode_raknet(src)?;
        OfflineMagic::decode_raknet(src)?;
        Ok(Self {
            ping_id,
            server_id,
            server_info: src.next_str()?,
        })
    }
}

/// Unsolicited server advertisement; laid out like [`UnconnectedPong`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvertiseSystem {
    pub ping_id: u64,
    pub server_id: u64,
    pub server_info: String,
}

impl Packet for AdvertiseSystem {
    const ID: u8 = 0x1d;

    fn encode_body(&self, dst: &mut ByteCursor) {
        self.ping_id.encode_raknet(dst);
        self.server_id.encode_raknet(dst);
        OfflineMagic.encode_raknet(dst);
        dst.put_str(&self.server_info);
    }

    fn decode_body(src: &mut ByteCursor) -> Result<Self, DecodeError> {
        let ping_id = u64::decode_raknet(src)?;
        let server_id = u64::decode_raknet(src)?;
        OfflineMagic::decode_raknet(src)?;
        Ok(Self {
            ping_id,
            server_id,
            server_info: src.next_str()?,
        })
    }
}
