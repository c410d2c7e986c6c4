use std::net::SocketAddrV4;

use crate::protocol::{
    constants::OPEN_CONNECTION_REQUEST_1_HEADER_SIZE,
    cursor::ByteCursor,
    packet::{DecodeError, Packet, RaknetEncodable},
    types::OfflineMagic,
};

/// First connection request. The client pads the datagram up to the MTU it
/// wants to probe; the padding carries no data, only its length matters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenConnectionRequest1 {
    pub protocol: u8,
    pub mtu_size: u16,
}

impl Packet for OpenConnectionRequest1 {
    const ID: u8 = 0x05;

    fn encode_body(&self, dst: &mut ByteCursor) {
        OfflineMagic.encode_raknet(dst);
        self.protocol.encode_raknet(dst);
        let padding =
            (self.mtu_size as usize).saturating_sub(OPEN_CONNECTION_REQUEST_1_HEADER_SIZE);
        dst.put(&vec![0u8; padding]);
    }

    fn decode_body(src: &mut ByteCursor) -> Result<Self, DecodeError> {
        OfflineMagic::decode_raknet(src)?;
        let protocol = u8::decode_raknet(src)?;
        let padding = src.next_remaining().len();
        Ok(Self {
            protocol,
            mtu_size: (padding + OPEN_CONNECTION_REQUEST_1_HEADER_SIZE).min(u16::MAX as usize)
                as u16,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenConnectionReply1 {
    pub server_id: u64,
    pub mtu_size: u16,
}

impl Packet for OpenConnectionReply1 {
    const ID: u8 = 0x06;

    fn encode_body(&self, dst: &mut ByteCursor) {
        OfflineMagic.encode_raknet(dst);
        self.server_id.encode_raknet(dst);
        false.encode_raknet(dst); // server security
        self.mtu_size.encode_raknet(dst);
    }

    fn decode_body(src: &mut ByteCursor) -> Result<Self, DecodeError> {
        OfflineMagic::decode_raknet(src)?;
        let server_id = u64::decode_raknet(src)?;
        bool::decode_raknet(src)?;
        Ok(Self {
            server_id,
            mtu_size: u16::decode_raknet(src)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenConnectionRequest2 {
    pub server_addr: SocketAddrV4,
    pub mtu_size: u16,
    pub client_id: u64,
}

impl Packet for OpenConnectionRequest2 {
    const ID: u8 = 0x07;

    fn encode_body(&self, dst: &mut ByteCursor) {
        OfflineMagic.encode_raknet(dst);
        self.server_addr.encode_raknet(dst);
        self.mtu_size.encode_raknet(dst);
        self.client_id.encode_raknet(dst);
    }

    fn decode_body(src: &mut ByteCursor) -> Result<Self, DecodeError> {
        OfflineMagic::decode_raknet(src)?;
        Ok(Self {
            server_addr: SocketAddrV4::decode_raknet(src)?,
            mtu_size: u16::decode_raknet(src)?,
            client_id: u64::decode_raknet(src)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenConnectionReply2 {
    pub server_id: u64,
    pub client_addr: SocketAddrV4,
    pub mtu_size: u16,
}

impl Packet for OpenConnectionReply2 {
    const ID: u8 = 0x08;

    fn encode_body(&self, dst: &mut ByteCursor) {
        OfflineMagic.encode_raknet(dst);
        self.server_id.encode_raknet(dst);
        self.client_addr.encode_raknet(dst);
        self.mtu_size.encode_raknet(dst);
        false.encode_raknet(dst); // server security
    }

    fn decode_body(src: &mut ByteCursor) -> Result<Self, DecodeError> {
        OfflineMagic::decode_raknet(src)?;
        let server_id = u64::decode_raknet(src)?;
        let client_addr = SocketAddrV4::decode_raknet(src)?;
        let mtu_size = u16::decode_raknet(src)?;
        bool::decode_raknet(src)?;
        Ok(Self {
            server_id,
            client_addr,
            mtu_size,
        })
    }
}
