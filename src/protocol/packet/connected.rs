//! Packets exchanged inside a session once the offline handshake is done.

use std::net::SocketAddrV4;

use crate::protocol::{
    constants::{ANY_V4, LOCAL_IP_ADDRESSES_V4},
    cursor::ByteCursor,
    packet::{DecodeError, Packet, RaknetEncodable},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ping {
    pub ping_id: u64,
}

impl Packet for Ping {
    const ID: u8 = 0x00;

    fn encode_body(&self, dst: &mut ByteCursor) {
        self.ping_id.encode_raknet(dst);
    }

    fn decode_body(src: &mut ByteCursor) -> Result<Self, DecodeError> {
        Ok(Self {
            ping_id: u64::decode_raknet(src)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pong {
    pub recv_ping_id: u64,
    pub send_ping_id: u64,
}

impl Packet for Pong {
    const ID: u8 = 0x03;

    fn encode_body(&self, dst: &mut ByteCursor) {
        self.recv_ping_id.encode_raknet(dst);
        self.send_ping_id.encode_raknet(dst);
    }

    fn decode_body(src: &mut ByteCursor) -> Result<Self, DecodeError> {
        Ok(Self {
            recv_ping_id: u64::decode_raknet(src)?,
            send_ping_id: u64::decode_raknet(src)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientConnect {
    pub client_id: u64,
    pub send_ping: u64,
    pub use_security: bool,
}

impl Packet for ClientConnect {
    const ID: u8 = 0x09;

    fn encode_body(&self, dst: &mut ByteCursor) {
        self.client_id.encode_raknet(dst);
        self.send_ping.encode_raknet(dst);
        self.use_security.encode_raknet(dst);
    }

    fn decode_body(src: &mut ByteCursor) -> Result<Self, DecodeError> {
        Ok(Self {
            client_id: u64::decode_raknet(src)?,
            send_ping: u64::decode_raknet(src)?,
            use_security: bool::decode_raknet(src)?,
        })
    }
}

fn decode_system_addrs(src: &mut ByteCursor) -> Result<[SocketAddrV4; 10], DecodeError> {
    let mut addrs = [ANY_V4; 10];
    for addr in &mut addrs {
        *addr = SocketAddrV4::decode_raknet(src)?;
    }
    Ok(addrs)
}

/// Server's answer to [`ClientConnect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerHandshake {
    pub addr: SocketAddrV4,
    pub system_index: u16,
    pub system_addrs: [SocketAddrV4; 10],
    pub send_ping: u64,
    pub send_pong: u64,
}

impl ServerHandshake {
    /// Offset added to the client's ping time to form `send_pong`.
    pub const PONG_OFFSET: u64 = 1000;

    pub fn new(addr: SocketAddrV4, send_ping: u64) -> Self {
        Self {
            addr,
            system_index: 0,
            system_addrs: LOCAL_IP_ADDRESSES_V4,
            send_ping,
            send_pong: send_ping.wrapping_add(Self::PONG_OFFSET),
        }
    }
}

impl Packet for ServerHandshake {
    const ID: u8 = 0x10;

    fn encode_body(&self, dst: &mut ByteCursor) {
        self.addr.encode_raknet(dst);
        self.system_index.encode_raknet(dst);
        for addr in &self.system_addrs {
            addr.encode_raknet(dst);
        }
        self.send_ping.encode_raknet(dst);
        self.send_pong.encode_raknet(dst);
    }

    fn decode_body(src: &mut ByteCursor) -> Result<Self, DecodeError> {
        Ok(Self {
            addr: SocketAddrV4::decode_raknet(src)?,
            system_index: u16::decode_raknet(src)?,
            system_addrs: decode_system_addrs(src)?,
            send_ping: u64::decode_raknet(src)?,
            send_pong: u64::decode_raknet(src)?,
        })
    }
}

/// Client's final handshake step; the session is connected once it arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientHandshake {
    pub addr: SocketAddrV4,
    pub system_addrs: [SocketAddrV4; 10],
    pub send_ping: u64,
    pub send_pong: u64,
}

impl Packet for ClientHandshake {
    const ID: u8 = 0x13;

    fn encode_body(&self, dst: &mut ByteCursor) {
        self.addr.encode_raknet(dst);
        for addr in &self.system_addrs {
            addr.encode_raknet(dst);
        }
        self.send_ping.encode_raknet(dst);
        self.send_pong.encode_raknet(dst);
    }

    fn decode_body(src: &mut ByteCursor) -> Result<Self, DecodeError> {
        Ok(Self {
            addr: SocketAddrV4::decode_raknet(src)?,
            system_addrs: decode_system_addrs(src)?,
            send_ping: u64::decode_raknet(src)?,
            send_pong: u64::decode_raknet(src)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClientDisconnect;

impl Packet for ClientDisconnect {
    const ID: u8 = 0x15;

    fn encode_body(&self, _dst: &mut ByteCursor) {}

    fn decode_body(_src: &mut ByteCursor) -> Result<Self, DecodeError> {
        Ok(ClientDisconnect)
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::*;
    use crate::protocol::constants::LOOPBACK_V4;

    #[test]
    fn server_handshake_defaults() {
        let addr = SocketAddrV4::new(Ipv4Addr::new(10, 0, 0, 2), 50000);
        let pkt = ServerHandshake::new(addr, 123);
        assert_eq!(pkt.send_pong, 1123);
        assert_eq!(pkt.system_addrs[0], LOOPBACK_V4);
        assert!(pkt.system_addrs[1..].iter().all(|a| *a == ANY_V4));

        let mut buf = ByteCursor::new();
        pkt.encode_body(&mut buf);
        assert_eq!(buf.len(), 7 + 2 + 7 * 10 + 8 + 8);
        assert_eq!(ServerHandshake::decode_body(&mut buf).unwrap(), pkt);
    }

    #[test]
    fn client_connect_layout() {
        let pkt = ClientConnect {
            client_id: 1,
            send_ping: 2,
            use_security: false,
        };
        let mut buf = ByteCursor::new();
        pkt.encode_body(&mut buf);
        assert_eq!(buf.len(), 17);
        assert_eq!(ClientConnect::decode_body(&mut buf).unwrap(), pkt);
    }

    #[test]
    fn client_handshake_roundtrip() {
        let pkt = ClientHandshake {
            addr: SocketAddrV4::new(Ipv4Addr::new(127, 0, 0, 1), 19132),
            system_addrs: LOCAL_IP_ADDRESSES_V4,
            send_ping: 5,
            send_pong: 6,
        };
        let mut buf = ByteCursor::new();
        pkt.encode_body(&mut buf);
        assert_eq!(ClientHandshake::decode_body(&mut buf).unwrap(), pkt);
    }
}
