use std::net::SocketAddrV4;

use crate::protocol::cursor::ByteCursor;
use crate::protocol::packet::{DecodeError, RaknetEncodable};
use crate::protocol::types::Magic;

impl RaknetEncodable for bool {
    fn encode_raknet(&self, dst: &mut ByteCursor) {
        dst.put_byte(if *self { 1 } else { 0 });
    }

    fn decode_raknet(src: &mut ByteCursor) -> Result<Self, DecodeError> {
        Ok(src.next_byte()? > 0)
    }
}

impl RaknetEncodable for Magic {
    fn encode_raknet(&self, dst: &mut ByteCursor) {
        dst.put(self);
    }

    fn decode_raknet(src: &mut ByteCursor) -> Result<Self, DecodeError> {
        let mut magic = [0u8; 16];
        let len = magic.len();
        magic.copy_from_slice(&src.next(len)?);
        Ok(magic)
    }
}

impl RaknetEncodable for SocketAddrV4 {
    fn encode_raknet(&self, dst: &mut ByteCursor) {
        dst.put_addr(*self);
    }

    fn decode_raknet(src: &mut ByteCursor) -> Result<Self, DecodeError> {
        src.next_addr()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_roundtrip() {
        for &v in &[false, true] {
            let mut buf = ByteCursor::new();
            v.encode_raknet(&mut buf);
            let decoded = bool::decode_raknet(&mut buf).unwrap();
            assert_eq!(decoded, v);
        }
    }

    #[test]
    fn magic_roundtrip() {
        let value: Magic = [0x12; 16];
        let mut buf = ByteCursor::new();
        value.encode_raknet(&mut buf);
        let decoded = Magic::decode_raknet(&mut buf).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn address_octets_are_inverted() {
        let addr: SocketAddrV4 = "10.0.0.255:19132".parse().unwrap();
        let mut buf = ByteCursor::new();
        addr.encode_raknet(&mut buf);
        assert_eq!(buf.bytes(), &[4, 0xf5, 0xff, 0xff, 0x00, 0x4a, 0xbc]);
        assert_eq!(SocketAddrV4::decode_raknet(&mut buf).unwrap(), addr);
    }
}
