use std::ops::RangeInclusive;

use crate::protocol::{
    constants::RAKNET_DATAGRAM_HEADER_SIZE,
    cursor::ByteCursor,
    encapsulated_packet::EncapsulatedPacket,
    packet::{DecodeError, RaknetEncodable},
    types::Sequence24,
};

/// Ids 0x80..=0x8F all carry a DataPacket; they differ only in the id byte.
pub const DATA_PACKET_IDS: RangeInclusive<u8> = 0x80..=0x8F;

/// Transport container for encapsulated packets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPacket {
    pub id: u8,
    pub seq_num: Sequence24,
    pub packets: Vec<EncapsulatedPacket>,
}

impl DataPacket {
    pub fn new(id: u8, seq_num: Sequence24) -> Self {
        debug_assert!(DATA_PACKET_IDS.contains(&id));
        Self {
            id,
            seq_num,
            packets: Vec::new(),
        }
    }

    pub fn require_ack(&self) -> bool {
        self.packets.iter().any(EncapsulatedPacket::require_ack)
    }

    /// Encoded length in bytes, id included.
    pub fn wire_len(&self) -> usize {
        RAKNET_DATAGRAM_HEADER_SIZE
            + self
                .packets
                .iter()
                .map(EncapsulatedPacket::wire_len)
                .sum::<usize>()
    }

    /// Encodes everything after the id byte.
    pub fn encode_body(&self, dst: &mut ByteCursor) {
        self.seq_num.encode_raknet(dst);
        for pkt in &self.packets {
            pkt.encode_raknet(dst);
        }
    }

    /// Decodes everything after the id byte; encapsulated packets fill the
    /// rest of the datagram.
    pub fn decode_body(id: u8, src: &mut ByteCursor) -> Result<Self, DecodeError> {
        let seq_num = Sequence24::decode_raknet(src)?;
        let mut packets = Vec::new();
        while src.has_next() {
            packets.push(EncapsulatedPacket::decode_raknet(src)?);
        }
        Ok(Self {
            id,
            seq_num,
            packets,
        })
    }
}
