use crate::protocol::{
    constants::RAKNET_DATAGRAM_HEADER_SIZE, datagram::DataPacket,
    encapsulated_packet::EncapsulatedPacket, types::Sequence24,
};

/// Accumulates encapsulated packets for one outgoing DataPacket.
#[derive(Debug)]
pub struct DataPacketContainer {
    id: u8,
    packets: Vec<EncapsulatedPacket>,
    wire_len: usize,
}

impl DataPacketContainer {
    /// `id` is the DataPacket id the batches go out under.
    pub fn new(id: u8) -> Self {
        Self {
            id,
            packets: Vec::new(),
            wire_len: RAKNET_DATAGRAM_HEADER_SIZE,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    pub fn add(&mut self, packet: EncapsulatedPacket) {
        self.wire_len += packet.wire_len();
        self.packets.push(packet);
    }

    /// Encoded length of the DataPacket built so far.
    pub fn wire_len(&self) -> usize {
        self.wire_len
    }

    /// Takes the accumulated packets as a DataPacket numbered `seq_num`.
    pub fn take(&mut self, seq_num: Sequence24) -> DataPacket {
        let mut packet = DataPacket::new(self.id, seq_num);
        packet.packets = std::mem::take(&mut self.packets);
        self.wire_len = RAKNET_DATAGRAM_HEADER_SIZE;
        packet
    }

    /// Drops everything accumulated.
    pub fn clear(&mut self) {
        self.packets.clear();
        self.wire_len = RAKNET_DATAGRAM_HEADER_SIZE;
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::protocol::reliability::Reliability;

    #[test]
    fn tracks_encoded_length() {
        let mut c = DataPacketContainer::new(0x84);
        assert!(c.is_empty());
        assert_eq!(c.wire_len(), 4);

        c.add(EncapsulatedPacket::new(
            Reliability::Unreliable,
            Bytes::from_static(b"\x00abc"),
        ));
        c.add(
            EncapsulatedPacket::new(Reliability::Reliable, Bytes::from_static(b"\x01"))
                .with_message(Sequence24::new(0)),
        );
        assert_eq!(c.wire_len(), 4 + 7 + 7);

        let dp = c.take(Sequence24::new(3));
        assert_eq!(dp.id, 0x84);
        assert_eq!(dp.seq_num, Sequence24::new(3));
        assert_eq!(dp.packets.len(), 2);
        assert_eq!(dp.wire_len(), 18);
        assert!(c.is_empty());
        assert_eq!(c.wire_len(), 4);
    }
}
