use std::fmt;

use bitflags::bitflags;
use bytes::Bytes;

use crate::protocol::{
    constants::SPLIT_HEADER_SIZE,
    cursor::ByteCursor,
    packet::{DecodeError, RaknetEncodable},
    reliability::Reliability,
    types::Sequence24,
};

bitflags! {
    /// Leading flag byte of an encapsulated packet.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    #[repr(transparent)]
    pub struct EncapsulatedFlags: u8 {
        const RELIABILITY = 0b1110_0000;
        const SPLIT       = 0b0001_0000;
    }
}

const RELIABILITY_SHIFT: u8 = 5;

/// Largest payload whose bit length fits the u16 length field.
pub const MAXIMUM_PAYLOAD_SIZE: usize = (u16::MAX / 8) as usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderInfo {
    pub index: Sequence24,
    pub channel: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitInfo {
    pub count: u32,
    pub id: u16,
    pub index: u32,
}

/// One application payload inside a DataPacket, with the bookkeeping its
/// reliability mode requires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncapsulatedPacket {
    pub reliability: Reliability,
    pub buffer: Bytes,
    /// Present iff `reliability.is_reliable()`.
    pub message: Option<Sequence24>,
    /// Present iff `reliability.is_ordered()`.
    pub order: Option<OrderInfo>,
    pub split: Option<SplitInfo>,
}

impl EncapsulatedPacket {
    pub fn new(reliability: Reliability, buffer: Bytes) -> Self {
        Self {
            reliability,
            buffer,
            message: None,
            order: None,
            split: None,
        }
    }

    pub fn with_message(mut self, index: Sequence24) -> Self {
        self.message = Some(index);
        self
    }

    pub fn with_order(mut self, index: Sequence24, channel: u8) -> Self {
        self.order = Some(OrderInfo { index, channel });
        self
    }

    pub fn with_split(mut self, count: u32, id: u16, index: u32) -> Self {
        self.split = Some(SplitInfo { count, id, index });
        self
    }

    /// Encoded length in bytes.
    pub fn wire_len(&self) -> usize {
        3 + if self.message.is_some() { 3 } else { 0 }
            + if self.order.is_some() { 4 } else { 0 }
            + if self.split.is_some() {
                SPLIT_HEADER_SIZE
            } else {
                0
            }
            + self.buffer.len()
    }

    pub fn require_ack(&self) -> bool {
        self.reliability.is_reliable()
    }

    fn flags(&self) -> EncapsulatedFlags {
        let mut flags = EncapsulatedFlags::from_bits_retain(
            ((self.reliability as u8) << RELIABILITY_SHIFT) & EncapsulatedFlags::RELIABILITY.bits(),
        );
        if self.split.is_some() {
            flags |= EncapsulatedFlags::SPLIT;
        }
        flags
    }
}

impl RaknetEncodable for EncapsulatedPacket {
    fn encode_raknet(&self, dst: &mut ByteCursor) {
        debug_assert_eq!(self.message.is_some(), self.reliability.is_reliable());
        debug_assert_eq!(self.order.is_some(), self.reliability.is_ordered());

        // The length field counts bits, so payloads stop at 8191 bytes.
        debug_assert!(self.buffer.len() <= MAXIMUM_PAYLOAD_SIZE);
        dst.put_byte(self.flags().bits());
        dst.put_short((self.buffer.len() * 8) as u16);

        if self.reliability.is_reliable() {
            self.message.unwrap_or_default().encode_raknet(dst);
        }

        if self.reliability.is_ordered() {
            let order = self.order.unwrap_or(OrderInfo {
                index: Sequence24::default(),
                channel: 0,
            });
            order.index.encode_raknet(dst);
            order.channel.encode_raknet(dst);
        }

        if let Some(split) = &self.split {
            split.count.encode_raknet(dst);
            split.id.encode_raknet(dst);
            split.index.encode_raknet(dst);
        }

        dst.put(&self.buffer);
    }

    fn decode_raknet(src: &mut ByteCursor) -> Result<Self, DecodeError> {
        let flags = EncapsulatedFlags::from_bits_retain(src.next_byte()?);
        let reliability = Reliability::try_from(
            (flags & EncapsulatedFlags::RELIABILITY).bits() >> RELIABILITY_SHIFT,
        )?;
        let length = (src.next_short()? as usize).div_ceil(8);

        let message = if reliability.is_reliable() {
            Some(Sequence24::decode_raknet(src)?)
        } else {
            None
        };

        let order = if reliability.is_ordered() {
            Some(OrderInfo {
                index: Sequence24::decode_raknet(src)?,
                channel: u8::decode_raknet(src)?,
            })
        } else {
            None
        };

        let split = if flags.contains(EncapsulatedFlags::SPLIT) {
            Some(SplitInfo {
                count: u32::decode_raknet(src)?,
                id: u16::decode_raknet(src)?,
                index: u32::decode_raknet(src)?,
            })
        } else {
            None
        };

        let buffer = src.next(length)?;

        Ok(EncapsulatedPacket {
            reliability,
            buffer,
            message,
            order,
            split,
        })
    }
}

impl fmt::Display for EncapsulatedPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EncapsulatedPacket({}", self.reliability as u8)?;
        match &self.message {
            Some(index) => write!(f, ",m[{index}]")?,
            None => f.write_str(",-")?,
        }
        match &self.order {
            Some(order) => write!(f, ",o[{},{}]", order.index, order.channel)?,
            None => f.write_str(",-")?,
        }
        match &self.split {
            Some(split) => write!(f, ",s[{},{},{}]", split.count, split.id, split.index)?,
            None => f.write_str(",-")?,
        }
        write!(f, ",{})", self.buffer.len())
    }
}
