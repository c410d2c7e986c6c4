//! Selective acknowledgement packets.
//!
//! Both carry the same payload: a run-length encoded set of datagram
//! sequence numbers. A record is either a single number (flag `0x01`) or an
//! inclusive `start..=end` range (flag `0x00`).

use crate::protocol::{
    cursor::ByteCursor,
    packet::{DecodeError, Packet, RaknetEncodable},
    types::Sequence24,
};

const SINGLE_FLAG: u8 = 0x01;

/// An inclusive run of sequence numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceRange {
    pub start: Sequence24,
    pub end: Sequence24,
}

impl SequenceRange {
    pub fn single(seq: Sequence24) -> Self {
        Self {
            start: seq,
            end: seq,
        }
    }

    pub fn contains(&self, seq: Sequence24) -> bool {
        seq.diff(self.start) >= 0 && self.end.diff(seq) >= 0
    }

    /// Number of sequence numbers covered; zero for an inverted range.
    pub fn len(&self) -> u32 {
        let d = self.end.diff(self.start);
        if d < 0 { 0 } else { d as u32 + 1 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AckNackPayload {
    pub ranges: Vec<SequenceRange>,
}

impl AckNackPayload {
    /// Builds the records from an arbitrary set of sequence numbers. Numbers
    /// are sorted and merged into contiguous runs; duplicates collapse.
    pub fn from_seq_nums<I>(seq_nums: I) -> Self
    where
        I: IntoIterator<Item = Sequence24>,
    {
        let mut values: Vec<u32> = seq_nums.into_iter().map(|s| s.value()).collect();
        values.sort_unstable();
        values.dedup();

        let mut ranges = Vec::new();
        let mut iter = values.into_iter();
        let Some(first) = iter.next() else {
            return Self { ranges };
        };
        let (mut start, mut last) = (first, first);
        for n in iter {
            if last + 1 == n {
                last = n;
            } else {
                ranges.push(SequenceRange {
                    start: Sequence24::new(start),
                    end: Sequence24::new(last),
                });
                start = n;
                last = n;
            }
        }
        ranges.push(SequenceRange {
            start: Sequence24::new(start),
            end: Sequence24::new(last),
        });
        Self { ranges }
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn contains(&self, seq: Sequence24) -> bool {
        self.ranges.iter().any(|r| r.contains(seq))
    }

    /// Expands every record. Only meant for small payloads; the session
    /// matches against its own ack-wait map with [`Self::contains`] instead.
    pub fn seq_nums(&self) -> impl Iterator<Item = Sequence24> + '_ {
        self.ranges
            .iter()
            .flat_map(|r| (0..r.len()).map(move |i| r.start + i as i32))
    }
}

impl RaknetEncodable for AckNackPayload {
    fn encode_raknet(&self, dst: &mut ByteCursor) {
        (self.ranges.len() as u16).encode_raknet(dst);
        for range in &self.ranges {
            if range.start == range.end {
                dst.put_byte(SINGLE_FLAG);
                range.start.encode_raknet(dst);
            } else {
                dst.put_byte(0x00);
                range.start.encode_raknet(dst);
                range.end.encode_raknet(dst);
            }
        }
    }

    fn decode_raknet(src: &mut ByteCursor) -> Result<Self, DecodeError> {
        let count = u16::decode_raknet(src)?;
        let mut ranges = Vec::with_capacity(count.min(256) as usize);
        for _ in 0..count {
            let flag = src.next_byte()?;
            let start = Sequence24::decode_raknet(src)?;
            let end = if flag & SINGLE_FLAG != 0 {
                start
            } else {
                Sequence24::decode_raknet(src)?
            };
            ranges.push(SequenceRange { start, end });
        }
        Ok(Self { ranges })
    }
}

/// Acknowledges received datagrams.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Ack(pub AckNackPayload);

impl Packet for Ack {
    const ID: u8 = 0xc0;

    fn encode_body(&self, dst: &mut ByteCursor) {
        self.0.encode_raknet(dst);
    }

    fn decode_body(src: &mut ByteCursor) -> Result<Self, DecodeError> {
        Ok(Ack(AckNackPayload::decode_raknet(src)?))
    }
}

/// Reports datagrams the receiver is still waiting for.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Nack(pub AckNackPayload);

impl Packet for Nack {
    const ID: u8 = 0xa0;

    fn encode_body(&self, dst: &mut ByteCursor) {
        self.0.encode_raknet(dst);
    }

    fn decode_body(src: &mut ByteCursor) -> Result<Self, DecodeError> {
        Ok(Nack(AckNackPayload::decode_raknet(src)?))
    }
}
