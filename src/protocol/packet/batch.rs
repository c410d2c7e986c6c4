//! Zlib-compressed bundle of application packets.

use std::io::{self, Read, Write};

use bytes::Bytes;
use flate2::{Compression, read::ZlibDecoder, write::ZlibEncoder};

use crate::protocol::{
    constants::{BATCH_THRESHOLD, MAXIMUM_BATCH_SIZE},
    cursor::ByteCursor,
    packet::{DecodeError, Packet, RaknetEncodable},
};

/// `[u32 compressed length][zlib((u32 length + packet)*)]`
///
/// The payload is kept compressed; [`Batch::packets`] inflates it on demand
/// with an upper bound on the inflated size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub payload: Bytes,
}

impl Batch {
    /// Compresses already-encoded application packets (id byte included).
    pub fn compress<I, B>(packets: I) -> io::Result<Self>
    where
        I: IntoIterator<Item = B>,
        B: AsRef<[u8]>,
    {
        let mut raw = ByteCursor::new();
        for packet in packets {
            let packet = packet.as_ref();
            raw.put_int(packet.len() as u32);
            raw.put(packet);
        }

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(raw.bytes())?;
        Ok(Self {
            payload: Bytes::from(encoder.finish()?),
        })
    }

    /// Wraps an encoded packet in a single-entry batch once it reaches
    /// [`BATCH_THRESHOLD`]; smaller packets are returned unchanged.
    pub fn wrap_if_large(buffer: Bytes) -> io::Result<Bytes> {
        if buffer.len() < BATCH_THRESHOLD {
            return Ok(buffer);
        }
        let batch = Batch::compress([&buffer])?;
        let mut dst = ByteCursor::with_capacity(batch.payload.len() + 5);
        dst.put_byte(Self::ID);
        batch.encode_body(&mut dst);
        Ok(dst.into_bytes())
    }

    /// Inflates the payload and splits it into the contained packets.
    pub fn packets(&self) -> Result<Vec<Bytes>, DecodeError> {
        self.packets_with_limit(MAXIMUM_BATCH_SIZE)
    }

    pub fn packets_with_limit(&self, limit: usize) -> Result<Vec<Bytes>, DecodeError> {
        let mut inflated = Vec::new();
        ZlibDecoder::new(&self.payload[..])
            .take(limit as u64 + 1)
            .read_to_end(&mut inflated)
            .map_err(DecodeError::Decompress)?;
        if inflated.len() > limit {
            return Err(DecodeError::BatchTooLarge { limit });
        }

        let mut src = ByteCursor::from(inflated);
        let mut packets = Vec::new();
        while src.has_next() {
            let len = src.next_int()? as usize;
            packets.push(src.next(len)?);
        }
        Ok(packets)
    }
}

impl Packet for Batch {
    const ID: u8 = 0x92;

    fn encode_body(&self, dst: &mut ByteCursor) {
        (self.payload.len() as u32).encode_raknet(dst);
        dst.put(&self.payload);
    }

    fn decode_body(src: &mut ByteCursor) -> Result<Self, DecodeError> {
        let len = u32::decode_raknet(src)? as usize;
        Ok(Self {
            payload: src.next(len)?,
        })
    }
}
