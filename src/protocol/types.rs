mod primitives;
mod sequence;

pub use sequence::Sequence24;

use crate::protocol::{
    constants::DEFAULT_UNCONNECTED_MAGIC,
    cursor::ByteCursor,
    packet::{DecodeError, RaknetEncodable},
};

pub type Magic = [u8; 16];

/// The 16-byte cookie every offline packet carries. Encodes as
/// [`DEFAULT_UNCONNECTED_MAGIC`]; decoding anything else is an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OfflineMagic;

impl RaknetEncodable for OfflineMagic {
    fn encode_raknet(&self, dst: &mut ByteCursor) {
        DEFAULT_UNCONNECTED_MAGIC.encode_raknet(dst);
    }

    fn decode_raknet(src: &mut ByteCursor) -> Result<Self, DecodeError> {
        if Magic::decode_raknet(src)? != DEFAULT_UNCONNECTED_MAGIC {
            return Err(DecodeError::InvalidMagic);
        }
        Ok(OfflineMagic)
    }
}

macro_rules! impl_raknet_int {
    ($ty:ty, $put:ident, $next:ident) => {
        impl RaknetEncodable for $ty {
            fn encode_raknet(&self, dst: &mut ByteCursor) {
                dst.$put(*self);
            }

            fn decode_raknet(src: &mut ByteCursor) -> Result<Self, DecodeError> {
                src.$next()
            }
        }
    };
}

// Unsigned big-endian ints:
impl_raknet_int!(u8, put_byte, next_byte);
impl_raknet_int!(u16, put_short, next_short);
impl_raknet_int!(u32, put_int, next_int);
impl_raknet_int!(u64, put_long, next_long);

/// 24-bit little-endian integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct U24LE(pub u32);

impl RaknetEncodable for U24LE {
    fn encode_raknet(&self, dst: &mut ByteCursor) {
        dst.put_triad(self.0);
    }

    fn decode_raknet(src: &mut ByteCursor) -> Result<Self, DecodeError> {
        Ok(U24LE(src.next_triad()?))
    }
}
