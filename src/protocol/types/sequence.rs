use std::ops::Add;

use crate::protocol::{
    cursor::ByteCursor,
    packet::{DecodeError, RaknetEncodable},
    types::U24LE,
};

const MODULO: u32 = 1 << 24;
const MASK: u32 = MODULO - 1;
const HALF: u32 = MODULO / 2;

/// Wrapping 24-bit counter used for sequence numbers, message indexes and
/// order indexes.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash)]
pub struct Sequence24(u32);

impl Sequence24 {
    pub fn new(v: u32) -> Sequence24 {
        Sequence24(v & MASK)
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    // clone mutations.

    pub fn next(&self) -> Sequence24 {
        Sequence24::new(self.0 + 1)
    }

    pub fn prev(&self) -> Sequence24 {
        Sequence24(if self.0 == 0 { MASK } else { self.0 - 1 })
    }

    /// Signed distance `self - other`, taking wrap-around into account.
    pub fn diff(&self, other: Sequence24) -> i32 {
        let d = self.0.wrapping_sub(other.0) & MASK;
        if d >= HALF {
            d as i32 - MODULO as i32
        } else {
            d as i32
        }
    }
}

impl Ord for Sequence24 {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.diff(*other).cmp(&0)
    }
}

impl PartialOrd for Sequence24 {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Add for Sequence24 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Sequence24::new(self.0 + rhs.0)
    }
}

impl Add<i32> for Sequence24 {
    type Output = Self;

    fn add(self, rhs: i32) -> Self::Output {
        let mut value = (self.0 as i64 + rhs as i64) % MODULO as i64;

        if value < 0 {
            value += MODULO as i64;
        }

        Sequence24::new(value as u32)
    }
}

impl From<Sequence24> for U24LE {
    fn from(seq: Sequence24) -> Self {
        U24LE(seq.value())
    }
}

impl From<U24LE> for Sequence24 {
    fn from(raw: U24LE) -> Self {
        Sequence24::new(raw.0)
    }
}

impl std::fmt::Display for Sequence24 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl RaknetEncodable for Sequence24 {
    fn encode_raknet(&self, dst: &mut ByteCursor) {
        U24LE::from(*self).encode_raknet(dst);
    }

    fn decode_raknet(src: &mut ByteCursor) -> Result<Self, DecodeError> {
        Ok(Sequence24::from(U24LE::decode_raknet(src)?))
    }
}
