//! Growable byte buffer with a read offset.
//!
//! Writes always append. Reads advance the offset and fail with
//! [`DecodeError::UnexpectedEof`] instead of panicking when the buffer runs
//! dry. Triads default to little-endian and every other multi-byte field to
//! big-endian, which is what the wrapped protocol expects.

use std::net::{Ipv4Addr, SocketAddrV4};

use bytes::{BufMut, Bytes, BytesMut};

use crate::protocol::packet::DecodeError;

/// Byte order of a single field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
}

#[derive(Debug, Clone, Default)]
pub struct ByteCursor {
    buf: BytesMut,
    offset: usize,
}

impl ByteCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
            offset: 0,
        }
    }

    /// Total number of bytes held, consumed or not.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.offset
    }

    pub fn has_next(&self) -> bool {
        self.offset < self.buf.len()
    }

    /// The unconsumed remainder.
    pub fn bytes(&self) -> &[u8] {
        &self.buf[self.offset..]
    }

    /// Drops the already-consumed prefix.
    pub fn trim(&mut self) {
        let _ = self.buf.split_to(self.offset);
        self.offset = 0;
    }

    /// Freezes the unconsumed remainder.
    pub fn into_bytes(mut self) -> Bytes {
        self.trim();
        self.buf.freeze()
    }

    // writers

    pub fn put(&mut self, v: &[u8]) {
        self.buf.put_slice(v);
    }

    pub fn put_byte(&mut self, v: u8) {
        self.buf.put_u8(v);
    }

    pub fn put_short(&mut self, v: u16) {
        self.put_short_endian(v, Endian::Big);
    }

    pub fn put_short_endian(&mut self, v: u16, endian: Endian) {
        match endian {
            Endian::Big => self.buf.put_u16(v),
            Endian::Little => self.buf.put_u16_le(v),
        }
    }

    pub fn put_triad(&mut self, v: u32) {
        self.put_triad_endian(v, Endian::Little);
    }

    pub fn put_triad_endian(&mut self, v: u32, endian: Endian) {
        let [b0, b1, b2, _] = v.to_le_bytes();
        match endian {
            Endian::Little => self.buf.put_slice(&[b0, b1, b2]),
            Endian::Big => self.buf.put_slice(&[b2, b1, b0]),
        }
    }

    pub fn put_int(&mut self, v: u32) {
        self.put_int_endian(v, Endian::Big);
    }

    pub fn put_int_endian(&mut self, v: u32, endian: Endian) {
        match endian {
            Endian::Big => self.buf.put_u32(v),
            Endian::Little => self.buf.put_u32_le(v),
        }
    }

    pub fn put_long(&mut self, v: u64) {
        self.put_long_endian(v, Endian::Big);
    }

    pub fn put_long_endian(&mut self, v: u64, endian: Endian) {
        match endian {
            Endian::Big => self.buf.put_u64(v),
            Endian::Little => self.buf.put_u64_le(v),
        }
    }

    pub fn put_float(&mut self, v: f32) {
        self.put_float_endian(v, Endian::Big);
    }

    pub fn put_float_endian(&mut self, v: f32, endian: Endian) {
        match endian {
            Endian::Big => self.buf.put_f32(v),
            Endian::Little => self.buf.put_f32_le(v),
        }
    }

    /// UTF-8 string behind a u16 length prefix. Longer strings are cut at
    /// `u16::MAX` bytes.
    pub fn put_str(&mut self, v: &str) {
        self.put_bytes(v.as_bytes());
    }

    pub fn put_str_endian(&mut self, v: &str, endian: Endian) {
        self.put_bytes_endian(v.as_bytes(), endian);
    }

    pub fn put_bytes(&mut self, v: &[u8]) {
        self.put_bytes_endian(v, Endian::Big);
    }

    pub fn put_bytes_endian(&mut self, v: &[u8], endian: Endian) {
        let len = v.len().min(u16::MAX as usize);
        self.put_short_endian(len as u16, endian);
        self.put(&v[..len]);
    }

    /// IPv4 address: version byte, bitwise-NOT octets, big-endian port.
    pub fn put_addr(&mut self, addr: SocketAddrV4) {
        self.put_byte(4);
        let octets = addr.ip().octets();
        self.put(&[!octets[0], !octets[1], !octets[2], !octets[3]]);
        self.put_short(addr.port());
    }

    // readers

    fn take(&mut self, n: usize) -> Result<&[u8], DecodeError> {
        if self.remaining() < n {
            return Err(DecodeError::UnexpectedEof);
        }
        let start = self.offset;
        self.offset += n;
        Ok(&self.buf[start..self.offset])
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn next(&mut self, n: usize) -> Result<Bytes, DecodeError> {
        Ok(Bytes::copy_from_slice(self.take(n)?))
    }

    /// Consumes everything that is left.
    pub fn next_remaining(&mut self) -> Bytes {
        let out = Bytes::copy_from_slice(&self.buf[self.offset..]);
        self.offset = self.buf.len();
        out
    }

    pub fn next_byte(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take_array::<1>()?[0])
    }

    pub fn next_short(&mut self) -> Result<u16, DecodeError> {
        self.next_short_endian(Endian::Big)
    }

    pub fn next_short_endian(&mut self, endian: Endian) -> Result<u16, DecodeError> {
        let raw = self.take_array::<2>()?;
        Ok(match endian {
            Endian::Big => u16::from_be_bytes(raw),
            Endian::Little => u16::from_le_bytes(raw),
        })
    }

    pub fn next_triad(&mut self) -> Result<u32, DecodeError> {
        self.next_triad_endian(Endian::Little)
    }

    pub fn next_triad_endian(&mut self, endian: Endian) -> Result<u32, DecodeError> {
        let [a, b, c] = self.take_array::<3>()?;
        Ok(match endian {
            Endian::Little => u32::from_le_bytes([a, b, c, 0]),
            Endian::Big => u32::from_be_bytes([0, a, b, c]),
        })
    }

    pub fn next_int(&mut self) -> Result<u32, DecodeError> {
        self.next_int_endian(Endian::Big)
    }

    pub fn next_int_endian(&mut self, endian: Endian) -> Result<u32, DecodeError> {
        let raw = self.take_array::<4>()?;
        Ok(match endian {
            Endian::Big => u32::from_be_bytes(raw),
            Endian::Little => u32::from_le_bytes(raw),
        })
    }

    pub fn next_long(&mut self) -> Result<u64, DecodeError> {
        self.next_long_endian(Endian::Big)
    }

    pub fn next_long_endian(&mut self, endian: Endian) -> Result<u64, DecodeError> {
        let raw = self.take_array::<8>()?;
        Ok(match endian {
            Endian::Big => u64::from_be_bytes(raw),
            Endian::Little => u64::from_le_bytes(raw),
        })
    }

    pub fn next_float(&mut self) -> Result<f32, DecodeError> {
        self.next_float_endian(Endian::Big)
    }

    pub fn next_float_endian(&mut self, endian: Endian) -> Result<f32, DecodeError> {
        let raw = self.take_array::<4>()?;
        Ok(match endian {
            Endian::Big => f32::from_be_bytes(raw),
            Endian::Little => f32::from_le_bytes(raw),
        })
    }

    pub fn next_str(&mut self) -> Result<String, DecodeError> {
        self.next_str_endian(Endian::Big)
    }

    pub fn next_str_endian(&mut self, endian: Endian) -> Result<String, DecodeError> {
        let raw = self.next_bytes_endian(endian)?;
        String::from_utf8(raw.to_vec()).map_err(|_| DecodeError::InvalidString)
    }

    pub fn next_bytes(&mut self) -> Result<Bytes, DecodeError> {
        self.next_bytes_endian(Endian::Big)
    }

    pub fn next_bytes_endian(&mut self, endian: Endian) -> Result<Bytes, DecodeError> {
        let len = self.next_short_endian(endian)? as usize;
        self.next(len)
    }

    pub fn next_addr(&mut self) -> Result<SocketAddrV4, DecodeError> {
        let version = self.next_byte()?;
        if version != 4 {
            return Err(DecodeError::InvalidAddrVersion(version));
        }
        let [a, b, c, d] = self.take_array::<4>()?;
        let port = self.next_short()?;
        Ok(SocketAddrV4::new(Ipv4Addr::new(!a, !b, !c, !d), port))
    }
}

/// Lowercase hex dump, for logging datagrams.
pub fn hex(bytes: &[u8]) -> String {
    use std::fmt::Write;

    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(out, "{b:02x}");
    }
    out
}

impl From<&[u8]> for ByteCursor {
    fn from(value: &[u8]) -> Self {
        Self {
            buf: BytesMut::from(value),
            offset: 0,
        }
    }
}

impl From<Vec<u8>> for ByteCursor {
    fn from(value: Vec<u8>) -> Self {
        Self {
            buf: BytesMut::from(&value[..]),
            offset: 0,
        }
    }
}

impl From<Bytes> for ByteCursor {
    fn from(value: Bytes) -> Self {
        Self {
            buf: BytesMut::from(&value[..]),
            offset: 0,
        }
    }
}
