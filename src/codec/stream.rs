//! Direction-tagged stream primitives for the wire codec (spec.md §4.1).
//!
//! The same primitive type is used for both encode and decode; only the
//! direction differs. This mirrors the teacher's `TdfSerializer`/
//! `TdfDeserializer` split, but kept as a single pair of small helper
//! types (`Writer`/`Reader`) since our message layout is flat structs,
//! not a generic tag-group format.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Read, Write};
use uuid::Uuid;

use crate::identity::Symbol;

use super::CodecError;

/// Writes message payloads in little-endian order, per spec.md §4.1.
pub struct Writer {
    buf: BytesMut,
}

impl Writer {
    pub fn new() -> Self {
        Self {
            buf: BytesMut::new(),
        }
    }

    pub fn into_bytes(self) -> Bytes {
        self.buf.freeze()
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buf.put_u8(value);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.buf.put_u16_le(value);
    }

    pub fn write_u32(&mut self, value: u32) {
        self.buf.put_u32_le(value);
    }

    pub fn write_u64(&mut self, value: u64) {
        self.buf.put_u64_le(value);
    }

    pub fn write_i32(&mut self, value: i32) {
        self.buf.put_i32_le(value);
    }

    pub fn write_f32(&mut self, value: f32) {
        self.buf.put_f32_le(value);
    }

    pub fn write_bool(&mut self, value: bool) {
        self.buf.put_u8(value as u8);
    }

    pub fn write_symbol(&mut self, value: Symbol) {
        self.write_u64(value.0);
    }

    pub fn write_guid(&mut self, value: Uuid) {
        self.buf.extend_from_slice(value.as_bytes());
    }

    /// Writes a null-terminated string.
    pub fn write_cstring(&mut self, value: &str) {
        self.buf.extend_from_slice(value.as_bytes());
        self.buf.put_u8(0);
    }

    /// Writes a bounded-width string: a u16 length prefix followed by
    /// up to `max_len` bytes, truncating silently if the input is
    /// longer (used for fields like the truncated-at-160 login failure
    /// message in spec.md §6).
    pub fn write_bounded_string(&mut self, value: &str, max_len: usize) {
        let bytes = value.as_bytes();
        let len = bytes.len().min(max_len);
        self.write_u16(len as u16);
        self.buf.extend_from_slice(&bytes[..len]);
    }

    /// Writes a length-prefixed string table (a count followed by that
    /// many null-terminated strings), used by the remote-log message's
    /// string table (spec.md §6).
    pub fn write_string_table(&mut self, values: &[String]) {
        self.write_u32(values.len() as u32);
        for value in values {
            self.write_cstring(value);
        }
    }

    /// Writes a JSON value as a length-prefixed UTF-8 blob, optionally
    /// zlib-compressed (used for profile/session-settings payloads).
    pub fn write_json(&mut self, value: &serde_json::Value, compressed: bool) -> Result<(), CodecError> {
        let text = serde_json::to_vec(value).map_err(|_| CodecError::InvalidPacket)?;
        let payload = if compressed {
            let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
            encoder
                .write_all(&text)
                .map_err(|_| CodecError::InvalidPacket)?;
            encoder.finish().map_err(|_| CodecError::InvalidPacket)?
        } else {
            text
        };
        self.write_bool(compressed);
        self.write_u32(payload.len() as u32);
        self.buf.extend_from_slice(&payload);
        Ok(())
    }

    pub fn write_bytes(&mut self, value: &[u8]) {
        self.write_u32(value.len() as u32);
        self.buf.extend_from_slice(value);
    }
}

impl Default for Writer {
    fn default() -> Self {
        Self::new()
    }
}

/// Reads message payloads in little-endian order.
pub struct Reader<'a> {
    buf: &'a [u8],
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    fn require(&self, len: usize) -> Result<(), CodecError> {
        if self.buf.remaining() < len {
            return Err(CodecError::InvalidPacket);
        }
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8, CodecError> {
        self.require(1)?;
        Ok(self.buf.get_u8())
    }

    pub fn read_u16(&mut self) -> Result<u16, CodecError> {
        self.require(2)?;
        Ok(self.buf.get_u16_le())
    }

    pub fn read_u32(&mut self) -> Result<u32, CodecError> {
        self.require(4)?;
        Ok(self.buf.get_u32_le())
    }

    pub fn read_u64(&mut self) -> Result<u64, CodecError> {
        self.require(8)?;
        Ok(self.buf.get_u64_le())
    }

    pub fn read_i32(&mut self) -> Result<i32, CodecError> {
        self.require(4)?;
        Ok(self.buf.get_i32_le())
    }

    pub fn read_f32(&mut self) -> Result<f32, CodecError> {
        self.require(4)?;
        Ok(self.buf.get_f32_le())
    }

    pub fn read_bool(&mut self) -> Result<bool, CodecError> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_symbol(&mut self) -> Result<Symbol, CodecError> {
        Ok(Symbol(self.read_u64()?))
    }

    pub fn read_guid(&mut self) -> Result<Uuid, CodecError> {
        self.require(16)?;
        let mut bytes = [0u8; 16];
        self.buf.copy_to_slice(&mut bytes);
        Ok(Uuid::from_bytes(bytes))
    }

    /// Reads a null-terminated string.
    pub fn read_cstring(&mut self) -> Result<String, CodecError> {
        let nul_pos = self
            .buf
            .iter()
            .position(|&b| b == 0)
            .ok_or(CodecError::InvalidPacket)?;
        let mut bytes = vec![0u8; nul_pos];
        self.buf.copy_to_slice(&mut bytes);
        self.buf.advance(1); // consume the null terminator
        String::from_utf8(bytes).map_err(|_| CodecError::InvalidPacket)
    }

    pub fn read_bounded_string(&mut self) -> Result<String, CodecError> {
        let len = self.read_u16()? as usize;
        self.require(len)?;
        let mut bytes = vec![0u8; len];
        self.buf.copy_to_slice(&mut bytes);
        String::from_utf8(bytes).map_err(|_| CodecError::InvalidPacket)
    }

    pub fn read_string_table(&mut self) -> Result<Vec<String>, CodecError> {
        let count = self.read_u32()? as usize;
        let mut out = Vec::with_capacity(count.min(4096));
        for _ in 0..count {
            out.push(self.read_cstring()?);
        }
        Ok(out)
    }

    pub fn read_json(&mut self) -> Result<serde_json::Value, CodecError> {
        let compressed = self.read_bool()?;
        let len = self.read_u32()? as usize;
        self.require(len)?;
        let mut bytes = vec![0u8; len];
        self.buf.copy_to_slice(&mut bytes);

        let text = if compressed {
            let mut decoder = ZlibDecoder::new(&bytes[..]);
            let mut out = Vec::new();
            decoder
                .read_to_end(&mut out)
                .map_err(|_| CodecError::InvalidPacket)?;
            out
        } else {
            bytes
        };

        serde_json::from_slice(&text).map_err(|_| CodecError::InvalidPacket)
    }

    pub fn read_bytes(&mut self) -> Result<Vec<u8>, CodecError> {
        let len = self.read_u32()? as usize;
        self.require(len)?;
        let mut bytes = vec![0u8; len];
        self.buf.copy_to_slice(&mut bytes);
        Ok(bytes)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_numbers_roundtrip() {
        let mut w = Writer::new();
        w.write_u64(0xDEAD_BEEF_CAFE_F00D);
        w.write_i32(-42);
        w.write_bool(true);
        let bytes = w.into_bytes();

        let mut r = Reader::new(&bytes);
        assert_eq!(r.read_u64().unwrap(), 0xDEAD_BEEF_CAFE_F00D);
        assert_eq!(r.read_i32().unwrap(), -42);
        assert!(r.read_bool().unwrap());
    }

    #[test]
    fn test_cstring_roundtrip() {
        let mut w = Writer::new();
        w.write_cstring("hello");
        let bytes = w.into_bytes();
        let mut r = Reader::new(&bytes);
        assert_eq!(r.read_cstring().unwrap(), "hello");
    }

    #[test]
    fn test_json_roundtrip_compressed_and_plain() {
        let value = serde_json::json!({"appid": "1369078409873402"});
        for compressed in [false, true] {
            let mut w = Writer::new();
            w.write_json(&value, compressed).unwrap();
            let bytes = w.into_bytes();
            let mut r = Reader::new(&bytes);
            let decoded = r.read_json().unwrap();
            assert_eq!(decoded, value);
        }
    }

    #[test]
    fn test_bounded_string_truncates() {
        let mut w = Writer::new();
        let long = "x".repeat(200);
        w.write_bounded_string(&long, 160);
        let bytes = w.into_bytes();
        let mut r = Reader::new(&bytes);
        let decoded = r.read_bounded_string().unwrap();
        assert_eq!(decoded.len(), 160);
    }

    #[test]
    fn test_truncated_read_fails() {
        let mut r = Reader::new(&[0x01, 0x02]);
        assert!(r.read_u64().is_err());
    }
}
