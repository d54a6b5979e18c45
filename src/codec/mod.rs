//! Wire codec (spec.md §4.1, component C1): framed binary encode/decode
//! of the tagged client/server message union.
//!
//! A packet is a concatenation of messages, each framed as
//! `MARKER(8B) || TYPE(u64 LE) || LENGTH(u64 LE) || PAYLOAD(LENGTH bytes)`.

pub mod message;
pub mod stream;
pub mod variants;

pub use message::Message;

use bytes::{Buf, BytesMut};
use thiserror::Error;
use tokio_util::codec::{Decoder, Encoder};

/// Fixed 8-byte sentinel that precedes every framed message.
pub const MARKER: [u8; 8] = [0xF6, 0x40, 0xBB, 0x78, 0xA2, 0xE7, 0x8C, 0xBB];

/// Maximum total packet size accepted by [`parse_packet`].
pub const MAX_PACKET_SIZE: usize = 10 * 1024 * 1024;

/// Maximum size of a single framed message accepted for serialisation.
pub const MAX_MESSAGE_SIZE: usize = 32 * 1024;

/// Minimum size of a frame chunk (type + length, before any payload) for
/// it to be considered for parsing at all.
const FRAME_HEADER_LEN: usize = 16;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("packet exceeds maximum size")]
    PacketTooLarge,
    #[error("message exceeds maximum size")]
    MessageTooLarge,
    #[error("invalid or truncated packet")]
    InvalidPacket,
    #[error("unknown message type symbol")]
    SymbolNotFound,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Parses a raw byte buffer into the list of messages it contains.
///
/// Splits the buffer on [`MARKER`]; each chunk of at least 16 bytes is
/// treated as `TYPE || LENGTH || PAYLOAD`. Unknown type symbols are
/// silently dropped, matching the designated-ignore behaviour in
/// spec.md §4.1. A truncated chunk (declared length does not match the
/// remaining bytes) fails the whole parse with [`CodecError::InvalidPacket`].
pub fn parse_packet(data: &[u8]) -> Result<Vec<Message>, CodecError> {
    if data.len() > MAX_PACKET_SIZE {
        return Err(CodecError::PacketTooLarge);
    }

    let mut messages = Vec::new();

    for chunk in split_on_marker(data) {
        if chunk.len() < FRAME_HEADER_LEN {
            continue;
        }

        let mut reader = stream::Reader::new(chunk);
        let type_symbol = reader.read_symbol().map_err(|_| CodecError::InvalidPacket)?;
        let length = reader.read_u64().map_err(|_| CodecError::InvalidPacket)? as usize;

        let remaining = chunk.len() - FRAME_HEADER_LEN;
        if remaining != length {
            return Err(CodecError::InvalidPacket);
        }

        let payload = &chunk[FRAME_HEADER_LEN..];

        match message::decode_message(type_symbol, payload) {
            Some(result) => messages.push(result.map_err(|_| CodecError::InvalidPacket)?),
            // Unknown or designated-ignore type symbol: dropped by design.
            None => continue,
        }
    }

    Ok(messages)
}

/// Serialises a list of messages into a single packet buffer.
///
/// Fails with [`CodecError::SymbolNotFound`] if any message has no
/// known wire encoding (should never happen for variants produced by
/// this crate, but guards against a bad hand-built message).
pub fn serialize_packet(messages: &[Message]) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::new();

    for message in messages {
        let type_symbol = message.type_symbol();
        let mut payload_writer = stream::Writer::new();
        message::encode_message(message, &mut payload_writer)?;
        let payload = payload_writer.into_bytes();

        if payload.len() > MAX_MESSAGE_SIZE {
            return Err(CodecError::MessageTooLarge);
        }

        out.extend_from_slice(&MARKER);
        out.extend_from_slice(&type_symbol.0.to_le_bytes());
        out.extend_from_slice(&(payload.len() as u64).to_le_bytes());
        out.extend_from_slice(&payload);
    }

    if out.len() > MAX_PACKET_SIZE {
        return Err(CodecError::PacketTooLarge);
    }

    Ok(out)
}

/// Streaming `tokio_util::codec` adapter over one connection's byte
/// stream, decoding and encoding one message at a time rather than a
/// whole packet (spec.md §4.1: the wire protocol is a stream of framed
/// messages, not a single bounded blob). Grounded in the same
/// MARKER/TYPE/LENGTH/PAYLOAD framing [`parse_packet`]/[`serialize_packet`]
/// use; this type just drives that framing incrementally against a
/// `BytesMut` read buffer the way `tokio_util::codec::LengthDelimitedCodec`
/// drives its own length header.
#[derive(Debug, Default)]
pub struct FrameCodec;

impl Decoder for FrameCodec {
    type Item = Message;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Message>, CodecError> {
        loop {
            if src.len() < MARKER.len() {
                return Ok(None);
            }

            if src[..MARKER.len()] != MARKER {
                match find_marker(src) {
                    Some(pos) if pos > 0 => {
                        src.advance(pos);
                        continue;
                    }
                    Some(_) => unreachable!("marker mismatch already ruled out at position 0"),
                    None => {
                        let keep = MARKER.len() - 1;
                        let drop = src.len().saturating_sub(keep);
                        src.advance(drop);
                        return Ok(None);
                    }
                }
            }

            if src.len() < MARKER.len() + FRAME_HEADER_LEN {
                return Ok(None);
            }

            let header = &src[MARKER.len()..MARKER.len() + FRAME_HEADER_LEN];
            let mut reader = stream::Reader::new(header);
            let type_symbol = reader.read_symbol().map_err(|_| CodecError::InvalidPacket)?;
            let length = reader.read_u64().map_err(|_| CodecError::InvalidPacket)? as usize;

            if length > MAX_MESSAGE_SIZE {
                return Err(CodecError::MessageTooLarge);
            }

            let total = MARKER.len() + FRAME_HEADER_LEN + length;
            if src.len() < total {
                src.reserve(total - src.len());
                return Ok(None);
            }

            let payload = src[MARKER.len() + FRAME_HEADER_LEN..total].to_vec();
            src.advance(total);

            match message::decode_message(type_symbol, &payload) {
                Some(result) => return Ok(Some(result.map_err(|_| CodecError::InvalidPacket)?)),
                // Unknown or designated-ignore type symbol: skip and keep reading.
                None => continue,
            }
        }
    }
}

impl Encoder<Message> for FrameCodec {
    type Error = CodecError;

    fn encode(&mut self, item: Message, dst: &mut BytesMut) -> Result<(), CodecError> {
        let type_symbol = item.type_symbol();
        let mut payload_writer = stream::Writer::new();
        message::encode_message(&item, &mut payload_writer)?;
        let payload = payload_writer.into_bytes();

        if payload.len() > MAX_MESSAGE_SIZE {
            return Err(CodecError::MessageTooLarge);
        }

        dst.extend_from_slice(&MARKER);
        dst.extend_from_slice(&type_symbol.0.to_le_bytes());
        dst.extend_from_slice(&(payload.len() as u64).to_le_bytes());
        dst.extend_from_slice(&payload);
        Ok(())
    }
}

/// Splits `data` on occurrences of [`MARKER`], returning the bytes that
/// follow each marker (not including the marker itself). Bytes before
/// the first marker are discarded, matching a sender that always opens
/// with the sentinel.
fn split_on_marker(data: &[u8]) -> Vec<&[u8]> {
    let mut chunks = Vec::new();
    let mut rest = data;

    while let Some(pos) = find_marker(rest) {
        rest = &rest[pos + MARKER.len()..];
        let next = find_marker(rest).unwrap_or(rest.len());
        chunks.push(&rest[..next]);
    }

    chunks
}

fn find_marker(data: &[u8]) -> Option<usize> {
    if data.len() < MARKER.len() {
        return None;
    }
    data.windows(MARKER.len()).position(|w| w == MARKER)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::codec::variants::observability::{LogLevel, RemoteLogSet};
    use crate::identity::to_symbol;

    #[test]
    fn test_packet_splitting_roundtrip() {
        let messages = vec![
            Message::RemoteLogSet(RemoteLogSet {
                xpid: "OVR-1".to_string(),
                opaque: [1, 2, 3, 4],
                level: LogLevel::Info,
                strings: vec!["hello".to_string()],
            }),
            Message::RemoteLogSet(RemoteLogSet {
                xpid: "OVR-2".to_string(),
                opaque: [5, 6, 7, 8],
                level: LogLevel::Error,
                strings: vec![],
            }),
        ];

        let bytes = serialize_packet(&messages).unwrap();
        let decoded = parse_packet(&bytes).unwrap();
        assert_eq!(decoded, messages);
    }

    #[test]
    fn test_unknown_type_symbol_is_dropped() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&MARKER);
        bytes.extend_from_slice(&to_symbol("totally_unknown_message_type").0.to_le_bytes());
        bytes.extend_from_slice(&0u64.to_le_bytes());

        let decoded = parse_packet(&bytes).unwrap();
        assert!(decoded.is_empty());
    }

    #[test]
    fn test_truncated_chunk_is_invalid() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&MARKER);
        bytes.extend_from_slice(&to_symbol("totally_unknown_message_type").0.to_le_bytes());
        // Declares 10 bytes of payload but provides none.
        bytes.extend_from_slice(&10u64.to_le_bytes());

        assert!(matches!(parse_packet(&bytes), Err(CodecError::InvalidPacket)));
    }

    #[test]
    fn test_frame_codec_decodes_one_message_at_a_time() {
        let messages = vec![
            Message::RemoteLogSet(RemoteLogSet {
                xpid: "OVR-1".to_string(),
                opaque: [1, 2, 3, 4],
                level: LogLevel::Info,
                strings: vec!["hello".to_string()],
            }),
            Message::RemoteLogSet(RemoteLogSet {
                xpid: "OVR-2".to_string(),
                opaque: [5, 6, 7, 8],
                level: LogLevel::Error,
                strings: vec![],
            }),
        ];

        let bytes = serialize_packet(&messages).unwrap();
        let mut buf = BytesMut::from(&bytes[..]);
        let mut codec = FrameCodec;

        let first = codec.decode(&mut buf).unwrap().unwrap();
        let second = codec.decode(&mut buf).unwrap().unwrap();
        assert!(codec.decode(&mut buf).unwrap().is_none());

        assert_eq!(vec![first, second], messages);
    }

    #[test]
    fn test_frame_codec_waits_for_a_split_frame() {
        let bytes = serialize_packet(&[Message::RemoteLogSet(RemoteLogSet {
            xpid: "OVR-1".to_string(),
            opaque: [1, 2, 3, 4],
            level: LogLevel::Info,
            strings: vec![],
        })])
        .unwrap();

        let mut codec = FrameCodec;
        let mut buf = BytesMut::from(&bytes[..bytes.len() - 2]);
        assert!(codec.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(&bytes[bytes.len() - 2..]);
        assert!(codec.decode(&mut buf).unwrap().is_some());
    }

    #[test]
    fn test_frame_codec_encode_decode_roundtrip() {
        let message = Message::RemoteLogSet(RemoteLogSet {
            xpid: "OVR-3".to_string(),
            opaque: [9, 9, 9, 9],
            level: LogLevel::Warning,
            strings: vec!["roundtrip".to_string()],
        });

        let mut codec = FrameCodec;
        let mut buf = BytesMut::new();
        codec.encode(message.clone(), &mut buf).unwrap();

        let decoded = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded, message);
    }

    #[test]
    fn test_packet_over_size_cap_rejected() {
        let oversized = vec![0u8; MAX_PACKET_SIZE + 1];
        assert!(matches!(
            parse_packet(&oversized),
            Err(CodecError::PacketTooLarge)
        ));
    }
}
