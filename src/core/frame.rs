//! Frame encoding and decoding.
//!
//! A frame is a 4-byte big-endian length, a 1-byte type tag and the payload.
//! The length covers the length field itself plus the tag, i.e. it is always
//! `payload.len() + 5`.

use bytes::{BufMut, Bytes, BytesMut};
use tracing::trace;

use crate::error::{FramingError, Result};
use crate::transport::Transport;

/// Size of the length field in bytes.
pub const LENGTH_FIELD_SIZE: usize = 4;

/// Size of the frame header (length field + type tag) in bytes.
pub const HEADER_SIZE: usize = LENGTH_FIELD_SIZE + 1;

/// Default maximum payload size accepted from the peer (16 MiB).
pub const MAX_PAYLOAD_SIZE: usize = 16 * 1024 * 1024;

/// Largest payload whose total length still fits the u32 length field.
pub const MAX_ENCODABLE_PAYLOAD: usize = u32::MAX as usize - HEADER_SIZE;

/// Decoded frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Number of payload bytes following the header.
    pub payload_len: usize,
    /// Message type tag.
    pub type_tag: u8,
}

impl FrameHeader {
    /// Decodes the 5 header bytes.
    ///
    /// Fails with [`FramingError::Underflow`] when the declared length is
    /// smaller than the header itself.
    pub fn decode(bytes: &[u8; HEADER_SIZE]) -> std::result::Result<Self, FramingError> {
        let declared = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let payload_len = declared
            .checked_sub(HEADER_SIZE as u32)
            .ok_or(FramingError::Underflow(declared))?;

        Ok(Self {
            payload_len: payload_len as usize,
            type_tag: bytes[4],
        })
    }

    /// Value of the length field for this header.
    pub fn total_length(&self) -> u32 {
        (self.payload_len + HEADER_SIZE) as u32
    }

    /// Encodes the header into `buf`.
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u32(self.total_length());
        buf.put_u8(self.type_tag);
    }
}

/// A complete frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub type_tag: u8,
    pub payload: Bytes,
}

impl Frame {
    pub fn new(type_tag: u8, payload: impl Into<Bytes>) -> Self {
        Self {
            type_tag,
            payload: payload.into(),
        }
    }

    /// Encodes the frame to wire bytes.
    pub fn encode(&self) -> std::result::Result<Bytes, FramingError> {
        encode(self.type_tag, &self.payload)
    }

    /// Total size of the frame on the wire.
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }
}

/// Fails when a payload of `payload_len` bytes cannot be announced in the
/// u32 length field.
pub fn check_encodable(payload_len: usize) -> std::result::Result<(), FramingError> {
    if payload_len > MAX_ENCODABLE_PAYLOAD {
        return Err(FramingError::Oversized {
            size: payload_len,
            max: MAX_ENCODABLE_PAYLOAD,
        });
    }
    Ok(())
}

/// Produces `[len + 5 (BE u32)] [type_tag] [payload]`.
pub fn encode(type_tag: u8, payload: &[u8]) -> std::result::Result<Bytes, FramingError> {
    check_encodable(payload.len())?;

    let header = FrameHeader {
        payload_len: payload.len(),
        type_tag,
    };
    let mut buf = BytesMut::with_capacity(HEADER_SIZE + payload.len());
    header.encode(&mut buf);
    buf.put_slice(payload);
    Ok(buf.freeze())
}

/// Decodes a header into `(payload_len, type_tag)`.
pub fn decode_header(bytes: &[u8; HEADER_SIZE]) -> std::result::Result<(usize, u8), FramingError> {
    let header = FrameHeader::decode(bytes)?;
    Ok((header.payload_len, header.type_tag))
}

/// Frames `payload` and writes it to `transport`, refusing payloads above `max_payload`.
pub fn write_frame(
    transport: &mut dyn Transport,
    type_tag: u8,
    payload: &[u8],
    max_payload: usize,
) -> Result<usize> {
    if payload.len() > max_payload {
        return Err(FramingError::Oversized {
            size: payload.len(),
            max: max_payload,
        }
        .into());
    }

    let bytes = encode(type_tag, payload)?;
    transport.write_all(&bytes)?;
    trace!(type_tag, bytes = bytes.len(), "frame written");
    Ok(bytes.len())
}

/// Reads exactly one frame: the 5-byte header, then exactly `payload_len` bytes.
///
/// The payload length is checked against `max_payload` before the payload
/// buffer is allocated.
pub fn read_frame(transport: &mut dyn Transport, max_payload: usize) -> Result<Frame> {
    let mut header_bytes = [0u8; HEADER_SIZE];
    transport.read_exact(&mut header_bytes)?;
    let header = FrameHeader::decode(&header_bytes)?;

    if header.payload_len > max_payload {
        return Err(FramingError::Oversized {
            size: header.payload_len,
            max: max_payload,
        }
        .into());
    }

    let payload = transport.read_n(header.payload_len)?;
    trace!(
        type_tag = header.type_tag,
        bytes = header.payload_len,
        "frame read"
    );

    Ok(Frame {
        type_tag: header.type_tag,
        payload,
    })
}
