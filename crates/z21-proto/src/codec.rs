//! Z21 LAN frame codec.
//!
//! Every message travels as `[len: u16 LE][header: u16 LE][data...]` where
//! `len` counts the 4-byte prefix. A single UDP datagram may carry several
//! frames back to back. X-Bus payloads (header `0x40`) end with an XOR
//! checksum over all preceding X-Bus bytes.

use bytes::{BufMut, BytesMut};

/// Frame length prefix + header, in bytes.
const PREFIX_LEN: usize = 4;

/// One wire frame: a header word and its raw payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub header: u16,
    pub data: Vec<u8>,
}

impl Frame {
    pub fn new(header: u16, data: Vec<u8>) -> Self {
        Self { header, data }
    }

    /// Frame with an X-Bus payload; appends the XOR checksum.
    pub fn xbus(header: u16, payload: &[u8]) -> Self {
        let mut data = payload.to_vec();
        data.push(xor_checksum(payload));
        Self { header, data }
    }
}

/// Serialize a frame into wire bytes.
pub fn encode(frame: &Frame) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(PREFIX_LEN + frame.data.len());
    buf.put_u16_le((PREFIX_LEN + frame.data.len()) as u16);
    buf.put_u16_le(frame.header);
    buf.put_slice(&frame.data);
    buf.to_vec()
}

/// Split a datagram into frames.
///
/// Decoding is tolerant: a truncated or nonsense tail is logged and
/// skipped so one bad frame cannot poison the frames before it.
pub fn decode_datagram(mut buf: &[u8]) -> Vec<Frame> {
    let mut frames = Vec::new();

    while buf.len() >= PREFIX_LEN {
        let len = u16::from_le_bytes([buf[0], buf[1]]) as usize;
        if len < PREFIX_LEN || len > buf.len() {
            tracing::debug!(len, remaining = buf.len(), "discarding malformed frame tail");
            break;
        }
        let header = u16::from_le_bytes([buf[2], buf[3]]);
        frames.push(Frame::new(header, buf[PREFIX_LEN..len].to_vec()));
        buf = &buf[len..];
    }

    if !buf.is_empty() && frames.is_empty() {
        tracing::debug!(bytes = buf.len(), "datagram contained no decodable frame");
    }
    frames
}

/// XOR of all bytes, the X-Bus checksum.
pub fn xor_checksum(payload: &[u8]) -> u8 {
    payload.iter().fold(0, |acc, b| acc ^ b)
}

/// Strip and verify the trailing X-Bus checksum.
///
/// Returns `None` when the payload is empty or the checksum does not match.
pub fn xbus_payload(data: &[u8]) -> Option<&[u8]> {
    let (payload, check) = data.split_at(data.len().checked_sub(1)?);
    if xor_checksum(payload) == check[0] {
        Some(payload)
    } else {
        tracing::debug!("X-Bus checksum mismatch, dropping frame");
        None
    }
}
