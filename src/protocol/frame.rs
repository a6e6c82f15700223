//! Frame struct with typed accessors.
//!
//! Represents one complete length-prefixed wire unit.
//! Uses `bytes::Bytes` for zero-copy payload sharing.

use bytes::Bytes;

use super::wire_format::{Header, CLIENT_HANDLE_FLOOR, HEADER_SIZE};

/// A complete protocol frame.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Correlation handle. Values below [`CLIENT_HANDLE_FLOOR`] mark
    /// server-initiated calls.
    pub handle: u32,
    /// XML-RPC document bytes (zero-copy via `bytes::Bytes`).
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame from handle and payload.
    pub fn new(handle: u32, payload: Bytes) -> Self {
        Self { handle, payload }
    }

    /// Get a reference to the payload bytes.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Get the payload length.
    #[inline]
    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }

    /// Check if this is a server-initiated call (push event).
    #[inline]
    pub fn is_callback(&self) -> bool {
        self.handle < CLIENT_HANDLE_FLOOR
    }

    /// Check if this frame answers a pending client call.
    #[inline]
    pub fn is_reply(&self) -> bool {
        !self.is_callback()
    }
}

/// Build a complete frame as a single byte vector.
///
/// Encodes the 8-byte header and appends the payload.
pub fn build_frame(handle: u32, payload: &[u8]) -> Vec<u8> {
    let header = Header::new(payload.len() as u32, handle);
    let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());
    buf.extend_from_slice(&header.encode());
    buf.extend_from_slice(payload);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_creation() {
        let frame = Frame::new(CLIENT_HANDLE_FLOOR + 7, Bytes::from_static(b"<xml/>"));

        assert_eq!(frame.handle, CLIENT_HANDLE_FLOOR + 7);
        assert_eq!(frame.payload(), b"<xml/>");
        assert_eq!(frame.payload_len(), 6);
        assert!(frame.is_reply());
        assert!(!frame.is_callback());
    }

    #[test]
    fn test_callback_classification() {
        let frame = Frame::new(0x42, Bytes::new());
        assert!(frame.is_callback());
        assert!(!frame.is_reply());
    }

    #[test]
    fn test_frame_empty_payload() {
        let frame = Frame::new(1, Bytes::new());
        assert_eq!(frame.payload_len(), 0);
        assert!(frame.payload().is_empty());
    }

    #[test]
    fn test_build_frame() {
        let bytes = build_frame(CLIENT_HANDLE_FLOOR, b"hello");

        assert_eq!(bytes.len(), HEADER_SIZE + 5);

        let header = Header::decode(&bytes[..HEADER_SIZE]).unwrap();
        assert_eq!(header.length, 5);
        assert_eq!(header.handle, CLIENT_HANDLE_FLOOR);
        assert_eq!(&bytes[HEADER_SIZE..], b"hello");
    }

    #[test]
    fn test_build_frame_empty_payload() {
        let bytes = build_frame(1, b"");
        assert_eq!(bytes.len(), HEADER_SIZE);
    }
}
