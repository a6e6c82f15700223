//! Wire format encoding and decoding.
//!
//! Post-handshake frames carry an 8-byte header:
//! ```text
//! ┌──────────┬──────────┐
//! │ Length   │ Handle   │
//! │ 4 bytes  │ 4 bytes  │
//! │ uint32 LE│ uint32 LE│
//! └──────────┴──────────┘
//! ```
//!
//! `Length` counts only the XML-RPC payload that follows, not the header.
//! All multi-byte integers are Little Endian.
//!
//! The pre-handshake banner frame is the exception: a 4-byte LE length
//! followed by the 11-byte banner, with no handle field.

use crate::error::{GbxError, Result};

/// Header size in bytes (fixed, exactly 8).
pub const HEADER_SIZE: usize = 8;

/// Hard ceiling for one frame, header included (7 MiB).
pub const MAX_FRAME_SIZE: usize = 7 * 1024 * 1024;

/// Banner the server sends immediately after the TCP connect.
pub const HANDSHAKE_BANNER: &[u8; 11] = b"GBXRemote 2";

/// Lowest handle the client may allocate. Everything below this value
/// belongs to server-initiated calls.
pub const CLIENT_HANDLE_FLOOR: u32 = 0x8000_0000;

/// The client counter wraps back to [`CLIENT_HANDLE_FLOOR`] before
/// reaching this value.
pub const HANDLE_WRAP_CEILING: u32 = 0xFFFF_FF00;

/// Decoded header from wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Payload length in bytes (header excluded).
    pub length: u32,
    /// Request/callback handle.
    pub handle: u32,
}

impl Header {
    /// Create a new header.
    pub fn new(length: u32, handle: u32) -> Self {
        Self { length, handle }
    }

    /// Encode header to bytes (Little Endian).
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(&self.length.to_le_bytes());
        buf[4..8].copy_from_slice(&self.handle.to_le_bytes());
        buf
    }

    /// Decode header from bytes (Little Endian).
    ///
    /// Returns `None` if the buffer is too short.
    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() < HEADER_SIZE {
            return None;
        }
        Some(Self {
            length: u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]),
            handle: u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]),
        })
    }

    /// Validate the header against the frame ceiling.
    pub fn validate(&self) -> Result<()> {
        let total = self.length as usize + HEADER_SIZE;
        if total > MAX_FRAME_SIZE {
            return Err(GbxError::Protocol(format!(
                "frame of {} bytes exceeds the {} byte ceiling",
                total, MAX_FRAME_SIZE
            )));
        }
        Ok(())
    }

    /// Check if this frame is a server-initiated call.
    #[inline]
    pub fn is_callback(&self) -> bool {
        self.handle < CLIENT_HANDLE_FLOOR
    }

    /// Check if this frame answers a client call.
    #[inline]
    pub fn is_reply(&self) -> bool {
        !self.is_callback()
    }
}
