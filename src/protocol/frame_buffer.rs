//! Frame buffer for accumulating partial reads.
//!
//! Uses `bytes::BytesMut` for zero-copy buffer management.
//! Implements a state machine for handling fragmented frames:
//! - `WaitingForHeader`: need the length prefix (and handle, once established)
//! - `WaitingForPayload`: header parsed, need N more payload bytes
//!
//! The buffer starts in handshake mode: the very first wire unit is a
//! 4-byte LE length followed by the banner, with no handle field. After
//! that single frame the buffer switches to the 8-byte established
//! header. The two prefixes are deliberately not symmetric.

use bytes::BytesMut;

use super::wire_format::{Header, HEADER_SIZE, MAX_FRAME_SIZE};
use super::Frame;
use crate::error::{GbxError, Result};

/// Upper bound for the handshake banner length prefix. Anything larger
/// is a malformed banner, not a slow one.
const MAX_BANNER_LEN: u32 = 256;

/// Framing mode: banner frame vs. established frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Expecting the banner: 4-byte length prefix, no handle.
    Handshake,
    /// Expecting length + handle headers.
    Established,
}

/// State machine for frame parsing.
#[derive(Debug, Clone)]
enum State {
    /// Waiting for a complete header.
    WaitingForHeader,
    /// Header parsed, waiting for payload bytes.
    WaitingForPayload { handle: u32, remaining: u32 },
}

/// Buffer for accumulating incoming bytes and extracting complete frames.
///
/// All data is stored in a single `BytesMut` buffer; complete frames are
/// sliced off the front, at most one partial frame trails.
pub struct FrameBuffer {
    /// Accumulated bytes from socket reads.
    buffer: BytesMut,
    /// Current parsing state.
    state: State,
    /// Banner vs. established framing.
    mode: Mode,
}

impl FrameBuffer {
    /// Create a frame buffer expecting the handshake banner first.
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(64 * 1024),
            state: State::WaitingForHeader,
            mode: Mode::Handshake,
        }
    }

    /// Create a frame buffer that is already past the handshake.
    pub fn established() -> Self {
        Self {
            buffer: BytesMut::with_capacity(64 * 1024),
            state: State::WaitingForHeader,
            mode: Mode::Established,
        }
    }

    /// Push data into the buffer and extract all complete frames.
    ///
    /// Returns every frame completed by this chunk, in arrival order.
    /// Partial data stays buffered for the next push. The banner frame
    /// (handshake mode) is yielded with handle 0; its payload is the
    /// banner bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if a length prefix exceeds the frame ceiling or
    /// the banner prefix is implausibly large. Framing errors are not
    /// recoverable; the connection must be torn down.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<Frame>> {
        self.buffer.extend_from_slice(data);

        let mut frames = Vec::new();
        while let Some(frame) = self.try_extract_one()? {
            frames.push(frame);
        }
        Ok(frames)
    }

    /// Try to extract a single frame from the buffer.
    fn try_extract_one(&mut self) -> Result<Option<Frame>> {
        match self.state {
            State::WaitingForHeader => match self.mode {
                Mode::Handshake => {
                    if self.buffer.len() < 4 {
                        return Ok(None);
                    }
                    let len =
                        u32::from_le_bytes([self.buffer[0], self.buffer[1], self.buffer[2], self.buffer[3]]);
                    if len > MAX_BANNER_LEN {
                        return Err(GbxError::Protocol(format!(
                            "banner length prefix {} is not a plausible banner",
                            len
                        )));
                    }
                    let _ = self.buffer.split_to(4);

                    self.state = State::WaitingForPayload {
                        handle: 0,
                        remaining: len,
                    };
                    self.try_extract_one()
                }
                Mode::Established => {
                    if self.buffer.len() < HEADER_SIZE {
                        return Ok(None);
                    }

                    // Peek the header, consume only once validated.
                    let header = Header::decode(&self.buffer[..HEADER_SIZE])
                        .expect("buffer has enough bytes");
                    header.validate()?;

                    let _ = self.buffer.split_to(HEADER_SIZE);

                    if header.length == 0 {
                        return Ok(Some(Frame::new(header.handle, bytes::Bytes::new())));
                    }

                    self.state = State::WaitingForPayload {
                        handle: header.handle,
                        remaining: header.length,
                    };
                    self.try_extract_one()
                }
            },

            State::WaitingForPayload { handle, remaining } => {
                let remaining = remaining as usize;
                if self.buffer.len() < remaining {
                    return Ok(None);
                }

                // Zero-copy slice off the front.
                let payload = self.buffer.split_to(remaining).freeze();

                self.state = State::WaitingForHeader;
                if self.mode == Mode::Handshake {
                    // Exactly one banner frame, then normal framing.
                    self.mode = Mode::Established;
                }

                Ok(Some(Frame::new(handle, payload)))
            }
        }
    }

    /// Get the number of buffered bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Frame ceiling enforced on inbound length prefixes.
    pub fn max_frame_size(&self) -> usize {
        MAX_FRAME_SIZE
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}
