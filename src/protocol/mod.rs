//! Protocol module - wire format, framing, and frame types.
//!
//! Implements the binary layer of the GBX Remote dialect:
//! - 8-byte header encoding/decoding (LE length + LE handle)
//! - Frame buffer for accumulating partial reads, banner special case
//! - Frame struct with reply/callback classification

mod frame;
mod frame_buffer;
mod wire_format;

pub use frame::{build_frame, Frame};
pub use frame_buffer::FrameBuffer;
pub use wire_format::{
    Header, CLIENT_HANDLE_FLOOR, HANDLE_WRAP_CEILING, HANDSHAKE_BANNER, HEADER_SIZE,
    MAX_FRAME_SIZE,
};
