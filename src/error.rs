//! Error types for gbxrpc.

use thiserror::Error;

/// Main error type for all GBX Remote operations.
#[derive(Debug, Error)]
pub enum GbxError {
    /// I/O error on the server socket.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// XML parse error while decoding an XML-RPC document.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// JSON parse error in a scripted-event payload.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Protocol violation (bad banner, malformed frame, unexpected document).
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Outbound frame would exceed the 7 MiB wire ceiling.
    #[error("Payload too large: {size} bytes")]
    PayloadTooLarge {
        /// Total frame size (header included) that was rejected.
        size: usize,
    },

    /// Structured fault returned by the server for one call.
    #[error("Server fault {code}: {message}")]
    Fault {
        /// XML-RPC `faultCode`.
        code: i32,
        /// XML-RPC `faultString`.
        message: String,
    },

    /// Connection closed or errored while calls were pending.
    #[error("Connection lost")]
    ConnectionLost,

    /// Server did not present a valid banner within the handshake deadline.
    #[error("Handshake timed out")]
    HandshakeTimeout,
}

/// Result type alias using GbxError.
pub type Result<T> = std::result::Result<T, GbxError>;
