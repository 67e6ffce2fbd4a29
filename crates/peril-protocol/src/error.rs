//! Error types for the protocol layer.
//!
//! A `ProtocolError` always means the bytes or the shape of a message were
//! wrong. A structurally invalid payload can never become valid on
//! redelivery, so consumers discard on any of these.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// JSON serialization failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// JSON deserialization failed: malformed text, missing fields, wrong
    /// types, or a truncated message.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// Binary serialization failed.
    #[cfg(feature = "binary")]
    #[error("binary encode failed: {0}")]
    BinaryEncode(bincode::Error),

    /// Binary deserialization failed.
    #[cfg(feature = "binary")]
    #[error("binary decode failed: {0}")]
    BinaryDecode(bincode::Error),

    /// The message decoded but violates a protocol rule, e.g. an army move
    /// that carries no units.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
