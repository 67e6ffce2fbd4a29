//! Codec trait and implementations for serializing/deserializing messages.
//!
//! A "codec" converts between Rust types and the raw bytes a broker carries.
//! Handlers don't care HOW a payload is serialized, only that it implements
//! [`Codec`]. Two are provided:
//!
//! - [`JsonCodec`]: self-describing text, used for pause signals, army moves
//!   and war recognitions so they can be read straight off a queue.
//! - [`BincodeCodec`]: dense binary, used for the high-volume game log.

use serde::{de::DeserializeOwned, Serialize};

use crate::ProtocolError;

/// Content type stamped on JSON payloads.
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Content type stamped on bincode payloads.
pub const CONTENT_TYPE_BINCODE: &str = "application/x-bincode";

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// ## Trait bounds explained
///
/// - `Send + Sync` → one codec value is shared by every consumer task.
/// - `'static` → the codec owns everything it needs, so it can live inside
///   long-running tasks.
///
/// `decode` requires `DeserializeOwned` (not plain `Deserialize`) because the
/// delivery buffer is settled and dropped right after decoding; the decoded
/// value cannot borrow from it.
pub trait Codec: Send + Sync + 'static {
    /// The content type to publish alongside encoded payloads.
    fn content_type(&self) -> &'static str;

    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns an encode error if the value cannot be represented in this
    /// format.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns a decode error if the bytes are malformed, incomplete, or don't
    /// match the expected type. Never falls back to a default value.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// ## Example
///
/// ```rust
/// use peril_protocol::{Codec, JsonCodec, PlayingState};
///
/// let codec = JsonCodec;
/// let bytes = codec.encode(&PlayingState { is_paused: true }).unwrap();
/// let decoded: PlayingState = codec.decode(&bytes).unwrap();
/// assert!(decoded.is_paused);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn content_type(&self) -> &'static str {
        CONTENT_TYPE_JSON
    }

    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

// ---------------------------------------------------------------------------
// BincodeCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses `bincode`'s compact binary layout.
///
/// Not self-describing: both ends must agree on the exact type.
#[cfg(feature = "binary")]
#[derive(Debug, Clone, Copy, Default)]
pub struct BincodeCodec;

#[cfg(feature = "binary")]
impl Codec for BincodeCodec {
    fn content_type(&self) -> &'static str {
        CONTENT_TYPE_BINCODE
    }

    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        bincode::serialize(value).map_err(ProtocolError::BinaryEncode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        bincode::deserialize(data).map_err(ProtocolError::BinaryDecode)
    }
}
