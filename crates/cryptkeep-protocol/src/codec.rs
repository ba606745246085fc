//! Codec trait and the JSON implementation.
//!
//! The transport hands the handler raw text frames; the codec turns them
//! into [`RawCommand`](crate::RawCommand)s and turns events back into
//! frames. Swapping the wire format means swapping the codec.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes values to bytes and decodes bytes back.
///
/// `Send + Sync + 'static` so one codec can be shared by every connection
/// task.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed or don't
    /// match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

/// A [`Codec`] backed by `serde_json`. This is what browsers speak.
///
/// ```rust
/// use cryptkeep_protocol::{Codec, JsonCodec, RawCommand, CommandScope};
///
/// let codec = JsonCodec;
/// let raw: RawCommand = codec
///     .decode(br#"{"type":"lobby","subType":"join","data":"ada"}"#)
///     .unwrap();
/// assert_eq!(raw.scope, CommandScope::Lobby);
/// assert_eq!(raw.subtype, "join");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
