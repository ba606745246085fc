//! Error types for the protocol layer.

/// Errors that can occur while encoding or decoding wire data.
///
/// All of these are "drop and log" errors: a client sent something the
/// server cannot understand. None of them is ever answered on the wire.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed.
    #[error("failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),

    /// The frame is not a valid command envelope.
    #[error("failed to decode message: {0}")]
    Decode(#[source] serde_json::Error),

    /// The envelope was valid but its `data` did not fit the subtype.
    #[error("invalid payload for {subtype}: {source}")]
    Payload {
        subtype: String,
        #[source]
        source: serde_json::Error,
    },

    /// The frame was structurally wrong (e.g. binary where text is expected).
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
