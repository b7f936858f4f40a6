//! Error types for the protocol layer.

/// Errors that can occur while encoding or decoding wire messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (Rust value → bytes).
    #[error("encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// Deserialization failed: malformed JSON, unknown `type` tag, or a
    /// field of the wrong shape.
    #[error("decode failed: {0}")]
    Decode(#[source] serde_json::Error),

    /// Well-formed but meaningless at the protocol level, e.g. a room
    /// code with illegal characters.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
