//! Error types for the protocol layer.

/// Errors that can occur in the protocol layer.
///
/// Parse failures carry the offending input so the connection layer can
/// echo it back to the client.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust type).
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// A session identifier was not exactly 16 hexadecimal characters.
    #[error("invalid session id: {0:?}")]
    InvalidSessionId(String),

    /// A move name or id did not match any of the five moves.
    #[error("invalid move: {0}")]
    InvalidMove(String),

    /// An outcome name or id did not match any outcome.
    #[error("invalid outcome: {0}")]
    InvalidOutcome(String),
}
