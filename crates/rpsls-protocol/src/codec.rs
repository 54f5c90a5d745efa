//! Codec trait and implementations for turning state messages into bytes.
//!
//! The session engine hands the connection layer typed [`StateMessage`]s;
//! the connection layer owns the socket and needs bytes. A [`Codec`] sits
//! between the two so the engine never cares how a message is framed.
//!
//! [`StateMessage`]: crate::StateMessage

use serde::{de::DeserializeOwned, Serialize};

use crate::ProtocolError;

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// `Send + Sync + 'static` because a single codec instance is shared by
/// every connection task.
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

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// This is the format browser clients speak. It is behind the `json`
/// feature flag (enabled by default).
///
/// ## Example
///
/// ```rust
/// use rpsls_protocol::{Codec, JsonCodec, Move, Outcome, StateMessage};
///
/// let codec = JsonCodec;
///
/// let msg = StateMessage {
///     left_name: "Alice".into(),
///     right_name: "Bob".into(),
///     left_move: Some(Move::Rock),
///     right_move: Some(Move::Spock),
///     outcome: Outcome::Lose,
/// };
///
/// let bytes = codec.encode(&msg).unwrap();
/// let decoded: StateMessage = codec.decode(&bytes).unwrap();
/// assert_eq!(msg, decoded);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
