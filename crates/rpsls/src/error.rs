//! Unified error type for the rpsls crates.

use rpsls_protocol::ProtocolError;
use rpsls_session::SessionError;

/// Top-level error that wraps every crate-specific error.
///
/// `#[from]` on each wrapping variant means `?` converts sub-crate errors
/// automatically.
#[derive(Debug, thiserror::Error)]
pub enum RpslsError {
    /// Wire encoding or parsing failed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session or registry operation failed (bad name, full, not found,
    /// random source down).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The tracing subscriber couldn't be installed.
    #[error("telemetry setup failed: {0}")]
    Telemetry(String),
}
