//! Error types for the session layer.

use std::time::Duration;

use rpsls_protocol::{SessionId, Side};

/// Errors produced by a [`RandomProvider`](crate::RandomProvider) or while
/// drawing identifier entropy from one.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RandomError {
    /// The source could not produce a number (network failure, closed
    /// generator, etc.).
    #[error("random source unavailable: {0}")]
    Unavailable(String),

    /// The source returned a value outside `0..=99`.
    #[error("random source returned {0}, expected 0..=99")]
    OutOfRange(u8),

    /// Drawing a full identifier took longer than the configured bound.
    #[error("random source timed out after {0:?}")]
    TimedOut(Duration),
}

/// Errors that can occur during session operations.
///
/// All of these are returned to the caller; nothing here is retried
/// internally except identifier collisions, which never surface.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The player name has characters other than ASCII letters and spaces,
    /// or is longer than [`SessionConfig::max_name_len`](crate::SessionConfig::max_name_len).
    #[error("invalid player name {0:?}")]
    InvalidName(String),

    /// Both seats are taken. The caller should find or create another
    /// session.
    #[error("session {0} is full")]
    SessionFull(SessionId),

    /// Identifier generation failed. Creation is aborted, not retried.
    #[error("generating session id: {0}")]
    RandomSource(#[from] RandomError),

    /// No live session has this id (never existed, or already terminated).
    #[error("session {0} not found")]
    NotFound(SessionId),

    /// A move was submitted for a seat nobody is sitting in.
    #[error("no player on the {side} side of session {session}")]
    NotSeated { session: SessionId, side: Side },

    /// The session's lifetime task could not be started.
    #[error("starting session {session}: {reason}")]
    StartFailed { session: SessionId, reason: String },
}
