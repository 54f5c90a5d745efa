//! Session configuration and state machine.

use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Configuration shared by every session a registry creates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// A session with no joins, leaves or moves for this long tears
    /// itself down. Every such event restarts the window.
    pub idle_timeout: Duration,

    /// Hard cap on a session's existence, however busy it is.
    pub max_lifetime: Duration,

    /// Upper bound on drawing one session identifier from the random
    /// provider.
    pub random_timeout: Duration,

    /// Name recorded for players who join with an empty name.
    pub default_name: String,

    /// Longest accepted player name, in characters.
    pub max_name_len: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(2 * 60 * 60),
            max_lifetime: Duration::from_secs(24 * 60 * 60),
            random_timeout: Duration::from_secs(1),
            default_name: "Anonymous".to_string(),
            max_name_len: 20,
        }
    }
}

impl SessionConfig {
    /// Checks a requested player name and returns the name to record.
    ///
    /// Accepts up to `max_name_len` ASCII letters and spaces. An empty
    /// name is replaced by `default_name`.
    pub fn validate_name(&self, name: &str) -> Option<String> {
        let allowed = name.len() <= self.max_name_len
            && name.bytes().all(|b| b.is_ascii_alphabetic() || b == b' ');
        if !allowed {
            return None;
        }
        if name.is_empty() {
            Some(self.default_name.clone())
        } else {
            Some(name.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// The lifecycle state of a session, derived from its seats.
///
/// ```text
/// Empty ⇄ WaitingForOpponent ⇄ Ready ⇄ MovePending
///   └──────────────┴────────────┴──────────┴──→ Terminated
/// ```
///
/// - **Empty**: nobody seated.
/// - **WaitingForOpponent**: one seat taken.
/// - **Ready**: both seats taken, no move submitted this round.
/// - **MovePending**: both seats taken, one side has moved.
/// - **Terminated**: the lifetime task has ended; the session is out of
///   the registry and accepts nothing.
///
/// When the second move arrives the round is resolved and both moves are
/// cleared under the same lock, so "resolved" is never observable: the
/// session goes straight from `MovePending` back to `Ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Empty,
    WaitingForOpponent,
    Ready,
    MovePending,
    Terminated,
}

impl SessionState {
    /// Returns `true` if another player can still sit down.
    pub fn is_joinable(&self) -> bool {
        matches!(self, Self::Empty | Self::WaitingForOpponent)
    }

    /// Returns `true` if both seats are taken and moves count.
    pub fn is_playing(&self) -> bool {
        matches!(self, Self::Ready | Self::MovePending)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "Empty"),
            Self::WaitingForOpponent => write!(f, "WaitingForOpponent"),
            Self::Ready => write!(f, "Ready"),
            Self::MovePending => write!(f, "MovePending"),
            Self::Terminated => write!(f, "Terminated"),
        }
    }
}
