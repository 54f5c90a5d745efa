//! Two-player game sessions for rpsls.
//!
//! Each session seats exactly two players, collects one move per side,
//! resolves the round and pushes a [`StateMessage`] to both seats. Every
//! session also runs a background lifetime task that tears it down after
//! an idle window, after an absolute lifetime, or on request.
//!
//! # Key types
//!
//! - [`SessionRegistry`]: creates sessions under collision-free ids,
//!   looks them up, stops them all on shutdown
//! - [`GameSession`]: one table: seats, pending moves, outbound channels
//! - [`RandomProvider`]: where identifier entropy comes from
//! - [`SessionConfig`]: idle window, lifetime cap, name rules
//! - [`SessionState`]: occupancy-derived state machine
//!
//! # How it fits in the stack
//!
//! ```text
//! Connection layer (above)  ← joins players, forwards moves, drains receivers
//!     ↕
//! Session engine (this crate)
//!     ↕
//! Protocol (below)  ← Move, Outcome, SessionId, StateMessage
//! ```
//!
//! [`StateMessage`]: rpsls_protocol::StateMessage

mod config;
mod error;
mod id;
mod random;
mod registry;
mod session;

pub use config::{SessionConfig, SessionState};
pub use error::{RandomError, SessionError};
pub use id::next_session_id;
pub use random::{RandomProvider, ThreadRandom};
pub use registry::SessionRegistry;
pub use session::{GameSession, PlayerReceiver, Termination};
