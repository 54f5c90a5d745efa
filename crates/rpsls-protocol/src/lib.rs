//! Wire-level vocabulary for rpsls.
//!
//! This crate defines everything that crosses the boundary between the
//! session engine and whoever is driving it (a WebSocket handler, a test,
//! a bot):
//!
//! - **Types** ([`Move`], [`Outcome`], [`Side`], [`SessionId`],
//!   [`StateMessage`]): the values players exchange with a session.
//! - **Rules** ([`Move::resolve`]): who beats whom.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how state messages are
//!   turned into bytes for a connection.
//! - **Errors** ([`ProtocolError`]): parse and encode failures.
//!
//! ```text
//! Connection layer (bytes) → Protocol (StateMessage, Move) → Session engine
//! ```

mod codec;
mod error;
mod rules;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{Move, Outcome, SessionId, Side, StateMessage};
