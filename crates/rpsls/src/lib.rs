//! # rpsls
//!
//! Two-player Rock/Paper/Scissors/Lizard/Spock session engine.
//!
//! A [`SessionRegistry`](prelude::SessionRegistry) hands out game sessions
//! under random 64-bit ids. Two players join a session, each submits a move,
//! and both receive a perspective-correct [`StateMessage`](prelude::StateMessage)
//! on their own channel. Idle sessions clean themselves up.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rpsls::prelude::*;
//!
//! # async fn run() -> Result<(), RpslsError> {
//! rpsls::telemetry::init_tracing(&LogConfig::from_env())?;
//!
//! let registry = SessionRegistry::default();
//! let session = registry.create().await?;
//!
//! let (alice, mut alice_rx) = session.add_player("Alice").await?;
//! let (bob, _bob_rx) = session.add_player("Bob").await?;
//!
//! session.submit_move(alice, Move::Spock).await?;
//! let outcome = session.submit_move(bob, Move::Lizard).await?;
//! assert_eq!(outcome, Outcome::Win);
//!
//! while let Some(state) = alice_rx.recv().await {
//!     let bytes = JsonCodec.encode(&state)?;
//!     println!("{}", String::from_utf8_lossy(&bytes));
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod telemetry;

pub use error::RpslsError;

pub mod prelude {
    pub use crate::error::RpslsError;
    pub use crate::telemetry::{LogConfig, LogFormat};
    pub use rpsls_protocol::{
        Codec, JsonCodec, Move, Outcome, ProtocolError, SessionId, Side, StateMessage,
    };
    pub use rpsls_session::{
        GameSession, PlayerReceiver, RandomError, RandomProvider, SessionConfig, SessionError,
        SessionRegistry, SessionState, ThreadRandom,
    };
}
