//! The random-number capability that session identifiers are built from.
//!
//! The engine doesn't decide where entropy comes from. In production it
//! might be a remote randomness service; in development a thread-local
//! PRNG; in tests a fixed script. All three implement [`RandomProvider`].

use std::future::Future;

use rand::Rng;

use crate::RandomError;

/// A source of bounded random integers.
///
/// Cancellation follows the usual async contract: dropping the returned
/// future abandons the request. The registry bounds every identifier
/// draw with [`SessionConfig::random_timeout`](crate::SessionConfig).
pub trait RandomProvider: Send + Sync + 'static {
    /// Returns one integer in `0..=99`.
    fn rand(&self) -> impl Future<Output = Result<u8, RandomError>> + Send;
}

/// A [`RandomProvider`] backed by `rand`'s thread-local generator.
///
/// Never fails. Use this when no external randomness service is
/// configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl RandomProvider for ThreadRandom {
    async fn rand(&self) -> Result<u8, RandomError> {
        Ok(rand::rng().random_range(0..100))
    }
}
