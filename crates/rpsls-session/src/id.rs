//! Session identifier generation.
//!
//! The random source only hands out small numbers (0..=99), so each
//! 32-bit half of an identifier is built by treating successive draws as
//! base-100 digits behind a leading 1:
//!
//! ```text
//! acc = 1
//! while acc <= 0x0F_FFFF_FFFF:   // 36 bits
//!     acc = acc * 100 + draw()
//! half = acc & 0xFFFF_FFFF
//! ```
//!
//! Stopping at 36 bits instead of 32 keeps more than one decimal digit of
//! headroom above the window that is kept, which flattens the bias of the
//! low 32 bits. Each half takes exactly six draws.

use rpsls_protocol::SessionId;

use crate::{RandomError, RandomProvider};

/// Accumulator ceiling for one half.
const HALF_THRESHOLD: u64 = 0x0F_FFFF_FFFF;

/// Largest value a provider may return.
const MAX_DRAW: u8 = 99;

/// Draws a fresh candidate identifier from `rng`.
///
/// The high half is generated first. Any provider failure aborts at once;
/// retrying (on collision) is the registry's job, and a retry always
/// restarts both halves.
///
/// Given the same sequence of draws this always returns the same id.
pub async fn next_session_id<R>(rng: &R) -> Result<SessionId, RandomError>
where
    R: RandomProvider + ?Sized,
{
    let high = next_half(rng).await?;
    let low = next_half(rng).await?;
    Ok(SessionId((high << 32) | low))
}

async fn next_half<R>(rng: &R) -> Result<u64, RandomError>
where
    R: RandomProvider + ?Sized,
{
    let mut acc: u64 = 1;
    while acc <= HALF_THRESHOLD {
        let digit = rng.rand().await?;
        if digit > MAX_DRAW {
            return Err(RandomError::OutOfRange(digit));
        }
        acc = acc * 100 + u64::from(digit);
    }
    Ok(acc & 0xFFFF_FFFF)
}
