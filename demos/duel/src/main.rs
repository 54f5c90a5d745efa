use std::sync::Arc;

use rand::Rng;
use rpsls::prelude::*;
use tokio::task::JoinHandle;

// ---------------------------------------------------------------------------
// Bots
// ---------------------------------------------------------------------------

/// Wins, losses and ties from one side's point of view.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Tally {
    wins: u32,
    losses: u32,
    ties: u32,
}

impl Tally {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Win => self.wins += 1,
            Outcome::Lose => self.losses += 1,
            Outcome::Tie => self.ties += 1,
            Outcome::Unknown => {}
        }
    }
}

fn random_move() -> Move {
    Move::ALL[rand::rng().random_range(0..Move::ALL.len())]
}

/// Prints every state message a bot receives, as the wire JSON, until its
/// channel closes.
fn watch(name: &'static str, mut rx: PlayerReceiver) -> JoinHandle<usize> {
    tokio::spawn(async move {
        let mut seen = 0;
        while let Some(state) = rx.recv().await {
            seen += 1;
            match JsonCodec.encode(&state) {
                Ok(bytes) => println!("[{name}] {}", String::from_utf8_lossy(&bytes)),
                Err(e) => tracing::warn!(bot = name, error = %e, "could not encode state"),
            }
        }
        seen
    })
}

/// Seats two bots in a fresh session and plays `rounds` rounds with
/// random moves. Returns the left bot's tally and the right bot's tally.
async fn play(registry: &SessionRegistry, rounds: u32) -> Result<(Tally, Tally), RpslsError> {
    let session: Arc<GameSession> = registry.create().await?;
    tracing::info!(session_id = %session.id(), rounds, "duel starting");

    let (_, _, alice_rx) = registry.join(session.id(), "Alice").await?;
    let left_watch = watch("Alice", alice_rx);
    let (_, _, bob_rx) = registry.join(session.id(), "Bob").await?;
    let right_watch = watch("Bob", bob_rx);

    let mut left = Tally::default();
    let mut right = Tally::default();
    for round in 1..=rounds {
        let (left_move, right_move) = (random_move(), random_move());
        session.submit_move(Side::Left, left_move).await?;
        let outcome = session.submit_move(Side::Right, right_move).await?;
        tracing::info!(round, %left_move, %right_move, right_outcome = %outcome, "round played");
        right.record(outcome);
        left.record(outcome.inverse());
    }

    session.remove_player(Side::Left).await;
    session.remove_player(Side::Right).await;
    for handle in [left_watch, right_watch] {
        if let Ok(seen) = handle.await {
            tracing::debug!(messages = seen, "bot finished");
        }
    }

    Ok((left, right))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    rpsls::telemetry::init_tracing(&LogConfig::from_env())?;

    let rounds = match std::env::args().nth(1) {
        Some(arg) => arg.parse::<u32>()?,
        None => 5,
    };

    let registry = SessionRegistry::default();
    let (alice, bob) = play(&registry, rounds).await?;
    registry.stop_all().await;

    eprintln!(
        "Alice {}W/{}L/{}T, Bob {}W/{}L/{}T",
        alice.wins, alice.losses, alice.ties, bob.wins, bob.losses, bob.ties
    );
    Ok(())
}
