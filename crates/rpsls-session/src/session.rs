//! A single two-player game session.
//!
//! A [`GameSession`] is shared (`Arc`) between the registry, the
//! connection tasks of its two players, and its own lifetime task. All
//! seat mutation goes through one async mutex. Outbound state is never
//! sent on a player's bounded channel while that mutex is held. Under the
//! lock each operation only queues one snapshot per occupied seat on that
//! seat's unbounded outbox, which never blocks. A per-seat forwarder task
//! moves the queue onto the player's channel in order. A player who stops
//! reading therefore can't stall the other player or the session itself,
//! and still sees every state in the order it was produced.
//!
//! Activity is tracked as an atomic "last active" timestamp instead of a
//! signal to the lifetime task, so recording activity never blocks and
//! is never lost.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use futures_util::FutureExt;
use rpsls_protocol::{Move, Outcome, SessionId, Side, StateMessage};
use tokio::sync::{mpsc, watch, Mutex};
use tokio::time::{self, Instant};

use crate::{SessionConfig, SessionError, SessionState};

/// Per-seat outbound channel capacity. A seat holds at most one unread
/// state message; later ones wait in the seat's outbox.
const OUTBOUND_CAPACITY: usize = 1;

/// Stand-in for "never" when a configured duration overflows `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Receiving end of a seat's outbound channel, handed to the player's
/// connection task by [`GameSession::add_player`].
///
/// Yields `None` once the player has been removed or the session has
/// terminated.
pub type PlayerReceiver = mpsc::Receiver<StateMessage>;

type PlayerSender = mpsc::Sender<StateMessage>;

/// Queue between the seat and its forwarder task.
type Outbox = mpsc::UnboundedSender<StateMessage>;

// ---------------------------------------------------------------------------
// Termination
// ---------------------------------------------------------------------------

/// Why a session's lifetime task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// No activity for `idle_timeout`.
    IdleTimeout,
    /// `max_lifetime` elapsed.
    MaxLifetime,
    /// [`GameSession::cancel`] was called (usually via
    /// [`SessionRegistry::stop_all`](crate::SessionRegistry::stop_all)).
    Cancelled,
    /// The lifetime task panicked. Only this session is affected.
    Panicked,
}

impl std::fmt::Display for Termination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IdleTimeout => write!(f, "idle timeout"),
            Self::MaxLifetime => write!(f, "max lifetime reached"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Panicked => write!(f, "panicked"),
        }
    }
}

// ---------------------------------------------------------------------------
// Seats
// ---------------------------------------------------------------------------

/// One player's position at the table. Empty when `name` is empty.
#[derive(Default)]
struct Seat {
    name: String,
    pending: Option<Move>,
    outbox: Option<Outbox>,
}

impl Seat {
    fn is_occupied(&self) -> bool {
        !self.name.is_empty()
    }

    /// Frees the seat. Dropping the outbox closes the player's channel
    /// once the forwarder has passed on everything already queued.
    fn clear(&mut self) {
        self.name.clear();
        self.pending = None;
        self.outbox = None;
    }
}

#[derive(Default)]
struct Seats {
    left: Seat,
    right: Seat,
    terminated: bool,
}

impl Seats {
    fn seat(&self, side: Side) -> &Seat {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    fn seat_mut(&mut self, side: Side) -> &mut Seat {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }

    fn free_side(&self) -> Option<Side> {
        Side::BOTH.into_iter().find(|&side| !self.seat(side).is_occupied())
    }

    fn state(&self) -> SessionState {
        if self.terminated {
            return SessionState::Terminated;
        }
        match (self.left.is_occupied(), self.right.is_occupied()) {
            (false, false) => SessionState::Empty,
            (true, true) => match (self.left.pending, self.right.pending) {
                (None, None) => SessionState::Ready,
                _ => SessionState::MovePending,
            },
            _ => SessionState::WaitingForOpponent,
        }
    }

    /// Left-perspective snapshot of the table.
    fn snapshot(&self, outcome: Outcome) -> StateMessage {
        StateMessage {
            left_name: self.left.name.clone(),
            right_name: self.right.name.clone(),
            left_move: self.left.pending,
            right_move: self.right.pending,
            outcome,
        }
    }

    /// Queues one perspective-correct message per occupied seat.
    ///
    /// Called with the seat lock held, so every seat's queue follows the
    /// order in which the lock was taken.
    fn broadcast(&self, session_id: SessionId, outcome: Outcome) {
        let snapshot = self.snapshot(outcome);
        for side in Side::BOTH {
            let seat = self.seat(side);
            let Some(outbox) = seat.outbox.as_ref().filter(|_| seat.is_occupied()) else {
                continue;
            };
            if outbox.send(snapshot.view_for(side)).is_err() {
                tracing::debug!(%session_id, %side, "forwarder gone, state not queued");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// GameSession
// ---------------------------------------------------------------------------

/// A two-seat game table.
///
/// Created and started by [`SessionRegistry::create`]; torn down only by
/// its own lifetime task.
///
/// [`SessionRegistry::create`]: crate::SessionRegistry::create
pub struct GameSession {
    id: SessionId,
    config: SessionConfig,
    seats: Mutex<Seats>,
    started_at: Instant,
    /// Nanoseconds after `started_at` of the latest join, leave or move.
    last_active: AtomicU64,
    cancel: watch::Sender<bool>,
    started: AtomicBool,
}

impl GameSession {
    pub(crate) fn new(id: SessionId, config: SessionConfig) -> Self {
        let (cancel, _) = watch::channel(false);
        Self {
            id,
            config,
            seats: Mutex::new(Seats::default()),
            started_at: Instant::now(),
            last_active: AtomicU64::new(0),
            cancel,
            started: AtomicBool::new(false),
        }
    }

    /// The session's identifier.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Seats a player and returns their side plus the channel their state
    /// updates arrive on.
    ///
    /// The left seat fills first. Both seated players (including the new
    /// one) receive a fresh state message with an unknown outcome.
    ///
    /// # Errors
    /// - [`SessionError::InvalidName`]: not ASCII letters and spaces, or
    ///   longer than [`SessionConfig::max_name_len`]
    /// - [`SessionError::SessionFull`]: both seats taken
    /// - [`SessionError::NotFound`]: the session has terminated
    pub async fn add_player(&self, name: &str) -> Result<(Side, PlayerReceiver), SessionError> {
        let name = self
            .config
            .validate_name(name)
            .ok_or_else(|| SessionError::InvalidName(name.to_string()))?;

        let (side, receiver) = {
            let mut seats = self.seats.lock().await;
            if seats.terminated {
                return Err(SessionError::NotFound(self.id));
            }
            let side = seats.free_side().ok_or(SessionError::SessionFull(self.id))?;

            let (sender, receiver) = mpsc::channel(OUTBOUND_CAPACITY);
            let (outbox, queued) = mpsc::unbounded_channel();
            self.spawn_forwarder(side, queued, sender);

            let seat = seats.seat_mut(side);
            seat.name = name;
            seat.pending = None;
            seat.outbox = Some(outbox);

            seats.broadcast(self.id, Outcome::Unknown);
            (side, receiver)
        };

        self.touch();
        tracing::info!(session_id = %self.id, %side, "player joined");
        Ok((side, receiver))
    }

    /// Frees a seat and closes its channel.
    ///
    /// Only that seat is cleared. A move the opponent already submitted
    /// stays in place and is resolved against whoever sits down next. The
    /// remaining player, if any, receives the updated table. Removing an
    /// empty seat is a no-op.
    pub async fn remove_player(&self, side: Side) {
        {
            let mut seats = self.seats.lock().await;
            if seats.terminated || !seats.seat(side).is_occupied() {
                tracing::debug!(session_id = %self.id, %side, "remove on empty seat ignored");
                return;
            }
            seats.seat_mut(side).clear();
            seats.broadcast(self.id, Outcome::Unknown);
        }

        self.touch();
        tracing::info!(session_id = %self.id, %side, "player left");
    }

    /// Records `side`'s move for the current round.
    ///
    /// Once both sides have moved the round is resolved, both players get
    /// the revealed moves and their own outcome, and both moves are
    /// cleared for the next round. Until then the opponent's move stays
    /// hidden and the outcome is [`Outcome::Unknown`].
    ///
    /// Returns the outcome from `side`'s point of view. Moving again
    /// before the opponent replaces the earlier move.
    ///
    /// # Errors
    /// - [`SessionError::NotSeated`]: nobody sits at `side`
    /// - [`SessionError::NotFound`]: the session has terminated
    pub async fn submit_move(&self, side: Side, mv: Move) -> Result<Outcome, SessionError> {
        let outcome = {
            let mut seats = self.seats.lock().await;
            if seats.terminated {
                return Err(SessionError::NotFound(self.id));
            }
            if !seats.seat(side).is_occupied() {
                return Err(SessionError::NotSeated {
                    session: self.id,
                    side,
                });
            }

            seats.seat_mut(side).pending = Some(mv);
            let outcome = match (seats.left.pending, seats.right.pending) {
                (Some(left), Some(right)) => left.resolve(right),
                _ => Outcome::Unknown,
            };
            seats.broadcast(self.id, outcome);
            if outcome != Outcome::Unknown {
                seats.left.pending = None;
                seats.right.pending = None;
            }
            outcome
        };

        self.touch();

        if outcome == Outcome::Unknown {
            tracing::debug!(session_id = %self.id, %side, "move submitted");
        } else {
            tracing::info!(session_id = %self.id, %outcome, "round resolved (left perspective)");
        }

        Ok(match side {
            Side::Left => outcome,
            Side::Right => outcome.inverse(),
        })
    }

    /// Returns `true` if both seats are taken.
    pub async fn is_full(&self) -> bool {
        let seats = self.seats.lock().await;
        seats.left.is_occupied() && seats.right.is_occupied()
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> SessionState {
        self.seats.lock().await.state()
    }

    /// Name of the player at `side`, if the seat is taken.
    pub async fn player_name(&self, side: Side) -> Option<String> {
        let seats = self.seats.lock().await;
        let seat = seats.seat(side);
        seat.is_occupied().then(|| seat.name.clone())
    }

    /// Asks the lifetime task to stop. Returns immediately; the session
    /// leaves the registry shortly after.
    pub fn cancel(&self) {
        self.cancel.send_replace(true);
    }

    /// Returns `true` once [`cancel`](Self::cancel) has been called or the
    /// session has terminated.
    pub fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    /// Claims the right to run the lifetime task. Only the first call
    /// returns `true`.
    pub(crate) fn mark_started(&self) -> bool {
        !self.started.swap(true, Ordering::AcqRel)
    }

    /// Waits until the session should end and says why.
    pub(crate) async fn run_lifetime(&self) -> Termination {
        let mut cancelled = self.cancel.subscribe();
        let hard_deadline = deadline_after(self.started_at, self.config.max_lifetime);

        tracing::info!(session_id = %self.id, "session started");

        loop {
            let deadline = self.idle_deadline().min(hard_deadline);
            tokio::select! {
                () = time::sleep_until(deadline) => {
                    let now = Instant::now();
                    if now >= hard_deadline {
                        return Termination::MaxLifetime;
                    }
                    if now >= self.idle_deadline() {
                        return Termination::IdleTimeout;
                    }
                    // Activity moved the idle deadline while we slept.
                }
                () = wait_cancelled(&mut cancelled) => return Termination::Cancelled,
            }
        }
    }

    /// Final teardown: stops the forwarders, closes both channels and
    /// refuses further operations.
    pub(crate) async fn close(&self) {
        self.cancel.send_replace(true);
        let mut seats = self.seats.lock().await;
        seats.terminated = true;
        seats.left.outbox = None;
        seats.right.outbox = None;
    }

    fn touch(&self) {
        let nanos = u64::try_from(self.started_at.elapsed().as_nanos()).unwrap_or(u64::MAX);
        self.last_active.fetch_max(nanos, Ordering::AcqRel);
    }

    fn idle_deadline(&self) -> Instant {
        let last = Duration::from_nanos(self.last_active.load(Ordering::Acquire));
        deadline_after(deadline_after(self.started_at, last), self.config.idle_timeout)
    }

    /// Moves a seat's queued states onto the player's channel, one at a
    /// time and in order. Ends when the seat is cleared and its queue is
    /// drained, when the player drops the receiver, or when the session
    /// is cancelled. Dropping `sender` on exit closes the player's channel.
    fn spawn_forwarder(
        &self,
        side: Side,
        mut queued: mpsc::UnboundedReceiver<StateMessage>,
        sender: PlayerSender,
    ) {
        let session_id = self.id;
        let mut cancelled = self.cancel.subscribe();
        tokio::spawn(async move {
            loop {
                let message = tokio::select! {
                    next = queued.recv() => match next {
                        Some(message) => message,
                        None => break,
                    },
                    () = wait_cancelled(&mut cancelled) => break,
                };
                tokio::select! {
                    sent = sender.send(message) => {
                        if sent.is_err() {
                            tracing::debug!(%session_id, %side, "receiver dropped, forwarder stopping");
                            break;
                        }
                    }
                    () = wait_cancelled(&mut cancelled) => {
                        tracing::debug!(%session_id, %side, "session ended before delivery");
                        break;
                    }
                }
            }
        });
    }
}

impl std::fmt::Debug for GameSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameSession")
            .field("id", &self.id)
            .field("cancelled", &self.is_cancelled())
            .finish_non_exhaustive()
    }
}

/// Runs a lifetime future, turning a panic into [`Termination::Panicked`]
/// so it can't escape into the runtime or other sessions.
pub(crate) async fn supervise<F>(session_id: SessionId, lifetime: F) -> Termination
where
    F: Future<Output = Termination>,
{
    match AssertUnwindSafe(lifetime).catch_unwind().await {
        Ok(reason) => reason,
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "non-string panic payload".to_string());
            tracing::error!(%session_id, panic = %message, "session lifetime task panicked");
            Termination::Panicked
        }
    }
}

/// Resolves once the watch flag is set or its sender is gone.
async fn wait_cancelled(cancelled: &mut watch::Receiver<bool>) {
    let _ = cancelled.wait_for(|flag| *flag).await;
}

fn deadline_after(start: Instant, after: Duration) -> Instant {
    start
        .checked_add(after)
        .unwrap_or_else(|| start + FAR_FUTURE)
}
