//! Integration tests for sessions and the registry.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rpsls_protocol::{Move, Outcome, SessionId, Side, StateMessage};
use rpsls_session::{
    GameSession, PlayerReceiver, RandomError, RandomProvider, SessionConfig, SessionError,
    SessionRegistry, SessionState, ThreadRandom,
};
use tokio::time;

// =========================================================================
// Helpers
// =========================================================================

/// Replays a fixed script of draws, then reports itself unavailable.
#[derive(Default)]
struct ScriptedRandom {
    draws: Mutex<VecDeque<Result<u8, RandomError>>>,
    served: Mutex<usize>,
}

impl ScriptedRandom {
    fn new(draws: impl IntoIterator<Item = Result<u8, RandomError>>) -> Self {
        Self {
            draws: Mutex::new(draws.into_iter().collect()),
            served: Mutex::new(0),
        }
    }

    /// Twelve draws of `value`: exactly one identifier's worth.
    fn id_of(value: u8) -> impl Iterator<Item = Result<u8, RandomError>> {
        std::iter::repeat_n(Ok(value), 12)
    }

    fn served(&self) -> usize {
        *self.served.lock().unwrap()
    }
}

impl RandomProvider for ScriptedRandom {
    async fn rand(&self) -> Result<u8, RandomError> {
        *self.served.lock().unwrap() += 1;
        self.draws
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(RandomError::Unavailable("script exhausted".into())))
    }
}

/// Never answers.
struct StalledRandom;

impl RandomProvider for StalledRandom {
    async fn rand(&self) -> Result<u8, RandomError> {
        std::future::pending().await
    }
}

fn config_with_idle(idle: Duration) -> SessionConfig {
    SessionConfig {
        idle_timeout: idle,
        ..SessionConfig::default()
    }
}

async fn new_session() -> (SessionRegistry, Arc<GameSession>) {
    let registry = SessionRegistry::default();
    let session = registry.create().await.unwrap();
    (registry, session)
}

/// Receives the next state message, failing the test if none arrives.
async fn recv(rx: &mut PlayerReceiver) -> StateMessage {
    time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for state")
        .expect("channel closed")
}

/// Yields until the registry is empty, or gives up.
async fn wait_until_empty<R: RandomProvider>(registry: &SessionRegistry<R>) -> bool {
    for _ in 0..200 {
        if registry.is_empty().await {
            return true;
        }
        tokio::task::yield_now().await;
    }
    registry.is_empty().await
}

// =========================================================================
// Seating
// =========================================================================

#[tokio::test]
async fn test_first_player_left_second_right_third_rejected() {
    let (_registry, session) = new_session().await;

    let (first, _rx1) = session.add_player("Alice").await.unwrap();
    let (second, _rx2) = session.add_player("Bob").await.unwrap();
    let third = session.add_player("Carol").await;

    assert_eq!(first, Side::Left);
    assert_eq!(second, Side::Right);
    assert!(
        matches!(third, Err(SessionError::SessionFull(id)) if id == session.id()),
        "third player must be turned away"
    );
    assert!(session.is_full().await);
}

#[tokio::test]
async fn test_empty_name_gets_default_label() {
    let (_registry, session) = new_session().await;

    let (side, mut rx) = session.add_player("").await.unwrap();

    assert_eq!(session.player_name(side).await.as_deref(), Some("Anonymous"));
    let msg = recv(&mut rx).await;
    assert_eq!(msg.left_name, "Anonymous");
}

#[tokio::test]
async fn test_invalid_names_are_rejected() {
    let (_registry, session) = new_session().await;

    let digits = session.add_player("abc123").await;
    let too_long = session.add_player(&"a".repeat(21)).await;

    assert!(matches!(digits, Err(SessionError::InvalidName(ref n)) if n == "abc123"));
    assert!(matches!(too_long, Err(SessionError::InvalidName(_))));
    assert_eq!(session.state().await, SessionState::Empty, "nothing was seated");
}

#[tokio::test]
async fn test_join_broadcasts_table_to_everyone_seated() {
    let (_registry, session) = new_session().await;

    let (_, mut left) = session.add_player("Alice").await.unwrap();
    let alone = recv(&mut left).await;
    assert_eq!(alone.left_name, "Alice");
    assert_eq!(alone.right_name, "");
    assert_eq!(alone.outcome, Outcome::Unknown);

    let (_, mut right) = session.add_player("Bob").await.unwrap();
    let left_view = recv(&mut left).await;
    let right_view = recv(&mut right).await;

    for view in [left_view, right_view] {
        assert_eq!(view.left_name, "Alice");
        assert_eq!(view.right_name, "Bob");
        assert_eq!(view.outcome, Outcome::Unknown);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_joins_seat_exactly_two() {
    let (_registry, session) = new_session().await;

    let mut joins = Vec::new();
    for _ in 0..8 {
        let session = Arc::clone(&session);
        joins.push(tokio::spawn(async move { session.add_player("Player").await }));
    }

    let mut seated = Vec::new();
    let mut full = 0;
    for join in joins {
        match join.await.unwrap() {
            Ok((side, rx)) => seated.push((side, rx)),
            Err(SessionError::SessionFull(_)) => full += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(seated.len(), 2);
    assert_eq!(full, 6);
    assert_ne!(seated[0].0, seated[1].0, "the two players got different sides");
}

// =========================================================================
// Rounds
// =========================================================================

/// Seats Alice (left) and Bob (right) and drains the join broadcasts.
async fn seated_pair() -> (SessionRegistry, Arc<GameSession>, PlayerReceiver, PlayerReceiver) {
    let (registry, session) = new_session().await;
    let (_, mut left) = session.add_player("Alice").await.unwrap();
    recv(&mut left).await;
    let (_, mut right) = session.add_player("Bob").await.unwrap();
    recv(&mut left).await;
    recv(&mut right).await;
    (registry, session, left, right)
}

#[tokio::test]
async fn test_single_move_stays_hidden_from_opponent() {
    let (_registry, session, mut left, mut right) = seated_pair().await;

    session.submit_move(Side::Left, Move::Rock).await.unwrap();

    let left_view = recv(&mut left).await;
    let right_view = recv(&mut right).await;

    assert_eq!(left_view.left_move, Some(Move::Rock), "own move is echoed");
    assert_eq!(left_view.right_move, None);
    assert_eq!(right_view.left_move, None, "opponent move must stay hidden");
    assert_eq!(right_view.right_move, None);
    assert_eq!(right_view.outcome, Outcome::Unknown);
    assert_eq!(session.state().await, SessionState::MovePending);
}

#[tokio::test]
async fn test_second_move_resolves_round_for_both_sides() {
    let (_registry, session, mut left, mut right) = seated_pair().await;

    session.submit_move(Side::Left, Move::Rock).await.unwrap();
    recv(&mut left).await;
    recv(&mut right).await;
    let right_outcome = session.submit_move(Side::Right, Move::Scissors).await.unwrap();

    let left_view = recv(&mut left).await;
    let right_view = recv(&mut right).await;

    assert_eq!(right_outcome, Outcome::Lose);
    assert_eq!(left_view.outcome, Outcome::Win);
    assert_eq!(right_view.outcome, Outcome::Lose);
    for view in [&left_view, &right_view] {
        assert_eq!(view.left_move, Some(Move::Rock));
        assert_eq!(view.right_move, Some(Move::Scissors));
    }
    assert_eq!(session.state().await, SessionState::Ready, "moves reset for next round");
}

#[tokio::test]
async fn test_tie_is_reported_to_both_sides() {
    let (_registry, session, mut left, mut right) = seated_pair().await;

    session.submit_move(Side::Right, Move::Spock).await.unwrap();
    session.submit_move(Side::Left, Move::Spock).await.unwrap();

    recv(&mut left).await;
    recv(&mut right).await;
    assert_eq!(recv(&mut left).await.outcome, Outcome::Tie);
    assert_eq!(recv(&mut right).await.outcome, Outcome::Tie);
}

#[tokio::test]
async fn test_previous_round_moves_do_not_leak_into_next_round() {
    let (_registry, session, mut left, mut right) = seated_pair().await;

    // Round one: both revealed.
    session.submit_move(Side::Left, Move::Paper).await.unwrap();
    session.submit_move(Side::Right, Move::Lizard).await.unwrap();
    for _ in 0..2 {
        recv(&mut left).await;
        recv(&mut right).await;
    }

    // Round two: only the right side moves.
    session.submit_move(Side::Right, Move::Rock).await.unwrap();
    let left_view = recv(&mut left).await;
    let right_view = recv(&mut right).await;

    assert_eq!(left_view.left_move, None, "left has not moved this round");
    assert_eq!(left_view.right_move, None, "right's new move stays hidden");
    assert_eq!(right_view.left_move, None, "round one's paper is gone");
    assert_eq!(right_view.right_move, Some(Move::Rock));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn test_each_seat_receives_states_in_order_on_worker_threads() {
    // Run from a spawned task so new tasks land in the worker's LIFO slot.
    tokio::spawn(async {
        let (_registry, session, mut left, mut right) = seated_pair().await;

        for _ in 0..10 {
            session.submit_move(Side::Left, Move::Rock).await.unwrap();
            session.submit_move(Side::Right, Move::Scissors).await.unwrap();

            let right_outcomes = [recv(&mut right).await.outcome, recv(&mut right).await.outcome];
            let left_outcomes = [recv(&mut left).await.outcome, recv(&mut left).await.outcome];
            assert_eq!(right_outcomes, [Outcome::Unknown, Outcome::Lose]);
            assert_eq!(left_outcomes, [Outcome::Unknown, Outcome::Win]);
        }
    })
    .await
    .unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_round_result_is_last_state_with_concurrent_movers() {
    let (_registry, session, mut left, mut right) = seated_pair().await;

    let l = Arc::clone(&session);
    let r = Arc::clone(&session);
    let (a, b) = tokio::join!(
        tokio::spawn(async move { l.submit_move(Side::Left, Move::Paper).await }),
        tokio::spawn(async move { r.submit_move(Side::Right, Move::Spock).await }),
    );
    a.unwrap().unwrap();
    b.unwrap().unwrap();

    // Whichever move landed first, the resolved state arrives second.
    recv(&mut left).await;
    recv(&mut right).await;
    assert_eq!(recv(&mut left).await.outcome, Outcome::Win);
    assert_eq!(recv(&mut right).await.outcome, Outcome::Lose);
}

#[tokio::test]
async fn test_opponent_move_survives_leave_and_stays_hidden() {
    let (_registry, session, mut left, mut right) = seated_pair().await;
    session.submit_move(Side::Left, Move::Scissors).await.unwrap();
    recv(&mut left).await;
    recv(&mut right).await;

    session.remove_player(Side::Right).await;
    let after_leave = recv(&mut left).await;
    assert_eq!(after_leave.left_move, Some(Move::Scissors));
    assert_eq!(session.state().await, SessionState::WaitingForOpponent);

    let (side, mut newcomer) = session.add_player("Dave").await.unwrap();
    assert_eq!(side, Side::Right);
    assert_eq!(recv(&mut newcomer).await.left_move, None, "pending move is hidden");
    recv(&mut left).await;

    let outcome = session.submit_move(Side::Right, Move::Paper).await.unwrap();
    assert_eq!(outcome, Outcome::Lose, "scissors cut paper");
    assert_eq!(recv(&mut newcomer).await.left_move, Some(Move::Scissors));
}

#[tokio::test]
async fn test_slow_reader_does_not_block_opponent() {
    let (_registry, session, mut left, _right_never_reads) = seated_pair().await;

    // The right receiver is never drained; its channel fills after the
    // first message and further states queue in the seat's outbox.
    for mv in [Move::Rock, Move::Paper, Move::Scissors, Move::Lizard] {
        session.submit_move(Side::Left, mv).await.unwrap();
        let view = recv(&mut left).await;
        assert_eq!(view.left_move, Some(mv));
    }
}

// =========================================================================
// Leaving
// =========================================================================

#[tokio::test]
async fn test_remove_player_notifies_remaining_and_closes_channel() {
    let (_registry, session, mut left, mut right) = seated_pair().await;

    session.remove_player(Side::Right).await;

    let left_view = recv(&mut left).await;
    assert_eq!(left_view.left_name, "Alice");
    assert_eq!(left_view.right_name, "");
    assert_eq!(left_view.outcome, Outcome::Unknown);

    let closed = time::timeout(Duration::from_secs(5), right.recv()).await.unwrap();
    assert!(closed.is_none(), "removed player's channel is closed");
    assert_eq!(session.state().await, SessionState::WaitingForOpponent);
}

#[tokio::test]
async fn test_seat_can_be_reused_after_leave() {
    let (_registry, session, _left, _right) = seated_pair().await;

    session.remove_player(Side::Left).await;
    let (side, mut rx) = session.add_player("Dave").await.unwrap();

    assert_eq!(side, Side::Left);
    let view = recv(&mut rx).await;
    assert_eq!(view.left_name, "Dave");
    assert_eq!(view.right_name, "Bob");
}

// =========================================================================
// Registry
// =========================================================================

#[tokio::test]
async fn test_create_uses_generated_id() {
    let registry = SessionRegistry::new(
        ScriptedRandom::new(ScriptedRandom::id_of(0)),
        SessionConfig::default(),
    );

    let session = registry.create().await.unwrap();

    assert_eq!(session.id(), SessionId(0xd4a5_1000_d4a5_1000));
    assert_eq!(session.id().to_string(), "d4a51000d4a51000");
}

#[tokio::test]
async fn test_create_regenerates_on_collision() {
    let rng = ScriptedRandom::new(
        ScriptedRandom::id_of(0)
            .chain(ScriptedRandom::id_of(0))
            .chain(ScriptedRandom::id_of(99)),
    );
    let registry = SessionRegistry::new(rng, SessionConfig::default());

    let first = registry.create().await.unwrap();
    let second = registry.create().await.unwrap();

    assert_eq!(first.id(), SessionId(0xd4a5_1000_d4a5_1000));
    assert_eq!(second.id(), SessionId(0xa94a_1fff_a94a_1fff));
    assert_eq!(registry.len().await, 2);
}

#[tokio::test]
async fn test_random_failure_aborts_create_without_retry() {
    let rng = Arc::new(ScriptedRandom::new([
        Ok(7),
        Err(RandomError::Unavailable("rng down".into())),
    ]));

    struct Shared(Arc<ScriptedRandom>);
    impl RandomProvider for Shared {
        async fn rand(&self) -> Result<u8, RandomError> {
            self.0.rand().await
        }
    }

    let registry = SessionRegistry::new(Shared(Arc::clone(&rng)), SessionConfig::default());

    let result = registry.create().await;

    assert!(matches!(
        result,
        Err(SessionError::RandomSource(RandomError::Unavailable(_)))
    ));
    assert_eq!(rng.served(), 2, "no retry after a random-source failure");
    assert!(registry.is_empty().await);
}

#[tokio::test(start_paused = true)]
async fn test_stalled_random_source_times_out() {
    let config = SessionConfig {
        random_timeout: Duration::from_millis(500),
        ..SessionConfig::default()
    };
    let registry = SessionRegistry::new(StalledRandom, config);

    let result = registry.create().await;

    assert!(matches!(
        result,
        Err(SessionError::RandomSource(RandomError::TimedOut(d))) if d == Duration::from_millis(500)
    ));
    assert!(registry.is_empty().await);
}

#[tokio::test]
async fn test_join_by_id() {
    let registry = SessionRegistry::default();
    let session = registry.create().await.unwrap();

    let (joined, side, _rx) = registry.join(session.id(), "Alice").await.unwrap();
    let missing = registry.join(SessionId(session.id().0 ^ 1), "Bob").await;

    assert!(Arc::ptr_eq(&joined, &session));
    assert_eq!(side, Side::Left);
    assert!(matches!(missing, Err(SessionError::NotFound(_))));
}

#[tokio::test]
async fn test_stop_all_removes_every_session_and_closes_channels() {
    let registry = SessionRegistry::new(ThreadRandom, SessionConfig::default());
    let mut receivers = Vec::new();
    for _ in 0..3 {
        let session = registry.create().await.unwrap();
        let (_, rx) = session.add_player("Eve").await.unwrap();
        receivers.push(rx);
    }
    assert_eq!(registry.len().await, 3);

    registry.stop_all().await;

    assert!(wait_until_empty(&registry).await, "all sessions should be gone");
    for mut rx in receivers {
        // At most the join broadcast is still buffered; after that, closed.
        let drained = time::timeout(Duration::from_secs(5), async {
            while rx.recv().await.is_some() {}
        })
        .await;
        assert!(drained.is_ok(), "channel should close after termination");
    }
}

#[tokio::test]
async fn test_terminated_session_rejects_joins() {
    let (registry, session) = new_session().await;
    let id = session.id();

    session.cancel();
    assert!(wait_until_empty(&registry).await);

    // Give the lifetime task a moment to finish closing the session.
    for _ in 0..50 {
        if session.state().await == SessionState::Terminated {
            break;
        }
        tokio::task::yield_now().await;
    }
    assert_eq!(session.state().await, SessionState::Terminated);
    assert!(matches!(session.add_player("Late").await, Err(SessionError::NotFound(i)) if i == id));
    assert!(registry.get(id).await.is_none());
}

// =========================================================================
// Idle and lifetime expiry (virtual time)
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_idle_session_is_removed() {
    let registry = SessionRegistry::new(ThreadRandom, config_with_idle(Duration::from_secs(5)));
    let session = registry.create().await.unwrap();
    let id = session.id();

    time::sleep(Duration::from_secs(4)).await;
    assert!(registry.get(id).await.is_some(), "still inside the idle window");

    time::sleep(Duration::from_secs(2)).await;
    assert!(wait_until_empty(&registry).await);
    assert!(registry.get(id).await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_activity_extends_idle_window() {
    let registry = SessionRegistry::new(ThreadRandom, config_with_idle(Duration::from_secs(5)));
    let session = registry.create().await.unwrap();
    let id = session.id();

    time::sleep(Duration::from_secs(3)).await;
    let (_side, _rx) = session.add_player("Alice").await.unwrap();

    // Six seconds after creation, but only three after the join.
    time::sleep(Duration::from_secs(3)).await;
    assert!(registry.get(id).await.is_some(), "join restarted the idle window");

    time::sleep(Duration::from_secs(3)).await;
    assert!(wait_until_empty(&registry).await, "idle again for five seconds");
}

#[tokio::test(start_paused = true)]
async fn test_max_lifetime_ends_busy_session() {
    let config = SessionConfig {
        idle_timeout: Duration::from_secs(5),
        max_lifetime: Duration::from_secs(12),
        ..SessionConfig::default()
    };
    let registry = SessionRegistry::new(ThreadRandom, config);
    let session = registry.create().await.unwrap();
    let (_, _left) = session.add_player("Alice").await.unwrap();
    let (_, _right) = session.add_player("Bob").await.unwrap();

    for _ in 0..5 {
        time::sleep(Duration::from_secs(2)).await;
        session.submit_move(Side::Left, Move::Rock).await.unwrap();
    }
    assert!(registry.get(session.id()).await.is_some(), "ten seconds in, still busy");

    time::sleep(Duration::from_secs(3)).await;
    assert!(wait_until_empty(&registry).await, "max lifetime reached at twelve seconds");
}
