//! Session registry: creates, tracks, and shuts down game sessions.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use rpsls_protocol::{SessionId, Side};
use tokio::runtime::Handle;
use tokio::sync::RwLock;
use tokio::time;

use crate::session::supervise;
use crate::{
    GameSession, PlayerReceiver, RandomError, RandomProvider, SessionConfig, SessionError,
    Termination, ThreadRandom, next_session_id,
};

type SessionMap = HashMap<SessionId, Arc<GameSession>>;

/// Owns every live session, keyed by id.
///
/// This is the entry point for the connection layer: create a session,
/// share its id, look it up when the second player arrives.
///
/// ## Locking
///
/// The map sits behind its own `RwLock`. No code path holds the map lock
/// and a session's seat lock at the same time, so the two can't deadlock
/// against each other.
///
/// ## Lifecycle
///
/// ```text
/// create() ──→ [live in map] ──(idle / max lifetime / cancel)──→ removed by its own task
/// ```
pub struct SessionRegistry<R: RandomProvider = ThreadRandom> {
    sessions: Arc<RwLock<SessionMap>>,
    rng: R,
    config: SessionConfig,
}

impl<R: RandomProvider> SessionRegistry<R> {
    /// Creates an empty registry drawing identifiers from `rng`.
    pub fn new(rng: R, config: SessionConfig) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            rng,
            config,
        }
    }

    /// Configuration applied to every session this registry creates.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Creates a session under a fresh id and starts its lifetime task.
    ///
    /// Ids that collide with a live session are regenerated from scratch
    /// until one is free.
    ///
    /// # Errors
    /// - [`SessionError::RandomSource`]: the random provider failed or
    ///   timed out; nothing was inserted
    /// - [`SessionError::StartFailed`]: the lifetime task couldn't be
    ///   spawned; the entry was removed again
    pub async fn create(&self) -> Result<Arc<GameSession>, SessionError> {
        let session = loop {
            let id = self.draw_id().await?;
            let mut sessions = self.sessions.write().await;
            match sessions.entry(id) {
                Entry::Occupied(_) => {
                    tracing::warn!(session_id = %id, "session id collision, regenerating");
                }
                Entry::Vacant(slot) => {
                    let session = Arc::new(GameSession::new(id, self.config.clone()));
                    slot.insert(Arc::clone(&session));
                    break session;
                }
            }
        };

        if let Err(err) = self.start(&session) {
            self.remove(session.id()).await;
            tracing::error!(session_id = %session.id(), error = %err, "session failed to start");
            return Err(err);
        }

        tracing::info!(session_id = %session.id(), "session created");
        Ok(session)
    }

    /// Looks up a live session.
    pub async fn get(&self, id: SessionId) -> Option<Arc<GameSession>> {
        self.sessions.read().await.get(&id).cloned()
    }

    /// Looks up a live session, failing with [`SessionError::NotFound`].
    pub async fn find(&self, id: SessionId) -> Result<Arc<GameSession>, SessionError> {
        self.get(id).await.ok_or(SessionError::NotFound(id))
    }

    /// Looks up a session and seats a player in it.
    ///
    /// # Errors
    /// [`SessionError::NotFound`] plus everything
    /// [`GameSession::add_player`] can return.
    pub async fn join(
        &self,
        id: SessionId,
        name: &str,
    ) -> Result<(Arc<GameSession>, Side, PlayerReceiver), SessionError> {
        let session = self.find(id).await?;
        let (side, receiver) = session.add_player(name).await?;
        Ok((session, side, receiver))
    }

    /// Drops a session from the map. Removing an absent id is a no-op.
    ///
    /// This does not stop the session's lifetime task; use
    /// [`GameSession::cancel`] for that.
    pub async fn remove(&self, id: SessionId) {
        if self.sessions.write().await.remove(&id).is_some() {
            tracing::debug!(session_id = %id, "session removed");
        }
    }

    /// Asks every live session to shut down.
    ///
    /// Returns immediately. Sessions leave the map as their lifetime
    /// tasks notice the cancellation.
    pub async fn stop_all(&self) {
        let sessions = self.sessions.read().await;
        tracing::info!(sessions = sessions.len(), "stopping all sessions");
        for session in sessions.values() {
            session.cancel();
        }
    }

    /// Returns the number of live sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Returns `true` if no session is live.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Lists the ids of all live sessions.
    pub async fn ids(&self) -> Vec<SessionId> {
        self.sessions.read().await.keys().copied().collect()
    }

    async fn draw_id(&self) -> Result<SessionId, RandomError> {
        let limit = self.config.random_timeout;
        time::timeout(limit, next_session_id(&self.rng))
            .await
            .map_err(|_| RandomError::TimedOut(limit))?
    }

    /// Spawns the lifetime task. When it ends, for whatever reason, the
    /// session is removed from the map and closed.
    fn start(&self, session: &Arc<GameSession>) -> Result<(), SessionError> {
        let id = session.id();
        let handle = Handle::try_current().map_err(|e| SessionError::StartFailed {
            session: id,
            reason: e.to_string(),
        })?;
        if !session.mark_started() {
            return Err(SessionError::StartFailed {
                session: id,
                reason: "already started".to_string(),
            });
        }

        let sessions = Arc::clone(&self.sessions);
        let session = Arc::clone(session);
        handle.spawn(async move {
            let reason = supervise(id, session.run_lifetime()).await;
            // Teardown runs even if the lifetime panicked, and is isolated
            // the same way.
            let reason = supervise(id, retire(&sessions, &session, reason)).await;
            tracing::info!(session_id = %id, %reason, "session terminated");
        });
        Ok(())
    }
}

/// Drops `session` from the map and closes it, passing `reason` through.
async fn retire(
    sessions: &RwLock<SessionMap>,
    session: &Arc<GameSession>,
    reason: Termination,
) -> Termination {
    let id = session.id();
    {
        let mut map = sessions.write().await;
        // Only remove the entry if it is still this session.
        if map.get(&id).is_some_and(|current| Arc::ptr_eq(current, session)) {
            map.remove(&id);
        }
    }
    session.close().await;
    reason
}

impl Default for SessionRegistry<ThreadRandom> {
    fn default() -> Self {
        Self::new(ThreadRandom, SessionConfig::default())
    }
}
