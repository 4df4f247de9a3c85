//! In-memory registry of chat sessions, keyed by UUID.
//!
//! Each entry remembers when it was last used and the task generating its
//! current answer. Idle entries are evicted after `idle_ttl`; sessions with a
//! running turn are kept until the turn ends.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, RwLock};
use tokio::task::AbortHandle;
use tracing::debug;
use uuid::Uuid;

use crate::session::ChatSession;

/// One session, shared between request handlers and its running turn.
pub type SharedSession = Arc<Mutex<ChatSession>>;

/// Idle time after which a session is forgotten, unless configured otherwise.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(60 * 60);

struct Entry {
    session: SharedSession,
    last_active: Instant,
    turn: Option<AbortHandle>,
}

impl Entry {
    fn turn_running(&self) -> bool {
        self.turn.as_ref().is_some_and(|t| !t.is_finished())
    }

    fn abort_turn(&mut self) -> bool {
        match self.turn.take() {
            Some(t) if !t.is_finished() => {
                t.abort();
                true
            }
            _ => false,
        }
    }
}

/// Process-local session contexts. Cloning shares the same map.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<Uuid, Entry>>>,
    /// `Duration::ZERO` disables eviction.
    idle_ttl: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_idle_ttl(DEFAULT_SESSION_TTL)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_idle_ttl(idle_ttl: Duration) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            idle_ttl,
        }
    }

    /// Registers a fresh idle session and returns its id.
    pub async fn create(&self) -> (Uuid, SharedSession) {
        let id = Uuid::new_v4();
        let session = Arc::new(Mutex::new(ChatSession::new()));
        let mut map = self.inner.write().await;
        self.evict_idle(&mut map);
        map.insert(
            id,
            Entry {
                session: session.clone(),
                last_active: Instant::now(),
                turn: None,
            },
        );
        (id, session)
    }

    /// Looks up a session and marks it as used.
    pub async fn get(&self, id: &Uuid) -> Option<SharedSession> {
        let mut map = self.inner.write().await;
        self.evict_idle(&mut map);
        let entry = map.get_mut(id)?;
        entry.last_active = Instant::now();
        Some(entry.session.clone())
    }

    /// Records the task generating the session's current answer.
    ///
    /// Callers hold the session lock while submitting and tracking, so a
    /// concurrent reset always finds the handle. If the session is already
    /// gone the task is aborted.
    pub async fn track_turn(&self, id: &Uuid, turn: AbortHandle) {
        match self.inner.write().await.get_mut(id) {
            Some(entry) => entry.turn = Some(turn),
            None => turn.abort(),
        }
    }

    /// Stops the running turn, if any. Returns `true` if one was aborted.
    pub async fn abort_turn(&self, id: &Uuid) -> bool {
        let mut map = self.inner.write().await;
        map.get_mut(id).is_some_and(Entry::abort_turn)
    }

    /// Forgets the session and stops its running turn. Returns `false` if it
    /// did not exist.
    pub async fn remove(&self, id: &Uuid) -> bool {
        match self.inner.write().await.remove(id) {
            Some(mut entry) => {
                entry.abort_turn();
                true
            }
            None => false,
        }
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    fn evict_idle(&self, map: &mut HashMap<Uuid, Entry>) {
        if self.idle_ttl.is_zero() {
            return;
        }
        let before = map.len();
        map.retain(|_, e| e.turn_running() || e.last_active.elapsed() < self.idle_ttl);
        let evicted = before - map.len();
        if evicted > 0 {
            debug!(evicted, remaining = map.len(), "evicted idle sessions");
        }
    }
}
