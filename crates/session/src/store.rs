//! Session-keyed storage.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use toolchat_config::AppConfig;
use toolchat_core::{Provider, SessionId};
use tracing::info;

use crate::error::SessionError;
use crate::session::ChatSession;

/// Builds a fresh session on demand.
pub type SessionFactory = Arc<dyn Fn() -> Result<ChatSession, SessionError> + Send + Sync>;

struct Entry {
    session: Arc<Mutex<ChatSession>>,
    last_used: Instant,
}

impl Entry {
    fn new(session: ChatSession) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
            last_used: Instant::now(),
        }
    }

    /// Someone outside the store still holds the session, e.g. a running turn.
    fn in_use(&self) -> bool {
        Arc::strong_count(&self.session) > 1
    }
}

/// All live sessions, each behind its own lock.
///
/// The map lock is only held to look up, insert or remove an entry. A turn
/// holds the per-session lock, so turns of one session run one at a time
/// while other sessions proceed independently.
///
/// Every lookup marks the session as used; [`evict_idle`](Self::evict_idle)
/// drops sessions nobody has asked for within a given time.
pub struct SessionStore {
    sessions: RwLock<HashMap<SessionId, Entry>>,
    factory: SessionFactory,
}

impl SessionStore {
    pub fn new(factory: SessionFactory) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            factory,
        }
    }

    /// Store whose sessions are built from the application configuration.
    pub fn from_config(config: AppConfig, provider: Arc<dyn Provider>) -> Self {
        let config = Arc::new(config);
        Self::new(Arc::new(move || {
            ChatSession::from_config(&config, provider.clone())
        }))
    }

    /// Start a new session under a server-issued id.
    pub async fn create(&self) -> Result<SessionId, SessionError> {
        let session = (self.factory)()?;
        let id = session.id().clone();
        self.sessions
            .write()
            .await
            .insert(id.clone(), Entry::new(session));
        info!(session_id = %id, "Session created");
        Ok(id)
    }

    /// Fetch a session, creating it on first access.
    pub async fn get_or_create(
        &self,
        id: &SessionId,
    ) -> Result<Arc<Mutex<ChatSession>>, SessionError> {
        if let Some(existing) = self.get(id).await {
            return Ok(existing);
        }

        let session = (self.factory)()?.with_id(id.clone());
        let mut sessions = self.sessions.write().await;
        // Another request may have won the race while we were building.
        let entry = sessions.entry(id.clone()).or_insert_with(|| {
            info!(session_id = %id, "Session created on first access");
            Entry::new(session)
        });
        entry.last_used = Instant::now();
        Ok(entry.session.clone())
    }

    /// Fetch an existing session without creating one.
    pub async fn get(&self, id: &SessionId) -> Option<Arc<Mutex<ChatSession>>> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions.get_mut(id)?;
        entry.last_used = Instant::now();
        Some(entry.session.clone())
    }

    /// Tear a session down. Returns `false` for an unknown id.
    pub async fn remove(&self, id: &SessionId) -> bool {
        let removed = self.sessions.write().await.remove(id).is_some();
        if removed {
            info!(session_id = %id, "Session removed");
        }
        removed
    }

    /// Drop every session unused for longer than `max_idle`.
    ///
    /// Sessions still held elsewhere (a turn in flight) are kept. Returns
    /// how many were dropped.
    pub async fn evict_idle(&self, max_idle: Duration) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|id, entry| {
            let keep = entry.in_use() || now.duration_since(entry.last_used) <= max_idle;
            if !keep {
                info!(session_id = %id, "Idle session evicted");
            }
            keep
        });
        before - sessions.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
