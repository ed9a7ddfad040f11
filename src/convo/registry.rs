//! Session registry: one live conversation per call identifier.
//!
//! Sessions are created on first touch (the first turn, not call dial) and
//! destroyed on terminal call status. Each session sits behind its own
//! `tokio::Mutex`: a turn holds the lock for its entire compute, so an
//! overlapping retry for the same call blocks instead of interleaving state
//! mutations. There is no global lock across calls.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::convo::session::ConversationSession;

/// Shared handle to one session.
pub type SessionHandle = Arc<Mutex<ConversationSession>>;

/// Registry of live call sessions, keyed by call SID.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, SessionHandle>>,
}

impl SessionRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Get the session for `session_id`, creating it on first contact.
    /// Re-entry with the same id returns the same handle.
    pub async fn get_or_create(&self, session_id: &str, user_id: &str) -> SessionHandle {
        if let Some(existing) = self.sessions.read().await.get(session_id) {
            return Arc::clone(existing);
        }

        let mut sessions = self.sessions.write().await;
        // Double-check under the write lock; a concurrent first turn may have
        // created it between our read and write.
        if let Some(existing) = sessions.get(session_id) {
            return Arc::clone(existing);
        }

        info!(call_sid = %session_id, user_id = %user_id, "Creating conversation session");
        let handle = Arc::new(Mutex::new(ConversationSession::new(session_id, user_id)));
        sessions.insert(session_id.to_string(), Arc::clone(&handle));
        handle
    }

    /// Look up an existing session. `None` is the session-miss signal; the
    /// transport restarts the greeting flow on it.
    pub async fn get(&self, session_id: &str) -> Option<SessionHandle> {
        self.sessions.read().await.get(session_id).map(Arc::clone)
    }

    /// Remove a session. Safe to call while a turn is mid-flight: that turn
    /// keeps running on its own clone of the handle and is simply not
    /// reachable for later turns.
    pub async fn destroy(&self, session_id: &str) -> bool {
        let removed = self.sessions.write().await.remove(session_id).is_some();
        if removed {
            info!(call_sid = %session_id, "Destroyed conversation session");
        } else {
            debug!(call_sid = %session_id, "Destroy for unknown session (already gone)");
        }
        removed
    }

    /// Number of live sessions (health surface).
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
