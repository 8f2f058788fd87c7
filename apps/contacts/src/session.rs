use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use crate::contacts::filter::CategoryFilter;
use crate::contacts::types::ContactInput;

/// Per-browser state. Lives until the session idles past the registry TTL.
#[derive(Debug, Default)]
pub struct SessionState {
    /// Contact list for the session-backed store; unused with postgres.
    pub contacts: Vec<ContactInput>,
    pub category: CategoryFilter,
    flash_error: Option<String>,
}

impl SessionState {
    pub fn set_flash_error(&mut self, message: impl Into<String>) {
        self.flash_error = Some(message.into());
    }

    /// Returns the pending flash message and forgets it.
    pub fn take_flash_error(&mut self) -> Option<String> {
        self.flash_error.take()
    }
}

pub type SessionHandle = Arc<Mutex<SessionState>>;

#[derive(Debug, Clone)]
pub struct ResolvedSession {
    pub id: String,
    pub handle: SessionHandle,
    pub is_new: bool,
}

struct SessionEntry {
    handle: SessionHandle,
    last_seen: Instant,
}

#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Arc<Mutex<HashMap<String, SessionEntry>>>,
    ttl: Duration,
    max_sessions: usize,
}

impl SessionRegistry {
    /// `max_sessions` bounds the live sessions; starting one past the bound
    /// evicts the least recently seen.
    pub fn new(ttl: Duration, max_sessions: usize) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            ttl,
            max_sessions: max_sessions.max(1),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Looks up the session named by the cookie, starting a fresh one when the
    /// cookie is missing, unknown, or expired.
    pub async fn resolve(&self, session_id: Option<&str>) -> ResolvedSession {
        let now = Instant::now();
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|_, entry| now.duration_since(entry.last_seen) < self.ttl);
        let pruned = before - sessions.len();
        if pruned > 0 {
            tracing::debug!(pruned, "expired contact sessions dropped");
        }

        if let Some(id) = session_id
            && let Some(entry) = sessions.get_mut(id)
        {
            entry.last_seen = now;
            return ResolvedSession {
                id: id.to_string(),
                handle: entry.handle.clone(),
                is_new: false,
            };
        }

        while sessions.len() >= self.max_sessions {
            let Some(oldest) = sessions
                .iter()
                .min_by_key(|(_, entry)| entry.last_seen)
                .map(|(id, _)| id.clone())
            else {
                break;
            };
            sessions.remove(&oldest);
            tracing::warn!(
                max_sessions = self.max_sessions,
                "contact session limit reached, evicted least recently seen"
            );
        }

        let id = uuid::Uuid::new_v4().simple().to_string();
        let handle = SessionHandle::default();
        sessions.insert(
            id.clone(),
            SessionEntry {
                handle: handle.clone(),
                last_seen: now,
            },
        );
        tracing::debug!(session_id = %id, "contact session started");
        ResolvedSession {
            id,
            handle,
            is_new: true,
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }
}
