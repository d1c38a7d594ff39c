//! Per-user conversation sessions
//!
//! A session exists only while a conversation is active. It is created
//! by `/start` and removed when the conversation ends, is cancelled, or
//! fails. Abandoned sessions are dropped by [`SessionStore::evict_idle`].

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::debug;

use crate::chat::UserId;

/// Step of the conversation; decides which handler gets the next message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationState {
    /// Waiting for "Так" or "Ні"
    AskReference,
    /// Waiting for a photo
    ReceiveReference,
    /// Waiting for the text description
    ReceivePrompt,
}

/// Scratch data for one conversation attempt
#[derive(Debug, Clone)]
pub struct Session {
    pub state: ConversationState,
    pub reference_path: Option<PathBuf>,
    touched_at: Instant,
}

impl Session {
    fn new() -> Self {
        Self {
            state: ConversationState::AskReference,
            reference_path: None,
            touched_at: Instant::now(),
        }
    }
}

/// Process-wide map of active sessions
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<UserId, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the user's session, creating one at the yes/no gate
    pub async fn get_or_create(&self, user_id: UserId) -> Session {
        let mut sessions = self.sessions.write().await;
        sessions
            .entry(user_id)
            .or_insert_with(|| {
                debug!("Creating session for user {}", user_id);
                Session::new()
            })
            .clone()
    }

    pub async fn get(&self, user_id: UserId) -> Option<Session> {
        self.sessions.read().await.get(&user_id).cloned()
    }

    /// Move the session to `state`. Returns false if there is no session.
    pub async fn set_state(&self, user_id: UserId, state: ConversationState) -> bool {
        self.update(user_id, |s| s.state = state).await
    }

    /// Record the reference photo path. Returns false if there is no session.
    pub async fn set_reference(&self, user_id: UserId, path: PathBuf) -> bool {
        self.update(user_id, |s| s.reference_path = Some(path)).await
    }

    pub async fn clear_reference(&self, user_id: UserId) -> bool {
        self.update(user_id, |s| s.reference_path = None).await
    }

    /// Mark the session active without changing it
    pub async fn touch(&self, user_id: UserId) -> bool {
        self.update(user_id, |_| {}).await
    }

    async fn update(&self, user_id: UserId, f: impl FnOnce(&mut Session)) -> bool {
        match self.sessions.write().await.get_mut(&user_id) {
            Some(session) => {
                f(session);
                session.touched_at = Instant::now();
                true
            }
            None => false,
        }
    }

    /// End the user's conversation
    pub async fn remove(&self, user_id: UserId) -> Option<Session> {
        self.sessions.write().await.remove(&user_id)
    }

    /// Drop sessions not touched within `ttl`; returns how many were dropped
    pub async fn evict_idle(&self, ttl: Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.touched_at.elapsed() < ttl);
        before - sessions.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
