//! Per-session state and the registry that owns it.
//!
//! A [`Session`] holds at most one active [`Index`] and its own
//! [`Conversation`]. Sessions live in a [`SessionRegistry`] keyed by a v4
//! UUID; each is behind its own async mutex so concurrent sessions never
//! block each other or share history.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;
use uuid::Uuid;

use repo_chat_core::conversation::Conversation;

use crate::index::Index;

pub type SessionId = Uuid;

pub struct Session {
    id: SessionId,
    pub index: Option<Index>,
    pub conversation: Conversation,
}

impl Session {
    pub fn new(id: SessionId) -> Self {
        Self {
            id,
            index: None,
            conversation: Conversation::new(),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Make `index` active and start a fresh conversation.
    pub fn attach(&mut self, index: Index) {
        self.index = Some(index);
        self.conversation.reset();
    }
}

#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, Arc<Mutex<Session>>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create(&self) -> SessionId {
        let id = Uuid::new_v4();
        self.sessions
            .write()
            .await
            .insert(id, Arc::new(Mutex::new(Session::new(id))));
        debug!(session = %id, "Created session");
        id
    }

    pub async fn get(&self, id: SessionId) -> Option<Arc<Mutex<Session>>> {
        self.sessions.read().await.get(&id).cloned()
    }

    /// Drop the session and its conversation. Returns whether it existed.
    pub async fn end(&self, id: SessionId) -> bool {
        let removed = self.sessions.write().await.remove(&id).is_some();
        if removed {
            debug!(session = %id, "Ended session");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use repo_chat_core::conversation::Role;

    #[tokio::test]
    async fn test_create_get_end() {
        let registry = SessionRegistry::new();
        let a = registry.create().await;
        let b = registry.create().await;
        assert_ne!(a, b);
        assert_eq!(registry.len().await, 2);

        let session = registry.get(a).await.unwrap();
        assert_eq!(session.lock().await.id(), a);

        assert!(registry.end(a).await);
        assert!(!registry.end(a).await);
        assert!(registry.get(a).await.is_none());
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_sessions_do_not_share_history() {
        let registry = SessionRegistry::new();
        let a = registry.get(registry.create().await).await.unwrap();
        let b = registry.get(registry.create().await).await.unwrap();

        a.lock().await.conversation.record_exchange("q", "a");
        assert_eq!(a.lock().await.conversation.len(), 2);
        assert!(b.lock().await.conversation.is_empty());
        assert_eq!(a.lock().await.conversation.history()[0].role, Role::User);
    }
}
