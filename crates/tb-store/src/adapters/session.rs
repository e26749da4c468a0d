//! Session store adapters.
//!
//! Two implementations, selected at construction: a process-local map
//! for single-node deployments, and a state-store-backed one for
//! deployments where UI state must survive a restart.

use crate::domain::StoreError;
use crate::ports::session::{Session, SessionStore};
use crate::ports::state_store::StateStore;
use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::UserId;
use std::collections::HashMap;
use std::sync::Arc;

/// Process-local session map. Lost on restart, which only costs users a
/// menu tap.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<UserId, Session>>,
}

impl MemorySessionStore {
    /// An empty session map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn put(&self, user_id: UserId, session: Session) -> Result<(), StoreError> {
        self.sessions.write().insert(user_id, session);
        Ok(())
    }

    async fn get(&self, user_id: UserId) -> Result<Option<Session>, StoreError> {
        Ok(self.sessions.read().get(&user_id).cloned())
    }

    async fn clear(&self, user_id: UserId) -> Result<(), StoreError> {
        self.sessions.write().remove(&user_id);
        Ok(())
    }
}

/// Session store that delegates to the state store, so sessions share
/// the durability of everything else.
pub struct StoreBackedSessionStore {
    store: Arc<dyn StateStore>,
}

impl StoreBackedSessionStore {
    /// Wrap a state store.
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl SessionStore for StoreBackedSessionStore {
    async fn put(&self, user_id: UserId, session: Session) -> Result<(), StoreError> {
        self.store.put_session(user_id, session).await
    }

    async fn get(&self, user_id: UserId) -> Result<Option<Session>, StoreError> {
        self.store.get_session(user_id).await
    }

    async fn clear(&self, user_id: UserId) -> Result<(), StoreError> {
        self.store.clear_session(user_id).await
    }
}
