//! Session registry

use crate::session::{PlayerSession, SessionId};
use hunt_core::{BridgeError, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

/// Shared handle to one registered session
pub type SessionHandle = Arc<Mutex<PlayerSession>>;

/// Registry of joined sessions
///
/// The table lock is held only for the map operation itself, never across
/// session I/O. Each session has its own lock.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, SessionHandle>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a joined session under its identifier
    pub async fn create(&self, session: PlayerSession) -> Result<SessionId> {
        let id = session.id().to_string();
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&id) {
            return Err(BridgeError::Session(format!("{}: duplicate session id", id)));
        }
        sessions.insert(id.clone(), Arc::new(Mutex::new(session)));
        debug!("Registered session {} ({} active)", id, sessions.len());
        Ok(id)
    }

    /// Find a session
    pub async fn lookup(&self, id: &str) -> Result<SessionHandle> {
        self.sessions
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| BridgeError::UnknownSession(id.to_string()))
    }

    /// Remove a session, then close it
    pub async fn delete(&self, id: &str) -> Result<()> {
        let handle = self
            .sessions
            .write()
            .await
            .remove(id)
            .ok_or_else(|| BridgeError::UnknownSession(id.to_string()))?;

        handle.lock().await.close().await;
        debug!("Deleted session {}", id);
        Ok(())
    }

    /// Number of registered sessions
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Remove and close every session
    pub async fn close_all(&self) {
        let drained: Vec<_> = self.sessions.write().await.drain().collect();
        for (_, handle) in drained {
            handle.lock().await.close().await;
        }
    }
}
