use anyhow::Result;
use tokio::sync::{Mutex, MutexGuard, RwLock};
use tracing::{debug, warn};

use super::store::{MemoryTokenStore, TokenStore};

/// What this process knows about the token, independent of the store.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Slot {
    /// Nothing set or cleared yet; the durable store decides
    Unknown,
    /// Explicitly cleared; the store is not consulted again
    Cleared,
    Present(String),
}

/// Bearer-token holder shared by every request of a client.
///
/// The token lives in two places: an in-memory slot for fast access and a
/// durable [`TokenStore`] so it survives restarts. Owned by the composition
/// root and handed to `ApiClient` behind an `Arc`.
pub struct Session {
    slot: RwLock<Slot>,
    store: Box<dyn TokenStore>,
    refresh_gate: Mutex<()>,
}

impl Session {
    pub fn new(store: impl TokenStore + 'static) -> Self {
        Self {
            slot: RwLock::new(Slot::Unknown),
            store: Box::new(store),
            refresh_gate: Mutex::new(()),
        }
    }

    /// Session backed only by process memory
    pub fn in_memory() -> Self {
        Self::new(MemoryTokenStore::new())
    }

    /// Store the token in memory and in durable storage.
    ///
    /// The in-memory value is updated even when persisting fails, so the
    /// current process keeps working; the error is still returned.
    pub async fn set_token(&self, token: impl Into<String>) -> Result<()> {
        let token = token.into();
        *self.slot.write().await = Slot::Present(token.clone());
        self.store.save(&token)
    }

    /// Current token: memory first, then durable storage. Once the token
    /// has been cleared in this process, storage is no longer read.
    pub async fn token(&self) -> Option<String> {
        match &*self.slot.read().await {
            Slot::Present(token) => return Some(token.clone()),
            Slot::Cleared => return None,
            Slot::Unknown => {}
        }
        match self.store.load() {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Failed to read stored token");
                None
            }
        }
    }

    /// Remove the token from memory and durable storage. Safe to call when
    /// already logged out.
    ///
    /// The session counts as logged out even if the store fails to clear;
    /// the store error is still returned.
    pub async fn clear_token(&self) -> Result<()> {
        *self.slot.write().await = Slot::Cleared;
        self.store.clear()?;
        debug!("Session token cleared");
        Ok(())
    }

    pub async fn is_authenticated(&self) -> bool {
        self.token().await.is_some()
    }

    /// Serializes refresh attempts across concurrent requests.
    pub(crate) async fn refresh_gate(&self) -> MutexGuard<'_, ()> {
        self.refresh_gate.lock().await
    }
}
