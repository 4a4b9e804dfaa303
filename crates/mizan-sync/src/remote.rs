//! # Remote Replica Adapter
//!
//! The seam between the sync coordinator and whatever backs the remote
//! replicated document store.
//!
//! ## Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       RemoteReplica Contract                            │
//! │                                                                         │
//! │  get(key)   ──► Option<State>     absent key is None, not an error     │
//! │  put(key)   ──► ()                fire-and-forget acceptable           │
//! │  watch(key) ──► Receiver<State>   every remote write of the key        │
//! │                                                                         │
//! │  The replica is OPTIONAL: when no remote is configured the             │
//! │  coordinator simply holds no replica and never calls it.               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Implementations: [`MemoryReplica`] (tests and embedded use) and
//! [`crate::transport::WsReplica`] (the WebSocket client).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc, RwLock};
use tracing::debug;

use mizan_core::State;

use crate::error::SyncResult;

/// A remote replicated document store, keyed by document key.
#[async_trait]
pub trait RemoteReplica: Send + Sync {
    /// Fetches the document stored under `key`. `None` means the key has
    /// never been written, which is the normal first-run case.
    async fn get(&self, key: &str) -> SyncResult<Option<State>>;

    /// Replaces the document stored under `key`.
    async fn put(&self, key: &str, document: &State) -> SyncResult<()>;

    /// Subscribes to writes of `key`. The receiver yields every document
    /// written from the moment of subscription onward, including this
    /// device's own puts (the coordinator filters echoes by equality).
    async fn watch(&self, key: &str) -> SyncResult<mpsc::Receiver<State>>;
}

// =============================================================================
// In-Memory Replica
// =============================================================================

/// In-process replica used by tests and by multi-cache setups in one
/// process. Semantics match the wire version: whole-document writes,
/// change fan-out per key.
#[derive(Clone)]
pub struct MemoryReplica {
    documents: Arc<RwLock<HashMap<String, State>>>,
    changes: broadcast::Sender<(String, State)>,
}

impl MemoryReplica {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(32);
        MemoryReplica {
            documents: Arc::new(RwLock::new(HashMap::new())),
            changes,
        }
    }

    /// Seeds a document, bypassing change notification. Test setup only.
    pub async fn seed(&self, key: &str, document: State) {
        self.documents
            .write()
            .await
            .insert(key.to_string(), document);
    }
}

impl Default for MemoryReplica {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteReplica for MemoryReplica {
    async fn get(&self, key: &str) -> SyncResult<Option<State>> {
        Ok(self.documents.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, document: &State) -> SyncResult<()> {
        self.documents
            .write()
            .await
            .insert(key.to_string(), document.clone());
        // No watchers is fine.
        let _ = self.changes.send((key.to_string(), document.clone()));
        debug!(key, "Memory replica stored document");
        Ok(())
    }

    async fn watch(&self, key: &str) -> SyncResult<mpsc::Receiver<State>> {
        let mut changes = self.changes.subscribe();
        let (tx, rx) = mpsc::channel(32);
        let key = key.to_string();
        tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok((changed_key, document)) if changed_key == key => {
                        if tx.send(document).await.is_err() {
                            break; // watcher dropped
                        }
                    }
                    Ok(_) => continue,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        Ok(rx)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_absent_key_is_none() {
        let replica = MemoryReplica::new();
        assert!(replica.get("shop-main").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let replica = MemoryReplica::new();
        let mut state = State::default();
        state.last_invoice_number = 4;

        replica.put("shop-main", &state).await.unwrap();
        let fetched = replica.get("shop-main").await.unwrap().unwrap();
        assert_eq!(fetched, state);
    }

    #[tokio::test]
    async fn test_watch_sees_every_put_of_its_key() {
        let replica = MemoryReplica::new();
        let mut rx = replica.watch("shop-main").await.unwrap();

        let mut state = State::default();
        state.last_invoice_number = 1;
        replica.put("shop-main", &state).await.unwrap();
        replica.put("other-shop", &State::default()).await.unwrap();
        state.last_invoice_number = 2;
        replica.put("shop-main", &state).await.unwrap();

        assert_eq!(rx.recv().await.unwrap().last_invoice_number, 1);
        // The other-shop write never arrives on this watcher.
        assert_eq!(rx.recv().await.unwrap().last_invoice_number, 2);
    }
}
