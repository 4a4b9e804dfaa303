//! # Sync Coordinator
//!
//! Reconciles the local cache with the optional remote replica.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Coordinator Lifecycle                              │
//! │                                                                         │
//! │  COLD START                                                            │
//! │  ──────────                                                            │
//! │  local cache has a document? ──► use it (startup never waits on the    │
//! │       │ no                        network when local data exists)      │
//! │       ▼                                                                 │
//! │  remote configured? ──► one blocking get ──► adopt if found            │
//! │       │ no / absent / failed                                            │
//! │       ▼                                                                 │
//! │  empty State                                                           │
//! │                                                                         │
//! │  STEADY STATE                                                          │
//! │  ────────────                                                          │
//! │  watch task: remote document arrives                                   │
//! │       │  equal to current? ──► ignore (echo of our own put)            │
//! │       ▼  different                                                      │
//! │  overwrite local cache ──► subscribers notified ──► current updated    │
//! │                                                                         │
//! │  WRITE PATH (every ledger commit)                                      │
//! │  ────────────────────────────────                                      │
//! │  save to local cache (synchronous, must succeed)                       │
//! │       │                                                                 │
//! │       └──► spawned remote put (fire-and-forget, failure logged)        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Replication is last-writer-wins on the whole document: two devices
//! writing near-simultaneously can silently lose one device's update.
//! There is no field-level merge or conflict detection; difference is
//! decided by structural equality, never by timestamps.

use std::sync::Arc;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use mizan_core::State;
use mizan_store::StateCache;

use crate::error::ServiceResult;
use crate::remote::RemoteReplica;

/// Owns the committed State and the replication tasks around it.
pub struct SyncCoordinator {
    cache: StateCache,
    remote: Option<Arc<dyn RemoteReplica>>,
    document_key: String,
    /// Snapshot of the latest committed State. Swapped atomically on
    /// every commit and on adopted remote changes.
    current: Arc<RwLock<Arc<State>>>,
    watch_task: Option<JoinHandle<()>>,
}

impl SyncCoordinator {
    /// Starts the coordinator: runs cold start and, when a remote is
    /// configured, spawns the watch task.
    pub async fn start(
        cache: StateCache,
        remote: Option<Arc<dyn RemoteReplica>>,
        document_key: impl Into<String>,
    ) -> ServiceResult<Self> {
        let document_key = document_key.into();

        // Cold start: local first, then one remote get, then empty.
        let initial = match cache.load().await? {
            Some(local) => {
                info!("Cold start from local cache");
                local
            }
            None => match &remote {
                Some(replica) => match replica.get(&document_key).await {
                    Ok(Some(fetched)) => {
                        info!(key = %document_key, "Cold start from remote document");
                        // Seed the cache so the next start is local.
                        cache.save(&fetched).await?;
                        fetched
                    }
                    Ok(None) => {
                        info!(key = %document_key, "Remote has no document, starting empty");
                        State::default()
                    }
                    Err(e) => {
                        warn!(?e, "Remote get failed during cold start, starting empty");
                        State::default()
                    }
                },
                None => {
                    info!("No remote configured, starting empty");
                    State::default()
                }
            },
        };

        let current = Arc::new(RwLock::new(Arc::new(initial)));

        let watch_task = match &remote {
            Some(replica) => {
                spawn_watch(
                    replica.clone(),
                    cache.clone(),
                    current.clone(),
                    document_key.clone(),
                )
                .await
            }
            None => None,
        };

        Ok(SyncCoordinator {
            cache,
            remote,
            document_key,
            current,
            watch_task,
        })
    }

    /// The latest committed State.
    pub async fn current(&self) -> Arc<State> {
        self.current.read().await.clone()
    }

    /// Commits a new State: synchronous local save, then a background
    /// remote push.
    ///
    /// A remote push failure never fails the commit; it is logged and the
    /// next commit carries the full document anyway. A LOCAL save failure
    /// is returned to the caller, but the committed state still becomes
    /// the operative copy for the session: the operation's side effects
    /// already happened in the computed document, and discarding it would
    /// desynchronize memory from what the user was shown.
    pub async fn commit(&self, state: State) -> ServiceResult<Arc<State>> {
        let committed = Arc::new(state);
        let saved = self.cache.save(&committed).await;
        *self.current.write().await = committed.clone();

        if let Some(replica) = &self.remote {
            let replica = replica.clone();
            let key = self.document_key.clone();
            let document = committed.clone();
            tokio::spawn(async move {
                if let Err(e) = replica.put(&key, &document).await {
                    // Eventually consistent: the next commit pushes the
                    // full document again.
                    warn!(?e, key = %key, "Remote push failed, local commit stands");
                }
            });
        }

        saved?;
        Ok(committed)
    }

    /// The cache this coordinator writes through.
    pub fn cache(&self) -> &StateCache {
        &self.cache
    }

    /// Whether a remote replica is configured.
    pub fn is_replicated(&self) -> bool {
        self.remote.is_some()
    }

    /// Stops the watch task.
    pub async fn shutdown(&mut self) {
        if let Some(task) = self.watch_task.take() {
            task.abort();
            let _ = task.await;
        }
    }
}

/// Spawns the remote watch task. Returns None if the subscription could
/// not be established; the system then runs local-only.
async fn spawn_watch(
    replica: Arc<dyn RemoteReplica>,
    cache: StateCache,
    current: Arc<RwLock<Arc<State>>>,
    document_key: String,
) -> Option<JoinHandle<()>> {
    let mut feed = match replica.watch(&document_key).await {
        Ok(feed) => feed,
        Err(e) => {
            warn!(?e, key = %document_key, "Could not establish remote watch");
            return None;
        }
    };

    Some(tokio::spawn(async move {
        while let Some(incoming) = feed.recv().await {
            // Structural equality, not timestamps: identical documents
            // (echoes of our own put) are ignored.
            if **current.read().await == incoming {
                debug!(key = %document_key, "Remote document unchanged, ignoring");
                continue;
            }

            info!(key = %document_key, "Adopting remote document");
            if let Err(e) = cache.save(&incoming).await {
                warn!(?e, "Failed to persist remote document, keeping it in memory");
            }
            *current.write().await = Arc::new(incoming);
        }
        debug!(key = %document_key, "Remote watch feed ended");
    }))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::MemoryReplica;
    use mizan_store::StoreConfig;
    use std::time::Duration;

    const KEY: &str = "shop-main";

    async fn open_cache() -> StateCache {
        StateCache::open(StoreConfig::in_memory()).await.unwrap()
    }

    fn state_with_invoice(n: u64) -> State {
        let mut state = State::default();
        state.last_invoice_number = n;
        state
    }

    /// Polls until the condition holds or the deadline passes.
    async fn eventually<F, Fut>(mut check: F)
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = bool>,
    {
        for _ in 0..100 {
            if check().await {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached in time");
    }

    #[tokio::test]
    async fn test_cold_start_prefers_local() {
        let cache = open_cache().await;
        cache.save(&state_with_invoice(5)).await.unwrap();

        let replica = Arc::new(MemoryReplica::new());
        replica.seed(KEY, state_with_invoice(99)).await;

        let coordinator = SyncCoordinator::start(cache, Some(replica), KEY)
            .await
            .unwrap();
        // Local wins even though the remote has a different document.
        assert_eq!(coordinator.current().await.last_invoice_number, 5);
    }

    #[tokio::test]
    async fn test_cold_start_pulls_remote_when_local_empty() {
        let cache = open_cache().await;
        let replica = Arc::new(MemoryReplica::new());
        replica.seed(KEY, state_with_invoice(7)).await;

        let coordinator = SyncCoordinator::start(cache, Some(replica), KEY)
            .await
            .unwrap();
        assert_eq!(coordinator.current().await.last_invoice_number, 7);
        // The remote document was seeded into the cache for next start.
        let stored = coordinator.cache().load().await.unwrap().unwrap();
        assert_eq!(stored.last_invoice_number, 7);
    }

    #[tokio::test]
    async fn test_cold_start_empty_everywhere() {
        let coordinator =
            SyncCoordinator::start(open_cache().await, Some(Arc::new(MemoryReplica::new())), KEY)
                .await
                .unwrap();
        assert_eq!(*coordinator.current().await, State::default());
    }

    #[tokio::test]
    async fn test_cold_start_without_remote() {
        let coordinator = SyncCoordinator::start(open_cache().await, None, KEY)
            .await
            .unwrap();
        assert!(!coordinator.is_replicated());
        assert_eq!(*coordinator.current().await, State::default());
    }

    #[tokio::test]
    async fn test_commit_saves_locally_and_pushes_remote() {
        let replica = Arc::new(MemoryReplica::new());
        let coordinator = SyncCoordinator::start(open_cache().await, Some(replica.clone()), KEY)
            .await
            .unwrap();

        coordinator.commit(state_with_invoice(3)).await.unwrap();

        // Local save is synchronous.
        let stored = coordinator.cache().load().await.unwrap().unwrap();
        assert_eq!(stored.last_invoice_number, 3);

        // Remote push is fire-and-forget; it lands eventually.
        eventually(|| {
            let replica = replica.clone();
            async move {
                replica
                    .get(KEY)
                    .await
                    .unwrap()
                    .is_some_and(|s| s.last_invoice_number == 3)
            }
        })
        .await;
    }

    #[tokio::test]
    async fn test_remote_change_overwrites_cache_and_notifies() {
        let replica = Arc::new(MemoryReplica::new());
        let coordinator = SyncCoordinator::start(open_cache().await, Some(replica.clone()), KEY)
            .await
            .unwrap();
        let mut changes = coordinator.cache().subscribe();

        // Another device writes the document.
        replica.put(KEY, &state_with_invoice(11)).await.unwrap();

        let notified = tokio::time::timeout(Duration::from_secs(2), changes.recv())
            .await
            .expect("subscriber was not notified")
            .unwrap();
        assert_eq!(notified.last_invoice_number, 11);
        assert_eq!(coordinator.current().await.last_invoice_number, 11);
    }

    #[tokio::test]
    async fn test_identical_remote_document_is_ignored() {
        let replica = Arc::new(MemoryReplica::new());
        let coordinator = SyncCoordinator::start(open_cache().await, Some(replica.clone()), KEY)
            .await
            .unwrap();

        coordinator.commit(state_with_invoice(4)).await.unwrap();
        eventually(|| {
            let coordinator = &coordinator;
            async move { coordinator.current().await.last_invoice_number == 4 }
        })
        .await;

        // The echo of our own put must not trigger a second save.
        let mut changes = coordinator.cache().subscribe();
        replica.put(KEY, &state_with_invoice(4)).await.unwrap();
        let echoed = tokio::time::timeout(Duration::from_millis(200), changes.recv()).await;
        assert!(echoed.is_err(), "identical document re-notified subscribers");
    }

    #[tokio::test]
    async fn test_commit_updates_memory_even_when_save_fails() {
        let cache = open_cache().await;
        let coordinator = SyncCoordinator::start(cache.clone(), None, KEY)
            .await
            .unwrap();
        cache.close().await;

        let result = coordinator.commit(state_with_invoice(8)).await;
        assert!(result.is_err());
        // The computed state is still the operative copy.
        assert_eq!(coordinator.current().await.last_invoice_number, 8);
    }
}
