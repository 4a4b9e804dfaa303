//! # Selector Subscriptions
//!
//! "Initial value plus every committed change" surface for external
//! callers (UI panels, exporters). Each subscription projects the State
//! through a selector so callers observe exactly the slice they render.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Subscription Lifecycle                             │
//! │                                                                         │
//! │  watch(cache, selector, callback)                                      │
//! │       │                                                                 │
//! │       ├── load current State ── callback(selector(state))  (immediate) │
//! │       │                                                                 │
//! │       └── spawn task:                                                   │
//! │              loop select {                                              │
//! │                  change received  ──► callback(selector(state))        │
//! │                  lagged           ──► continue (newest wins)           │
//! │                  channel closed   ──► exit                             │
//! │                  shutdown signal  ──► exit                             │
//! │              }                                                          │
//! │                                                                         │
//! │  handle.cancel() ──► shutdown signal ──► task exits deterministically  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! This replaces fixed-interval polling: the callback runs once per
//! committed change, driven by the cache's broadcast channel.

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::debug;

use mizan_core::State;

use crate::cache::StateCache;
use crate::error::StoreResult;

/// Handle to a running subscription.
///
/// Dropping the handle does NOT stop the task; call [`cancel`] for a
/// deterministic stop.
///
/// [`cancel`]: SubscriptionHandle::cancel
#[derive(Debug)]
pub struct SubscriptionHandle {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl SubscriptionHandle {
    /// Stops the subscription and waits for the task to exit.
    pub async fn cancel(self) {
        // A send error means the task already exited.
        let _ = self.shutdown.send(());
        let _ = self.task.await;
    }

    /// Whether the subscription task has exited on its own.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Starts a subscription on the cache.
///
/// The callback is invoked once immediately with the projection of the
/// current State, then once per committed change. A subscriber that
/// cannot keep up skips to the newest document.
pub async fn watch<T, S, F>(
    cache: &StateCache,
    selector: S,
    mut callback: F,
) -> StoreResult<SubscriptionHandle>
where
    T: Send + 'static,
    S: Fn(&State) -> T + Send + 'static,
    F: FnMut(T) + Send + 'static,
{
    // Subscribe BEFORE the initial read so a commit racing this call is
    // never missed (it may be observed twice, which is harmless).
    let mut changes = cache.subscribe();
    let initial = cache.load_or_default().await?;
    callback(selector(&initial));

    let (shutdown, mut shutdown_rx) = oneshot::channel::<()>();
    let task = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = &mut shutdown_rx => {
                    debug!("Subscription cancelled");
                    break;
                }
                received = changes.recv() => match received {
                    Ok(state) => callback(selector(&state)),
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(skipped, "Subscription lagged, skipping to newest");
                        continue;
                    }
                    Err(RecvError::Closed) => {
                        debug!("Change channel closed, subscription ending");
                        break;
                    }
                },
            }
        }
    });

    Ok(SubscriptionHandle { shutdown, task })
}

// =============================================================================
// Unit Tests
// =============================================================================
