//! # WebSocket Replica
//!
//! WebSocket client for the remote document store, with automatic
//! reconnection and backoff.
//!
//! ## Connection Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    WebSocket Connection States                          │
//! │                                                                         │
//! │  ┌────────────┐    connect()    ┌────────────┐                         │
//! │  │Disconnected│ ──────────────► │ Connecting │                         │
//! │  └────────────┘                 └─────┬──────┘                         │
//! │        ▲                              │                                 │
//! │        │                    success   │   failure                       │
//! │        │                        ┌─────┴─────┐                          │
//! │        │                        ▼           ▼                           │
//! │        │              ┌────────────┐  ┌────────────┐                   │
//! │        │              │ Connected  │  │ Backoff    │                   │
//! │        │              └─────┬──────┘  └─────┬──────┘                   │
//! │        │                    │               │                           │
//! │        │              disconnect/error      │  timer expired            │
//! │        │                    │               │                           │
//! │        │                    ▼               │                           │
//! │        │              ┌────────────┐        │                           │
//! │        └───────────── │Reconnecting│ ◄──────┘                          │
//! │                       └────────────┘                                    │
//! │                                                                         │
//! │  On every (re)connect the task re-sends Watch for all watched keys,    │
//! │  so the change feed survives connection loss.                           │
//! │                                                                         │
//! │  BACKOFF STRATEGY (Exponential)                                        │
//! │  Attempt 1: 500ms ─ 2: 1s ─ 3: 2s ─ ... ─ Max: 60s                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Request Correlation
//! `get` is request/response over a stream: each request carries a fresh
//! UUID, and a pending-request map routes the matching `Document` reply
//! back to the waiting caller via a oneshot channel. A reply that never
//! arrives is a timeout, not a hang.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, Mutex, RwLock};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use async_trait::async_trait;
use mizan_core::State;

use crate::config::RemoteSettings;
use crate::error::{SyncError, SyncResult};
use crate::protocol::ReplicaMessage;
use crate::remote::RemoteReplica;

// =============================================================================
// Transport State
// =============================================================================

/// Connection state for the WebSocket replica.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected.
    Disconnected,
    /// Attempting to connect.
    Connecting,
    /// Connected and ready.
    Connected,
    /// Waiting before reconnection attempt.
    Backoff,
    /// Reconnection in progress.
    Reconnecting,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
            ConnectionState::Backoff => write!(f, "backoff"),
            ConnectionState::Reconnecting => write!(f, "reconnecting"),
        }
    }
}

// =============================================================================
// Transport Configuration
// =============================================================================

/// Configuration for the WebSocket replica.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// WebSocket URL to connect to.
    pub url: String,

    /// Connection timeout.
    pub connect_timeout: Duration,

    /// How long a `get` waits for its Document reply.
    pub request_timeout: Duration,

    /// Initial backoff duration.
    pub initial_backoff: Duration,

    /// Maximum backoff duration.
    pub max_backoff: Duration,

    /// Maximum reconnection attempts (0 = infinite).
    pub max_retries: u32,

    /// Ping interval for keepalive.
    pub ping_interval: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        TransportConfig {
            url: String::new(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(10),
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(60),
            max_retries: 0, // Infinite
            ping_interval: Duration::from_secs(30),
        }
    }
}

impl TransportConfig {
    /// Builds a transport config from validated remote settings.
    pub fn from_remote_settings(settings: &RemoteSettings) -> SyncResult<Self> {
        let url = settings
            .url
            .clone()
            .ok_or_else(|| SyncError::InvalidConfig("remote.url is not set".into()))?;
        Ok(TransportConfig {
            url,
            connect_timeout: Duration::from_secs(settings.connect_timeout_secs),
            request_timeout: Duration::from_secs(settings.request_timeout_secs),
            initial_backoff: Duration::from_millis(settings.initial_backoff_ms),
            max_backoff: Duration::from_secs(settings.max_backoff_secs),
            ..Default::default()
        })
    }
}

// =============================================================================
// Shared Task State
// =============================================================================

type PendingMap = Arc<Mutex<HashMap<String, oneshot::Sender<Option<State>>>>>;
type WatchedKeys = Arc<RwLock<HashSet<String>>>;

// =============================================================================
// WebSocket Replica
// =============================================================================

/// WebSocket-backed [`RemoteReplica`] with automatic reconnection.
///
/// Cheap to clone; clones share the background task.
///
/// ## Usage
/// ```rust,ignore
/// let config = TransportConfig {
///     url: "wss://replica.example/sync".into(),
///     ..Default::default()
/// };
/// let replica = WsReplica::spawn(config);
///
/// let initial = replica.get("shop-main").await?;   // Option<State>
/// let mut feed = replica.watch("shop-main").await?;
/// ```
#[derive(Clone)]
pub struct WsReplica {
    outgoing_tx: mpsc::Sender<ReplicaMessage>,
    pending: PendingMap,
    changed: tokio::sync::broadcast::Sender<(String, State)>,
    watched: WatchedKeys,
    state: Arc<RwLock<ConnectionState>>,
    shutdown_tx: mpsc::Sender<()>,
    request_timeout: Duration,
}

impl WsReplica {
    /// Creates the replica and spawns its background connection task.
    pub fn spawn(config: TransportConfig) -> Self {
        let (outgoing_tx, outgoing_rx) = mpsc::channel::<ReplicaMessage>(100);
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);
        let (changed, _) = tokio::sync::broadcast::channel(32);
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let watched: WatchedKeys = Arc::new(RwLock::new(HashSet::new()));
        let state = Arc::new(RwLock::new(ConnectionState::Disconnected));
        let request_timeout = config.request_timeout;

        let task = ReplicaTask {
            config,
            state: state.clone(),
            outgoing_rx,
            outgoing_tx: outgoing_tx.clone(),
            shutdown_rx,
            pending: pending.clone(),
            changed: changed.clone(),
            watched: watched.clone(),
        };
        tokio::spawn(task.run());

        WsReplica {
            outgoing_tx,
            pending,
            changed,
            watched,
            state,
            shutdown_tx,
            request_timeout,
        }
    }

    /// Returns the current connection state.
    pub async fn connection_state(&self) -> ConnectionState {
        *self.state.read().await
    }

    /// Returns true if currently connected.
    pub async fn is_connected(&self) -> bool {
        *self.state.read().await == ConnectionState::Connected
    }

    /// Triggers graceful shutdown of the background task.
    pub async fn shutdown(&self) -> SyncResult<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| SyncError::ShuttingDown)
    }

    async fn send(&self, message: ReplicaMessage) -> SyncResult<()> {
        self.outgoing_tx
            .send(message)
            .await
            .map_err(|_| SyncError::ChannelError("transport task is gone".into()))
    }
}

#[async_trait]
impl RemoteReplica for WsReplica {
    async fn get(&self, key: &str) -> SyncResult<Option<State>> {
        let request_id = Uuid::new_v4().to_string();
        let (reply_tx, reply_rx) = oneshot::channel();
        self.pending
            .lock()
            .await
            .insert(request_id.clone(), reply_tx);

        self.send(ReplicaMessage::Get {
            request_id: request_id.clone(),
            key: key.to_string(),
        })
        .await?;

        match timeout(self.request_timeout, reply_rx).await {
            Ok(Ok(document)) => Ok(document),
            Ok(Err(_)) => Err(SyncError::Disconnected),
            Err(_) => {
                // Reply never came; forget the correlation entry.
                self.pending.lock().await.remove(&request_id);
                Err(SyncError::Timeout(self.request_timeout.as_secs()))
            }
        }
    }

    async fn put(&self, key: &str, document: &State) -> SyncResult<()> {
        // Queued for the connection task; delivered on (re)connect.
        self.send(ReplicaMessage::Put {
            key: key.to_string(),
            document: document.clone(),
        })
        .await
    }

    async fn watch(&self, key: &str) -> SyncResult<mpsc::Receiver<State>> {
        let newly_watched = self.watched.write().await.insert(key.to_string());
        if newly_watched {
            self.send(ReplicaMessage::Watch {
                key: key.to_string(),
            })
            .await?;
        }

        let mut changes = self.changed.subscribe();
        let (tx, rx) = mpsc::channel(32);
        let key = key.to_string();
        tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok((changed_key, document)) if changed_key == key => {
                        if tx.send(document).await.is_err() {
                            break;
                        }
                    }
                    Ok(_) => continue,
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(skipped, "Watch feed lagged, skipping to newest");
                        continue;
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        Ok(rx)
    }
}

// =============================================================================
// Background Connection Task
// =============================================================================

struct ReplicaTask {
    config: TransportConfig,
    state: Arc<RwLock<ConnectionState>>,
    outgoing_rx: mpsc::Receiver<ReplicaMessage>,
    outgoing_tx: mpsc::Sender<ReplicaMessage>,
    shutdown_rx: mpsc::Receiver<()>,
    pending: PendingMap,
    changed: tokio::sync::broadcast::Sender<(String, State)>,
    watched: WatchedKeys,
}

impl ReplicaTask {
    /// Main transport loop: connect, run, back off, repeat.
    async fn run(mut self) {
        info!(url = %self.config.url, "Replica transport starting");

        let mut backoff = self.create_backoff();
        let mut retry_count = 0u32;

        loop {
            if self.shutdown_rx.try_recv().is_ok() {
                info!("Replica transport received shutdown signal");
                break;
            }

            *self.state.write().await = ConnectionState::Connecting;

            match self.connect_with_timeout().await {
                Ok(ws_stream) => {
                    info!("Replica WebSocket connected");
                    *self.state.write().await = ConnectionState::Connected;
                    backoff.reset();
                    retry_count = 0;

                    if let Err(e) = self.resubscribe_watches().await {
                        warn!(?e, "Failed to queue watch re-subscription");
                    }

                    if let Err(e) = self.connection_loop(ws_stream).await {
                        warn!(?e, "Connection loop ended");
                    }
                }
                Err(e) => {
                    error!(?e, "Failed to connect to replica");
                }
            }

            // A dropped connection orphans in-flight gets; dropping the
            // senders fails them fast instead of letting them time out.
            self.pending.lock().await.clear();

            *self.state.write().await = ConnectionState::Backoff;

            if self.config.max_retries > 0 {
                retry_count += 1;
                if retry_count >= self.config.max_retries {
                    error!(
                        max_retries = self.config.max_retries,
                        "Max reconnection attempts reached"
                    );
                    break;
                }
            }

            if let Some(duration) = backoff.next_backoff() {
                debug!(?duration, attempt = retry_count, "Waiting before reconnect");
                tokio::select! {
                    _ = tokio::time::sleep(duration) => {
                        *self.state.write().await = ConnectionState::Reconnecting;
                    }
                    _ = self.shutdown_rx.recv() => {
                        info!("Shutdown during backoff");
                        break;
                    }
                }
            } else {
                error!("Backoff exhausted");
                break;
            }
        }

        *self.state.write().await = ConnectionState::Disconnected;
        info!("Replica transport stopped");
    }

    /// Re-queues Watch messages for every watched key after a reconnect.
    async fn resubscribe_watches(&self) -> SyncResult<()> {
        let keys: Vec<String> = self.watched.read().await.iter().cloned().collect();
        for key in keys {
            debug!(key = %key, "Re-subscribing watch after reconnect");
            self.outgoing_tx
                .send(ReplicaMessage::Watch { key })
                .await
                .map_err(|_| SyncError::ChannelError("outgoing channel closed".into()))?;
        }
        Ok(())
    }

    /// Connects with timeout.
    async fn connect_with_timeout(
        &self,
    ) -> SyncResult<WebSocketStream<MaybeTlsStream<TcpStream>>> {
        let connect_future = connect_async(self.config.url.as_str());

        match timeout(self.config.connect_timeout, connect_future).await {
            Ok(Ok((ws_stream, response))) => {
                debug!(status = ?response.status(), "WebSocket handshake complete");
                Ok(ws_stream)
            }
            Ok(Err(e)) => Err(SyncError::from(e)),
            Err(_) => Err(SyncError::Timeout(self.config.connect_timeout.as_secs())),
        }
    }

    /// Main connection loop - handles sending and receiving.
    async fn connection_loop(
        &mut self,
        ws_stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    ) -> SyncResult<()> {
        let (mut write, mut read) = ws_stream.split();

        let mut ping_interval = tokio::time::interval(self.config.ping_interval);
        ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                // Outgoing messages
                Some(msg) = self.outgoing_rx.recv() => {
                    let json = msg.to_json()?;
                    debug!(msg_type = %msg.type_name(), "Sending message");
                    write.send(WsMessage::Text(json.into())).await?;
                }

                // Incoming messages
                Some(result) = read.next() => {
                    match result {
                        Ok(WsMessage::Text(text)) => {
                            match ReplicaMessage::from_json(&text) {
                                Ok(msg) => self.handle_incoming(msg).await,
                                Err(e) => warn!(?e, "Failed to parse message"),
                            }
                        }
                        Ok(WsMessage::Ping(data)) => {
                            write.send(WsMessage::Pong(data)).await?;
                        }
                        Ok(WsMessage::Pong(_)) => {
                            debug!("Received pong");
                        }
                        Ok(WsMessage::Close(frame)) => {
                            info!(?frame, "Received close frame");
                            return Ok(());
                        }
                        Ok(WsMessage::Binary(_)) => {
                            warn!("Received unexpected binary message");
                        }
                        Ok(WsMessage::Frame(_)) => {
                            // Raw frame, ignore
                        }
                        Err(e) => {
                            error!(?e, "WebSocket error");
                            return Err(SyncError::from(e));
                        }
                    }
                }

                // Keepalive pings
                _ = ping_interval.tick() => {
                    write.send(WsMessage::Ping(vec![].into())).await?;
                    debug!("Sent ping");
                }

                // Shutdown
                _ = self.shutdown_rx.recv() => {
                    info!("Shutdown signal received, closing connection");
                    let _ = write.send(WsMessage::Close(None)).await;
                    return Ok(());
                }
            }
        }
    }

    /// Routes one server message.
    async fn handle_incoming(&self, msg: ReplicaMessage) {
        debug!(msg_type = %msg.type_name(), "Received message");
        match msg {
            ReplicaMessage::Document {
                request_id,
                document,
                ..
            } => {
                match self.pending.lock().await.remove(&request_id) {
                    Some(reply_tx) => {
                        // A dropped receiver means the get timed out already.
                        let _ = reply_tx.send(document);
                    }
                    None => warn!(request_id = %request_id, "Reply for unknown request"),
                }
            }
            ReplicaMessage::Changed { key, document } => {
                let _ = self.changed.send((key, document));
            }
            ReplicaMessage::Error { code, message } => {
                warn!(code = %code, message = %message, "Remote replica reported an error");
            }
            other => {
                warn!(msg_type = %other.type_name(), "Unexpected client-bound message");
            }
        }
    }

    /// Creates the exponential backoff configuration.
    fn create_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: self.config.initial_backoff,
            max_interval: self.config.max_backoff,
            multiplier: 2.0,
            max_elapsed_time: None, // No limit on total time
            ..Default::default()
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RemoteSettings;

    fn unreachable_config() -> TransportConfig {
        TransportConfig {
            url: "ws://127.0.0.1:1/sync".to_string(),
            connect_timeout: Duration::from_millis(100),
            request_timeout: Duration::from_millis(100),
            initial_backoff: Duration::from_millis(50),
            max_backoff: Duration::from_millis(200),
            ..Default::default()
        }
    }

    #[test]
    fn test_config_from_remote_settings() {
        let settings = RemoteSettings {
            enabled: true,
            url: Some("wss://replica.example/sync".to_string()),
            ..Default::default()
        };
        let config = TransportConfig::from_remote_settings(&settings).unwrap();
        assert_eq!(config.url, "wss://replica.example/sync");
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_config_requires_a_url() {
        let err = TransportConfig::from_remote_settings(&RemoteSettings::default()).unwrap_err();
        assert!(matches!(err, SyncError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn test_get_times_out_when_unreachable() {
        let replica = WsReplica::spawn(unreachable_config());
        let err = replica.get("shop-main").await.unwrap_err();
        assert!(matches!(
            err,
            SyncError::Timeout(_) | SyncError::Disconnected
        ));
        let _ = replica.shutdown().await;
    }

    #[tokio::test]
    async fn test_put_queues_while_disconnected() {
        let replica = WsReplica::spawn(unreachable_config());
        // Fire-and-forget contract: queuing succeeds even while offline.
        replica.put("shop-main", &State::default()).await.unwrap();
        let _ = replica.shutdown().await;
    }
}
