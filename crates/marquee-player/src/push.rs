//! # Push Subscription Manager
//!
//! Long-lived push channels with dedup, refcounting, and capped reconnect.
//!
//! ## Channel Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Push Channel Lifecycle                             │
//! │                                                                         │
//! │  subscribe_commands(dev-1, cb)                                         │
//! │       │                                                                 │
//! │       ├── registry has 'commands:dev-1'? ──► add observer, REUSE       │
//! │       │                                       the open channel          │
//! │       └── else: spawn channel task ──┐                                  │
//! │                                      ▼                                  │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                     channel task (per key)                       │  │
//! │  │                                                                  │  │
//! │  │   open ──ok──► read events ──► fan out to observers              │  │
//! │  │     ▲              │                                             │  │
//! │  │     │              └─ stream ends → channel lost                 │  │
//! │  │     │                     │                                      │  │
//! │  │     │     backoff (BackoffPolicy, jittered)                      │  │
//! │  │     └─────────────┬───────┘                                      │  │
//! │  │                   │ attempt > max_channel_retries?               │  │
//! │  │                   └──yes──► TERMINAL: log and stop THIS channel  │  │
//! │  │                             (poll fallback keeps device alive)   │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │       ▲                                                                 │
//! │       │  last observer unsubscribes → shutdown task, drop registry     │
//! │       │  entry                                                          │
//! │                                                                         │
//! │  CHANNEL KEYS: (concern, scope id)                                     │
//! │  • commands:<deviceId>   - device-command-inserted                     │
//! │  • refresh:<deviceId>    - device-needs-refresh (old/new row diff)     │
//! │  • content:<sequenceId>  - content-edited-for-active-sequence          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Push is an optimization, not the only path: the agent's poll loops keep a
//! device alive after a channel fails terminally.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, error, info, warn};

use crate::connectivity::{ConnectionStatus, ConnectivityMonitor};
use crate::error::{PlayerError, PlayerResult};
use marquee_core::{BackoffPolicy, Command, DeviceRecord, RefreshReason};

// =============================================================================
// Channel Keys
// =============================================================================

/// The concern a push channel carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Concern {
    /// device-command-inserted notifications.
    Commands,

    /// device-needs-refresh notifications.
    Refresh,

    /// content-edited notifications for a sequence.
    Content,
}

impl std::fmt::Display for Concern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Concern::Commands => write!(f, "commands"),
            Concern::Refresh => write!(f, "refresh"),
            Concern::Content => write!(f, "content"),
        }
    }
}

/// Identity of one push channel: (concern, scoping id).
///
/// At most one underlying channel exists per key; the registry dedups.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelKey {
    /// What the channel carries.
    pub concern: Concern,

    /// The id scoping the channel (device id or sequence id).
    pub scope_id: String,
}

impl ChannelKey {
    /// Creates a channel key.
    pub fn new(concern: Concern, scope_id: &str) -> Self {
        ChannelKey {
            concern,
            scope_id: scope_id.to_string(),
        }
    }

    /// The wire channel name, e.g. `commands:dev-1`.
    pub fn channel_name(&self) -> String {
        format!("{}:{}", self.concern, self.scope_id)
    }
}

impl std::fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.channel_name())
    }
}

// =============================================================================
// Wire Messages
// =============================================================================

/// Push notifications as they appear on the wire.
///
/// Adjacently tagged JSON: `{ "type": "CommandInserted", "payload": { ... } }`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum PushMessage {
    /// A command row was inserted for this device.
    CommandInserted(Command),

    /// The device row changed; carries the row before and after so the
    /// player can derive a refresh reason.
    DeviceChanged {
        old: DeviceRecord,
        new: DeviceRecord,
    },

    /// Content belonging to a sequence was edited.
    ContentEdited { sequence_id: String },

    /// Keepalive from the realtime facility.
    Ping { timestamp: String },

    /// Error notification from the realtime facility.
    Error { code: String, message: String },
}

// =============================================================================
// Channel Opener (transport seam)
// =============================================================================

/// Opens the underlying transport for one channel key.
///
/// Production uses [`WsChannelOpener`]; tests substitute in-process fakes.
/// The returned receiver yields parsed messages and *ends* when the channel
/// is lost - reconnecting is the manager's job, not the opener's.
#[async_trait]
pub trait ChannelOpener: Send + Sync {
    async fn open(&self, key: &ChannelKey) -> PlayerResult<mpsc::Receiver<PushMessage>>;
}

/// WebSocket-based channel opener.
///
/// One socket per channel, URL shaped `wss://host/channels/<channel-name>`.
pub struct WsChannelOpener {
    realtime_url: String,
    connect_timeout: Duration,
}

impl WsChannelOpener {
    /// Creates an opener against the given realtime facility URL.
    pub fn new(realtime_url: &str, connect_timeout: Duration) -> Self {
        WsChannelOpener {
            realtime_url: realtime_url.trim_end_matches('/').to_string(),
            connect_timeout,
        }
    }
}

#[async_trait]
impl ChannelOpener for WsChannelOpener {
    async fn open(&self, key: &ChannelKey) -> PlayerResult<mpsc::Receiver<PushMessage>> {
        let url = format!("{}/{}", self.realtime_url, key.channel_name());

        let (ws_stream, response) = match timeout(self.connect_timeout, connect_async(&url)).await
        {
            Ok(Ok(pair)) => pair,
            Ok(Err(e)) => {
                return Err(PlayerError::SubscribeFailed {
                    channel: key.channel_name(),
                    message: e.to_string(),
                })
            }
            Err(_) => return Err(PlayerError::Timeout(self.connect_timeout.as_secs())),
        };

        debug!(channel = %key, status = ?response.status(), "Realtime handshake complete");

        let (tx, rx) = mpsc::channel::<PushMessage>(64);
        let channel_name = key.channel_name();

        // Forward task: parse frames into PushMessages until the socket or
        // the receiver goes away. Dropping `tx` ends the receiver, which the
        // manager reads as "channel lost".
        tokio::spawn(async move {
            let (mut write, mut read) = ws_stream.split();

            while let Some(result) = read.next().await {
                match result {
                    Ok(WsMessage::Text(text)) => match serde_json::from_str::<PushMessage>(&text) {
                        Ok(msg) => {
                            if tx.send(msg).await.is_err() {
                                debug!(channel = %channel_name, "Subscriber gone, closing socket");
                                break;
                            }
                        }
                        Err(e) => {
                            warn!(channel = %channel_name, error = %e, "Failed to parse push message");
                        }
                    },
                    Ok(WsMessage::Ping(data)) => {
                        let _ = write.send(WsMessage::Pong(data)).await;
                    }
                    Ok(WsMessage::Close(frame)) => {
                        info!(channel = %channel_name, ?frame, "Received close frame");
                        break;
                    }
                    Ok(_) => {
                        // Binary/pong/raw frames are not part of the protocol
                    }
                    Err(e) => {
                        warn!(channel = %channel_name, error = %e, "Realtime socket error");
                        break;
                    }
                }
            }
        });

        Ok(rx)
    }
}

// =============================================================================
// Push Manager
// =============================================================================

type Observer = Arc<dyn Fn(&PushMessage) + Send + Sync>;

struct ObserverSet {
    next_id: u64,
    observers: HashMap<u64, Observer>,
}

struct ChannelEntry {
    observers: Arc<Mutex<ObserverSet>>,
    shutdown_tx: mpsc::Sender<()>,
}

type Registry = Mutex<HashMap<ChannelKey, ChannelEntry>>;

/// Maintains push channels keyed by (concern, scope id).
///
/// Cheap to clone; all clones share the same registry. Registry mutations
/// happen synchronously under a std Mutex, never across an await, so two
/// subscribers can never race a duplicate channel open for the same key.
#[derive(Clone)]
pub struct PushManager {
    opener: Arc<dyn ChannelOpener>,
    monitor: ConnectivityMonitor,
    policy: BackoffPolicy,
    max_retries: u32,
    registry: Arc<Registry>,
}

impl PushManager {
    /// Creates a push manager.
    ///
    /// ## Arguments
    /// * `opener` - Transport for opening individual channels
    /// * `monitor` - Connectivity monitor to drive on open/loss
    /// * `policy` - Backoff policy for reconnect delays
    /// * `max_retries` - Reconnect cap per channel before terminal failure
    pub fn new(
        opener: Arc<dyn ChannelOpener>,
        monitor: ConnectivityMonitor,
        policy: BackoffPolicy,
        max_retries: u32,
    ) -> Self {
        PushManager {
            opener,
            monitor,
            policy,
            max_retries,
            registry: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Subscribes to device-command-inserted notifications.
    pub fn subscribe_commands(
        &self,
        device_id: &str,
        on_command: impl Fn(Command) + Send + Sync + 'static,
    ) -> PushSubscription {
        self.subscribe_raw(
            ChannelKey::new(Concern::Commands, device_id),
            Arc::new(move |msg| {
                if let PushMessage::CommandInserted(command) = msg {
                    on_command(command.clone());
                }
            }),
        )
    }

    /// Subscribes to device-needs-refresh notifications.
    ///
    /// The callback fires with a reason derived from diffing the old and new
    /// device rows; changes that are not render-relevant are filtered out.
    pub fn subscribe_refresh(
        &self,
        device_id: &str,
        on_refresh: impl Fn(RefreshReason) + Send + Sync + 'static,
    ) -> PushSubscription {
        self.subscribe_raw(
            ChannelKey::new(Concern::Refresh, device_id),
            Arc::new(move |msg| {
                if let PushMessage::DeviceChanged { old, new } = msg {
                    if let Some(reason) = RefreshReason::from_change(old, new) {
                        on_refresh(reason);
                    }
                }
            }),
        )
    }

    /// Subscribes to content-edited notifications for a sequence.
    pub fn subscribe_content(
        &self,
        sequence_id: &str,
        on_update: impl Fn(String) + Send + Sync + 'static,
    ) -> PushSubscription {
        self.subscribe_raw(
            ChannelKey::new(Concern::Content, sequence_id),
            Arc::new(move |msg| {
                if let PushMessage::ContentEdited { sequence_id } = msg {
                    on_update(sequence_id.clone());
                }
            }),
        )
    }

    /// Registers an observer, opening the channel if this is the first
    /// interest in its key.
    fn subscribe_raw(&self, key: ChannelKey, observer: Observer) -> PushSubscription {
        let mut registry = self.registry.lock().expect("push registry lock poisoned");

        if let Some(entry) = registry.get(&key) {
            // Channel already open: reuse it
            let id = {
                let mut set = entry.observers.lock().expect("observer lock poisoned");
                let id = set.next_id;
                set.next_id += 1;
                set.observers.insert(id, observer);
                id
            };
            debug!(channel = %key, "Reusing open push channel");
            return PushSubscription {
                key,
                id,
                registry: Arc::downgrade(&self.registry),
            };
        }

        // First interest: spawn the channel task
        let observers = Arc::new(Mutex::new(ObserverSet {
            next_id: 1,
            observers: HashMap::from([(0u64, observer)]),
        }));

        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);

        tokio::spawn(run_channel(
            key.clone(),
            self.opener.clone(),
            observers.clone(),
            self.monitor.clone(),
            self.policy,
            self.max_retries,
            shutdown_rx,
        ));

        registry.insert(
            key.clone(),
            ChannelEntry {
                observers,
                shutdown_tx,
            },
        );

        info!(channel = %key, "Push channel registered");

        PushSubscription {
            key,
            id: 0,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Tears down every open channel and clears the registry.
    ///
    /// Safe to call when nothing was ever opened, and safe to call twice.
    pub fn unsubscribe_all(&self) {
        let mut registry = self.registry.lock().expect("push registry lock poisoned");

        for (key, entry) in registry.drain() {
            debug!(channel = %key, "Closing push channel");
            // The task may already have ended (terminal failure); ignore
            let _ = entry.shutdown_tx.try_send(());
        }

        info!("All push channels closed");
    }

    /// Number of channels currently in the registry (diagnostics).
    pub fn open_channel_count(&self) -> usize {
        self.registry.lock().expect("push registry lock poisoned").len()
    }
}

/// Per-channel task: open, read, fan out, reconnect with backoff.
async fn run_channel(
    key: ChannelKey,
    opener: Arc<dyn ChannelOpener>,
    observers: Arc<Mutex<ObserverSet>>,
    monitor: ConnectivityMonitor,
    policy: BackoffPolicy,
    max_retries: u32,
    mut shutdown_rx: mpsc::Receiver<()>,
) {
    debug!(channel = %key, "Push channel task starting");

    let mut attempt: u32 = 0;

    loop {
        let opened = tokio::select! {
            _ = shutdown_rx.recv() => break,
            result = opener.open(&key) => result,
        };

        match opened {
            Ok(mut rx) => {
                attempt = 0;
                monitor.set_status(ConnectionStatus::Online);
                info!(channel = %key, "Push channel open");

                loop {
                    tokio::select! {
                        _ = shutdown_rx.recv() => {
                            debug!(channel = %key, "Push channel task shutting down");
                            return;
                        }
                        msg = rx.recv() => match msg {
                            Some(msg) => fan_out(&key, &observers, &msg),
                            None => break, // channel lost
                        }
                    }
                }

                warn!(channel = %key, "Push channel lost");
                monitor.set_status(ConnectionStatus::Reconnecting);
            }
            Err(e) => {
                warn!(channel = %key, error = %e, "Failed to open push channel");
                monitor.set_status(ConnectionStatus::Reconnecting);
            }
        }

        attempt += 1;
        if attempt > max_retries {
            error!(
                channel = %key,
                attempts = attempt,
                "Push channel failed terminally; poll-based fallback keeps the device alive"
            );
            break;
        }

        let delay = policy.delay_for(attempt - 1, rand::random::<f64>());
        debug!(channel = %key, ?delay, attempt, "Waiting before channel reconnect");

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown_rx.recv() => break,
        }
    }

    debug!(channel = %key, "Push channel task stopped");
}

/// Delivers one message to every observer of a channel.
fn fan_out(key: &ChannelKey, observers: &Arc<Mutex<ObserverSet>>, msg: &PushMessage) {
    match msg {
        PushMessage::Ping { .. } => return,
        PushMessage::Error { code, message } => {
            warn!(channel = %key, code = %code, message = %message, "Realtime facility error");
            return;
        }
        _ => {}
    }

    let callbacks: Vec<Observer> = {
        let set = observers.lock().expect("observer lock poisoned");
        set.observers.values().cloned().collect()
    };

    for cb in callbacks {
        cb(msg);
    }
}

// =============================================================================
// Push Subscription
// =============================================================================

/// Guard for one registered observer. Unsubscribing (or dropping) removes
/// the observer; the underlying channel closes when the last observer for
/// its key is gone.
pub struct PushSubscription {
    key: ChannelKey,
    id: u64,
    registry: Weak<Registry>,
}

impl PushSubscription {
    /// Explicitly deregisters the observer.
    pub fn unsubscribe(self) {
        // Drop does the work
    }

    fn remove(&self) {
        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        let mut registry = registry.lock().expect("push registry lock poisoned");

        let empty = match registry.get(&self.key) {
            Some(entry) => {
                let mut set = entry.observers.lock().expect("observer lock poisoned");
                set.observers.remove(&self.id);
                set.observers.is_empty()
            }
            None => return, // already torn down via unsubscribe_all
        };

        if empty {
            if let Some(entry) = registry.remove(&self.key) {
                debug!(channel = %self.key, "Last observer gone, closing push channel");
                let _ = entry.shutdown_tx.try_send(());
            }
        }
    }
}

impl Drop for PushSubscription {
    fn drop(&mut self) {
        self.remove();
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use marquee_core::CommandType;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Opener that hands out receivers and keeps the senders alive so the
    /// channel stays "open" until the test drops them.
    struct FakeOpener {
        opens: AtomicUsize,
        senders: Mutex<Vec<mpsc::Sender<PushMessage>>>,
    }

    impl FakeOpener {
        fn new() -> Self {
            FakeOpener {
                opens: AtomicUsize::new(0),
                senders: Mutex::new(Vec::new()),
            }
        }

        fn open_count(&self) -> usize {
            self.opens.load(Ordering::SeqCst)
        }

        async fn send(&self, msg: PushMessage) {
            let senders = self.senders.lock().unwrap().clone();
            for tx in senders {
                let _ = tx.send(msg.clone()).await;
            }
        }
    }

    #[async_trait]
    impl ChannelOpener for FakeOpener {
        async fn open(&self, _key: &ChannelKey) -> PlayerResult<mpsc::Receiver<PushMessage>> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            let (tx, rx) = mpsc::channel(8);
            self.senders.lock().unwrap().push(tx);
            Ok(rx)
        }
    }

    /// Opener that always fails.
    struct FailingOpener {
        opens: AtomicUsize,
    }

    #[async_trait]
    impl ChannelOpener for FailingOpener {
        async fn open(&self, key: &ChannelKey) -> PlayerResult<mpsc::Receiver<PushMessage>> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            Err(PlayerError::SubscribeFailed {
                channel: key.channel_name(),
                message: "refused".into(),
            })
        }
    }

    fn manager(opener: Arc<dyn ChannelOpener>, max_retries: u32) -> PushManager {
        let policy = BackoffPolicy::new(Duration::from_millis(1), Duration::from_millis(5));
        PushManager::new(opener, ConnectivityMonitor::new(), policy, max_retries)
    }

    fn command(id: &str) -> Command {
        Command {
            id: id.into(),
            command_type: CommandType::Reload,
            payload: None,
            created_at: Utc::now(),
        }
    }

    fn device_record(sequence: &str) -> DeviceRecord {
        DeviceRecord {
            id: "dev-1".into(),
            name: "Lobby".into(),
            active_sequence_id: Some(sequence.into()),
            refresh_requested_at: None,
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_duplicate_subscribe_opens_one_channel() {
        let opener = Arc::new(FakeOpener::new());
        let mgr = manager(opener.clone(), 3);

        let sub_a = mgr.subscribe_commands("dev-1", |_| {});
        let sub_b = mgr.subscribe_commands("dev-1", |_| {});

        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(opener.open_count(), 1);
        assert_eq!(mgr.open_channel_count(), 1);

        drop(sub_a);
        assert_eq!(mgr.open_channel_count(), 1, "one subscriber remains");

        drop(sub_b);
        assert_eq!(mgr.open_channel_count(), 0, "last unsubscribe closes it");
    }

    #[tokio::test]
    async fn test_distinct_keys_get_distinct_channels() {
        let opener = Arc::new(FakeOpener::new());
        let mgr = manager(opener.clone(), 3);

        let _a = mgr.subscribe_commands("dev-1", |_| {});
        let _b = mgr.subscribe_refresh("dev-1", |_| {});
        let _c = mgr.subscribe_content("seq-9", |_| {});

        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(opener.open_count(), 3);
        assert_eq!(mgr.open_channel_count(), 3);
    }

    #[tokio::test]
    async fn test_command_events_fan_out_to_all_observers() {
        let opener = Arc::new(FakeOpener::new());
        let mgr = manager(opener.clone(), 3);

        let hits = Arc::new(AtomicUsize::new(0));
        let h1 = hits.clone();
        let h2 = hits.clone();
        let _sub_a = mgr.subscribe_commands("dev-1", move |_| {
            h1.fetch_add(1, Ordering::SeqCst);
        });
        let _sub_b = mgr.subscribe_commands("dev-1", move |_| {
            h2.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        opener.send(PushMessage::CommandInserted(command("c1"))).await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_refresh_reason_derived_from_row_diff() {
        let opener = Arc::new(FakeOpener::new());
        let mgr = manager(opener.clone(), 3);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let _sub = mgr.subscribe_refresh("dev-1", move |reason| {
            sink.lock().unwrap().push(reason);
        });

        tokio::time::sleep(Duration::from_millis(50)).await;

        // Scene swap fires; a plain rename does not
        opener
            .send(PushMessage::DeviceChanged {
                old: device_record("seq-a"),
                new: device_record("seq-b"),
            })
            .await;
        let mut renamed = device_record("seq-b");
        renamed.name = "Renamed".into();
        opener
            .send(PushMessage::DeviceChanged {
                old: device_record("seq-b"),
                new: renamed,
            })
            .await;

        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(*seen.lock().unwrap(), vec![RefreshReason::SceneChange]);
    }

    #[tokio::test]
    async fn test_reconnect_capped_then_terminal() {
        let opener = Arc::new(FailingOpener {
            opens: AtomicUsize::new(0),
        });
        let mgr = manager(opener.clone(), 2);

        let _sub = mgr.subscribe_commands("dev-1", |_| {});

        tokio::time::sleep(Duration::from_millis(200)).await;

        // initial attempt + max_retries reconnects, then stop
        assert_eq!(opener.opens.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_unsubscribe_all_is_idempotent_and_safe_when_empty() {
        let opener = Arc::new(FakeOpener::new());
        let mgr = manager(opener.clone(), 3);

        // Never opened anything: must not panic
        mgr.unsubscribe_all();

        let _a = mgr.subscribe_commands("dev-1", |_| {});
        let _b = mgr.subscribe_refresh("dev-1", |_| {});
        tokio::time::sleep(Duration::from_millis(20)).await;

        mgr.unsubscribe_all();
        assert_eq!(mgr.open_channel_count(), 0);

        mgr.unsubscribe_all();
        assert_eq!(mgr.open_channel_count(), 0);
    }

    #[tokio::test]
    async fn test_channel_loss_sets_reconnecting() {
        let opener = Arc::new(FakeOpener::new());
        let policy = BackoffPolicy::new(Duration::from_millis(50), Duration::from_millis(100));
        let monitor = ConnectivityMonitor::new();
        let mgr = PushManager::new(opener.clone(), monitor.clone(), policy, 3);

        let _sub = mgr.subscribe_commands("dev-1", |_| {});
        tokio::time::sleep(Duration::from_millis(20)).await;

        // Drop the live sender: the channel task sees the stream end
        opener.senders.lock().unwrap().clear();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(monitor.status(), ConnectionStatus::Reconnecting);
    }

    #[test]
    fn test_channel_key_names() {
        assert_eq!(
            ChannelKey::new(Concern::Commands, "dev-1").channel_name(),
            "commands:dev-1"
        );
        assert_eq!(
            ChannelKey::new(Concern::Content, "seq-9").channel_name(),
            "content:seq-9"
        );
    }

    #[test]
    fn test_push_message_wire_format() {
        let msg = PushMessage::ContentEdited {
            sequence_id: "seq-9".into(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""type":"ContentEdited""#));
        assert!(json.contains(r#""sequence_id":"seq-9""#));
    }
}
