//! # Player Agent
//!
//! Top-level coordinator for the sync engine. Owns lifecycle, drives the
//! heartbeat, command-poll, and content-refresh timers, and attaches the
//! push channels.
//!
//! ## Agent Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        PlayerAgent Architecture                         │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                         PlayerAgent                              │  │
//! │  │                                                                  │  │
//! │  │  • start(): open cache, spawn timers, attach push               │  │
//! │  │  • stop(): cancel timers, tear down channels, clear state       │  │
//! │  │  • Both idempotent; stop() safe when never started              │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               │                                         │
//! │         ┌─────────────────────┼─────────────────────┐                  │
//! │         ▼                     ▼                     ▼                   │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────┐    │
//! │  │ Heartbeat loop │  │ Command poll   │  │ Content refresh        │    │
//! │  │                │  │ loop           │  │ (initial + timer +     │    │
//! │  │ liveness +     │  │                │  │  push-triggered)       │    │
//! │  │ fingerprint    │  │ PollCommand →  │  │                        │    │
//! │  │ every tick     │  │ dispatch       │  │ bounded live retries,  │    │
//! │  │                │  │                │  │ then cache fallback    │    │
//! │  └────────────────┘  └────────────────┘  └────────────────────────┘    │
//! │                                                                         │
//! │  EVENTS (to the player shell via PlayerEventEmitter):                  │
//! │  ─────────────────────────────────────────────────                     │
//! │  content_updated(snapshot, offline)  - re-render needed                │
//! │  status_changed(online|offline|reconnecting)                           │
//! │  sync_error(message)                 - terminal fetch failure          │
//! │  restart_requested()                 - reboot/reset command            │
//! │  screenshot_requested()              - dashboard asked for a capture   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! In-flight operations started before `stop()` are allowed to complete but
//! their results are discarded: every post-await continuation checks the
//! running flag first.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::sync::{watch, OnceCell};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::PlayerApi;
use crate::commands::CommandDispatcher;
use crate::config::PlayerConfig;
use crate::connectivity::{ConnectionStatus, ConnectivityMonitor, StatusSubscription};
use crate::error::{PlayerError, PlayerResult};
use crate::fetcher::{ContentFetcher, FetchOutcome};
use crate::push::{ChannelOpener, PushManager, PushSubscription, WsChannelOpener};
use marquee_core::{BackoffPolicy, ContentSnapshot};
use marquee_db::{CacheConfig, CacheRepository, CacheStore};

// =============================================================================
// Event Emitter Trait
// =============================================================================

/// Events the sync engine raises toward the player shell.
pub trait PlayerEventEmitter: Send + Sync {
    /// New content should be rendered. `offline` is true when it came from
    /// the cache.
    fn content_updated(&self, snapshot: &ContentSnapshot, offline: bool);

    /// The connection status changed (drive the "offline" indicator).
    fn status_changed(&self, status: ConnectionStatus);

    /// A content refresh failed terminally (no live content, no cache).
    fn sync_error(&self, message: &str);

    /// A reboot/reset command asks the shell to restart the process.
    fn restart_requested(&self);

    /// The dashboard asked for a fresh screenshot of this display.
    fn screenshot_requested(&self);
}

/// No-op event emitter for testing.
pub struct NoOpEmitter;

impl PlayerEventEmitter for NoOpEmitter {
    fn content_updated(&self, _snapshot: &ContentSnapshot, _offline: bool) {}
    fn status_changed(&self, _status: ConnectionStatus) {}
    fn sync_error(&self, _message: &str) {}
    fn restart_requested(&self) {}
    fn screenshot_requested(&self) {}
}

// =============================================================================
// Player Status
// =============================================================================

/// Current engine status for external queries.
#[derive(Debug, Clone)]
pub struct PlayerStatus {
    /// Whether the agent is running.
    pub running: bool,

    /// Current connection status.
    pub connection_status: ConnectionStatus,

    /// Fingerprint of the content last handed to the renderer.
    pub last_fingerprint: Option<String>,

    /// Number of open push channels.
    pub open_push_channels: usize,
}

// =============================================================================
// Fetch Context
// =============================================================================

/// Everything a content refresh needs, shared between the timer loop, push
/// callbacks, and the public `refresh()` entry point.
struct FetchContext {
    fetcher: Arc<ContentFetcher>,
    monitor: ConnectivityMonitor,
    emitter: Arc<dyn PlayerEventEmitter>,
    last_fingerprint: Arc<RwLock<Option<String>>>,
    running: Arc<AtomicBool>,
    policy: BackoffPolicy,
    max_attempts: u32,

    /// Set when push is attached; used to follow the active sequence's
    /// content channel.
    push: Mutex<Option<PushManager>>,

    /// The content channel currently subscribed: (sequence id, guard).
    content_sub: Mutex<Option<(String, PushSubscription)>>,
}

impl FetchContext {
    /// Runs one content refresh: bounded live retries, then cache fallback.
    ///
    /// Never raises; the terminal no-content case goes to the emitter and
    /// the agent keeps running for the next scheduled cycle.
    async fn fetch_content(self: &Arc<Self>) {
        if !self.running.load(Ordering::SeqCst) {
            return;
        }

        self.monitor.set_status(ConnectionStatus::Reconnecting);

        let mut live = None;
        for attempt in 0..self.max_attempts {
            match self.fetcher.fetch_live().await {
                Ok(outcome) => {
                    live = Some(outcome);
                    break;
                }
                Err(e) => {
                    warn!(attempt, error = %e, "Live content fetch failed");
                    if attempt + 1 < self.max_attempts {
                        let delay = self.policy.delay_for(attempt, rand::random::<f64>());
                        debug!(?delay, "Waiting before fetch retry");
                        tokio::time::sleep(delay).await;
                    }
                }
            }

            if !self.running.load(Ordering::SeqCst) {
                return; // stopped mid-refresh: discard
            }
        }

        let outcome = match live {
            Some(outcome) => outcome,
            None => match self.fetcher.cached_snapshot().await {
                Some(outcome) => outcome,
                None => {
                    // Terminal for this cycle; the next timer tick tries again
                    self.monitor.set_status(ConnectionStatus::Offline);
                    self.emitter.sync_error(&PlayerError::NoContent.to_string());
                    return;
                }
            },
        };

        if !self.running.load(Ordering::SeqCst) {
            return;
        }

        self.monitor.set_status(if outcome.offline {
            ConnectionStatus::Offline
        } else {
            ConnectionStatus::Online
        });

        let changed = {
            let mut fingerprint = self
                .last_fingerprint
                .write()
                .expect("fingerprint lock poisoned");
            let changed = fingerprint.as_deref() != Some(outcome.fingerprint.as_str());
            *fingerprint = Some(outcome.fingerprint.clone());
            changed
        };

        if changed {
            info!(fingerprint = %outcome.fingerprint, offline = outcome.offline, "Content updated");
            self.emitter.content_updated(&outcome.snapshot, outcome.offline);
        } else {
            debug!("Content unchanged, render skipped");
        }

        self.follow_active_sequence(&outcome);
    }

    /// Keeps the content push channel pointed at the active sequence.
    fn follow_active_sequence(self: &Arc<Self>, outcome: &FetchOutcome) {
        let push = self.push.lock().expect("push slot lock poisoned");
        let Some(manager) = push.as_ref() else {
            return;
        };

        let new_id = outcome.snapshot.sequence.as_ref().map(|s| s.id.clone());
        let mut slot = self.content_sub.lock().expect("content sub lock poisoned");

        if slot.as_ref().map(|(id, _)| id.as_str()) == new_id.as_deref() {
            return; // already following the right sequence
        }

        // Dropping the old guard unsubscribes it
        *slot = None;

        if let Some(sequence_id) = new_id {
            let ctx = Arc::downgrade(self);
            let sub = manager.subscribe_content(&sequence_id, move |_| {
                if let Some(ctx) = ctx.upgrade() {
                    spawn_refresh(&ctx);
                }
            });
            debug!(sequence_id = %sequence_id, "Following content channel");
            *slot = Some((sequence_id, sub));
        }
    }

    /// Drops push-related state (on stop).
    fn detach_push(&self) {
        *self.content_sub.lock().expect("content sub lock poisoned") = None;
        *self.push.lock().expect("push slot lock poisoned") = None;
    }
}

/// Spawns a refresh from a sync context (push callbacks are synchronous).
fn spawn_refresh(ctx: &Arc<FetchContext>) {
    let ctx = ctx.clone();
    tokio::spawn(async move {
        ctx.fetch_content().await;
    });
}

// =============================================================================
// Player Agent
// =============================================================================

/// Main agent that coordinates all sync operations for one device.
pub struct PlayerAgent {
    /// Player configuration.
    config: Arc<PlayerConfig>,

    /// Cloud API handle.
    api: Arc<dyn PlayerApi>,

    /// Event emitter for shell notifications.
    emitter: Arc<dyn PlayerEventEmitter>,

    /// Connectivity monitor (single source of truth for status).
    monitor: ConnectivityMonitor,

    /// Push channel opener (swappable for tests).
    opener: Option<Arc<dyn ChannelOpener>>,

    /// Offline cache config and memoized handle: concurrent starts converge
    /// on one open store.
    cache_config: CacheConfig,
    cache_cell: Arc<OnceCell<CacheStore>>,

    /// Lifecycle state.
    running: Arc<AtomicBool>,

    /// Fingerprint of the content last handed to the renderer.
    last_fingerprint: Arc<RwLock<Option<String>>>,

    /// Live engine parts, present while running.
    fetch_ctx: Mutex<Option<Arc<FetchContext>>>,
    dispatcher: Mutex<Option<Arc<CommandDispatcher>>>,
    push: Mutex<Option<PushManager>>,
    push_subs: Mutex<Vec<PushSubscription>>,
    status_sub: Mutex<Option<StatusSubscription>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    shutdown_tx: Mutex<Option<watch::Sender<bool>>>,
}

impl PlayerAgent {
    /// Creates an agent with the production cloud API and cache location.
    ///
    /// Use [`PlayerAgentBuilder`] to substitute fakes in tests.
    pub fn new(config: PlayerConfig) -> PlayerResult<Self> {
        let api = Arc::new(crate::api::CloudApi::new(config.api.clone())?);
        PlayerAgentBuilder::new(config).with_api(api).build()
    }

    /// Returns the current engine status.
    pub fn status(&self) -> PlayerStatus {
        PlayerStatus {
            running: self.running.load(Ordering::SeqCst),
            connection_status: self.monitor.status(),
            last_fingerprint: self
                .last_fingerprint
                .read()
                .expect("fingerprint lock poisoned")
                .clone(),
            open_push_channels: self
                .push
                .lock()
                .expect("push lock poisoned")
                .as_ref()
                .map(|p| p.open_channel_count())
                .unwrap_or(0),
        }
    }

    /// Returns the connectivity monitor (for shell-side status badges).
    pub fn monitor(&self) -> &ConnectivityMonitor {
        &self.monitor
    }

    /// Starts the agent.
    ///
    /// Opens the offline cache, spawns the heartbeat, command-poll, and
    /// content-refresh loops, runs an initial fetch, and attaches push
    /// channels when configured. Idempotent: a second start() while running
    /// is a no-op.
    pub async fn start(&self) -> PlayerResult<()> {
        self.config.validate()?;

        if self.running.swap(true, Ordering::SeqCst) {
            debug!("Agent already running, start() is a no-op");
            return Ok(());
        }

        info!(
            device_id = %self.config.device_id(),
            push = self.config.push_enabled(),
            "Starting player agent"
        );

        // Open the offline cache. A broken cache degrades the engine to
        // live-only operation instead of failing the start.
        let cache = self.open_cache().await;

        let fetcher = Arc::new(ContentFetcher::new(
            self.api.clone(),
            cache.clone(),
            self.config.device_id(),
        ));

        let fetch_ctx = Arc::new(FetchContext {
            fetcher: fetcher.clone(),
            monitor: self.monitor.clone(),
            emitter: self.emitter.clone(),
            last_fingerprint: self.last_fingerprint.clone(),
            running: self.running.clone(),
            policy: BackoffPolicy::new(
                Duration::from_millis(self.config.sync.fetch_backoff_base_ms),
                Duration::from_millis(self.config.sync.fetch_backoff_max_ms),
            ),
            max_attempts: self.config.sync.content_fetch_max_attempts,
            push: Mutex::new(None),
            content_sub: Mutex::new(None),
        });

        let dispatcher = Arc::new(CommandDispatcher::new(
            self.api.clone(),
            cache,
            fetcher,
            self.monitor.clone(),
            self.emitter.clone(),
            self.last_fingerprint.clone(),
            self.config.reboot_grace(),
        ));

        // Forward status changes to the shell
        {
            let emitter = self.emitter.clone();
            let sub = self.monitor.subscribe(move |status| {
                emitter.status_changed(status);
            });
            *self.status_sub.lock().expect("status sub lock poisoned") = Some(sub);
        }

        // Attach push channels
        if self.config.push_enabled() {
            self.attach_push(&fetch_ctx, &dispatcher);
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let mut tasks = Vec::new();
        tasks.push(self.spawn_heartbeat_loop(shutdown_rx.clone()));
        tasks.push(self.spawn_command_poll_loop(dispatcher.clone(), shutdown_rx.clone()));
        tasks.push(self.spawn_content_refresh_loop(fetch_ctx.clone(), shutdown_rx));

        // Initial fetch, off the start() critical path
        spawn_refresh(&fetch_ctx);

        *self.fetch_ctx.lock().expect("fetch ctx lock poisoned") = Some(fetch_ctx);
        *self.dispatcher.lock().expect("dispatcher lock poisoned") = Some(dispatcher);
        *self.tasks.lock().expect("task lock poisoned") = tasks;
        *self.shutdown_tx.lock().expect("shutdown lock poisoned") = Some(shutdown_tx);

        info!("Player agent started");
        Ok(())
    }

    /// Stops the agent.
    ///
    /// Cancels all timers, tears down push subscriptions, clears per-session
    /// command state. Safe to call when never started, and safe to call
    /// twice. In-flight operations complete but their results are discarded.
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            debug!("Agent not running, stop() is a no-op");
            return;
        }

        info!("Stopping player agent");

        if let Some(tx) = self
            .shutdown_tx
            .lock()
            .expect("shutdown lock poisoned")
            .take()
        {
            let _ = tx.send(true);
        }

        for task in self.tasks.lock().expect("task lock poisoned").drain(..) {
            task.abort();
        }

        self.push_subs.lock().expect("push subs lock poisoned").clear();

        if let Some(ctx) = self.fetch_ctx.lock().expect("fetch ctx lock poisoned").take() {
            ctx.detach_push();
        }

        if let Some(push) = self.push.lock().expect("push lock poisoned").take() {
            push.unsubscribe_all();
        }

        if let Some(dispatcher) = self
            .dispatcher
            .lock()
            .expect("dispatcher lock poisoned")
            .take()
        {
            dispatcher.reset_session_state();
        }

        *self.status_sub.lock().expect("status sub lock poisoned") = None;

        info!("Player agent stopped");
    }

    /// Runs one content refresh immediately (also wired to push triggers).
    pub async fn refresh(&self) {
        let ctx = self
            .fetch_ctx
            .lock()
            .expect("fetch ctx lock poisoned")
            .clone();

        match ctx {
            Some(ctx) => ctx.fetch_content().await,
            None => debug!("refresh() ignored, agent not running"),
        }
    }

    // =========================================================================
    // Start Helpers
    // =========================================================================

    /// Opens the offline cache, memoized so concurrent initializers converge
    /// on the same handle. Failure degrades to cache-less operation.
    async fn open_cache(&self) -> Option<CacheRepository> {
        let result = self
            .cache_cell
            .get_or_try_init(|| CacheStore::new(self.cache_config.clone()))
            .await;

        match result {
            Ok(store) => Some(store.cache()),
            Err(e) => {
                warn!(error = %e, "Offline cache unavailable, running live-only");
                None
            }
        }
    }

    /// Opens the command and refresh push channels.
    fn attach_push(&self, fetch_ctx: &Arc<FetchContext>, dispatcher: &Arc<CommandDispatcher>) {
        let Some(opener) = self.opener.clone() else {
            warn!("Push enabled but no channel opener configured");
            return;
        };

        let manager = PushManager::new(
            opener,
            self.monitor.clone(),
            BackoffPolicy::new(
                Duration::from_millis(self.config.push.channel_backoff_base_ms),
                Duration::from_millis(self.config.push.channel_backoff_max_ms),
            ),
            self.config.push.max_channel_retries,
        );

        let device_id = self.config.device_id();
        let mut subs = Vec::new();

        // Instant command delivery
        {
            let dispatcher = dispatcher.clone();
            let running = self.running.clone();
            subs.push(manager.subscribe_commands(device_id, move |command| {
                if !running.load(Ordering::SeqCst) {
                    return;
                }
                let dispatcher = dispatcher.clone();
                tokio::spawn(async move {
                    dispatcher.dispatch(command).await;
                });
            }));
        }

        // Instant refresh on device-row changes
        {
            let ctx = Arc::downgrade(fetch_ctx);
            subs.push(manager.subscribe_refresh(device_id, move |reason| {
                info!(reason = %reason, "Push refresh received");
                if let Some(ctx) = ctx.upgrade() {
                    spawn_refresh(&ctx);
                }
            }));
        }

        *fetch_ctx.push.lock().expect("push slot lock poisoned") = Some(manager.clone());
        *self.push.lock().expect("push lock poisoned") = Some(manager);
        *self.push_subs.lock().expect("push subs lock poisoned") = subs;
    }

    /// Heartbeat loop: liveness + last-known fingerprint on every tick.
    fn spawn_heartbeat_loop(&self, mut shutdown_rx: watch::Receiver<bool>) -> JoinHandle<()> {
        let api = self.api.clone();
        let emitter = self.emitter.clone();
        let running = self.running.clone();
        let last_fingerprint = self.last_fingerprint.clone();
        let device_id = self.config.device_id().to_string();
        let player_version = self.config.device.player_version.clone();
        let interval = self.config.heartbeat_interval();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = shutdown_rx.changed() => break,
                }

                if !running.load(Ordering::SeqCst) {
                    break;
                }

                // Best-effort: heartbeat failures are logged, never fatal,
                // and never stall command or content traffic
                let fingerprint = last_fingerprint
                    .read()
                    .expect("fingerprint lock poisoned")
                    .clone();

                match fingerprint {
                    Some(fingerprint) => {
                        match api
                            .update_device_status(&device_id, &player_version, &fingerprint)
                            .await
                        {
                            Ok(ack) => {
                                if ack.needs_screenshot_update && running.load(Ordering::SeqCst) {
                                    emitter.screenshot_requested();
                                }
                            }
                            Err(e) => debug!(error = %e, "Extended heartbeat failed"),
                        }
                    }
                    None => {
                        // No content fetched yet this session: plain ping
                        if let Err(e) = api.heartbeat(&device_id).await {
                            debug!(error = %e, "Heartbeat failed");
                        }
                    }
                }
            }

            debug!("Heartbeat loop stopped");
        })
    }

    /// Command poll loop: the delivery path that works without push.
    fn spawn_command_poll_loop(
        &self,
        dispatcher: Arc<CommandDispatcher>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let api = self.api.clone();
        let running = self.running.clone();
        let device_id = self.config.device_id().to_string();
        let interval = self.config.command_poll_interval();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = shutdown_rx.changed() => break,
                }

                if !running.load(Ordering::SeqCst) {
                    break;
                }

                match api.poll_command(&device_id).await {
                    Ok(Some(command)) => {
                        if !running.load(Ordering::SeqCst) {
                            break; // stopped while polling: discard
                        }
                        // Dispatch off the poll cadence; a reboot's grace
                        // delay must not slow the next poll
                        let dispatcher = dispatcher.clone();
                        tokio::spawn(async move {
                            dispatcher.dispatch(command).await;
                        });
                    }
                    Ok(None) => {}
                    Err(e) => debug!(error = %e, "Command poll failed"),
                }
            }

            debug!("Command poll loop stopped");
        })
    }

    /// Poll-based content refresh, the fallback when push is down.
    fn spawn_content_refresh_loop(
        &self,
        fetch_ctx: Arc<FetchContext>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let running = self.running.clone();
        let interval = self.config.content_refresh_interval();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            // The initial fetch runs from start(); skip the immediate tick
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = shutdown_rx.changed() => break,
                }

                if !running.load(Ordering::SeqCst) {
                    break;
                }

                fetch_ctx.fetch_content().await;
            }

            debug!("Content refresh loop stopped");
        })
    }
}

// =============================================================================
// Builder Pattern
// =============================================================================

/// Builder for creating a PlayerAgent with options.
pub struct PlayerAgentBuilder {
    config: PlayerConfig,
    api: Option<Arc<dyn PlayerApi>>,
    emitter: Option<Arc<dyn PlayerEventEmitter>>,
    cache_config: Option<CacheConfig>,
    opener: Option<Arc<dyn ChannelOpener>>,
}

impl PlayerAgentBuilder {
    /// Creates a new builder with the given config.
    pub fn new(config: PlayerConfig) -> Self {
        PlayerAgentBuilder {
            config,
            api: None,
            emitter: None,
            cache_config: None,
            opener: None,
        }
    }

    /// Sets the cloud API implementation.
    pub fn with_api(mut self, api: Arc<dyn PlayerApi>) -> Self {
        self.api = Some(api);
        self
    }

    /// Sets the event emitter.
    pub fn with_emitter(mut self, emitter: Arc<dyn PlayerEventEmitter>) -> Self {
        self.emitter = Some(emitter);
        self
    }

    /// Overrides the offline cache location (tests use in-memory).
    pub fn with_cache_config(mut self, cache_config: CacheConfig) -> Self {
        self.cache_config = Some(cache_config);
        self
    }

    /// Overrides the push channel opener (tests use in-process fakes).
    pub fn with_channel_opener(mut self, opener: Arc<dyn ChannelOpener>) -> Self {
        self.opener = Some(opener);
        self
    }

    /// Builds the PlayerAgent.
    pub fn build(self) -> PlayerResult<PlayerAgent> {
        let api = self
            .api
            .ok_or_else(|| PlayerError::InvalidConfig("Cloud API required".into()))?;

        let emitter = self.emitter.unwrap_or_else(|| Arc::new(NoOpEmitter));

        let cache_config = self.cache_config.unwrap_or_else(|| {
            let path = self
                .config
                .sync
                .cache_path
                .clone()
                .or_else(PlayerConfig::default_cache_path);
            match path {
                Some(path) => CacheConfig::new(path),
                None => {
                    warn!("No cache path available, offline cache will not survive restarts");
                    CacheConfig::in_memory()
                }
            }
        });

        let opener: Option<Arc<dyn ChannelOpener>> = match self.opener {
            Some(opener) => Some(opener),
            None => self.config.push.realtime_url.as_ref().map(|url| {
                Arc::new(WsChannelOpener::new(
                    url,
                    Duration::from_secs(self.config.push.connect_timeout_secs),
                )) as Arc<dyn ChannelOpener>
            }),
        };

        Ok(PlayerAgent {
            config: Arc::new(self.config),
            api,
            emitter,
            monitor: ConnectivityMonitor::new(),
            opener,
            cache_config,
            cache_cell: Arc::new(OnceCell::new()),
            running: Arc::new(AtomicBool::new(false)),
            last_fingerprint: Arc::new(RwLock::new(None)),
            fetch_ctx: Mutex::new(None),
            dispatcher: Mutex::new(None),
            push: Mutex::new(None),
            push_subs: Mutex::new(Vec::new()),
            status_sub: Mutex::new(None),
            tasks: Mutex::new(Vec::new()),
            shutdown_tx: Mutex::new(None),
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::DeviceStatusAck;
    use async_trait::async_trait;
    use chrono::Utc;
    use marquee_core::{
        Command, CommandType, ContentSequence, DeviceDescriptor, ItemKind, SequenceItem,
    };
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;

    fn snapshot(source: &str) -> ContentSnapshot {
        ContentSnapshot {
            device: DeviceDescriptor {
                id: "dev-1".into(),
                name: "Lobby".into(),
                tenant_id: "tenant-1".into(),
            },
            sequence: Some(ContentSequence {
                id: "seq-1".into(),
                name: "Loop".into(),
                items: vec![SequenceItem {
                    id: "item-1".into(),
                    kind: ItemKind::Image,
                    source: source.into(),
                    duration_secs: 10,
                    width: None,
                    height: None,
                }],
            }),
        }
    }

    struct FakeApi {
        content: Mutex<ContentSnapshot>,
        fail_content: AtomicBool,
        heartbeats: AtomicUsize,
        status_updates: AtomicUsize,
        pending_commands: Mutex<VecDeque<Command>>,
        reports: Mutex<Vec<(String, bool)>>,
    }

    impl FakeApi {
        fn new() -> Self {
            FakeApi {
                content: Mutex::new(snapshot("img/a.png")),
                fail_content: AtomicBool::new(false),
                heartbeats: AtomicUsize::new(0),
                status_updates: AtomicUsize::new(0),
                pending_commands: Mutex::new(VecDeque::new()),
                reports: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl PlayerApi for FakeApi {
        async fn heartbeat(&self, _device_id: &str) -> PlayerResult<()> {
            self.heartbeats.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn get_content(&self, _device_id: &str) -> PlayerResult<ContentSnapshot> {
            if self.fail_content.load(Ordering::SeqCst) {
                Err(PlayerError::ConnectionFailed("down".into()))
            } else {
                Ok(self.content.lock().unwrap().clone())
            }
        }

        async fn poll_command(&self, _device_id: &str) -> PlayerResult<Option<Command>> {
            Ok(self.pending_commands.lock().unwrap().pop_front())
        }

        async fn report_command_result(
            &self,
            command_id: &str,
            success: bool,
            _error_message: Option<&str>,
        ) -> PlayerResult<()> {
            self.reports
                .lock()
                .unwrap()
                .push((command_id.to_string(), success));
            Ok(())
        }

        async fn update_device_status(
            &self,
            _device_id: &str,
            _player_version: &str,
            _content_fingerprint: &str,
        ) -> PlayerResult<DeviceStatusAck> {
            self.status_updates.fetch_add(1, Ordering::SeqCst);
            Ok(DeviceStatusAck {
                needs_screenshot_update: false,
            })
        }
    }

    /// Emitter that records everything.
    #[derive(Default)]
    struct RecordingEmitter {
        content: Mutex<Vec<(String, bool)>>, // (first item source, offline)
        errors: Mutex<Vec<String>>,
        restarts: AtomicUsize,
    }

    impl PlayerEventEmitter for RecordingEmitter {
        fn content_updated(&self, snapshot: &ContentSnapshot, offline: bool) {
            let source = snapshot
                .sequence
                .as_ref()
                .and_then(|s| s.items.first())
                .map(|i| i.source.clone())
                .unwrap_or_default();
            self.content.lock().unwrap().push((source, offline));
        }
        fn status_changed(&self, _status: ConnectionStatus) {}
        fn sync_error(&self, message: &str) {
            self.errors.lock().unwrap().push(message.to_string());
        }
        fn restart_requested(&self) {
            self.restarts.fetch_add(1, Ordering::SeqCst);
        }
        fn screenshot_requested(&self) {}
    }

    fn test_config() -> PlayerConfig {
        let mut config = PlayerConfig::default();
        config.device.id = "dev-1".into();
        config.sync.heartbeat_interval_secs = 1;
        config.sync.command_poll_interval_secs = 1;
        config.sync.fetch_backoff_base_ms = 1;
        config.sync.fetch_backoff_max_ms = 5;
        config.push.enabled = false;
        config
    }

    fn agent_with(
        api: Arc<FakeApi>,
        emitter: Arc<RecordingEmitter>,
    ) -> PlayerAgent {
        PlayerAgentBuilder::new(test_config())
            .with_api(api)
            .with_emitter(emitter)
            .with_cache_config(CacheConfig::in_memory())
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_start_is_idempotent_and_stop_is_safe() {
        let api = Arc::new(FakeApi::new());
        let agent = agent_with(api, Arc::new(RecordingEmitter::default()));

        assert!(!agent.status().running);

        agent.start().await.unwrap();
        agent.start().await.unwrap(); // no-op
        assert!(agent.status().running);

        agent.stop();
        assert!(!agent.status().running);
        agent.stop(); // no-op
    }

    #[tokio::test]
    async fn test_stop_without_start_is_safe() {
        let api = Arc::new(FakeApi::new());
        let agent = agent_with(api, Arc::new(RecordingEmitter::default()));
        agent.stop();
        assert!(!agent.status().running);
    }

    #[tokio::test]
    async fn test_initial_fetch_goes_online_and_renders() {
        let api = Arc::new(FakeApi::new());
        let emitter = Arc::new(RecordingEmitter::default());
        let agent = agent_with(api, emitter.clone());

        agent.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(agent.status().connection_status, ConnectionStatus::Online);
        assert!(agent.status().last_fingerprint.is_some());
        assert_eq!(
            *emitter.content.lock().unwrap(),
            vec![("img/a.png".to_string(), false)]
        );

        agent.stop();
    }

    #[tokio::test]
    async fn test_offline_resilience_serves_cached_content() {
        let api = Arc::new(FakeApi::new());
        let emitter = Arc::new(RecordingEmitter::default());
        let agent = agent_with(api.clone(), emitter.clone());

        agent.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        let online_fingerprint = agent.status().last_fingerprint.clone();

        // Network drops; retries exhaust; cached snapshot A is served
        api.fail_content.store(true, Ordering::SeqCst);
        agent.refresh().await;

        assert_eq!(agent.status().connection_status, ConnectionStatus::Offline);
        assert_eq!(agent.status().last_fingerprint, online_fingerprint);

        // No redundant re-render: the cached content is fingerprint-equal
        assert_eq!(emitter.content.lock().unwrap().len(), 1);

        agent.stop();
    }

    #[tokio::test]
    async fn test_terminal_fetch_failure_reaches_error_callback() {
        let api = Arc::new(FakeApi::new());
        api.fail_content.store(true, Ordering::SeqCst);
        let emitter = Arc::new(RecordingEmitter::default());
        let agent = agent_with(api, emitter.clone());

        agent.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;

        // Empty cache + dead network: the error surfaced, the agent lives
        assert!(agent.status().running);
        assert_eq!(agent.status().connection_status, ConnectionStatus::Offline);
        let errors = emitter.errors.lock().unwrap();
        assert!(!errors.is_empty());
        assert!(errors[0].contains("No content available"));

        agent.stop();
    }

    #[tokio::test]
    async fn test_content_change_triggers_rerender() {
        let api = Arc::new(FakeApi::new());
        let emitter = Arc::new(RecordingEmitter::default());
        let agent = agent_with(api.clone(), emitter.clone());

        agent.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        // Same content: no re-render
        agent.refresh().await;
        assert_eq!(emitter.content.lock().unwrap().len(), 1);

        // Changed content: re-render
        *api.content.lock().unwrap() = snapshot("img/CHANGED.png");
        agent.refresh().await;

        let rendered = emitter.content.lock().unwrap();
        assert_eq!(rendered.len(), 2);
        assert_eq!(rendered[1], ("img/CHANGED.png".to_string(), false));
        drop(rendered);

        agent.stop();
    }

    #[tokio::test]
    async fn test_polled_command_is_dispatched_and_reported() {
        let api = Arc::new(FakeApi::new());
        api.pending_commands.lock().unwrap().push_back(Command {
            id: "c1".into(),
            command_type: CommandType::Unknown("frobnicate".into()),
            payload: None,
            created_at: Utc::now(),
        });
        let agent = agent_with(api.clone(), Arc::new(RecordingEmitter::default()));

        agent.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;

        let reports = api.reports.lock().unwrap().clone();
        assert_eq!(reports, vec![("c1".to_string(), false)]);

        agent.stop();
    }

    #[tokio::test]
    async fn test_heartbeat_reports_fingerprint_once_content_is_known() {
        let api = Arc::new(FakeApi::new());
        let agent = agent_with(api.clone(), Arc::new(RecordingEmitter::default()));

        agent.start().await.unwrap();
        // First tick fires immediately; content may not be fetched yet, so
        // either the plain or extended heartbeat counts as liveness
        tokio::time::sleep(Duration::from_millis(1200)).await;

        let plain = api.heartbeats.load(Ordering::SeqCst);
        let extended = api.status_updates.load(Ordering::SeqCst);
        assert!(plain + extended >= 2, "expected at least two ticks");
        assert!(extended >= 1, "fingerprint reported once content is known");

        agent.stop();
    }

    #[tokio::test]
    async fn test_refresh_after_stop_is_discarded() {
        let api = Arc::new(FakeApi::new());
        let emitter = Arc::new(RecordingEmitter::default());
        let agent = agent_with(api, emitter.clone());

        agent.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        agent.stop();

        let before = emitter.content.lock().unwrap().len();
        agent.refresh().await; // fetch_ctx is gone: ignored
        assert_eq!(emitter.content.lock().unwrap().len(), before);
    }
}
