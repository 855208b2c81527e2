//! # Command Dispatcher
//!
//! Exactly-once-effective execution of administrative commands.
//!
//! ## Dispatch Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Command Dispatch Flow                              │
//! │                                                                         │
//! │   poll timer ──────┐                 ┌────── push channel               │
//! │                    ▼                 ▼                                  │
//! │              ┌──────────────────────────────┐                          │
//! │              │          dispatch(cmd)       │                          │
//! │              └──────────────┬───────────────┘                          │
//! │                             │                                           │
//! │                 in-flight set has cmd.id?                              │
//! │                             │                                           │
//! │              ┌──────yes─────┴──────no──────┐                           │
//! │              ▼                             ▼                           │
//! │      drop silently                  execute effect                     │
//! │      (duplicate from the            │                                   │
//! │       poll/push race)               ▼                                   │
//! │                             report result ← EXACTLY ONCE per id        │
//! │                             │                                           │
//! │                             ▼                                           │
//! │                     post-report action                                 │
//! │                     (restart after grace, re-fetch content)            │
//! │                                                                         │
//! │  COMMAND TABLE                                                         │
//! │  ─────────────                                                         │
//! │  reboot      → report success, then restart after grace delay         │
//! │  reload      → report success, then re-fetch + notify                 │
//! │  clear_cache → clear cache, report its outcome                        │
//! │  reset       → clear cache + local state, report success, restart     │
//! │  (unknown)   → no effect, report failure naming the type              │
//! │                                                                         │
//! │  Dual poll + push delivery is intentional redundancy for liveness;     │
//! │  the in-flight set (cleared on stop) is what makes it harmless.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashSet;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::agent::PlayerEventEmitter;
use crate::api::PlayerApi;
use crate::connectivity::{ConnectionStatus, ConnectivityMonitor};
use crate::error::{PlayerError, PlayerResult};
use crate::fetcher::ContentFetcher;
use marquee_core::{Command, CommandType};
use marquee_db::CacheRepository;

// =============================================================================
// Command Dispatcher
// =============================================================================

/// Executes commands and reports each result exactly once.
///
/// Both delivery paths (poll and push) funnel into [`Self::dispatch`]; the
/// in-memory in-flight set keyed by command id suppresses the second arrival
/// of the same command within a session.
pub struct CommandDispatcher {
    /// Cloud API for result reporting.
    api: Arc<dyn PlayerApi>,

    /// Offline cache, for clear_cache/reset. None when the cache failed to
    /// open; clearing then reports failure.
    cache: Option<CacheRepository>,

    /// Content fetcher, for the reload command.
    fetcher: Arc<ContentFetcher>,

    /// Connectivity monitor, updated by reload's re-fetch.
    monitor: ConnectivityMonitor,

    /// Event emitter for restart requests and content updates.
    emitter: Arc<dyn PlayerEventEmitter>,

    /// Last rendered content fingerprint, shared with the agent.
    last_fingerprint: Arc<RwLock<Option<String>>>,

    /// Delay between a reboot/reset success report and the restart request,
    /// letting the report flush.
    reboot_grace: Duration,

    /// Command ids seen this session. Cleared on stop().
    in_flight: Mutex<HashSet<String>>,
}

impl CommandDispatcher {
    /// Creates a new command dispatcher.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        api: Arc<dyn PlayerApi>,
        cache: Option<CacheRepository>,
        fetcher: Arc<ContentFetcher>,
        monitor: ConnectivityMonitor,
        emitter: Arc<dyn PlayerEventEmitter>,
        last_fingerprint: Arc<RwLock<Option<String>>>,
        reboot_grace: Duration,
    ) -> Self {
        CommandDispatcher {
            api,
            cache,
            fetcher,
            monitor,
            emitter,
            last_fingerprint,
            reboot_grace,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Dispatches one command.
    ///
    /// Idempotent per command id: the same id observed via both poll and
    /// push within a session executes and reports once. Whatever happens
    /// during execution, exactly one result report goes out.
    pub async fn dispatch(&self, command: Command) {
        // Synchronous check-and-insert: no await between test and set
        let first_arrival = self
            .in_flight
            .lock()
            .expect("in-flight lock poisoned")
            .insert(command.id.clone());

        if !first_arrival {
            debug!(id = %command.id, "Duplicate command dispatch suppressed");
            return;
        }

        info!(id = %command.id, command_type = %command.command_type, "Dispatching command");

        let outcome = self.execute(&command).await;

        let (success, message) = match &outcome {
            Ok(()) => (true, None),
            Err(e) => {
                warn!(id = %command.id, error = %e, "Command execution failed");
                (false, Some(e.to_string()))
            }
        };

        // The one and only report for this dispatch. A failed report is
        // logged, not retried: the server's poll cycle redelivers commands
        // it never heard back about.
        if let Err(e) = self
            .api
            .report_command_result(&command.id, success, message.as_deref())
            .await
        {
            error!(id = %command.id, error = %e, "Failed to report command result");
        }

        if success {
            self.post_report(&command).await;
        }
    }

    /// Runs the command's effect. Reporting happens in [`Self::dispatch`].
    async fn execute(&self, command: &Command) -> PlayerResult<()> {
        match &command.command_type {
            // Effects that run after the success report (restart, re-fetch)
            // have nothing to do here
            CommandType::Reboot | CommandType::Reload => Ok(()),

            CommandType::ClearCache => self.clear_cache().await,

            CommandType::Reset => {
                // Best-effort wipe: a reset must succeed even with a broken
                // cache, the restart is what recovers the device
                if let Err(e) = self.clear_cache().await {
                    warn!(error = %e, "Cache clear during reset failed");
                }
                self.clear_local_state(&command.id);
                Ok(())
            }

            CommandType::Unknown(name) => Err(PlayerError::UnknownCommand(name.clone())),
        }
    }

    /// Actions that intentionally run after the result report.
    async fn post_report(&self, command: &Command) {
        match &command.command_type {
            CommandType::Reboot | CommandType::Reset => {
                debug!(grace = ?self.reboot_grace, "Restart scheduled after grace delay");
                tokio::time::sleep(self.reboot_grace).await;
                self.emitter.restart_requested();
            }

            CommandType::Reload => {
                match self.fetcher.fetch().await {
                    Ok(outcome) => {
                        self.monitor.set_status(if outcome.offline {
                            ConnectionStatus::Offline
                        } else {
                            ConnectionStatus::Online
                        });
                        *self
                            .last_fingerprint
                            .write()
                            .expect("fingerprint lock poisoned") = Some(outcome.fingerprint);
                        self.emitter.content_updated(&outcome.snapshot, outcome.offline);
                    }
                    Err(e) => {
                        warn!(error = %e, "Reload re-fetch failed");
                        self.emitter.sync_error(&e.to_string());
                    }
                }
            }

            CommandType::ClearCache | CommandType::Unknown(_) => {}
        }
    }

    /// Clears the offline cache.
    async fn clear_cache(&self) -> PlayerResult<()> {
        match self.cache.as_ref() {
            Some(cache) => {
                let dropped = cache.clear().await?;
                info!(dropped, "Offline cache cleared");
                Ok(())
            }
            None => Err(PlayerError::Internal("offline cache unavailable".into())),
        }
    }

    /// Clears all local session state except the command being executed.
    fn clear_local_state(&self, current_command_id: &str) {
        *self
            .last_fingerprint
            .write()
            .expect("fingerprint lock poisoned") = None;

        let mut in_flight = self.in_flight.lock().expect("in-flight lock poisoned");
        in_flight.retain(|id| id == current_command_id);

        info!("Local state cleared");
    }

    /// Forgets all dispatched command ids. Called by the agent on stop().
    pub fn reset_session_state(&self) {
        self.in_flight
            .lock()
            .expect("in-flight lock poisoned")
            .clear();
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::NoOpEmitter;
    use crate::api::DeviceStatusAck;
    use async_trait::async_trait;
    use chrono::Utc;
    use marquee_core::{
        content_cache_key, CacheCategory, ContentSequence, ContentSnapshot, DeviceDescriptor,
        ItemKind, SequenceItem,
    };
    use marquee_db::{CacheConfig, CacheStore};
    use std::sync::atomic::{AtomicBool, Ordering};

    fn snapshot() -> ContentSnapshot {
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
                    source: "img/a.png".into(),
                    duration_secs: 10,
                    width: None,
                    height: None,
                }],
            }),
        }
    }

    /// Fake API that records result reports.
    struct RecordingApi {
        reports: Mutex<Vec<(String, bool, Option<String>)>>,
        fail_content: AtomicBool,
    }

    impl RecordingApi {
        fn new() -> Self {
            RecordingApi {
                reports: Mutex::new(Vec::new()),
                fail_content: AtomicBool::new(false),
            }
        }

        fn reports(&self) -> Vec<(String, bool, Option<String>)> {
            self.reports.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PlayerApi for RecordingApi {
        async fn heartbeat(&self, _device_id: &str) -> PlayerResult<()> {
            Ok(())
        }

        async fn get_content(&self, _device_id: &str) -> PlayerResult<ContentSnapshot> {
            if self.fail_content.load(Ordering::SeqCst) {
                Err(PlayerError::ConnectionFailed("down".into()))
            } else {
                Ok(snapshot())
            }
        }

        async fn poll_command(&self, _device_id: &str) -> PlayerResult<Option<Command>> {
            Ok(None)
        }

        async fn report_command_result(
            &self,
            command_id: &str,
            success: bool,
            error_message: Option<&str>,
        ) -> PlayerResult<()> {
            self.reports.lock().unwrap().push((
                command_id.to_string(),
                success,
                error_message.map(String::from),
            ));
            Ok(())
        }

        async fn update_device_status(
            &self,
            _device_id: &str,
            _player_version: &str,
            _content_fingerprint: &str,
        ) -> PlayerResult<DeviceStatusAck> {
            Ok(DeviceStatusAck {
                needs_screenshot_update: false,
            })
        }
    }

    struct Fixture {
        api: Arc<RecordingApi>,
        cache: CacheRepository,
        dispatcher: Arc<CommandDispatcher>,
        fingerprint: Arc<RwLock<Option<String>>>,
    }

    async fn fixture() -> Fixture {
        let api = Arc::new(RecordingApi::new());
        let cache = CacheStore::new(CacheConfig::in_memory())
            .await
            .unwrap()
            .cache();
        let fetcher = Arc::new(ContentFetcher::new(
            api.clone(),
            Some(cache.clone()),
            "dev-1",
        ));
        let fingerprint = Arc::new(RwLock::new(None));
        let dispatcher = Arc::new(CommandDispatcher::new(
            api.clone(),
            Some(cache.clone()),
            fetcher,
            ConnectivityMonitor::new(),
            Arc::new(NoOpEmitter),
            fingerprint.clone(),
            Duration::from_millis(1),
        ));

        Fixture {
            api,
            cache,
            dispatcher,
            fingerprint,
        }
    }

    fn command(id: &str, command_type: CommandType) -> Command {
        Command {
            id: id.into(),
            command_type,
            payload: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_exactly_once_under_poll_push_race() {
        let f = fixture().await;

        // The same command arrives via poll and push "in the same tick"
        let cmd = command("c1", CommandType::Reload);
        let (a, b) = tokio::join!(
            f.dispatcher.dispatch(cmd.clone()),
            f.dispatcher.dispatch(cmd.clone())
        );
        let _ = (a, b);

        let reports = f.api.reports();
        assert_eq!(reports.len(), 1, "exactly one report for one command id");
        assert_eq!(reports[0].0, "c1");
        assert!(reports[0].1);
    }

    #[tokio::test]
    async fn test_unknown_command_reports_failure_and_nothing_else() {
        let f = fixture().await;
        f.cache
            .put("content-dev-1", &serde_json::json!({"v": 1}), CacheCategory::Content)
            .await
            .unwrap();

        f.dispatcher
            .dispatch(command("c1", CommandType::Unknown("frobnicate".into())))
            .await;

        let reports = f.api.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].0, "c1");
        assert!(!reports[0].1);
        let message = reports[0].2.as_deref().unwrap();
        assert!(message.contains("Unknown command type"));
        assert!(message.contains("frobnicate"));

        // No side effects: the cache is untouched
        assert!(f.cache.get("content-dev-1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_clear_cache_reports_outcome_of_the_clear() {
        let f = fixture().await;
        f.cache
            .put("content-dev-1", &serde_json::json!({"v": 1}), CacheCategory::Content)
            .await
            .unwrap();

        f.dispatcher
            .dispatch(command("c1", CommandType::ClearCache))
            .await;

        let reports = f.api.reports();
        assert_eq!(reports.len(), 1);
        assert!(reports[0].1);
        assert_eq!(f.cache.get("content-dev-1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_reset_clears_cache_before_success_report() {
        let f = fixture().await;
        f.cache
            .put("content-dev-1", &serde_json::json!({"v": 1}), CacheCategory::Content)
            .await
            .unwrap();
        *f.fingerprint.write().unwrap() = Some("a1b2".into());

        f.dispatcher.dispatch(command("c2", CommandType::Reset)).await;

        let reports = f.api.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].0, "c2");
        assert!(reports[0].1);

        // Previously stored keys are gone and local state is wiped
        assert_eq!(f.cache.get("content-dev-1").await.unwrap(), None);
        assert_eq!(*f.fingerprint.read().unwrap(), None);
    }

    #[tokio::test]
    async fn test_reload_refetches_and_updates_fingerprint() {
        let f = fixture().await;

        f.dispatcher.dispatch(command("c3", CommandType::Reload)).await;

        let reports = f.api.reports();
        assert_eq!(reports.len(), 1);
        assert!(reports[0].1, "reload reports success before the re-fetch");
        assert!(f.fingerprint.read().unwrap().is_some());

        // The re-fetch persisted fresh content
        assert!(f
            .cache
            .get(&content_cache_key("dev-1"))
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_reload_with_dead_network_still_reports_success() {
        let f = fixture().await;
        f.api.fail_content.store(true, Ordering::SeqCst);

        f.dispatcher.dispatch(command("c4", CommandType::Reload)).await;

        // The report went out before the re-fetch was attempted
        let reports = f.api.reports();
        assert_eq!(reports.len(), 1);
        assert!(reports[0].1);
    }

    #[tokio::test]
    async fn test_reset_session_state_allows_redelivery() {
        let f = fixture().await;

        f.dispatcher.dispatch(command("c5", CommandType::Reload)).await;
        f.dispatcher.reset_session_state();
        f.dispatcher.dispatch(command("c5", CommandType::Reload)).await;

        // After a session reset the server may legitimately redeliver
        assert_eq!(f.api.reports().len(), 2);
    }

    #[tokio::test]
    async fn test_clear_cache_without_cache_reports_failure() {
        let api = Arc::new(RecordingApi::new());
        let fetcher = Arc::new(ContentFetcher::new(api.clone(), None, "dev-1"));
        let dispatcher = CommandDispatcher::new(
            api.clone(),
            None,
            fetcher,
            ConnectivityMonitor::new(),
            Arc::new(NoOpEmitter),
            Arc::new(RwLock::new(None)),
            Duration::from_millis(1),
        );

        dispatcher
            .dispatch(command("c6", CommandType::ClearCache))
            .await;

        let reports = api.reports();
        assert_eq!(reports.len(), 1);
        assert!(!reports[0].1);
    }
}
