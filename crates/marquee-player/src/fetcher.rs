//! # Content Fetcher
//!
//! Obtains the current content snapshot, preferring the live server and
//! falling back to the offline cache.
//!
//! ## Fetch Algorithm
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Content Fetch Flow                                │
//! │                                                                         │
//! │  fetch()                                                               │
//! │    │                                                                    │
//! │    ├─ 1. live fetch (gRPC GetContent)                                  │
//! │    │      │                                                             │
//! │    │      ├─ OK ──► validate ──► persist to cache ──► fingerprint      │
//! │    │      │                      (write failure logged, not fatal)     │
//! │    │      │         return { snapshot, offline: false }                │
//! │    │      │                                                             │
//! │    │      └─ ERR                                                        │
//! │    │           │                                                        │
//! │    ├─ 2. cache fallback: get('content-<deviceId>')                     │
//! │    │      │                                                             │
//! │    │      ├─ HIT ──► return { snapshot, offline: true }                │
//! │    │      │          (storage errors are treated as a miss)            │
//! │    │      │                                                             │
//! │    │      └─ MISS                                                       │
//! │    │           │                                                        │
//! │    └─ 3. Err(NoContent)  ← terminal: nothing to render                 │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The agent wraps `fetch_live` in a bounded retry loop (see agent.rs) and
//! only then takes the cache fallback, so a blip never masks fresh content
//! behind a stale cache read.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::api::PlayerApi;
use crate::error::{PlayerError, PlayerResult};
use marquee_core::validation::validate_snapshot;
use marquee_core::{content_cache_key, fingerprint, CacheCategory, ContentSnapshot};
use marquee_db::CacheRepository;

// =============================================================================
// Fetch Outcome
// =============================================================================

/// Result of a content fetch.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    /// The resolved snapshot.
    pub snapshot: ContentSnapshot,

    /// Digest used for change detection.
    pub fingerprint: String,

    /// True when the snapshot came from the offline cache.
    pub offline: bool,
}

// =============================================================================
// Content Fetcher
// =============================================================================

/// Fetches content for one device, with offline fallback.
pub struct ContentFetcher {
    /// Cloud API handle.
    api: Arc<dyn PlayerApi>,

    /// Offline cache repository. None when the cache failed to open: every
    /// read is then a miss and every write a logged no-op.
    cache: Option<CacheRepository>,

    /// The device this fetcher serves.
    device_id: String,
}

impl ContentFetcher {
    /// Creates a new content fetcher.
    pub fn new(api: Arc<dyn PlayerApi>, cache: Option<CacheRepository>, device_id: &str) -> Self {
        ContentFetcher {
            api,
            cache,
            device_id: device_id.to_string(),
        }
    }

    /// Fetches from the live server, persisting the result.
    ///
    /// The cache write is best-effort: a storage failure is logged and the
    /// fresh snapshot is still returned.
    pub async fn fetch_live(&self) -> PlayerResult<FetchOutcome> {
        let snapshot = self.api.get_content(&self.device_id).await?;

        validate_snapshot(&snapshot, &self.device_id)?;

        let digest = fingerprint(&snapshot);
        debug!(fingerprint = %digest, "Live content fetched");

        self.persist(&snapshot).await;

        Ok(FetchOutcome {
            snapshot,
            fingerprint: digest,
            offline: false,
        })
    }

    /// Reads the last-known-good snapshot from the offline cache.
    ///
    /// Returns None on a miss; storage and decode failures are logged and
    /// also treated as a miss, never raised.
    pub async fn cached_snapshot(&self) -> Option<FetchOutcome> {
        let cache = self.cache.as_ref()?;
        let key = content_cache_key(&self.device_id);

        let value = match cache.get(&key).await {
            Ok(Some(value)) => value,
            Ok(None) => {
                debug!(key = %key, "No cached content");
                return None;
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Cache read failed, treating as miss");
                return None;
            }
        };

        match serde_json::from_value::<ContentSnapshot>(value) {
            Ok(snapshot) => {
                let digest = fingerprint(&snapshot);
                debug!(fingerprint = %digest, "Serving cached content");
                Some(FetchOutcome {
                    snapshot,
                    fingerprint: digest,
                    offline: true,
                })
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Cached content undecodable, treating as miss");
                None
            }
        }
    }

    /// Live-else-cache fetch.
    ///
    /// ## Returns
    /// * `Ok(outcome)` with `offline: false` - live fetch succeeded
    /// * `Ok(outcome)` with `offline: true` - live failed, cache had content
    /// * `Err(NoContent)` - live failed and nothing is cached
    pub async fn fetch(&self) -> PlayerResult<FetchOutcome> {
        match self.fetch_live().await {
            Ok(outcome) => Ok(outcome),
            Err(live_err) => {
                warn!(error = %live_err, "Live fetch failed, trying cache");
                match self.cached_snapshot().await {
                    Some(outcome) => Ok(outcome),
                    None => Err(PlayerError::NoContent),
                }
            }
        }
    }

    /// Persists a snapshot under the device's content key.
    async fn persist(&self, snapshot: &ContentSnapshot) {
        let Some(cache) = self.cache.as_ref() else {
            debug!("Cache unavailable, skipping persist");
            return;
        };

        let key = content_cache_key(&self.device_id);
        let value = match serde_json::to_value(snapshot) {
            Ok(value) => value,
            Err(e) => {
                warn!(key = %key, error = %e, "Snapshot not serializable, skipping persist");
                return;
            }
        };

        if let Err(e) = cache.put(&key, &value, CacheCategory::Content).await {
            warn!(key = %key, error = %e, "Cache write failed");
        }
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
    use marquee_core::{Command, ContentSequence, DeviceDescriptor, ItemKind, SequenceItem};
    use marquee_db::{CacheConfig, CacheStore};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    fn snapshot(device_id: &str, source: &str) -> ContentSnapshot {
        ContentSnapshot {
            device: DeviceDescriptor {
                id: device_id.into(),
                name: "Lobby Screen".into(),
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

    /// Fake API whose get_content either serves a snapshot or fails.
    struct FakeApi {
        snapshot: ContentSnapshot,
        fail: AtomicBool,
        calls: AtomicUsize,
    }

    impl FakeApi {
        fn new(snapshot: ContentSnapshot) -> Self {
            FakeApi {
                snapshot,
                fail: AtomicBool::new(false),
                calls: AtomicUsize::new(0),
            }
        }

        fn set_failing(&self, failing: bool) {
            self.fail.store(failing, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl PlayerApi for FakeApi {
        async fn heartbeat(&self, _device_id: &str) -> PlayerResult<()> {
            Ok(())
        }

        async fn get_content(&self, _device_id: &str) -> PlayerResult<ContentSnapshot> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                Err(PlayerError::ConnectionFailed("network down".into()))
            } else {
                Ok(self.snapshot.clone())
            }
        }

        async fn poll_command(&self, _device_id: &str) -> PlayerResult<Option<Command>> {
            Ok(None)
        }

        async fn report_command_result(
            &self,
            _command_id: &str,
            _success: bool,
            _error_message: Option<&str>,
        ) -> PlayerResult<()> {
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

    async fn cache() -> CacheRepository {
        CacheStore::new(CacheConfig::in_memory())
            .await
            .unwrap()
            .cache()
    }

    #[tokio::test]
    async fn test_live_fetch_persists_and_reports_online() {
        let api = Arc::new(FakeApi::new(snapshot("dev-1", "img/a.png")));
        let repo = cache().await;
        let fetcher = ContentFetcher::new(api, Some(repo.clone()), "dev-1");

        let outcome = fetcher.fetch().await.unwrap();
        assert!(!outcome.offline);

        // The snapshot is now cached under the device content key
        let cached = repo.get(&content_cache_key("dev-1")).await.unwrap();
        assert!(cached.is_some());
    }

    #[tokio::test]
    async fn test_fallback_serves_cached_content() {
        let api = Arc::new(FakeApi::new(snapshot("dev-1", "img/a.png")));
        let repo = cache().await;
        let fetcher = ContentFetcher::new(api.clone(), Some(repo), "dev-1");

        // Seed the cache via a successful fetch, then kill the network
        let first = fetcher.fetch().await.unwrap();
        api.set_failing(true);

        let outcome = fetcher.fetch().await.unwrap();
        assert!(outcome.offline);
        assert_eq!(outcome.fingerprint, first.fingerprint);
        assert_eq!(outcome.snapshot, first.snapshot);
    }

    #[tokio::test]
    async fn test_no_content_when_nothing_cached() {
        let api = Arc::new(FakeApi::new(snapshot("dev-1", "img/a.png")));
        api.set_failing(true);
        let fetcher = ContentFetcher::new(api, Some(cache().await), "dev-1");

        let err = fetcher.fetch().await.unwrap_err();
        assert!(matches!(err, PlayerError::NoContent));
    }

    #[tokio::test]
    async fn test_unavailable_cache_degrades_to_live_only() {
        let api = Arc::new(FakeApi::new(snapshot("dev-1", "img/a.png")));
        let fetcher = ContentFetcher::new(api.clone(), None, "dev-1");

        // Live works without a cache
        assert!(fetcher.fetch().await.is_ok());

        // Without cache, a network failure is terminal
        api.set_failing(true);
        assert!(matches!(
            fetcher.fetch().await.unwrap_err(),
            PlayerError::NoContent
        ));
    }

    #[tokio::test]
    async fn test_snapshot_for_wrong_device_rejected() {
        let api = Arc::new(FakeApi::new(snapshot("some-other-device", "img/a.png")));
        let fetcher = ContentFetcher::new(api, Some(cache().await), "dev-1");

        let err = fetcher.fetch_live().await.unwrap_err();
        assert!(matches!(err, PlayerError::InvalidSnapshot(_)));
    }

    #[tokio::test]
    async fn test_invalid_snapshot_does_not_poison_cache() {
        let api = Arc::new(FakeApi::new(snapshot("dev-1", "")));
        let repo = cache().await;
        let fetcher = ContentFetcher::new(api, Some(repo.clone()), "dev-1");

        assert!(fetcher.fetch_live().await.is_err());
        assert_eq!(repo.get(&content_cache_key("dev-1")).await.unwrap(), None);
    }
}
