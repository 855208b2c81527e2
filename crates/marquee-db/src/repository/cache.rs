//! # Cache Repository
//!
//! Persistent key/value storage that outlives process restarts.
//!
//! ## The Last-Known-Good Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Offline Cache Lifecycle                              │
//! │                                                                         │
//! │  FETCH SUCCEEDS                                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  put('content-<deviceId>', snapshot, 'content')                        │
//! │       │   UPSERT: one row per key, overwritten every cycle             │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    offline_cache Table                          │   │
//! │  │                                                                 │   │
//! │  │  key                  | data    | type     | timestamp         │   │
//! │  │  ─────────────────────┼─────────┼──────────┼─────────────      │   │
//! │  │  content-dev-1        │ {...}   │ content  │ 2026-...          │   │
//! │  │  device-state-dev-1   │ {...}   │ metadata │ 2026-...          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       ▲                                                                 │
//! │       │                                                                 │
//! │  FETCH FAILS → get('content-<deviceId>') → render last-known-good      │
//! │                                                                         │
//! │  KEY GUARANTEES:                                                       │
//! │  • get on a missing key returns None, never an error                   │
//! │  • entries never expire on their own (staleness bounded only by how   │
//! │    often fetches succeed)                                              │
//! │  • clear() is the only bulk delete, driven by clear_cache/reset        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::error::{CacheError, CacheResult};
use marquee_core::{CacheCategory, CacheEntry};

/// Repository for offline cache operations.
#[derive(Debug, Clone)]
pub struct CacheRepository {
    pool: SqlitePool,
}

impl CacheRepository {
    /// Creates a new CacheRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CacheRepository { pool }
    }

    /// Upserts a cache entry.
    ///
    /// Returns once the row is durably written. There is exactly one row per
    /// key: a successful fetch always replaces the previous snapshot.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let payload = serde_json::to_value(&snapshot)?;
    /// repo.put(&content_cache_key(device_id), &payload, CacheCategory::Content).await?;
    /// ```
    pub async fn put(
        &self,
        key: &str,
        value: &serde_json::Value,
        category: CacheCategory,
    ) -> CacheResult<()> {
        let now = Utc::now();
        let data = serde_json::to_string(value).map_err(|e| CacheError::Serialization {
            key: key.to_string(),
            message: e.to_string(),
        })?;

        debug!(key = %key, category = %category, "Writing cache entry");

        sqlx::query(
            r#"
            INSERT INTO offline_cache (key, data, type, timestamp)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(key) DO UPDATE SET
                data = excluded.data,
                type = excluded.type,
                timestamp = excluded.timestamp
            "#,
        )
        .bind(key)
        .bind(data)
        .bind(category.as_str())
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Reads a cache entry's payload.
    ///
    /// ## Returns
    /// * `Ok(Some(value))` - The cached payload
    /// * `Ok(None)` - No entry under this key (NOT an error)
    /// * `Err(CacheError)` - Storage or deserialization failure
    pub async fn get(&self, key: &str) -> CacheResult<Option<serde_json::Value>> {
        let row = sqlx::query("SELECT data FROM offline_cache WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let data: String = row.try_get("data")?;
                let value =
                    serde_json::from_str(&data).map_err(|e| CacheError::Serialization {
                        key: key.to_string(),
                        message: e.to_string(),
                    })?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Reads a full cache entry including category and write time.
    ///
    /// Used by diagnostics; the fetch path only needs [`Self::get`].
    pub async fn get_entry(&self, key: &str) -> CacheResult<Option<CacheEntry>> {
        let row = sqlx::query(
            "SELECT key, data, type, timestamp FROM offline_cache WHERE key = ?1",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let key: String = row.try_get("key")?;
                let data: String = row.try_get("data")?;
                let category: String = row.try_get("type")?;
                let timestamp: String = row.try_get("timestamp")?;

                let data = serde_json::from_str(&data).map_err(|e| CacheError::Serialization {
                    key: key.clone(),
                    message: e.to_string(),
                })?;
                let category =
                    category
                        .parse::<CacheCategory>()
                        .map_err(|e| CacheError::Serialization {
                            key: key.clone(),
                            message: e.to_string(),
                        })?;
                let stored_at = DateTime::parse_from_rfc3339(&timestamp)
                    .map_err(|e| CacheError::Serialization {
                        key: key.clone(),
                        message: e.to_string(),
                    })?
                    .with_timezone(&Utc);

                Ok(Some(CacheEntry {
                    key,
                    data,
                    category,
                    stored_at,
                }))
            }
            None => Ok(None),
        }
    }

    /// Drops every cache entry.
    ///
    /// Driven by the `clear_cache` and `reset` commands; nothing else bulk
    /// deletes. Returns the number of dropped entries.
    pub async fn clear(&self) -> CacheResult<u64> {
        let result = sqlx::query("DELETE FROM offline_cache")
            .execute(&self.pool)
            .await?;

        debug!(dropped = result.rows_affected(), "Cleared offline cache");
        Ok(result.rows_affected())
    }

    /// Counts all cache entries.
    pub async fn count(&self) -> CacheResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM offline_cache")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Lists the keys stored under a category, oldest first.
    pub async fn keys_by_category(&self, category: CacheCategory) -> CacheResult<Vec<String>> {
        let rows = sqlx::query(
            "SELECT key FROM offline_cache WHERE type = ?1 ORDER BY timestamp ASC",
        )
        .bind(category.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("key").map_err(CacheError::from))
            .collect()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{CacheConfig, CacheStore};
    use serde_json::json;

    async fn repo() -> CacheRepository {
        let store = CacheStore::new(CacheConfig::in_memory()).await.unwrap();
        store.cache()
    }

    #[tokio::test]
    async fn test_round_trip() {
        let repo = repo().await;
        let payload = json!({"sequence": {"id": "seq-1", "items": [1, 2, 3]}});

        repo.put("content-dev-1", &payload, CacheCategory::Content)
            .await
            .unwrap();

        let cached = repo.get("content-dev-1").await.unwrap();
        assert_eq!(cached, Some(payload));
    }

    #[tokio::test]
    async fn test_missing_key_returns_none() {
        let repo = repo().await;
        assert_eq!(repo.get("never-written").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let repo = repo().await;

        repo.put("content-dev-1", &json!({"v": 1}), CacheCategory::Content)
            .await
            .unwrap();
        repo.put("content-dev-1", &json!({"v": 2}), CacheCategory::Content)
            .await
            .unwrap();

        assert_eq!(repo.get("content-dev-1").await.unwrap(), Some(json!({"v": 2})));
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_clear_drops_everything() {
        let repo = repo().await;

        repo.put("content-dev-1", &json!({"v": 1}), CacheCategory::Content)
            .await
            .unwrap();
        repo.put("device-state-dev-1", &json!({"s": true}), CacheCategory::Metadata)
            .await
            .unwrap();

        let dropped = repo.clear().await.unwrap();
        assert_eq!(dropped, 2);
        assert_eq!(repo.get("content-dev-1").await.unwrap(), None);
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_keys_by_category() {
        let repo = repo().await;

        repo.put("content-dev-1", &json!({}), CacheCategory::Content)
            .await
            .unwrap();
        repo.put("device-state-dev-1", &json!({}), CacheCategory::Metadata)
            .await
            .unwrap();

        let content_keys = repo.keys_by_category(CacheCategory::Content).await.unwrap();
        assert_eq!(content_keys, vec!["content-dev-1".to_string()]);
    }

    #[tokio::test]
    async fn test_get_entry_carries_metadata() {
        let repo = repo().await;

        repo.put("content-dev-1", &json!({"v": 1}), CacheCategory::Content)
            .await
            .unwrap();

        let entry = repo.get_entry("content-dev-1").await.unwrap().unwrap();
        assert_eq!(entry.key, "content-dev-1");
        assert_eq!(entry.category, CacheCategory::Content);
        assert_eq!(entry.data, json!({"v": 1}));
    }
}
