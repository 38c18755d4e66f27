//! Snapshot persistence for the catalog.
//!
//! The cache sits on top of a generic string key-value store, holding the
//! last successful pass under two companion keys:
//!
//! - `catalog.entries`   — the serialized entry set
//! - `catalog.timestamp` — capture time, milliseconds since the epoch
//!
//! A snapshot older than the configured TTL, or one that fails to
//! deserialize, is treated as a miss.

pub mod local;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{CacheSnapshot, CatalogEntry};

// Re-export for convenience
pub use local::JsonFileStore;

/// Key holding the serialized entry set.
pub const ENTRIES_KEY: &str = "catalog.entries";

/// Key holding the capture timestamp in epoch milliseconds.
pub const TIMESTAMP_KEY: &str = "catalog.timestamp";

/// Generic persisted key-value store with string keys and values.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> Result<()>;
    async fn delete(&self, key: &str) -> Result<()>;
}

/// Time-bounded snapshot cache over a key-value store.
pub struct CatalogCache {
    store: Box<dyn KeyValueStore>,
    ttl_secs: u64,
}

impl CatalogCache {
    pub fn new(store: Box<dyn KeyValueStore>, ttl_secs: u64) -> Self {
        Self { store, ttl_secs }
    }

    /// Read the stored snapshot if it exists, parses, and is fresh.
    ///
    /// Every failure mode is a miss: missing keys, malformed timestamp,
    /// malformed entry JSON, or staleness.
    pub async fn read(&self) -> Option<CacheSnapshot> {
        let raw_ts = self.store.get(TIMESTAMP_KEY).await.ok().flatten()?;
        let captured_ms: i64 = raw_ts.trim().parse().ok()?;
        let captured_at = DateTime::<Utc>::from_timestamp_millis(captured_ms)?;

        let age = Utc::now()
            .signed_duration_since(captured_at)
            .num_seconds()
            .max(0) as u64;
        if age >= self.ttl_secs {
            log::debug!("Cached snapshot is stale ({age}s old, ttl {}s)", self.ttl_secs);
            return None;
        }

        let raw = self.store.get(ENTRIES_KEY).await.ok().flatten()?;
        match serde_json::from_str::<Vec<CatalogEntry>>(&raw) {
            Ok(entries) => {
                let count = entries.len();
                Some(CacheSnapshot {
                    captured_at,
                    count,
                    entries,
                })
            }
            Err(error) => {
                log::warn!("Cached snapshot failed to parse: {error}");
                None
            }
        }
    }

    /// Persist a fresh snapshot.
    ///
    /// The entry set is written before the timestamp, so a torn write
    /// leaves the old timestamp behind and reads as a stale miss rather
    /// than a half-new snapshot.
    pub async fn write(&self, entries: &[CatalogEntry]) -> Result<()> {
        let serialized = serde_json::to_string(entries)?;
        self.store.set(ENTRIES_KEY, &serialized).await?;
        let now_ms = Utc::now().timestamp_millis().to_string();
        self.store.set(TIMESTAMP_KEY, &now_ms).await?;
        Ok(())
    }

    /// Drop the stored snapshot.
    pub async fn clear(&self) -> Result<()> {
        self.store.delete(ENTRIES_KEY).await?;
        self.store.delete(TIMESTAMP_KEY).await?;
        Ok(())
    }
}
