// src/pipeline/sync.rs

//! Catalog synchronization pipeline.
//!
//! One pass: consult the cache, resolve the listing, fan out enrichment,
//! persist the snapshot. A pass is best-effort and idempotent; a failed
//! pass degrades to placeholder content instead of an empty result.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;

use crate::error::Result;
use crate::models::{AllowLists, CatalogEntry, Config};
use crate::services::pool::{self, ProgressEvent, ProgressFn, SyncPhase};
use crate::services::{
    fallback_entries, EntryEnricher, ImageResolver, ListingResolver, ProxyClient, WikiClient,
};
use crate::storage::{CatalogCache, KeyValueStore};

/// Options for one synchronization call.
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// Skip the cache read (the write still happens on success)
    pub force_refresh: bool,
    /// Override the configured worker count
    pub concurrency: Option<usize>,
}

/// The catalog synchronization engine.
pub struct CatalogSync {
    config: Arc<Config>,
    allow: AllowLists,
    cache: CatalogCache,
    in_flight: Mutex<()>,
}

impl CatalogSync {
    pub fn new(config: Arc<Config>, allow: AllowLists, store: Box<dyn KeyValueStore>) -> Self {
        let cache = CatalogCache::new(store, config.cache.ttl_secs);
        Self {
            config,
            allow,
            cache,
            in_flight: Mutex::new(()),
        }
    }

    /// The snapshot cache, for inspection and manual clearing.
    pub fn cache(&self) -> &CatalogCache {
        &self.cache
    }

    /// Run one synchronization pass and return the full entry set.
    ///
    /// Resolves with the fixed fallback set when the upstream is
    /// unreachable; an `Err` only ever reflects infrastructure misuse
    /// (invalid configuration), never upstream state.
    pub async fn synchronize(
        &self,
        options: &SyncOptions,
        on_progress: Option<&ProgressFn>,
    ) -> Result<Vec<CatalogEntry>> {
        // Concurrent refresh requests join the in-flight pass: the second
        // caller waits here and then typically hits the fresh snapshot.
        let _guard = self.in_flight.lock().await;

        if !options.force_refresh {
            if let Some(snapshot) = self.cache.read().await {
                log::info!(
                    "Using cached catalog ({} entries, {}h old)",
                    snapshot.count,
                    snapshot.age_secs(Utc::now()) / 3600
                );
                return Ok(snapshot.entries);
            }
        }

        // Fresh client per pass: the endpoint cursor starts at identity
        let proxy = ProxyClient::new(&self.config.source, &self.config.proxy)?;
        let wiki = WikiClient::new(&proxy, &self.config.source.api_base);
        let resolver = ListingResolver::new(&self.config.source, &self.allow);

        let listing = match resolver.resolve(&wiki).await {
            Ok(listing) => listing,
            Err(error) if error.is_proxy_exhausted() => {
                log::error!("Listing fetch failed: {error}. Serving placeholder entries.");
                return Ok(fallback_entries());
            }
            Err(error) => return Err(error),
        };

        if listing.used_fallback {
            // Placeholder entries have no sub-pages to enrich and are
            // never persisted as a snapshot.
            return Ok(listing.entries);
        }

        let entries = listing.entries;
        let total = entries.len();
        pool::emit(
            on_progress,
            &ProgressEvent {
                phase: SyncPhase::List,
                index: 0,
                entry: None,
                completed: 0,
                total,
                percent: 0,
                is_done: false,
                error: None,
            },
        );

        let images = ImageResolver::new(&proxy, &self.config.source);
        let enricher = EntryEnricher::new(&wiki, &images, &self.config.source);
        let concurrency = options
            .concurrency
            .unwrap_or(self.config.sync.concurrency);

        let (entries, outcomes) = pool::run_all(
            entries,
            concurrency,
            |entry| enricher.enrich_entry(entry),
            on_progress,
        )
        .await;

        let failures = outcomes.iter().filter(|o| o.error.is_some()).count();
        if failures > 0 {
            log::warn!("{failures}/{total} entries only partially enriched");
        }

        if let Err(error) = self.cache.write(&entries).await {
            log::warn!("Failed to persist snapshot: {error}");
        }

        Ok(entries)
    }
}
