//! Service layer for the catalog application.
//!
//! This module contains the business logic for:
//! - Redundant-endpoint network access (`ProxyClient`)
//! - Wiki render-API access (`WikiClient`)
//! - Listing discovery (`ListingResolver`)
//! - Per-entry enrichment (`EntryEnricher`)
//! - Bounded-concurrency fan-out (`pool`)
//! - Image location resolution (`ImageResolver`)

mod enrich;
mod images;
mod listing;
pub mod pool;
mod proxy;
mod wiki;

pub use enrich::EntryEnricher;
pub use images::{trim_static_url, ImageResolver};
pub use listing::{fallback_entries, ListingOutcome, ListingResolver};
pub use pool::{run_all, EnrichOutcome, ProgressEvent, ProgressFn, SyncPhase};
pub use proxy::ProxyClient;
pub use wiki::WikiClient;
