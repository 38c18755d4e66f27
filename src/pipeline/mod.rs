//! Pipeline entry points for catalog operations.
//!
//! - `CatalogSync::synchronize`: the single public contract of the engine

pub mod sync;

pub use sync::{CatalogSync, SyncOptions};
