//! Cached snapshot of a synchronization pass.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::CatalogEntry;

/// The full entry set of one successful pass plus its capture timestamp.
///
/// Owned exclusively by the catalog cache and replaced whole on each
/// successful pass, never partially updated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheSnapshot {
    /// ISO 8601 capture timestamp
    pub captured_at: DateTime<Utc>,

    /// Total entry count
    pub count: usize,

    /// The entries, in listing order
    pub entries: Vec<CatalogEntry>,
}

impl CacheSnapshot {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self {
            captured_at: Utc::now(),
            count: entries.len(),
            entries,
        }
    }

    /// Snapshot age relative to `now`, in seconds. Clock skew into the
    /// future counts as age zero.
    pub fn age_secs(&self, now: DateTime<Utc>) -> u64 {
        now.signed_duration_since(self.captured_at)
            .num_seconds()
            .max(0) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn age_counts_elapsed_seconds() {
        let snapshot = CacheSnapshot::new(Vec::new());
        let later = snapshot.captured_at + Duration::seconds(90);
        assert_eq!(snapshot.age_secs(later), 90);
    }

    #[test]
    fn future_timestamp_has_zero_age() {
        let snapshot = CacheSnapshot::new(Vec::new());
        let earlier = snapshot.captured_at - Duration::seconds(30);
        assert_eq!(snapshot.age_secs(earlier), 0);
    }
}
