// src/services/pool.rs

//! Bounded-concurrency enrichment pool.
//!
//! Workers share a single atomic cursor over the entry sequence; each
//! claims the next unclaimed index, enriches it, bumps the completed
//! counter and reports progress. The pool settles every worker before
//! returning and never short-circuits on failure. Concurrency is logical:
//! the workers are cooperative futures driven together, suspension only
//! happens at network boundaries and at the explicit yield after each
//! entry.

use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Mutex;

use crate::models::CatalogEntry;

/// Which stage of a synchronization pass a progress event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    /// Emitted once, after the listing resolved
    List,
    /// Emitted once per entry as enrichment completes
    Enrich,
}

/// Structured progress payload handed to the reporter callback.
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub phase: SyncPhase,
    /// Listing index of the entry this event is about
    pub index: usize,
    /// The entry as of this event; absent for the listing event
    pub entry: Option<CatalogEntry>,
    /// Entries completed so far, failures included
    pub completed: usize,
    pub total: usize,
    /// Whole percentage, 0..=100
    pub percent: u8,
    pub is_done: bool,
    /// Set when this entry's enrichment failed
    pub error: Option<String>,
}

/// Reporter callback contract. Reporting is fire-and-forget: a panicking
/// reporter is swallowed and never aborts the pass.
pub type ProgressFn = dyn Fn(&ProgressEvent) + Send + Sync;

/// Per-entry enrichment outcome, making the never-abort policy explicit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichOutcome {
    pub index: usize,
    /// Present when enrichment failed; the entry is still returned
    pub error: Option<String>,
}

/// Invoke the reporter, swallowing its panics.
pub(crate) fn emit(on_progress: Option<&ProgressFn>, event: &ProgressEvent) {
    if let Some(callback) = on_progress {
        if catch_unwind(AssertUnwindSafe(|| callback(event))).is_err() {
            log::warn!("Progress reporter panicked; continuing");
        }
    }
}

fn percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    (((completed as f64 / total as f64) * 100.0).round() as u64).min(100) as u8
}

/// Drive enrichment of every entry with a fixed concurrency bound.
///
/// The returned sequence preserves the input order regardless of
/// completion order. Exactly one progress event fires per entry, with
/// `completed` strictly increasing to the total.
pub async fn run_all<F, Fut>(
    entries: Vec<CatalogEntry>,
    concurrency: usize,
    enrich: F,
    on_progress: Option<&ProgressFn>,
) -> (Vec<CatalogEntry>, Vec<EnrichOutcome>)
where
    F: Fn(CatalogEntry) -> Fut,
    Fut: Future<Output = (CatalogEntry, Option<String>)>,
{
    let total = entries.len();
    if total == 0 {
        return (Vec::new(), Vec::new());
    }

    let worker_count = concurrency.max(1).min(total);
    let cursor = AtomicUsize::new(0);
    let completed = AtomicUsize::new(0);

    // One slot per entry; a worker takes the entry out, enriches it and
    // puts the result back, so the final order is the listing order.
    let slots: Vec<Mutex<Option<CatalogEntry>>> = entries
        .into_iter()
        .map(|entry| Mutex::new(Some(entry)))
        .collect();
    let errors: Vec<Mutex<Option<String>>> = (0..total).map(|_| Mutex::new(None)).collect();

    {
        let cursor = &cursor;
        let completed = &completed;
        let slots = &slots;
        let errors = &errors;
        let enrich = &enrich;

        let run_worker = move || async move {
            loop {
                let index = cursor.fetch_add(1, Ordering::SeqCst);
                if index >= total {
                    break;
                }

                let Some(entry) = slots[index].lock().await.take() else {
                    continue;
                };
                let (entry, error) = enrich(entry).await;

                let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                let event = ProgressEvent {
                    phase: SyncPhase::Enrich,
                    index,
                    entry: Some(entry.clone()),
                    completed: done,
                    total,
                    percent: percent(done, total),
                    is_done: done == total,
                    error: error.clone(),
                };
                emit(on_progress, &event);

                *slots[index].lock().await = Some(entry);
                *errors[index].lock().await = error;

                // Yield so a consumer stays responsive under parse-heavy work
                tokio::task::yield_now().await;
            }
        };

        futures::future::join_all((0..worker_count).map(|_| run_worker())).await;
    }

    let mut result = Vec::with_capacity(total);
    let mut outcomes = Vec::with_capacity(total);
    for (index, slot) in slots.iter().enumerate() {
        if let Some(entry) = slot.lock().await.take() {
            result.push(entry);
        }
        let error = errors[index].lock().await.take();
        outcomes.push(EnrichOutcome { index, error });
    }
    (result, outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize as StdAtomicUsize;
    use std::sync::Mutex as StdMutex;

    use crate::models::EntryFlags;

    fn make_entries(count: usize) -> Vec<CatalogEntry> {
        (0..count)
            .map(|i| {
                CatalogEntry::bare(
                    format!("User_blog:A/Tower{i}"),
                    format!("Tower{i}"),
                    "A",
                    format!("/wiki/User_blog:A/Tower{i}"),
                    EntryFlags::default(),
                )
            })
            .collect()
    }

    #[tokio::test]
    async fn fires_one_event_per_entry_with_increasing_completed() {
        let events: std::sync::Arc<StdMutex<Vec<ProgressEvent>>> =
            std::sync::Arc::new(StdMutex::new(Vec::new()));
        let reporter = {
            let events = std::sync::Arc::clone(&events);
            move |event: &ProgressEvent| {
                events.lock().unwrap().push(event.clone());
            }
        };

        let (result, outcomes) = run_all(
            make_entries(7),
            3,
            |mut entry| async move {
                entry.description = Some("enriched".to_string());
                (entry, None)
            },
            Some(&reporter),
        )
        .await;

        assert_eq!(result.len(), 7);
        assert_eq!(outcomes.len(), 7);

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 7);
        for (i, event) in events.iter().enumerate() {
            assert_eq!(event.completed, i + 1);
            assert_eq!(event.total, 7);
            assert_eq!(event.is_done, i == 6);
            assert_eq!(event.phase, SyncPhase::Enrich);
            assert!(event.entry.is_some());
        }
        assert_eq!(events.last().unwrap().percent, 100);
    }

    #[tokio::test]
    async fn result_preserves_listing_order() {
        let (result, _) = run_all(
            make_entries(10),
            4,
            |entry| async move {
                // Stagger completion so later indices can finish first
                if entry.name.ends_with('0') || entry.name.ends_with('1') {
                    tokio::task::yield_now().await;
                    tokio::task::yield_now().await;
                }
                (entry, None)
            },
            None,
        )
        .await;

        let names: Vec<&str> = result.iter().map(|e| e.name.as_str()).collect();
        let expected: Vec<String> = (0..10).map(|i| format!("Tower{i}")).collect();
        assert_eq!(names, expected);
    }

    #[tokio::test]
    async fn one_failure_never_aborts_the_batch() {
        let (result, outcomes) = run_all(
            make_entries(5),
            2,
            |mut entry| async move {
                if entry.name == "Tower2" {
                    return (entry, Some("sub-page fetch failed".to_string()));
                }
                entry.description = Some("ok".to_string());
                (entry, None)
            },
            None,
        )
        .await;

        assert_eq!(result.len(), 5);
        let failures: Vec<&EnrichOutcome> =
            outcomes.iter().filter(|o| o.error.is_some()).collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].index, 2);
        assert!(result[2].description.is_none());
        assert!(result[3].description.is_some());
    }

    #[tokio::test]
    async fn concurrency_is_bounded() {
        let active = StdAtomicUsize::new(0);
        let peak = StdAtomicUsize::new(0);
        let (active, peak) = (&active, &peak);

        let (result, _) = run_all(
            make_entries(12),
            3,
            |entry| async move {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::task::yield_now().await;
                active.fetch_sub(1, Ordering::SeqCst);
                (entry, None)
            },
            None,
        )
        .await;

        assert_eq!(result.len(), 12);
        assert!(peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn zero_concurrency_is_coerced_to_one() {
        let (result, _) =
            run_all(make_entries(3), 0, |entry| async move { (entry, None) }, None).await;
        assert_eq!(result.len(), 3);
    }

    #[tokio::test]
    async fn panicking_reporter_is_swallowed() {
        let reporter = |_: &ProgressEvent| panic!("reporter bug");
        let (result, outcomes) = run_all(
            make_entries(4),
            2,
            |entry| async move { (entry, None) },
            Some(&reporter),
        )
        .await;

        assert_eq!(result.len(), 4);
        assert!(outcomes.iter().all(|o| o.error.is_none()));
    }

    #[tokio::test]
    async fn empty_input_yields_empty_output() {
        let (result, outcomes) =
            run_all(Vec::new(), 5, |entry| async move { (entry, None) }, None).await;
        assert!(result.is_empty());
        assert!(outcomes.is_empty());
    }
}
