//! Pipeline metrics: the live counters in [`PipelineStatus`] plus the
//! per-job metadata ring bounded at 1,000 entries (SPEC_FULL.md §4.3.1,
//! §5).

use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

const MAX_RETAINED_ENTRIES: usize = 1_000;

/// Per-job metadata retained after a terminal outcome, for introspection
/// tooling. Oldest entries (by `completed_at`) are evicted once the
/// retained set exceeds [`MAX_RETAINED_ENTRIES`].
#[derive(Debug, Clone)]
pub struct JobMetricEntry {
    pub job_id: Uuid,
    pub agent_name: String,
    pub success: bool,
    pub completed_at: DateTime<Utc>,
    pub execution_time: Duration,
}

/// A point-in-time snapshot of the pipeline's counters, returned by
/// `pipeline_status`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineStatus {
    pub completed: u64,
    pub failed: u64,
    pub retried: u64,
    pub active: i64,
    pub ready_queue_len: usize,
    pub delayed_len: usize,
}

/// Atomic counters plus the bounded recent-job ring, guarded separately so
/// the hot-path counter increments never contend with the ring's mutex.
#[derive(Default)]
pub struct PipelineMetrics {
    completed: AtomicU64,
    failed: AtomicU64,
    retried: AtomicU64,
    active: AtomicI64,
    recent: Mutex<VecDeque<JobMetricEntry>>,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_active(&self) {
        self.active.fetch_add(1, Ordering::Relaxed);
    }

    pub fn mark_inactive(&self) {
        self.active.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn record_completion(&self, entry: JobMetricEntry) {
        if entry.success {
            self.completed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
        let mut recent = self.recent.lock().expect("metrics mutex poisoned");
        recent.push_back(entry);
    }

    pub fn record_retry(&self) {
        self.retried.fetch_add(1, Ordering::Relaxed);
    }

    /// Evicts entries beyond [`MAX_RETAINED_ENTRIES`], oldest (earliest
    /// `completed_at`) first. This is the cleanup task's sole
    /// responsibility — no other code path trims the ring.
    pub fn evict_stale(&self) {
        let mut recent = self.recent.lock().expect("metrics mutex poisoned");
        if recent.len() <= MAX_RETAINED_ENTRIES {
            return;
        }
        let mut entries: Vec<JobMetricEntry> = recent.drain(..).collect();
        entries.sort_by_key(|e| e.completed_at);
        let keep_from = entries.len() - MAX_RETAINED_ENTRIES;
        recent.extend(entries.into_iter().skip(keep_from));
    }

    pub fn job_entry(&self, job_id: Uuid) -> Option<JobMetricEntry> {
        let recent = self.recent.lock().expect("metrics mutex poisoned");
        recent.iter().find(|e| e.job_id == job_id).cloned()
    }

    pub fn snapshot(&self, ready_queue_len: usize, delayed_len: usize) -> PipelineStatus {
        PipelineStatus {
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            retried: self.retried.load(Ordering::Relaxed),
            active: self.active.load(Ordering::Relaxed),
            ready_queue_len,
            delayed_len,
        }
    }

    pub fn retained_len(&self) -> usize {
        self.recent.lock().expect("metrics mutex poisoned").len()
    }
}
