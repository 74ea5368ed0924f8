//! The delayed set: a time-ordered collection of [`JobTask`]s whose
//! `scheduled_at` is in the future — future-dated submissions and
//! backoff retries alike, per SPEC_FULL.md §3.1 and §4.3.4.

use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Mutex;
use taskloom_kernel::domain::JobTask;

struct DelayedEntry(JobTask);

impl PartialEq for DelayedEntry {
    fn eq(&self, other: &Self) -> bool {
        self.0.scheduled_at == other.0.scheduled_at && self.0.job_id == other.0.job_id
    }
}
impl Eq for DelayedEntry {}

impl PartialOrd for DelayedEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DelayedEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so the BinaryHeap (a max-heap) surfaces the *earliest*
        // `scheduled_at` first, turning it into a min-heap by time.
        other.0.scheduled_at.cmp(&self.0.scheduled_at)
    }
}

/// Single-task-owned (behind its own mutex) sorted collection of not-yet-due
/// tasks, drained by the delayed-promotion loop.
#[derive(Default)]
pub struct DelayedSet {
    heap: Mutex<BinaryHeap<DelayedEntry>>,
}

impl DelayedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, task: JobTask) {
        let mut heap = self.heap.lock().expect("delayed set mutex poisoned");
        heap.push(DelayedEntry(task));
    }

    /// Removes and returns every task whose `scheduled_at` is at or before
    /// `now`, earliest first.
    pub fn drain_ready(&self, now: DateTime<Utc>) -> Vec<JobTask> {
        let mut heap = self.heap.lock().expect("delayed set mutex poisoned");
        let mut ready = Vec::new();
        while let Some(entry) = heap.peek() {
            if entry.0.scheduled_at > now {
                break;
            }
            ready.push(heap.pop().expect("peeked entry must be present").0);
        }
        ready
    }

    pub fn len(&self) -> usize {
        self.heap.lock().expect("delayed set mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
