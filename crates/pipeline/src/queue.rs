//! The ready queue: a bounded priority queue of [`JobTask`] ordered by
//! `(-priority, enqueue sequence)`, per SPEC_FULL.md §4.3.1. A
//! monotonically increasing sequence number (not just `created_at`, which
//! can tie at sub-millisecond enqueue rates) guarantees FIFO order within
//! a priority band.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Mutex;
use std::time::Duration;
use taskloom_kernel::domain::JobTask;
use taskloom_kernel::error::CoreError;
use tokio::sync::{Notify, Semaphore};

struct HeapEntry {
    priority: i32,
    sequence: u64,
    task: JobTask,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.sequence == other.sequence
    }
}
impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap: higher priority must compare greater,
        // and within equal priority the lower (earlier) sequence must
        // compare greater so it pops first.
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

/// Bounded priority queue backing the pipeline's immediately-runnable
/// tasks. Capacity is enforced with a [`Semaphore`] rather than checking
/// `len()` against a limit, so `push`/`push_blocking` and `pop` can't race
/// past the bound.
pub struct ReadyQueue {
    heap: Mutex<BinaryHeap<HeapEntry>>,
    notify: Notify,
    capacity: Semaphore,
    sequence: AtomicU64,
}

impl ReadyQueue {
    pub fn new(max_queue_size: usize) -> Self {
        Self {
            heap: Mutex::new(BinaryHeap::new()),
            notify: Notify::new(),
            capacity: Semaphore::new(max_queue_size),
            sequence: AtomicU64::new(0),
        }
    }

    /// Non-blocking push used by `submit`. Returns [`CoreError::QueueFull`]
    /// immediately when the bound is reached rather than waiting.
    pub fn try_push(&self, task: JobTask) -> Result<(), CoreError> {
        let permit = self
            .capacity
            .try_acquire()
            .map_err(|_| CoreError::QueueFull)?;
        permit.forget();
        self.push_entry(task);
        Ok(())
    }

    /// Blocking push used by the delayed-promotion loop, which must not
    /// drop a task that became due just because the queue is momentarily
    /// full (SPEC_FULL.md §4.3.5).
    pub async fn push_blocking(&self, task: JobTask) {
        let permit = self
            .capacity
            .acquire()
            .await
            .expect("ready queue semaphore never closes");
        permit.forget();
        self.push_entry(task);
    }

    fn push_entry(&self, task: JobTask) {
        let sequence = self.sequence.fetch_add(1, AtomicOrdering::Relaxed);
        let mut heap = self.heap.lock().expect("ready queue mutex poisoned");
        heap.push(HeapEntry {
            priority: task.priority,
            sequence,
            task,
        });
        drop(heap);
        self.notify.notify_one();
    }

    fn try_pop(&self) -> Option<JobTask> {
        let mut heap = self.heap.lock().expect("ready queue mutex poisoned");
        let entry = heap.pop()?;
        drop(heap);
        self.capacity.add_permits(1);
        Some(entry.task)
    }

    /// Cooperative poll: returns immediately if a task is ready, otherwise
    /// waits up to `timeout` for one to be pushed, per the worker-loop
    /// pseudocode in SPEC_FULL.md §4.3.3.
    pub async fn pop_timeout(&self, timeout: Duration) -> Option<JobTask> {
        if let Some(task) = self.try_pop() {
            return Some(task);
        }
        let notified = self.notify.notified();
        tokio::select! {
            _ = notified => self.try_pop(),
            _ = tokio::time::sleep(timeout) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.heap.lock().expect("ready queue mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
