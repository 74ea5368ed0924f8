//! The store contract the pipeline and scheduler depend on. Kept narrow —
//! exactly the operations SPEC_FULL.md §4.5 enumerates, nothing a generic
//! ORM would expose beyond that.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use taskloom_kernel::domain::{Job, JobStatus, Schedule};
use taskloom_kernel::error::CoreError;
use uuid::Uuid;

/// Optional filters for [`JobStore::list_jobs`]; `None` means "no filter on
/// this field".
#[derive(Debug, Clone, Default)]
pub struct JobFilter {
    pub status: Option<JobStatus>,
    pub agent_name: Option<String>,
    pub schedule_id: Option<Uuid>,
}

/// Fields an [`JobStore::update_job_status`] call may set alongside the new
/// status. `result`/`error` are mutually exclusive in practice but the
/// adapter does not enforce that — last-writer-wins, per SPEC_FULL.md §4.5.
#[derive(Debug, Clone, Default)]
pub struct JobStatusUpdate {
    pub result: Option<String>,
    pub error: Option<String>,
}

/// Jobs: create, point lookups, listing, status transitions, delete.
/// Per-user access filters are the adapter's responsibility — `user_id:
/// None` means an internal caller (the pipeline itself) that already knows
/// it owns the row; `Some(id)` enforces ownership for external callers.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn create_job(&self, job: Job) -> Result<Job, CoreError>;

    async fn get_job(&self, id: Uuid, user_id: Option<&str>) -> Result<Option<Job>, CoreError>;

    async fn list_jobs(
        &self,
        user_id: &str,
        limit: i64,
        offset: i64,
        filter: &JobFilter,
    ) -> Result<Vec<Job>, CoreError>;

    async fn update_job_status(
        &self,
        id: Uuid,
        status: JobStatus,
        update: JobStatusUpdate,
    ) -> Result<(), CoreError>;

    async fn delete_job(&self, id: Uuid, user_id: Option<&str>) -> Result<bool, CoreError>;
}

/// Schedules: CRUD plus the specialized sweep query and the single
/// conditional claim update that makes concurrent scheduler instances safe.
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    async fn create_schedule(&self, schedule: Schedule) -> Result<Schedule, CoreError>;

    async fn get_schedule(&self, id: Uuid, user_id: Option<&str>) -> Result<Option<Schedule>, CoreError>;

    async fn list_schedules(&self, user_id: &str) -> Result<Vec<Schedule>, CoreError>;

    /// Replaces the full row. Callers read-modify-write via `get_schedule`
    /// first; this adapter layer does not expose partial-field patching.
    async fn update_schedule(&self, schedule: Schedule) -> Result<Schedule, CoreError>;

    /// Deletes the schedule and cascades to its jobs, per the ownership
    /// invariant in SPEC_FULL.md §3.2.
    async fn delete_schedule(&self, id: Uuid, user_id: Option<&str>) -> Result<bool, CoreError>;

    /// Returns enabled schedules whose `next_run` is non-null and at or
    /// before `horizon`, per SPEC_FULL.md §4.4.1.
    async fn select_due_schedules(&self, horizon: DateTime<Utc>) -> Result<Vec<Schedule>, CoreError>;

    /// The sole optimistic-concurrency operation in the adapter: atomically
    /// sets `last_run`/`next_run`/`updated_at` only if the stored `next_run`
    /// still equals `expected_next_run`. Returns `true` iff the row was
    /// updated — `false` means another scheduler instance already claimed
    /// this firing (SPEC_FULL.md §4.4.2).
    async fn claim_schedule(
        &self,
        id: Uuid,
        expected_next_run: DateTime<Utc>,
        new_last_run: DateTime<Utc>,
        new_next_run: DateTime<Utc>,
    ) -> Result<bool, CoreError>;

    /// Disables a schedule and clears `next_run`, used when cron/timezone
    /// evaluation fails (SPEC_FULL.md §4.4.2 step 2).
    async fn disable_schedule(&self, id: Uuid) -> Result<(), CoreError>;

    /// Bumps `successful_executions` or `failed_executions` on the schedule
    /// that emitted a job once that job reaches a terminal status. A no-op
    /// if the schedule has since been deleted.
    async fn record_schedule_execution(&self, id: Uuid, success: bool) -> Result<(), CoreError>;
}

/// The combined adapter surface both the pipeline and scheduler crates
/// depend on, bundled as one trait so `AppContext` can hold a single
/// `Arc<dyn Store>`.
pub trait Store: JobStore + ScheduleStore {}
impl<T: JobStore + ScheduleStore> Store for T {}
