//! Domain entities shared across the pipeline, scheduler, store, and
//! agent-runtime crates: [`Job`], [`Schedule`], and the transient
//! [`JobTask`] that the pipeline actually carries through its queues.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of a [`Job`]. Transitions form the DAG
/// `Pending -> Running -> {Completed, Failed}`. `Running -> Pending` is never
/// observed externally — a retrying job stays `Running` from the outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// Where a job's submission originated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "schedule_id")]
pub enum JobOrigin {
    Manual,
    Scheduled(Uuid),
}

impl JobOrigin {
    pub fn schedule_id(&self) -> Option<Uuid> {
        match self {
            JobOrigin::Manual => None,
            JobOrigin::Scheduled(id) => Some(*id),
        }
    }
}

/// Default job priority. Higher values are served first; range 0-10.
pub const DEFAULT_PRIORITY: i32 = 5;

/// Default number of retries a job gets before terminal failure.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// One execution attempt of an agent for a user, as persisted by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub user_id: String,
    pub agent_name: String,
    pub payload: serde_json::Value,
    pub status: JobStatus,
    pub priority: i32,
    pub origin: JobOrigin,
    pub max_retries: u32,
    pub retry_count: u32,
    pub result: Option<String>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub failed_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Construct a freshly-submitted job in `Pending` status.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user_id: impl Into<String>,
        agent_name: impl Into<String>,
        payload: serde_json::Value,
        priority: i32,
        max_retries: u32,
        origin: JobOrigin,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            agent_name: agent_name.into(),
            payload,
            status: JobStatus::Pending,
            priority,
            origin,
            max_retries,
            retry_count: 0,
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
            failed_at: None,
        }
    }
}

/// A cron rule that manufactures jobs. `next_run` is the single authoritative
/// timestamp of the next due firing and is `None` exactly when `enabled` is
/// `false`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub id: Uuid,
    pub user_id: String,
    pub cron_expression: String,
    pub timezone: Option<String>,
    pub enabled: bool,
    pub agent_name: String,
    pub payload_template: serde_json::Value,
    pub priority: i32,
    pub max_retries: u32,
    pub next_run: Option<DateTime<Utc>>,
    pub last_run: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub total_executions: u64,
    pub successful_executions: u64,
    pub failed_executions: u64,
}

impl Schedule {
    /// `true` when `enabled = false` implies `next_run = None`, per the data
    /// model invariant in SPEC_FULL.md §3.2.
    pub fn satisfies_enabled_invariant(&self) -> bool {
        self.enabled || self.next_run.is_none()
    }
}

/// Transient in-memory record carried through the pipeline's queues. Never
/// persisted directly — the store only ever sees the corresponding [`Job`]
/// row created at submission time.
#[derive(Debug, Clone)]
pub struct JobTask {
    pub job_id: Uuid,
    pub user_id: String,
    pub agent_name: String,
    pub payload: serde_json::Value,
    pub priority: i32,
    pub max_retries: u32,
    pub retry_count: u32,
    pub created_at: DateTime<Utc>,
    pub scheduled_at: DateTime<Utc>,
    /// The schedule this task was emitted by, if any. Carried through so the
    /// pipeline can feed a terminal outcome back into the originating
    /// schedule's `successful_executions`/`failed_executions` counters
    /// (SPEC_FULL.md §3.1).
    pub schedule_id: Option<Uuid>,
}

impl JobTask {
    /// `true` when this task is ready to run immediately rather than living
    /// in the delayed set.
    pub fn is_ready(&self, now: DateTime<Utc>) -> bool {
        self.scheduled_at <= now
    }

    /// `true` when another retry attempt is permitted.
    pub fn can_retry(&self) -> bool {
        self.retry_count < self.max_retries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_starts_pending_with_no_terminal_timestamps() {
        let now = Utc::now();
        let job = Job::new("u1", "echo", serde_json::json!({"text": "hi"}), 5, 3, JobOrigin::Manual, now);
        assert_eq!(job.status, JobStatus::Pending);
        assert!(job.completed_at.is_none());
        assert!(job.failed_at.is_none());
        assert_eq!(job.retry_count, 0);
    }

    #[test]
    fn disabled_schedule_without_next_run_satisfies_invariant() {
        let now = Utc::now();
        let schedule = Schedule {
            id: Uuid::new_v4(),
            user_id: "u1".into(),
            cron_expression: "* * * * *".into(),
            timezone: None,
            enabled: false,
            agent_name: "echo".into(),
            payload_template: serde_json::json!({}),
            priority: DEFAULT_PRIORITY,
            max_retries: DEFAULT_MAX_RETRIES,
            next_run: None,
            last_run: None,
            created_at: now,
            updated_at: now,
            total_executions: 0,
            successful_executions: 0,
            failed_executions: 0,
        };
        assert!(schedule.satisfies_enabled_invariant());
    }

    #[test]
    fn disabled_schedule_with_next_run_violates_invariant() {
        let now = Utc::now();
        let mut schedule = Schedule {
            id: Uuid::new_v4(),
            user_id: "u1".into(),
            cron_expression: "* * * * *".into(),
            timezone: None,
            enabled: false,
            agent_name: "echo".into(),
            payload_template: serde_json::json!({}),
            priority: DEFAULT_PRIORITY,
            max_retries: DEFAULT_MAX_RETRIES,
            next_run: Some(now),
            last_run: None,
            created_at: now,
            updated_at: now,
            total_executions: 0,
            successful_executions: 0,
            failed_executions: 0,
        };
        assert!(!schedule.satisfies_enabled_invariant());
        schedule.next_run = None;
        assert!(schedule.satisfies_enabled_invariant());
    }

    #[test]
    fn job_task_ready_when_scheduled_at_not_in_future() {
        let now = Utc::now();
        let task = JobTask {
            job_id: Uuid::new_v4(),
            user_id: "u1".into(),
            agent_name: "echo".into(),
            payload: serde_json::json!({}),
            priority: DEFAULT_PRIORITY,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_count: 0,
            created_at: now,
            scheduled_at: now,
            schedule_id: None,
        };
        assert!(task.is_ready(now));
        assert!(task.can_retry());
    }

    #[test]
    fn job_task_exhausted_when_retry_count_reaches_max() {
        let now = Utc::now();
        let task = JobTask {
            job_id: Uuid::new_v4(),
            user_id: "u1".into(),
            agent_name: "echo".into(),
            payload: serde_json::json!({}),
            priority: DEFAULT_PRIORITY,
            max_retries: 2,
            retry_count: 2,
            created_at: now,
            scheduled_at: now,
            schedule_id: None,
        };
        assert!(!task.can_retry());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn task_with(retry_count: u32, max_retries: u32) -> JobTask {
        let now = Utc::now();
        JobTask {
            job_id: Uuid::new_v4(),
            user_id: "u1".into(),
            agent_name: "echo".into(),
            payload: serde_json::json!({}),
            priority: DEFAULT_PRIORITY,
            max_retries,
            retry_count,
            created_at: now,
            scheduled_at: now,
            schedule_id: None,
        }
    }

    proptest! {
        // §8.1: a task can retry iff its count has not yet reached the ceiling,
        // and that boundary never moves once retry_count passes max_retries.
        #[test]
        fn can_retry_matches_the_retry_count_boundary(retry_count in 0u32..100, max_retries in 0u32..100) {
            let task = task_with(retry_count, max_retries);
            prop_assert_eq!(task.can_retry(), retry_count < max_retries);
        }

        // §3.2: a schedule satisfies the enabled invariant in exactly the two
        // shapes the data model allows — enabled with any next_run, or
        // disabled with next_run cleared.
        #[test]
        fn disabled_schedule_satisfies_invariant_iff_next_run_is_cleared(has_next_run in any::<bool>()) {
            let now = Utc::now();
            let schedule = Schedule {
                id: Uuid::new_v4(),
                user_id: "u1".into(),
                cron_expression: "* * * * *".into(),
                timezone: None,
                enabled: false,
                agent_name: "echo".into(),
                payload_template: serde_json::json!({}),
                priority: DEFAULT_PRIORITY,
                max_retries: DEFAULT_MAX_RETRIES,
                next_run: has_next_run.then_some(now),
                last_run: None,
                created_at: now,
                updated_at: now,
                total_executions: 0,
                successful_executions: 0,
                failed_executions: 0,
            };
            prop_assert_eq!(schedule.satisfies_enabled_invariant(), !has_next_run);
        }
    }
}
