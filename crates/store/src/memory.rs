//! A plain lock-guarded in-memory backend. Used by pipeline/scheduler unit
//! tests that don't need genuine SQL row-level semantics — see
//! SPEC_FULL.md §4.5.1 and §8.4 for why the claim-race property still
//! needs the SQL backend.

use crate::traits::{JobFilter, JobStatusUpdate, JobStore, ScheduleStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use taskloom_kernel::domain::{Job, JobStatus, Schedule};
use taskloom_kernel::error::CoreError;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    jobs: HashMap<Uuid, Job>,
    schedules: HashMap<Uuid, Schedule>,
}

/// In-memory [`JobStore`] + [`ScheduleStore`] backed by a single
/// [`std::sync::Mutex`]. Cheap enough for tests that run thousands of
/// operations without needing to await a lock, and simple enough that
/// there's no doubt about what it does.
#[derive(Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Tables> {
        self.tables.lock().expect("in-memory store mutex poisoned")
    }
}

fn check_owner(job_or_schedule_user: &str, requested: Option<&str>) -> Result<(), CoreError> {
    match requested {
        Some(user_id) if user_id != job_or_schedule_user => Err(CoreError::AccessDenied),
        _ => Ok(()),
    }
}

#[async_trait]
impl JobStore for InMemoryStore {
    async fn create_job(&self, job: Job) -> Result<Job, CoreError> {
        let mut tables = self.lock();
        tables.jobs.insert(job.id, job.clone());
        Ok(job)
    }

    async fn get_job(&self, id: Uuid, user_id: Option<&str>) -> Result<Option<Job>, CoreError> {
        let tables = self.lock();
        match tables.jobs.get(&id) {
            Some(job) => {
                check_owner(&job.user_id, user_id)?;
                Ok(Some(job.clone()))
            }
            None => Ok(None),
        }
    }

    async fn list_jobs(
        &self,
        user_id: &str,
        limit: i64,
        offset: i64,
        filter: &JobFilter,
    ) -> Result<Vec<Job>, CoreError> {
        let tables = self.lock();
        let mut jobs: Vec<Job> = tables
            .jobs
            .values()
            .filter(|j| j.user_id == user_id)
            .filter(|j| filter.status.is_none_or(|s| j.status == s))
            .filter(|j| filter.agent_name.as_deref().is_none_or(|n| j.agent_name == n))
            .filter(|j| filter.schedule_id.is_none_or(|id| j.origin.schedule_id() == Some(id)))
            .cloned()
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let offset = offset.max(0) as usize;
        let limit = limit.max(0) as usize;
        Ok(jobs.into_iter().skip(offset).take(limit).collect())
    }

    async fn update_job_status(
        &self,
        id: Uuid,
        status: JobStatus,
        update: JobStatusUpdate,
    ) -> Result<(), CoreError> {
        let mut tables = self.lock();
        let job = tables
            .jobs
            .get_mut(&id)
            .ok_or_else(|| CoreError::NotFound(id.to_string()))?;
        let now = Utc::now();
        job.status = status;
        job.updated_at = now;
        if let Some(result) = update.result {
            job.result = Some(result);
        }
        if let Some(error) = update.error {
            job.error = Some(error);
        }
        match status {
            JobStatus::Completed => job.completed_at = Some(now),
            JobStatus::Failed => job.failed_at = Some(now),
            JobStatus::Pending | JobStatus::Running => {}
        }
        Ok(())
    }

    async fn delete_job(&self, id: Uuid, user_id: Option<&str>) -> Result<bool, CoreError> {
        let mut tables = self.lock();
        if let Some(job) = tables.jobs.get(&id) {
            check_owner(&job.user_id, user_id)?;
        } else {
            return Ok(false);
        }
        Ok(tables.jobs.remove(&id).is_some())
    }
}

#[async_trait]
impl ScheduleStore for InMemoryStore {
    async fn create_schedule(&self, schedule: Schedule) -> Result<Schedule, CoreError> {
        let mut tables = self.lock();
        tables.schedules.insert(schedule.id, schedule.clone());
        Ok(schedule)
    }

    async fn get_schedule(&self, id: Uuid, user_id: Option<&str>) -> Result<Option<Schedule>, CoreError> {
        let tables = self.lock();
        match tables.schedules.get(&id) {
            Some(schedule) => {
                check_owner(&schedule.user_id, user_id)?;
                Ok(Some(schedule.clone()))
            }
            None => Ok(None),
        }
    }

    async fn list_schedules(&self, user_id: &str) -> Result<Vec<Schedule>, CoreError> {
        let tables = self.lock();
        let mut schedules: Vec<Schedule> = tables
            .schedules
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        schedules.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(schedules)
    }

    async fn update_schedule(&self, schedule: Schedule) -> Result<Schedule, CoreError> {
        let mut tables = self.lock();
        if !tables.schedules.contains_key(&schedule.id) {
            return Err(CoreError::NotFound(schedule.id.to_string()));
        }
        tables.schedules.insert(schedule.id, schedule.clone());
        Ok(schedule)
    }

    async fn delete_schedule(&self, id: Uuid, user_id: Option<&str>) -> Result<bool, CoreError> {
        let mut tables = self.lock();
        if let Some(schedule) = tables.schedules.get(&id) {
            check_owner(&schedule.user_id, user_id)?;
        } else {
            return Ok(false);
        }
        tables.schedules.remove(&id);
        tables.jobs.retain(|_, job| job.origin.schedule_id() != Some(id));
        Ok(true)
    }

    async fn select_due_schedules(&self, horizon: DateTime<Utc>) -> Result<Vec<Schedule>, CoreError> {
        let tables = self.lock();
        let mut due: Vec<Schedule> = tables
            .schedules
            .values()
            .filter(|s| s.enabled)
            .filter(|s| s.next_run.is_some_and(|next_run| next_run <= horizon))
            .cloned()
            .collect();
        due.sort_by_key(|s| s.next_run);
        Ok(due)
    }

    async fn claim_schedule(
        &self,
        id: Uuid,
        expected_next_run: DateTime<Utc>,
        new_last_run: DateTime<Utc>,
        new_next_run: DateTime<Utc>,
    ) -> Result<bool, CoreError> {
        let mut tables = self.lock();
        let Some(schedule) = tables.schedules.get_mut(&id) else {
            return Ok(false);
        };
        if schedule.next_run != Some(expected_next_run) {
            return Ok(false);
        }
        schedule.last_run = Some(new_last_run);
        schedule.next_run = Some(new_next_run);
        schedule.updated_at = new_last_run;
        schedule.total_executions += 1;
        Ok(true)
    }

    async fn record_schedule_execution(&self, id: Uuid, success: bool) -> Result<(), CoreError> {
        let mut tables = self.lock();
        let Some(schedule) = tables.schedules.get_mut(&id) else {
            return Ok(());
        };
        if success {
            schedule.successful_executions += 1;
        } else {
            schedule.failed_executions += 1;
        }
        schedule.updated_at = Utc::now();
        Ok(())
    }

    async fn disable_schedule(&self, id: Uuid) -> Result<(), CoreError> {
        let mut tables = self.lock();
        let schedule = tables
            .schedules
            .get_mut(&id)
            .ok_or_else(|| CoreError::NotFound(id.to_string()))?;
        schedule.enabled = false;
        schedule.next_run = None;
        schedule.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskloom_kernel::domain::{JobOrigin, DEFAULT_MAX_RETRIES, DEFAULT_PRIORITY};

    fn sample_job(user_id: &str) -> Job {
        Job::new(
            user_id,
            "echo",
            serde_json::json!({"text": "hi"}),
            DEFAULT_PRIORITY,
            DEFAULT_MAX_RETRIES,
            JobOrigin::Manual,
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn cross_user_get_is_denied() {
        let store = InMemoryStore::new();
        let job = store.create_job(sample_job("alice")).await.unwrap();
        let err = store.get_job(job.id, Some("bob")).await.unwrap_err();
        assert!(matches!(err, CoreError::AccessDenied));
    }

    #[tokio::test]
    async fn owner_get_succeeds() {
        let store = InMemoryStore::new();
        let job = store.create_job(sample_job("alice")).await.unwrap();
        let fetched = store.get_job(job.id, Some("alice")).await.unwrap();
        assert!(fetched.is_some());
    }

    #[tokio::test]
    async fn update_status_sets_completed_at() {
        let store = InMemoryStore::new();
        let job = store.create_job(sample_job("alice")).await.unwrap();
        store
            .update_job_status(
                job.id,
                JobStatus::Completed,
                JobStatusUpdate {
                    result: Some("done".into()),
                    error: None,
                },
            )
            .await
            .unwrap();
        let fetched = store.get_job(job.id, None).await.unwrap().unwrap();
        assert_eq!(fetched.status, JobStatus::Completed);
        assert!(fetched.completed_at.is_some());
        assert_eq!(fetched.result.as_deref(), Some("done"));
    }

    #[tokio::test]
    async fn deleting_schedule_cascades_to_its_jobs() {
        let store = InMemoryStore::new();
        let schedule_id = Uuid::new_v4();
        let mut schedule = sample_schedule("alice", schedule_id);
        schedule.enabled = true;
        store.create_schedule(schedule).await.unwrap();

        let mut job = sample_job("alice");
        job.origin = JobOrigin::Scheduled(schedule_id);
        store.create_job(job).await.unwrap();

        store.delete_schedule(schedule_id, Some("alice")).await.unwrap();

        let filter = JobFilter {
            schedule_id: Some(schedule_id),
            ..Default::default()
        };
        let remaining = store.list_jobs("alice", 100, 0, &filter).await.unwrap();
        assert!(remaining.is_empty());
    }

    #[tokio::test]
    async fn claim_schedule_fails_on_stale_next_run() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        let schedule_id = Uuid::new_v4();
        let mut schedule = sample_schedule("alice", schedule_id);
        schedule.next_run = Some(now);
        store.create_schedule(schedule).await.unwrap();

        let stale = now - chrono::Duration::seconds(1);
        let claimed = store
            .claim_schedule(schedule_id, stale, now, now + chrono::Duration::minutes(1))
            .await
            .unwrap();
        assert!(!claimed);
    }

    #[tokio::test]
    async fn concurrent_claims_only_one_succeeds() {
        use std::sync::Arc;

        let store = Arc::new(InMemoryStore::new());
        let now = Utc::now();
        let schedule_id = Uuid::new_v4();
        let mut schedule = sample_schedule("alice", schedule_id);
        schedule.next_run = Some(now);
        store.create_schedule(schedule).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .claim_schedule(schedule_id, now, now, now + chrono::Duration::minutes(1))
                    .await
                    .unwrap()
            }));
        }
        let mut successes = 0;
        for h in handles {
            if h.await.unwrap() {
                successes += 1;
            }
        }
        assert_eq!(successes, 1);
    }

    #[tokio::test]
    async fn record_schedule_execution_increments_the_matching_counter() {
        let store = InMemoryStore::new();
        let schedule_id = Uuid::new_v4();
        store.create_schedule(sample_schedule("alice", schedule_id)).await.unwrap();

        store.record_schedule_execution(schedule_id, true).await.unwrap();
        store.record_schedule_execution(schedule_id, true).await.unwrap();
        store.record_schedule_execution(schedule_id, false).await.unwrap();

        let updated = store.get_schedule(schedule_id, None).await.unwrap().unwrap();
        assert_eq!(updated.successful_executions, 2);
        assert_eq!(updated.failed_executions, 1);
    }

    #[tokio::test]
    async fn record_schedule_execution_on_missing_schedule_is_a_no_op() {
        let store = InMemoryStore::new();
        store.record_schedule_execution(Uuid::new_v4(), true).await.unwrap();
    }

    fn sample_schedule(user_id: &str, id: Uuid) -> Schedule {
        let now = Utc::now();
        Schedule {
            id,
            user_id: user_id.to_string(),
            cron_expression: "* * * * *".to_string(),
            timezone: None,
            enabled: false,
            agent_name: "echo".to_string(),
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
        }
    }
}
