//! SQL-backed [`JobStore`]/[`ScheduleStore`] implementation on
//! `sqlx::Any`, usable against SQLite (tests, single-node) and Postgres
//! (multi-node deployments sharing one store), per SPEC_FULL.md §4.5.1.
//!
//! Timestamps are stored as RFC 3339 text and JSON payloads as serialized
//! text rather than driver-native `TIMESTAMPTZ`/`JSONB` columns, so the
//! same schema and queries work unmodified against either backend through
//! `sqlx::Any`'s portable type set.

use crate::traits::{JobFilter, JobStatusUpdate, JobStore, ScheduleStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::any::{install_default_drivers, AnyPoolOptions, AnyRow};
use sqlx::{AnyPool, Row};
use taskloom_kernel::domain::{Job, JobOrigin, JobStatus, Schedule};
use taskloom_kernel::error::CoreError;
use uuid::Uuid;

const CREATE_JOBS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS jobs (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    agent_name TEXT NOT NULL,
    payload TEXT NOT NULL,
    status TEXT NOT NULL,
    priority INTEGER NOT NULL,
    origin_kind TEXT NOT NULL,
    schedule_id TEXT,
    max_retries INTEGER NOT NULL,
    retry_count INTEGER NOT NULL,
    result TEXT,
    error TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    completed_at TEXT,
    failed_at TEXT
)"#;

const CREATE_JOBS_USER_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_jobs_user_created ON jobs (user_id, created_at DESC)";
const CREATE_JOBS_SCHEDULE_INDEX: &str = "CREATE INDEX IF NOT EXISTS idx_jobs_schedule ON jobs (schedule_id)";

const CREATE_SCHEDULES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS schedules (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    cron_expression TEXT NOT NULL,
    timezone TEXT,
    enabled INTEGER NOT NULL,
    agent_name TEXT NOT NULL,
    payload_template TEXT NOT NULL,
    priority INTEGER NOT NULL,
    max_retries INTEGER NOT NULL,
    next_run TEXT,
    last_run TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    total_executions INTEGER NOT NULL,
    successful_executions INTEGER NOT NULL,
    failed_executions INTEGER NOT NULL
)"#;

const CREATE_SCHEDULES_DUE_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_schedules_enabled_next_run ON schedules (enabled, next_run)";

/// A `sqlx::Any`-backed store. Connects lazily via [`SqlStore::connect`],
/// which also runs the idempotent `CREATE TABLE IF NOT EXISTS` migrations
/// described in SPEC_FULL.md §4.5.1.
pub struct SqlStore {
    pool: AnyPool,
}

impl SqlStore {
    /// Connects to `database_url` (`sqlite::memory:`, `sqlite://path`, or
    /// `postgres://...`) and runs migrations.
    pub async fn connect(database_url: &str) -> Result<Self, CoreError> {
        install_default_drivers();
        // An in-memory SQLite database lives on a single connection; handing
        // out a second pooled connection would open an unrelated empty
        // database. Cap the pool at one connection in that case only.
        let max_connections = if database_url.contains(":memory:") { 1 } else { 10 };
        let pool = AnyPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| CoreError::Store(format!("connect: {e}")))?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<(), CoreError> {
        for statement in [
            CREATE_JOBS_TABLE,
            CREATE_JOBS_USER_INDEX,
            CREATE_JOBS_SCHEDULE_INDEX,
            CREATE_SCHEDULES_TABLE,
            CREATE_SCHEDULES_DUE_INDEX,
        ] {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| CoreError::Store(format!("migrate: {e}")))?;
        }
        Ok(())
    }
}

fn fmt_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339()
}

fn parse_ts(raw: &str) -> Result<DateTime<Utc>, CoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| CoreError::Store(format!("malformed timestamp {raw:?}: {e}")))
}

fn parse_ts_opt(raw: Option<String>) -> Result<Option<DateTime<Utc>>, CoreError> {
    raw.map(|s| parse_ts(&s)).transpose()
}

fn status_to_str(status: JobStatus) -> &'static str {
    match status {
        JobStatus::Pending => "pending",
        JobStatus::Running => "running",
        JobStatus::Completed => "completed",
        JobStatus::Failed => "failed",
    }
}

fn status_from_str(raw: &str) -> Result<JobStatus, CoreError> {
    match raw {
        "pending" => Ok(JobStatus::Pending),
        "running" => Ok(JobStatus::Running),
        "completed" => Ok(JobStatus::Completed),
        "failed" => Ok(JobStatus::Failed),
        other => Err(CoreError::Store(format!("unknown job status {other:?}"))),
    }
}

fn job_from_row(row: AnyRow) -> Result<Job, CoreError> {
    let id: String = row.try_get("id").map_err(store_err)?;
    let origin_kind: String = row.try_get("origin_kind").map_err(store_err)?;
    let schedule_id: Option<String> = row.try_get("schedule_id").map_err(store_err)?;
    let origin = match origin_kind.as_str() {
        "manual" => JobOrigin::Manual,
        "scheduled" => {
            let schedule_id = schedule_id
                .ok_or_else(|| CoreError::Store("scheduled job missing schedule_id".to_string()))?;
            JobOrigin::Scheduled(parse_uuid(&schedule_id)?)
        }
        other => return Err(CoreError::Store(format!("unknown job origin {other:?}"))),
    };
    let payload_raw: String = row.try_get("payload").map_err(store_err)?;
    let status_raw: String = row.try_get("status").map_err(store_err)?;
    let created_at: String = row.try_get("created_at").map_err(store_err)?;
    let updated_at: String = row.try_get("updated_at").map_err(store_err)?;

    Ok(Job {
        id: parse_uuid(&id)?,
        user_id: row.try_get("user_id").map_err(store_err)?,
        agent_name: row.try_get("agent_name").map_err(store_err)?,
        payload: serde_json::from_str(&payload_raw)
            .map_err(|e| CoreError::Store(format!("malformed payload json: {e}")))?,
        status: status_from_str(&status_raw)?,
        priority: row.try_get::<i64, _>("priority").map_err(store_err)? as i32,
        origin,
        max_retries: row.try_get::<i64, _>("max_retries").map_err(store_err)? as u32,
        retry_count: row.try_get::<i64, _>("retry_count").map_err(store_err)? as u32,
        result: row.try_get("result").map_err(store_err)?,
        error: row.try_get("error").map_err(store_err)?,
        created_at: parse_ts(&created_at)?,
        updated_at: parse_ts(&updated_at)?,
        completed_at: parse_ts_opt(row.try_get("completed_at").map_err(store_err)?)?,
        failed_at: parse_ts_opt(row.try_get("failed_at").map_err(store_err)?)?,
    })
}

fn schedule_from_row(row: AnyRow) -> Result<Schedule, CoreError> {
    let id: String = row.try_get("id").map_err(store_err)?;
    let payload_raw: String = row.try_get("payload_template").map_err(store_err)?;
    let created_at: String = row.try_get("created_at").map_err(store_err)?;
    let updated_at: String = row.try_get("updated_at").map_err(store_err)?;
    Ok(Schedule {
        id: parse_uuid(&id)?,
        user_id: row.try_get("user_id").map_err(store_err)?,
        cron_expression: row.try_get("cron_expression").map_err(store_err)?,
        timezone: row.try_get("timezone").map_err(store_err)?,
        enabled: row.try_get::<i64, _>("enabled").map_err(store_err)? != 0,
        agent_name: row.try_get("agent_name").map_err(store_err)?,
        payload_template: serde_json::from_str(&payload_raw)
            .map_err(|e| CoreError::Store(format!("malformed agent_config json: {e}")))?,
        priority: row.try_get::<i64, _>("priority").map_err(store_err)? as i32,
        max_retries: row.try_get::<i64, _>("max_retries").map_err(store_err)? as u32,
        next_run: parse_ts_opt(row.try_get("next_run").map_err(store_err)?)?,
        last_run: parse_ts_opt(row.try_get("last_run").map_err(store_err)?)?,
        created_at: parse_ts(&created_at)?,
        updated_at: parse_ts(&updated_at)?,
        total_executions: row.try_get::<i64, _>("total_executions").map_err(store_err)? as u64,
        successful_executions: row.try_get::<i64, _>("successful_executions").map_err(store_err)? as u64,
        failed_executions: row.try_get::<i64, _>("failed_executions").map_err(store_err)? as u64,
    })
}

fn parse_uuid(raw: &str) -> Result<Uuid, CoreError> {
    Uuid::parse_str(raw).map_err(|e| CoreError::Store(format!("malformed uuid {raw:?}: {e}")))
}

fn store_err(e: sqlx::Error) -> CoreError {
    CoreError::Store(e.to_string())
}

#[async_trait]
impl JobStore for SqlStore {
    async fn create_job(&self, job: Job) -> Result<Job, CoreError> {
        let (origin_kind, schedule_id) = match &job.origin {
            JobOrigin::Manual => ("manual", None),
            JobOrigin::Scheduled(id) => ("scheduled", Some(id.to_string())),
        };
        sqlx::query(
            "INSERT INTO jobs (id, user_id, agent_name, payload, status, priority, origin_kind, \
             schedule_id, max_retries, retry_count, result, error, created_at, updated_at, \
             completed_at, failed_at) VALUES (?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?)",
        )
        .bind(job.id.to_string())
        .bind(&job.user_id)
        .bind(&job.agent_name)
        .bind(job.payload.to_string())
        .bind(status_to_str(job.status))
        .bind(job.priority as i64)
        .bind(origin_kind)
        .bind(schedule_id)
        .bind(job.max_retries as i64)
        .bind(job.retry_count as i64)
        .bind(job.result.clone())
        .bind(job.error.clone())
        .bind(fmt_ts(job.created_at))
        .bind(fmt_ts(job.updated_at))
        .bind(job.completed_at.map(fmt_ts))
        .bind(job.failed_at.map(fmt_ts))
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(job)
    }

    async fn get_job(&self, id: Uuid, user_id: Option<&str>) -> Result<Option<Job>, CoreError> {
        let row = sqlx::query("SELECT * FROM jobs WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;
        let Some(row) = row else { return Ok(None) };
        let job = job_from_row(row)?;
        if let Some(user_id) = user_id {
            if job.user_id != user_id {
                return Err(CoreError::AccessDenied);
            }
        }
        Ok(Some(job))
    }

    async fn list_jobs(
        &self,
        user_id: &str,
        limit: i64,
        offset: i64,
        filter: &JobFilter,
    ) -> Result<Vec<Job>, CoreError> {
        let mut sql = "SELECT * FROM jobs WHERE user_id = ?".to_string();
        if filter.status.is_some() {
            sql.push_str(" AND status = ?");
        }
        if filter.agent_name.is_some() {
            sql.push_str(" AND agent_name = ?");
        }
        if filter.schedule_id.is_some() {
            sql.push_str(" AND schedule_id = ?");
        }
        sql.push_str(" ORDER BY created_at DESC LIMIT ? OFFSET ?");

        let mut query = sqlx::query(&sql).bind(user_id);
        if let Some(status) = filter.status {
            query = query.bind(status_to_str(status));
        }
        if let Some(agent_name) = &filter.agent_name {
            query = query.bind(agent_name.clone());
        }
        if let Some(schedule_id) = filter.schedule_id {
            query = query.bind(schedule_id.to_string());
        }
        let rows = query
            .bind(limit.max(0))
            .bind(offset.max(0))
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)?;
        rows.into_iter().map(job_from_row).collect()
    }

    async fn update_job_status(
        &self,
        id: Uuid,
        status: JobStatus,
        update: JobStatusUpdate,
    ) -> Result<(), CoreError> {
        let now = Utc::now();
        let completed_at = matches!(status, JobStatus::Completed).then(|| fmt_ts(now));
        let failed_at = matches!(status, JobStatus::Failed).then(|| fmt_ts(now));
        sqlx::query(
            "UPDATE jobs SET status = ?, updated_at = ?, \
             result = COALESCE(?, result), error = COALESCE(?, error), \
             completed_at = COALESCE(?, completed_at), failed_at = COALESCE(?, failed_at) \
             WHERE id = ?",
        )
        .bind(status_to_str(status))
        .bind(fmt_ts(now))
        .bind(update.result)
        .bind(update.error)
        .bind(completed_at)
        .bind(failed_at)
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(())
    }

    async fn delete_job(&self, id: Uuid, user_id: Option<&str>) -> Result<bool, CoreError> {
        if let Some(user_id) = user_id {
            let existing = self.get_job(id, None).await?;
            match existing {
                Some(job) if job.user_id != user_id => return Err(CoreError::AccessDenied),
                None => return Ok(false),
                _ => {}
            }
        }
        let result = sqlx::query("DELETE FROM jobs WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ScheduleStore for SqlStore {
    async fn create_schedule(&self, schedule: Schedule) -> Result<Schedule, CoreError> {
        sqlx::query(
            "INSERT INTO schedules (id, user_id, cron_expression, timezone, enabled, agent_name, \
             payload_template, priority, max_retries, next_run, last_run, created_at, updated_at, \
             total_executions, successful_executions, failed_executions) \
             VALUES (?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?)",
        )
        .bind(schedule.id.to_string())
        .bind(&schedule.user_id)
        .bind(&schedule.cron_expression)
        .bind(schedule.timezone.clone())
        .bind(schedule.enabled as i64)
        .bind(&schedule.agent_name)
        .bind(schedule.payload_template.to_string())
        .bind(schedule.priority as i64)
        .bind(schedule.max_retries as i64)
        .bind(schedule.next_run.map(fmt_ts))
        .bind(schedule.last_run.map(fmt_ts))
        .bind(fmt_ts(schedule.created_at))
        .bind(fmt_ts(schedule.updated_at))
        .bind(schedule.total_executions as i64)
        .bind(schedule.successful_executions as i64)
        .bind(schedule.failed_executions as i64)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(schedule)
    }

    async fn get_schedule(&self, id: Uuid, user_id: Option<&str>) -> Result<Option<Schedule>, CoreError> {
        let row = sqlx::query("SELECT * FROM schedules WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;
        let Some(row) = row else { return Ok(None) };
        let schedule = schedule_from_row(row)?;
        if let Some(user_id) = user_id {
            if schedule.user_id != user_id {
                return Err(CoreError::AccessDenied);
            }
        }
        Ok(Some(schedule))
    }

    async fn list_schedules(&self, user_id: &str) -> Result<Vec<Schedule>, CoreError> {
        let rows = sqlx::query("SELECT * FROM schedules WHERE user_id = ? ORDER BY created_at")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)?;
        rows.into_iter().map(schedule_from_row).collect()
    }

    async fn update_schedule(&self, schedule: Schedule) -> Result<Schedule, CoreError> {
        let result = sqlx::query(
            "UPDATE schedules SET cron_expression = ?, timezone = ?, enabled = ?, agent_name = ?, \
             payload_template = ?, priority = ?, max_retries = ?, next_run = ?, last_run = ?, \
             updated_at = ?, total_executions = ?, successful_executions = ?, failed_executions = ? \
             WHERE id = ?",
        )
        .bind(&schedule.cron_expression)
        .bind(schedule.timezone.clone())
        .bind(schedule.enabled as i64)
        .bind(&schedule.agent_name)
        .bind(schedule.payload_template.to_string())
        .bind(schedule.priority as i64)
        .bind(schedule.max_retries as i64)
        .bind(schedule.next_run.map(fmt_ts))
        .bind(schedule.last_run.map(fmt_ts))
        .bind(fmt_ts(Utc::now()))
        .bind(schedule.total_executions as i64)
        .bind(schedule.successful_executions as i64)
        .bind(schedule.failed_executions as i64)
        .bind(schedule.id.to_string())
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(schedule.id.to_string()));
        }
        self.get_schedule(schedule.id, None)
            .await?
            .ok_or_else(|| CoreError::NotFound(schedule.id.to_string()))
    }

    async fn delete_schedule(&self, id: Uuid, user_id: Option<&str>) -> Result<bool, CoreError> {
        if let Some(user_id) = user_id {
            match self.get_schedule(id, None).await? {
                Some(schedule) if schedule.user_id != user_id => return Err(CoreError::AccessDenied),
                None => return Ok(false),
                _ => {}
            }
        }
        sqlx::query("DELETE FROM jobs WHERE schedule_id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        let result = sqlx::query("DELETE FROM schedules WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(result.rows_affected() > 0)
    }

    async fn select_due_schedules(&self, horizon: DateTime<Utc>) -> Result<Vec<Schedule>, CoreError> {
        let rows = sqlx::query(
            "SELECT * FROM schedules WHERE enabled = 1 AND next_run IS NOT NULL AND next_run <= ? \
             ORDER BY next_run",
        )
        .bind(fmt_ts(horizon))
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;
        rows.into_iter().map(schedule_from_row).collect()
    }

    async fn claim_schedule(
        &self,
        id: Uuid,
        expected_next_run: DateTime<Utc>,
        new_last_run: DateTime<Utc>,
        new_next_run: DateTime<Utc>,
    ) -> Result<bool, CoreError> {
        let result = sqlx::query(
            "UPDATE schedules SET last_run = ?, next_run = ?, updated_at = ?, \
             total_executions = total_executions + 1 \
             WHERE id = ? AND next_run = ?",
        )
        .bind(fmt_ts(new_last_run))
        .bind(fmt_ts(new_next_run))
        .bind(fmt_ts(new_last_run))
        .bind(id.to_string())
        .bind(fmt_ts(expected_next_run))
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(result.rows_affected() > 0)
    }

    async fn record_schedule_execution(&self, id: Uuid, success: bool) -> Result<(), CoreError> {
        let column = if success { "successful_executions" } else { "failed_executions" };
        let sql = format!("UPDATE schedules SET {column} = {column} + 1, updated_at = ? WHERE id = ?");
        sqlx::query(&sql)
            .bind(fmt_ts(Utc::now()))
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn disable_schedule(&self, id: Uuid) -> Result<(), CoreError> {
        sqlx::query("UPDATE schedules SET enabled = 0, next_run = NULL, updated_at = ? WHERE id = ?")
            .bind(fmt_ts(Utc::now()))
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskloom_kernel::domain::{DEFAULT_MAX_RETRIES, DEFAULT_PRIORITY};

    async fn sqlite_store() -> SqlStore {
        SqlStore::connect("sqlite::memory:").await.unwrap()
    }

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
    async fn create_and_fetch_job_round_trips() {
        let store = sqlite_store().await;
        let job = store.create_job(sample_job("alice")).await.unwrap();
        let fetched = store.get_job(job.id, Some("alice")).await.unwrap().unwrap();
        assert_eq!(fetched.id, job.id);
        assert_eq!(fetched.payload, serde_json::json!({"text": "hi"}));
    }

    #[tokio::test]
    async fn cross_user_get_is_denied() {
        let store = sqlite_store().await;
        let job = store.create_job(sample_job("alice")).await.unwrap();
        let err = store.get_job(job.id, Some("bob")).await.unwrap_err();
        assert!(matches!(err, CoreError::AccessDenied));
    }

    #[tokio::test]
    async fn update_job_status_sets_timestamps_and_preserves_previous_result() {
        let store = sqlite_store().await;
        let job = store.create_job(sample_job("alice")).await.unwrap();
        store
            .update_job_status(job.id, JobStatus::Running, JobStatusUpdate::default())
            .await
            .unwrap();
        store
            .update_job_status(
                job.id,
                JobStatus::Completed,
                JobStatusUpdate {
                    result: Some("42".into()),
                    error: None,
                },
            )
            .await
            .unwrap();
        let fetched = store.get_job(job.id, None).await.unwrap().unwrap();
        assert_eq!(fetched.status, JobStatus::Completed);
        assert_eq!(fetched.result.as_deref(), Some("42"));
        assert!(fetched.completed_at.is_some());
    }

    #[tokio::test]
    async fn claim_schedule_race_only_one_winner() {
        use std::sync::Arc;

        let store = Arc::new(sqlite_store().await);
        let now = Utc::now();
        let schedule_id = Uuid::new_v4();
        let schedule = Schedule {
            id: schedule_id,
            user_id: "alice".to_string(),
            cron_expression: "* * * * *".to_string(),
            timezone: None,
            enabled: true,
            agent_name: "echo".to_string(),
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
        store.create_schedule(schedule).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..5 {
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
        let store = sqlite_store().await;
        let now = Utc::now();
        let schedule_id = Uuid::new_v4();
        let schedule = Schedule {
            id: schedule_id,
            user_id: "alice".to_string(),
            cron_expression: "* * * * *".to_string(),
            timezone: None,
            enabled: true,
            agent_name: "echo".to_string(),
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
        store.create_schedule(schedule).await.unwrap();

        store.record_schedule_execution(schedule_id, true).await.unwrap();
        store.record_schedule_execution(schedule_id, true).await.unwrap();
        store.record_schedule_execution(schedule_id, false).await.unwrap();

        let updated = store.get_schedule(schedule_id, None).await.unwrap().unwrap();
        assert_eq!(updated.successful_executions, 2);
        assert_eq!(updated.failed_executions, 1);
    }

    #[tokio::test]
    async fn record_schedule_execution_on_missing_schedule_is_a_no_op() {
        let store = sqlite_store().await;
        store.record_schedule_execution(Uuid::new_v4(), true).await.unwrap();
    }

    #[tokio::test]
    async fn delete_schedule_cascades_jobs() {
        let store = sqlite_store().await;
        let now = Utc::now();
        let schedule_id = Uuid::new_v4();
        let schedule = Schedule {
            id: schedule_id,
            user_id: "alice".to_string(),
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
        };
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
}
