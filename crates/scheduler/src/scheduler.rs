//! The sweep loop: a single long-lived task that claims due schedules and
//! emits jobs into the pipeline, per SPEC_FULL.md §4.4.

use crate::cron_expr::next_fire_time;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use taskloom_kernel::clock::Clock;
use taskloom_kernel::domain::{Job, JobOrigin, Schedule};
use taskloom_kernel::error::CoreError;
use taskloom_pipeline::{JobPipeline, ShutdownSignal};
use taskloom_store::Store;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Tunables enumerated in SPEC_FULL.md §6.4.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub check_interval: Duration,
    pub tolerance: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(30),
            tolerance: Duration::from_secs(30),
        }
    }
}

/// Claims due schedules and submits the jobs they emit. Independent of the
/// pipeline's own worker pool — a single sweep task regardless of
/// `max_concurrent_jobs`.
pub struct CronScheduler {
    config: SchedulerConfig,
    store: Arc<dyn Store>,
    pipeline: Arc<JobPipeline>,
    clock: Arc<dyn Clock>,
    shutdown: Arc<ShutdownSignal>,
    started: AtomicBool,
    handle: StdMutex<Option<JoinHandle<()>>>,
}

impl CronScheduler {
    pub fn new(
        config: SchedulerConfig,
        store: Arc<dyn Store>,
        pipeline: Arc<JobPipeline>,
        clock: Arc<dyn Clock>,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            store,
            pipeline,
            clock,
            shutdown: Arc::new(ShutdownSignal::new()),
            started: AtomicBool::new(false),
            handle: StdMutex::new(None),
        })
    }

    /// Spawns the sweep task. A no-op when already running.
    pub fn start(self: &Arc<Self>) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }
        self.shutdown.reset();
        let scheduler = Arc::clone(self);
        let mut handle = self.handle.lock().expect("scheduler handle mutex poisoned");
        *handle = Some(tokio::spawn(async move {
            scheduler.sweep_loop().await;
        }));
    }

    /// Triggers shutdown and waits up to `timeout` for the sweep task to
    /// drain, aborting it otherwise. A no-op when already stopped.
    pub async fn stop(&self, timeout: Duration) {
        if !self.started.swap(false, Ordering::SeqCst) {
            return;
        }
        self.shutdown.trigger();
        let handle = self.handle.lock().expect("scheduler handle mutex poisoned").take();
        let Some(handle) = handle else { return };
        let abort = handle.abort_handle();
        if tokio::time::timeout(timeout, handle).await.is_err() {
            tracing::warn!(?timeout, "scheduler stop timed out; aborting sweep task");
            abort.abort();
        }
    }

    async fn sweep_loop(self: Arc<Self>) {
        loop {
            if self.shutdown.is_set() {
                break;
            }
            if let Err(err) = self.sweep().await {
                tracing::error!(error = %err, "scheduler sweep failed");
            }
            tokio::select! {
                _ = tokio::time::sleep(self.config.check_interval) => {}
                _ = self.shutdown.triggered() => break,
            }
        }
    }

    /// One pass over every due schedule, per SPEC_FULL.md §4.4.1.
    async fn sweep(&self) -> Result<(), CoreError> {
        let now = self.clock.now();
        let horizon = now + chrono::Duration::from_std(self.config.tolerance).unwrap_or(chrono::Duration::zero());
        let due = self.store.select_due_schedules(horizon).await?;
        for schedule in due {
            self.process_due_schedule(schedule, now).await;
        }
        Ok(())
    }

    /// Implements SPEC_FULL.md §4.4.2: re-verify, compute the next firing,
    /// claim, then submit. Every step after the re-verify logs and returns
    /// rather than propagating, since one schedule's failure must never
    /// interrupt the sweep over the rest.
    async fn process_due_schedule(&self, schedule: Schedule, now: DateTime<Utc>) {
        let Some(expected_next_run) = schedule.next_run else {
            return;
        };
        let tolerance = chrono::Duration::from_std(self.config.tolerance).unwrap_or(chrono::Duration::zero());
        if now < expected_next_run - tolerance {
            return;
        }

        let next_fire = match next_fire_time(&schedule.cron_expression, schedule.timezone.as_deref(), now) {
            Ok(fire) => fire,
            Err(err) => {
                tracing::warn!(schedule_id = %schedule.id, error = %err, "disabling schedule: invalid cron expression or timezone");
                if let Err(disable_err) = self.store.disable_schedule(schedule.id).await {
                    tracing::error!(schedule_id = %schedule.id, error = %disable_err, "failed to disable schedule after cron error");
                }
                return;
            }
        };

        let claimed = match self.store.claim_schedule(schedule.id, expected_next_run, now, next_fire).await {
            Ok(claimed) => claimed,
            Err(err) => {
                tracing::error!(schedule_id = %schedule.id, error = %err, "claim_schedule call failed");
                return;
            }
        };
        if !claimed {
            tracing::debug!(schedule_id = %schedule.id, "firing already claimed by another scheduler instance");
            return;
        }

        self.submit_firing(&schedule, now).await;
    }

    async fn submit_firing(&self, schedule: &Schedule, now: DateTime<Utc>) {
        let job = Job::new(
            schedule.user_id.clone(),
            schedule.agent_name.clone(),
            schedule.payload_template.clone(),
            schedule.priority,
            schedule.max_retries,
            JobOrigin::Scheduled(schedule.id),
            now,
        );
        let job = match self.store.create_job(job).await {
            Ok(job) => job,
            Err(err) => {
                tracing::error!(schedule_id = %schedule.id, error = %err, "failed to create job row for scheduled firing");
                return;
            }
        };

        match self
            .pipeline
            .submit(
                job.id,
                &schedule.user_id,
                &schedule.agent_name,
                job.payload.clone(),
                schedule.priority,
                schedule.max_retries,
                None,
                Some(schedule.id),
            )
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(job_id = %job.id, schedule_id = %schedule.id, "pipeline rejected scheduled job; claim already committed, job row recoverable externally");
            }
            Err(err) => {
                tracing::error!(job_id = %job.id, schedule_id = %schedule.id, error = %err, "submit failed for scheduled firing");
            }
        }
    }

    /// Out-of-band immediate firing, per SPEC_FULL.md §4.4.5. Bypasses cron
    /// computation and the claim entirely; `next_run`/`last_run` are
    /// untouched.
    pub async fn run_schedule_now(&self, schedule_id: Uuid, user_id: Option<&str>) -> Result<Uuid, CoreError> {
        let schedule = self
            .store
            .get_schedule(schedule_id, user_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(schedule_id.to_string()))?;

        let now = self.clock.now();
        let job = Job::new(
            schedule.user_id.clone(),
            schedule.agent_name.clone(),
            schedule.payload_template.clone(),
            schedule.priority,
            schedule.max_retries,
            JobOrigin::Scheduled(schedule.id),
            now,
        );
        let job = self.store.create_job(job).await?;
        self.pipeline
            .submit(
                job.id,
                &schedule.user_id,
                &schedule.agent_name,
                job.payload.clone(),
                schedule.priority,
                schedule.max_retries,
                None,
                Some(schedule.id),
            )
            .await?;
        Ok(job.id)
    }
}
