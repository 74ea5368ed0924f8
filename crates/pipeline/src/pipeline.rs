//! The job pipeline itself: `submit`/`start`/`stop` plus the worker,
//! delayed-promotion, and metrics-cleanup loops described in
//! SPEC_FULL.md §4.3.

use crate::delayed::DelayedSet;
use crate::metrics::{JobMetricEntry, PipelineMetrics, PipelineStatus};
use crate::queue::ReadyQueue;
use crate::retry::backoff_delay;
use crate::shutdown::ShutdownSignal;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use taskloom_agents::{execute_with_guardrails, AgentOutcome, AgentRegistry};
use taskloom_kernel::clock::Clock;
use taskloom_kernel::domain::{JobStatus, JobTask};
use taskloom_kernel::error::CoreError;
use taskloom_store::{JobStatusUpdate, Store};
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Tunables enumerated in SPEC_FULL.md §6.4.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub max_concurrent_jobs: usize,
    pub max_queue_size: usize,
    pub retry_delay_base: f64,
    pub retry_delay_cap: Duration,
    pub delayed_promotion_interval: Duration,
    pub metrics_cleanup_interval: Duration,
    pub worker_poll_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 5,
            max_queue_size: 1000,
            retry_delay_base: 2.0,
            retry_delay_cap: Duration::from_secs(600),
            delayed_promotion_interval: Duration::from_secs(5),
            metrics_cleanup_interval: Duration::from_secs(60),
            worker_poll_timeout: Duration::from_secs(1),
        }
    }
}

/// The concurrent job pipeline: priority ready queue, time-ordered delayed
/// set, a fixed worker pool, and the retry/backoff engine. Always held
/// behind an `Arc` since its worker tasks hold clones of it.
pub struct JobPipeline {
    config: PipelineConfig,
    agents: Arc<AgentRegistry>,
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    ready: Arc<ReadyQueue>,
    delayed: Arc<DelayedSet>,
    active: StdMutex<HashSet<Uuid>>,
    metrics: Arc<PipelineMetrics>,
    shutdown: Arc<ShutdownSignal>,
    started: AtomicBool,
    handles: StdMutex<Vec<JoinHandle<()>>>,
}

impl JobPipeline {
    pub fn new(
        config: PipelineConfig,
        agents: Arc<AgentRegistry>,
        store: Arc<dyn Store>,
        clock: Arc<dyn Clock>,
    ) -> Arc<Self> {
        Arc::new(Self {
            ready: Arc::new(ReadyQueue::new(config.max_queue_size)),
            delayed: Arc::new(DelayedSet::new()),
            active: StdMutex::new(HashSet::new()),
            metrics: Arc::new(PipelineMetrics::new()),
            shutdown: Arc::new(ShutdownSignal::new()),
            started: AtomicBool::new(false),
            handles: StdMutex::new(Vec::new()),
            config,
            agents,
            store,
            clock,
        })
    }

    /// Accepts a job for execution, per SPEC_FULL.md §4.3.2.
    ///
    /// An unknown agent is a terminal failure written synchronously before
    /// this returns — nothing is ever enqueued for an agent that doesn't
    /// exist. A full ready queue is reported back to the caller as `Ok(false)`
    /// rather than an error: it's the caller's decision whether to retry the
    /// submission.
    #[allow(clippy::too_many_arguments)]
    #[tracing::instrument(skip(self, payload), fields(job_id = %job_id, agent = %agent_name.as_ref()))]
    pub async fn submit(
        &self,
        job_id: Uuid,
        user_id: impl AsRef<str>,
        agent_name: impl AsRef<str>,
        payload: Value,
        priority: i32,
        max_retries: u32,
        scheduled_at: Option<DateTime<Utc>>,
        schedule_id: Option<Uuid>,
    ) -> Result<bool, CoreError> {
        let agent_name = agent_name.as_ref().to_string();
        let user_id = user_id.as_ref().to_string();

        if !self.agents.contains(&agent_name) {
            self.store
                .update_job_status(
                    job_id,
                    JobStatus::Failed,
                    JobStatusUpdate {
                        result: None,
                        error: Some(CoreError::UnknownAgent(agent_name).to_string()),
                    },
                )
                .await?;
            return Ok(false);
        }

        let now = self.clock.now();
        let scheduled_at = scheduled_at.unwrap_or(now);
        let task = JobTask {
            job_id,
            user_id,
            agent_name,
            payload,
            priority,
            max_retries,
            retry_count: 0,
            created_at: now,
            scheduled_at,
            schedule_id,
        };

        if task.is_ready(now) {
            match self.ready.try_push(task) {
                Ok(()) => Ok(true),
                Err(CoreError::QueueFull) => Ok(false),
                Err(other) => Err(other),
            }
        } else {
            self.delayed.insert(task);
            Ok(true)
        }
    }

    /// Spawns the worker pool plus the delayed-promotion and
    /// metrics-cleanup tasks. A no-op when already running.
    pub fn start(self: &Arc<Self>) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }
        self.shutdown.reset();

        let mut handles = self.handles.lock().expect("pipeline handles mutex poisoned");
        for worker_id in 0..self.config.max_concurrent_jobs {
            let pipeline = Arc::clone(self);
            handles.push(tokio::spawn(async move {
                pipeline.worker_loop(worker_id).await;
            }));
        }
        let promotion_pipeline = Arc::clone(self);
        handles.push(tokio::spawn(async move {
            promotion_pipeline.delayed_promotion_loop().await;
        }));
        let cleanup_pipeline = Arc::clone(self);
        handles.push(tokio::spawn(async move {
            cleanup_pipeline.metrics_cleanup_loop().await;
        }));
    }

    /// Triggers shutdown and waits up to `timeout` for every worker and
    /// auxiliary task to drain. Tasks still running past `timeout` are
    /// aborted; their jobs are left `running` in the store, per
    /// SPEC_FULL.md §4.3.2 and §5. A no-op when already stopped.
    pub async fn stop(&self, timeout: Duration) {
        if !self.started.swap(false, Ordering::SeqCst) {
            return;
        }
        self.shutdown.trigger();

        let handles: Vec<JoinHandle<()>> = {
            let mut guard = self.handles.lock().expect("pipeline handles mutex poisoned");
            std::mem::take(&mut *guard)
        };
        let abort_handles: Vec<_> = handles.iter().map(JoinHandle::abort_handle).collect();

        if tokio::time::timeout(timeout, futures::future::join_all(handles))
            .await
            .is_err()
        {
            tracing::warn!(?timeout, "pipeline stop timed out; aborting undrained tasks");
            for handle in abort_handles {
                handle.abort();
            }
        }
    }

    pub fn pipeline_status(&self) -> PipelineStatus {
        self.metrics.snapshot(self.ready.len(), self.delayed.len())
    }

    pub fn job_metrics(&self, job_id: Uuid) -> Option<JobMetricEntry> {
        self.metrics.job_entry(job_id)
    }

    async fn worker_loop(self: Arc<Self>, worker_id: usize) {
        tracing::debug!(worker_id, "worker started");
        loop {
            if self.shutdown.is_set() {
                break;
            }
            match self.ready.pop_timeout(self.config.worker_poll_timeout).await {
                Some(task) => self.run_task(task).await,
                None => continue,
            }
        }
        tracing::debug!(worker_id, "worker stopped");
    }

    async fn run_task(&self, task: JobTask) {
        let job_id = task.job_id;
        self.active.lock().expect("active set mutex poisoned").insert(job_id);
        self.metrics.mark_active();

        if let Err(err) = self
            .store
            .update_job_status(job_id, JobStatus::Running, JobStatusUpdate::default())
            .await
        {
            tracing::error!(%job_id, error = %err, "failed to persist running status");
        }

        let agent_name = task.agent_name.clone();
        let payload = task.payload.clone();
        let result = match self.agents.get(&agent_name) {
            Some(agent) => execute_with_guardrails(agent.as_ref(), payload).await,
            None => taskloom_agents::AgentResult {
                outcome: AgentOutcome::failure(CoreError::UnknownAgent(agent_name)),
                execution_time: Duration::ZERO,
            },
        };

        match result.outcome {
            AgentOutcome::Success { output, .. } => {
                if let Err(err) = self
                    .store
                    .update_job_status(
                        job_id,
                        JobStatus::Completed,
                        JobStatusUpdate {
                            result: Some(output),
                            error: None,
                        },
                    )
                    .await
                {
                    tracing::error!(%job_id, error = %err, "failed to persist completed status");
                }
                self.metrics.record_completion(JobMetricEntry {
                    job_id,
                    agent_name: task.agent_name.clone(),
                    success: true,
                    completed_at: self.clock.now(),
                    execution_time: result.execution_time,
                });
                self.record_schedule_outcome(task.schedule_id, true).await;
            }
            AgentOutcome::Failure { error, .. } => {
                self.handle_failure(task, error, result.execution_time).await;
            }
        }

        self.active.lock().expect("active set mutex poisoned").remove(&job_id);
        self.metrics.mark_inactive();
    }

    /// Implements the disposition table in SPEC_FULL.md §7: non-retriable
    /// kinds and exhausted retries write a terminal `failed` status;
    /// everything else re-enters the delayed set with backoff, leaving the
    /// persisted status untouched (still `running` from the write above).
    async fn handle_failure(&self, mut task: JobTask, error: CoreError, execution_time: Duration) {
        let job_id = task.job_id;
        let terminal = !error.is_retriable() || !task.can_retry();

        if terminal {
            if let Err(err) = self
                .store
                .update_job_status(
                    job_id,
                    JobStatus::Failed,
                    JobStatusUpdate {
                        result: None,
                        error: Some(error.to_string()),
                    },
                )
                .await
            {
                tracing::error!(%job_id, error = %err, "failed to persist failed status");
            }
            self.metrics.record_completion(JobMetricEntry {
                job_id,
                agent_name: task.agent_name.clone(),
                success: false,
                completed_at: self.clock.now(),
                execution_time,
            });
            self.record_schedule_outcome(task.schedule_id, false).await;
            return;
        }

        task.retry_count += 1;
        let delay = backoff_delay(task.retry_count, self.config.retry_delay_base, self.config.retry_delay_cap);
        let delay = chrono::Duration::from_std(delay).unwrap_or(chrono::Duration::zero());
        task.scheduled_at = self.clock.now() + delay;
        self.metrics.record_retry();
        tracing::warn!(
            %job_id,
            retry_count = task.retry_count,
            delay_secs = delay.num_milliseconds() as f64 / 1000.0,
            %error,
            "job failed with a retriable error, scheduling retry"
        );
        self.delayed.insert(task);
    }

    /// Feeds a terminal outcome back into the originating schedule's
    /// execution counters, per SPEC_FULL.md §3.1. A no-op for manually
    /// submitted jobs. Store errors here are logged and swallowed — they
    /// must never fail the job whose outcome is already persisted.
    async fn record_schedule_outcome(&self, schedule_id: Option<Uuid>, success: bool) {
        let Some(schedule_id) = schedule_id else {
            return;
        };
        if let Err(err) = self.store.record_schedule_execution(schedule_id, success).await {
            tracing::error!(%schedule_id, error = %err, "failed to record schedule execution outcome");
        }
    }

    async fn delayed_promotion_loop(self: Arc<Self>) {
        loop {
            if self.shutdown.is_set() {
                break;
            }
            let now = self.clock.now();
            for task in self.delayed.drain_ready(now) {
                self.ready.push_blocking(task).await;
            }
            tokio::select! {
                _ = tokio::time::sleep(self.config.delayed_promotion_interval) => {}
                _ = self.shutdown.triggered() => break,
            }
        }
    }

    async fn metrics_cleanup_loop(self: Arc<Self>) {
        loop {
            if self.shutdown.is_set() {
                break;
            }
            self.metrics.evict_stale();
            tokio::select! {
                _ = tokio::time::sleep(self.config.metrics_cleanup_interval) => {}
                _ = self.shutdown.triggered() => break,
            }
        }
    }
}
