//! End-to-end pipeline scenarios: a job submitted through `submit` runs
//! through the real worker pool, delayed set, and backoff engine against
//! an in-memory store and scripted agents.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use taskloom_agents::{Agent, AgentOutcome, AgentRegistry};
use taskloom_kernel::clock::SystemClock;
use taskloom_kernel::domain::{JobOrigin, JobStatus};
use taskloom_kernel::error::CoreError;
use taskloom_pipeline::{JobPipeline, PipelineConfig};
use taskloom_store::InMemoryStore;
use uuid::Uuid;

fn fast_config() -> PipelineConfig {
    PipelineConfig {
        max_concurrent_jobs: 2,
        max_queue_size: 16,
        retry_delay_base: 0.05,
        retry_delay_cap: Duration::from_millis(200),
        delayed_promotion_interval: Duration::from_millis(20),
        metrics_cleanup_interval: Duration::from_secs(60),
        worker_poll_timeout: Duration::from_millis(20),
    }
}

struct AlwaysSucceeds;

#[async_trait]
impl Agent for AlwaysSucceeds {
    fn name(&self) -> &str {
        "always_succeeds"
    }
    fn description(&self) -> &str {
        "test agent that always succeeds"
    }
    fn validate(&self, _payload: &Value) -> Result<(), CoreError> {
        Ok(())
    }
    async fn execute(&self, _payload: Value) -> AgentOutcome {
        AgentOutcome::success("done")
    }
}

struct AlwaysFailsTerminally;

#[async_trait]
impl Agent for AlwaysFailsTerminally {
    fn name(&self) -> &str {
        "always_fails_terminally"
    }
    fn description(&self) -> &str {
        "test agent that always fails with a non-retriable error"
    }
    fn validate(&self, _payload: &Value) -> Result<(), CoreError> {
        Ok(())
    }
    async fn execute(&self, _payload: Value) -> AgentOutcome {
        AgentOutcome::failure(CoreError::InvalidRequest("malformed forever".into()))
    }
}

/// Fails with a retriable error the first `fail_times` calls, then succeeds.
struct FailsThenSucceeds {
    calls: AtomicUsize,
    fail_times: usize,
}

impl FailsThenSucceeds {
    fn new(fail_times: usize) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_times,
        }
    }
}

#[async_trait]
impl Agent for FailsThenSucceeds {
    fn name(&self) -> &str {
        "fails_then_succeeds"
    }
    fn description(&self) -> &str {
        "test agent that fails a fixed number of times before succeeding"
    }
    fn validate(&self, _payload: &Value) -> Result<(), CoreError> {
        Ok(())
    }
    async fn execute(&self, _payload: Value) -> AgentOutcome {
        let attempt = self.calls.fetch_add(1, Ordering::SeqCst);
        if attempt < self.fail_times {
            AgentOutcome::failure(CoreError::UpstreamError("transient upstream hiccup".into()))
        } else {
            AgentOutcome::success("eventually done")
        }
    }
}

struct AlwaysFailsRetriably;

#[async_trait]
impl Agent for AlwaysFailsRetriably {
    fn name(&self) -> &str {
        "always_fails_retriably"
    }
    fn description(&self) -> &str {
        "test agent that always fails with a retriable error"
    }
    fn validate(&self, _payload: &Value) -> Result<(), CoreError> {
        Ok(())
    }
    async fn execute(&self, _payload: Value) -> AgentOutcome {
        AgentOutcome::failure(CoreError::Timeout("upstream never responds".into()))
    }
}

/// Records the order in which it is invoked, always succeeding.
struct OrderRecorder {
    order: Mutex<Vec<String>>,
}

#[async_trait]
impl Agent for OrderRecorder {
    fn name(&self) -> &str {
        "order_recorder"
    }
    fn description(&self) -> &str {
        "test agent that records invocation order via its payload's `label`"
    }
    fn validate(&self, _payload: &Value) -> Result<(), CoreError> {
        Ok(())
    }
    async fn execute(&self, payload: Value) -> AgentOutcome {
        let label = payload["label"].as_str().unwrap_or_default().to_string();
        self.order.lock().unwrap().push(label);
        // Give other workers a chance to race in, so ordering reflects queue
        // priority rather than scheduling luck.
        tokio::time::sleep(Duration::from_millis(5)).await;
        AgentOutcome::success("recorded")
    }
}

async fn wait_for_status(store: &InMemoryStore, job_id: Uuid, want: JobStatus, timeout: Duration) -> JobStatus {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let job = store.get_job(job_id, None).await.unwrap().expect("job must exist");
        if job.status == want || tokio::time::Instant::now() >= deadline {
            return job.status;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

#[tokio::test]
async fn happy_path_job_completes() {
    let store = Arc::new(InMemoryStore::new());
    let mut agents = AgentRegistry::new();
    agents.register(Arc::new(AlwaysSucceeds));
    let pipeline = JobPipeline::new(fast_config(), Arc::new(agents), store.clone(), Arc::new(SystemClock));
    pipeline.start();

    let job = taskloom_kernel::domain::Job::new(
        "user-1",
        "always_succeeds",
        serde_json::json!({}),
        5,
        3,
        JobOrigin::Manual,
        chrono::Utc::now(),
    );
    let job = store.create_job(job).await.unwrap();
    let submitted = pipeline
        .submit(job.id, "user-1", "always_succeeds", serde_json::json!({}), 5, 3, None, None)
        .await
        .unwrap();
    assert!(submitted);

    let status = wait_for_status(&store, job.id, JobStatus::Completed, Duration::from_secs(2)).await;
    assert_eq!(status, JobStatus::Completed);

    pipeline.stop(Duration::from_secs(1)).await;
}

#[tokio::test]
async fn unknown_agent_is_rejected_and_marked_failed_synchronously() {
    let store = Arc::new(InMemoryStore::new());
    let agents = AgentRegistry::new();
    let pipeline = JobPipeline::new(fast_config(), Arc::new(agents), store.clone(), Arc::new(SystemClock));

    let job = taskloom_kernel::domain::Job::new(
        "user-1",
        "does_not_exist",
        serde_json::json!({}),
        5,
        3,
        JobOrigin::Manual,
        chrono::Utc::now(),
    );
    let job = store.create_job(job).await.unwrap();
    let submitted = pipeline
        .submit(job.id, "user-1", "does_not_exist", serde_json::json!({}), 5, 3, None, None)
        .await
        .unwrap();
    assert!(!submitted);

    let stored = store.get_job(job.id, None).await.unwrap().unwrap();
    assert_eq!(stored.status, JobStatus::Failed);
    assert!(stored.error.unwrap().contains("does_not_exist"));
}

#[tokio::test]
async fn non_retriable_failure_goes_straight_to_failed() {
    let store = Arc::new(InMemoryStore::new());
    let mut agents = AgentRegistry::new();
    agents.register(Arc::new(AlwaysFailsTerminally));
    let pipeline = JobPipeline::new(fast_config(), Arc::new(agents), store.clone(), Arc::new(SystemClock));
    pipeline.start();

    let job = taskloom_kernel::domain::Job::new(
        "user-1",
        "always_fails_terminally",
        serde_json::json!({}),
        5,
        3,
        JobOrigin::Manual,
        chrono::Utc::now(),
    );
    let job = store.create_job(job).await.unwrap();
    pipeline
        .submit(job.id, "user-1", "always_fails_terminally", serde_json::json!({}), 5, 3, None, None)
        .await
        .unwrap();

    let status = wait_for_status(&store, job.id, JobStatus::Failed, Duration::from_secs(2)).await;
    assert_eq!(status, JobStatus::Failed);
    let stored = store.get_job(job.id, None).await.unwrap().unwrap();
    assert!(stored.error.unwrap().contains("malformed forever"));

    pipeline.stop(Duration::from_secs(1)).await;
}

#[tokio::test]
async fn retriable_failure_recovers_on_a_later_attempt() {
    let store = Arc::new(InMemoryStore::new());
    let mut agents = AgentRegistry::new();
    agents.register(Arc::new(FailsThenSucceeds::new(2)));
    let pipeline = JobPipeline::new(fast_config(), Arc::new(agents), store.clone(), Arc::new(SystemClock));
    pipeline.start();

    let job = taskloom_kernel::domain::Job::new(
        "user-1",
        "fails_then_succeeds",
        serde_json::json!({}),
        5,
        5,
        JobOrigin::Manual,
        chrono::Utc::now(),
    );
    let job = store.create_job(job).await.unwrap();
    pipeline
        .submit(job.id, "user-1", "fails_then_succeeds", serde_json::json!({}), 5, 5, None, None)
        .await
        .unwrap();

    let status = wait_for_status(&store, job.id, JobStatus::Completed, Duration::from_secs(3)).await;
    assert_eq!(status, JobStatus::Completed);
    let status = pipeline.pipeline_status();
    assert!(status.retried >= 2);

    pipeline.stop(Duration::from_secs(1)).await;
}

#[tokio::test]
async fn retries_exhaust_into_a_terminal_failure() {
    let store = Arc::new(InMemoryStore::new());
    let mut agents = AgentRegistry::new();
    agents.register(Arc::new(AlwaysFailsRetriably));
    let pipeline = JobPipeline::new(fast_config(), Arc::new(agents), store.clone(), Arc::new(SystemClock));
    pipeline.start();

    let job = taskloom_kernel::domain::Job::new(
        "user-1",
        "always_fails_retriably",
        serde_json::json!({}),
        5,
        2,
        JobOrigin::Manual,
        chrono::Utc::now(),
    );
    let job = store.create_job(job).await.unwrap();
    pipeline
        .submit(job.id, "user-1", "always_fails_retriably", serde_json::json!({}), 5, 2, None, None)
        .await
        .unwrap();

    let status = wait_for_status(&store, job.id, JobStatus::Failed, Duration::from_secs(3)).await;
    assert_eq!(status, JobStatus::Failed);
    let stored = store.get_job(job.id, None).await.unwrap().unwrap();
    assert!(stored.error.unwrap().contains("upstream never responds"));

    pipeline.stop(Duration::from_secs(1)).await;
}

#[tokio::test]
async fn higher_priority_jobs_run_before_lower_priority_ones() {
    let store = Arc::new(InMemoryStore::new());
    let mut config = fast_config();
    config.max_concurrent_jobs = 1; // single worker: ordering is deterministic
    let recorder = Arc::new(OrderRecorder { order: Mutex::new(Vec::new()) });
    let mut agents = AgentRegistry::new();
    // AgentRegistry stores `Arc<dyn Agent>`; register the same recorder so
    // the test can inspect it afterward through its own handle.
    struct Shared(Arc<OrderRecorder>);
    #[async_trait]
    impl Agent for Shared {
        fn name(&self) -> &str {
            self.0.name()
        }
        fn description(&self) -> &str {
            self.0.description()
        }
        fn validate(&self, payload: &Value) -> Result<(), CoreError> {
            self.0.validate(payload)
        }
        async fn execute(&self, payload: Value) -> AgentOutcome {
            self.0.execute(payload).await
        }
    }
    agents.register(Arc::new(Shared(recorder.clone())));
    let pipeline = JobPipeline::new(config, Arc::new(agents), store.clone(), Arc::new(SystemClock));

    // Submit before starting workers, so all three land in the ready queue
    // before any are popped.
    let mut job_ids = Vec::new();
    for (label, priority) in [("low", 1), ("high", 10), ("mid", 5)] {
        let job = taskloom_kernel::domain::Job::new(
            "user-1",
            "order_recorder",
            serde_json::json!({ "label": label }),
            priority,
            0,
            JobOrigin::Manual,
            chrono::Utc::now(),
        );
        let job = store.create_job(job).await.unwrap();
        pipeline
            .submit(job.id, "user-1", "order_recorder", serde_json::json!({ "label": label }), priority, 0, None, None)
            .await
            .unwrap();
        job_ids.push(job.id);
    }

    pipeline.start();
    for job_id in job_ids {
        wait_for_status(&store, job_id, JobStatus::Completed, Duration::from_secs(2)).await;
    }
    pipeline.stop(Duration::from_secs(1)).await;

    let order = recorder.order.lock().unwrap().clone();
    assert_eq!(order, vec!["high", "mid", "low"]);
}
