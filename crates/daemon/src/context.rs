//! Explicit application wiring: `init(config)` builds every subsystem and
//! hands back one `AppContext`, rather than reaching for module-level
//! global state (SPEC_FULL.md §9).

use crate::config::DaemonConfig;
use anyhow::Context as _;
use std::sync::Arc;
use std::time::Duration;
use taskloom_agents::reference::{SummarizeAgent, TextProcessingAgent};
use taskloom_agents::registry::AgentRegistry;
use taskloom_kernel::clock::SystemClock;
use taskloom_pipeline::{JobPipeline, PipelineConfig};
use taskloom_providers::registry::ProviderRegistry;
use taskloom_scheduler::{CronScheduler, SchedulerConfig};
use taskloom_store::{SqlStore, Store};

/// Every wired subsystem, held behind `Arc` so workers, the sweep task, and
/// any future external API layer can share ownership.
pub struct AppContext {
    pub config: DaemonConfig,
    pub providers: Arc<ProviderRegistry>,
    pub agents: Arc<AgentRegistry>,
    pub store: Arc<dyn Store>,
    pub pipeline: Arc<JobPipeline>,
    pub scheduler: Arc<CronScheduler>,
}

impl AppContext {
    /// Builds the provider registry, agent registry, store connection,
    /// pipeline, and scheduler from `config`. Fails fast — connection and
    /// migration errors surface here rather than at first job submission.
    pub async fn init(config: DaemonConfig) -> anyhow::Result<Self> {
        let providers = Arc::new(ProviderRegistry::from_env());
        if providers.available().is_empty() {
            tracing::warn!("no LLM providers configured; agents that call through to one will fail until an API key is set");
        }

        let mut registry = AgentRegistry::new();
        registry.register(Arc::new(SummarizeAgent::new(providers.clone())));
        registry.register(Arc::new(TextProcessingAgent));
        let agents = Arc::new(registry);

        let store: Arc<dyn Store> = Arc::new(
            SqlStore::connect(&config.database_url)
                .await
                .context("connecting to the configured store")?,
        );

        let clock = Arc::new(SystemClock);

        let pipeline_config = PipelineConfig {
            max_concurrent_jobs: config.max_concurrent_jobs,
            max_queue_size: config.max_queue_size,
            retry_delay_base: config.retry_delay_base,
            retry_delay_cap: Duration::from_secs(config.retry_delay_cap_secs),
            ..PipelineConfig::default()
        };
        let pipeline = JobPipeline::new(pipeline_config, agents.clone(), store.clone(), clock.clone());

        let scheduler_config = SchedulerConfig {
            check_interval: Duration::from_secs(config.scheduler_check_interval_secs),
            tolerance: Duration::from_secs(config.scheduler_tolerance_secs),
        };
        let scheduler = CronScheduler::new(scheduler_config, store.clone(), pipeline.clone(), clock);

        Ok(Self {
            config,
            providers,
            agents,
            store,
            pipeline,
            scheduler,
        })
    }

    /// Starts the pipeline's worker pool and the scheduler's sweep task.
    pub fn start(&self) {
        self.pipeline.start();
        self.scheduler.start();
    }

    /// Stops the scheduler before the pipeline, so no new scheduled job can
    /// be submitted to a pipeline that's already draining.
    pub async fn stop(&self, timeout: Duration) {
        self.scheduler.stop(timeout).await;
        self.pipeline.stop(timeout).await;
    }
}
