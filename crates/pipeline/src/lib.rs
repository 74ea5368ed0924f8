//! The job pipeline: a bounded priority ready queue, a time-ordered
//! delayed set for future-dated and backed-off jobs, a fixed worker pool,
//! and the metrics the rest of the platform introspects it through.

pub mod delayed;
pub mod metrics;
pub mod pipeline;
pub mod queue;
pub mod retry;
pub mod shutdown;

pub use delayed::DelayedSet;
pub use metrics::{JobMetricEntry, PipelineMetrics, PipelineStatus};
pub use pipeline::{JobPipeline, PipelineConfig};
pub use queue::ReadyQueue;
pub use retry::backoff_delay;
pub use shutdown::ShutdownSignal;
