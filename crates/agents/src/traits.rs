//! The stable contract every agent implements, per SPEC_FULL.md §4.2.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use taskloom_kernel::error::CoreError;

/// The tagged outcome an agent's `execute` produces, before the runtime
/// wraps it with timing metadata. `success = false` carries the error kind
/// that determines the pipeline's retry disposition (SPEC_FULL.md §7).
#[derive(Debug, Clone)]
pub enum AgentOutcome {
    Success { output: String, metadata: HashMap<String, Value> },
    Failure { error: CoreError, metadata: HashMap<String, Value> },
}

impl AgentOutcome {
    pub fn success(output: impl Into<String>) -> Self {
        Self::Success {
            output: output.into(),
            metadata: HashMap::new(),
        }
    }

    pub fn failure(error: CoreError) -> Self {
        Self::Failure {
            error,
            metadata: HashMap::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// The fully-shaped result returned by [`crate::runtime::execute_with_guardrails`]:
/// an [`AgentOutcome`] plus the wall-clock execution time the runtime
/// measured around the call, per SPEC_FULL.md §4.2 step 2.
#[derive(Debug, Clone)]
pub struct AgentResult {
    pub outcome: AgentOutcome,
    pub execution_time: Duration,
}

impl AgentResult {
    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }

    /// The output text when successful, `None` otherwise.
    pub fn output(&self) -> Option<&str> {
        match &self.outcome {
            AgentOutcome::Success { output, .. } => Some(output),
            AgentOutcome::Failure { .. } => None,
        }
    }

    /// The [`CoreError`] when unsuccessful, `None` otherwise.
    pub fn error(&self) -> Option<&CoreError> {
        match &self.outcome {
            AgentOutcome::Success { .. } => None,
            AgentOutcome::Failure { error, .. } => Some(error),
        }
    }
}

/// A named unit of work that consumes a typed payload and produces text
/// output. Implementations validate their own payload shape in
/// [`Agent::validate`]; the runtime never inspects payload contents itself.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Stable registry key, e.g. `"summarize"`.
    fn name(&self) -> &str;

    /// Human-readable description surfaced by introspection tooling.
    fn description(&self) -> &str;

    /// Validates `payload` against this agent's declared schema. Returning
    /// `Err` here is surfaced by the runtime as `InvalidPayload` and is
    /// never retried by the pipeline (SPEC_FULL.md §4.2 step 1).
    fn validate(&self, payload: &Value) -> Result<(), CoreError>;

    /// Executes the agent against an already-validated payload. Panics
    /// raised from within this call are caught by the runtime and
    /// translated into `AgentCrashed` (SPEC_FULL.md §4.2 step 3) — this
    /// method itself should simply do its work and may assume `payload`
    /// passed `validate`.
    async fn execute(&self, payload: Value) -> AgentOutcome;
}
