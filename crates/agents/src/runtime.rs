//! Wraps a bare [`Agent::execute`] call with the three guardrails
//! SPEC_FULL.md §4.2 requires of every invocation: payload validation,
//! wall-clock timing, and panic capture. None of the three are the
//! pipeline's concern — a worker only ever sees an [`AgentResult`].

use crate::traits::{Agent, AgentOutcome, AgentResult};
use futures::FutureExt;
use serde_json::Value;
use std::panic::AssertUnwindSafe;
use std::time::Instant;
use taskloom_kernel::error::CoreError;

/// Validates, times, and crash-guards a single `execute` call.
///
/// Validation failure and a caught panic both short-circuit before the
/// timer would otherwise measure agent-internal work; both cases still
/// report an elapsed time so callers can log how long the guardrail itself
/// took, even though it's negligible next to a real invocation.
#[tracing::instrument(skip(agent, payload), fields(agent = agent.name()))]
pub async fn execute_with_guardrails(agent: &dyn Agent, payload: Value) -> AgentResult {
    let started = Instant::now();

    if let Err(err) = agent.validate(&payload) {
        let reason = match err {
            CoreError::InvalidPayload(msg) => msg,
            other => other.to_string(),
        };
        return AgentResult {
            outcome: AgentOutcome::failure(CoreError::InvalidPayload(reason)),
            execution_time: started.elapsed(),
        };
    }

    let outcome = match AssertUnwindSafe(agent.execute(payload)).catch_unwind().await {
        Ok(outcome) => outcome,
        Err(panic) => {
            let message = panic_message(&panic);
            tracing::error!(agent = agent.name(), message, "agent panicked during execute");
            AgentOutcome::failure(CoreError::AgentCrashed(message))
        }
    };

    AgentResult {
        outcome,
        execution_time: started.elapsed(),
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "agent panicked with a non-string payload".to_string()
    }
}
