//! Reference agents that exercise the runtime end to end, per
//! SPEC_FULL.md §4.2.1: a summarization agent that calls through to a
//! provider, a text-processing agent that never leaves the process, and a
//! test-only echo agent used by the happy-path and priority scenarios.

use crate::traits::{Agent, AgentOutcome};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use taskloom_kernel::error::CoreError;
use taskloom_providers::provider::QueryRequest;
use taskloom_providers::registry::ProviderRegistry;

#[derive(Debug, Deserialize)]
struct SummarizePayload {
    text: String,
    #[serde(default)]
    max_sentences: Option<u32>,
}

/// Composes a system instruction bounding the summary length, then defers
/// to the configured default provider for the actual generation.
pub struct SummarizeAgent {
    providers: Arc<ProviderRegistry>,
}

impl SummarizeAgent {
    pub fn new(providers: Arc<ProviderRegistry>) -> Self {
        Self { providers }
    }

    fn parse(payload: &Value) -> Result<SummarizePayload, CoreError> {
        serde_json::from_value(payload.clone())
            .map_err(|e| CoreError::InvalidPayload(format!("summarize: {e}")))
    }
}

#[async_trait]
impl Agent for SummarizeAgent {
    fn name(&self) -> &str {
        "summarize"
    }

    fn description(&self) -> &str {
        "Summarizes input text within an optional sentence bound using the default provider"
    }

    fn validate(&self, payload: &Value) -> Result<(), CoreError> {
        Self::parse(payload).map(|_| ())
    }

    async fn execute(&self, payload: Value) -> AgentOutcome {
        let parsed = match Self::parse(&payload) {
            Ok(p) => p,
            Err(e) => return AgentOutcome::failure(e),
        };

        let provider = match self.providers.default_provider() {
            Ok(p) => p,
            Err(e) => return AgentOutcome::failure(e),
        };

        let bound = parsed.max_sentences.unwrap_or(3);
        let system = format!(
            "Summarize the user's text in at most {bound} sentences. Respond with only the summary."
        );
        let request = QueryRequest::new(parsed.text).with_system(system);

        match provider.query(request).await {
            Ok(output) => AgentOutcome::success(output),
            Err(e) => AgentOutcome::failure(e),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
enum TextOperation {
    Uppercase,
    Lowercase,
    Reverse,
    WordCount,
}

#[derive(Debug, Deserialize)]
struct TextProcessingPayload {
    text: String,
    operation: String,
}

/// Performs a local string transform with no provider call, demonstrating
/// that not every agent needs one (SPEC_FULL.md §4.2.1).
pub struct TextProcessingAgent;

impl TextProcessingAgent {
    fn parse(payload: &Value) -> Result<(String, TextOperation), CoreError> {
        let raw: TextProcessingPayload = serde_json::from_value(payload.clone())
            .map_err(|e| CoreError::InvalidPayload(format!("text_processing: {e}")))?;
        let op = match raw.operation.as_str() {
            "uppercase" => TextOperation::Uppercase,
            "lowercase" => TextOperation::Lowercase,
            "reverse" => TextOperation::Reverse,
            "word_count" => TextOperation::WordCount,
            other => {
                return Err(CoreError::InvalidPayload(format!(
                    "unrecognized operation: {other}"
                )));
            }
        };
        Ok((raw.text, op))
    }
}

#[async_trait]
impl Agent for TextProcessingAgent {
    fn name(&self) -> &str {
        "text_processing"
    }

    fn description(&self) -> &str {
        "Applies a local text transform: uppercase, lowercase, reverse, or word_count"
    }

    fn validate(&self, payload: &Value) -> Result<(), CoreError> {
        Self::parse(payload).map(|_| ())
    }

    async fn execute(&self, payload: Value) -> AgentOutcome {
        let (text, op) = match Self::parse(&payload) {
            Ok(parsed) => parsed,
            Err(e) => return AgentOutcome::failure(e),
        };

        let output = match op {
            TextOperation::Uppercase => text.to_uppercase(),
            TextOperation::Lowercase => text.to_lowercase(),
            TextOperation::Reverse => text.chars().rev().collect(),
            TextOperation::WordCount => text.split_whitespace().count().to_string(),
        };
        AgentOutcome::success(output)
    }
}

#[derive(Debug, Deserialize)]
struct EchoPayload {
    text: String,
}

/// Returns its payload's `text` field unchanged. Registered only in test
/// builds and harnesses — it exercises the happy-path and priority-ordering
/// scenarios in SPEC_FULL.md §8.3 without depending on network access.
pub struct EchoAgent;

#[async_trait]
impl Agent for EchoAgent {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Returns its `text` payload field unchanged (test-only)"
    }

    fn validate(&self, payload: &Value) -> Result<(), CoreError> {
        serde_json::from_value::<EchoPayload>(payload.clone())
            .map(|_| ())
            .map_err(|e| CoreError::InvalidPayload(format!("echo: {e}")))
    }

    async fn execute(&self, payload: Value) -> AgentOutcome {
        match serde_json::from_value::<EchoPayload>(payload) {
            Ok(p) => AgentOutcome::success(p.text),
            Err(e) => AgentOutcome::failure(CoreError::InvalidPayload(format!("echo: {e}"))),
        }
    }
}
