//! The uniform provider contract every backend implements.

use async_trait::async_trait;
use taskloom_kernel::error::CoreError;

/// One text-generation request, shaped identically regardless of backend.
#[derive(Debug, Clone, Default)]
pub struct QueryRequest {
    pub prompt: String,
    pub system_instruction: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl QueryRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn with_system(mut self, system_instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(system_instruction.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Health status of a single registered provider, as reported by
/// [`crate::registry::ProviderRegistry::health`].
#[derive(Debug, Clone)]
pub struct ProviderHealth {
    pub name: String,
    pub healthy: bool,
    pub last_error: Option<String>,
}

/// A pluggable text-generation backend. Implementations issue exactly one
/// upstream request per `query` call — retry policy belongs to the caller
/// (the agent runtime / pipeline), not the provider.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Stable lowercase name used as the registry key (`"openai"`, `"anthropic"`, ...).
    fn name(&self) -> &str;

    /// The model used when a request doesn't specify one.
    fn default_model(&self) -> &str;

    /// Issue one text-generation request.
    async fn query(&self, request: QueryRequest) -> Result<String, CoreError>;

    /// A cheap call used to populate [`ProviderRegistry::health`]. Default
    /// implementation issues a minimal real query.
    async fn health_check(&self) -> Result<bool, CoreError> {
        let request = QueryRequest::new("ping").with_max_tokens(1);
        match self.query(request).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_retriable() => Ok(false),
            Err(e) => Err(e),
        }
    }
}
