//! Process-wide mapping from provider name to a constructed provider
//! handle, per SPEC_FULL.md §4.1.

use crate::anthropic::{AnthropicConfig, AnthropicProvider};
use crate::deepseek::{DeepSeekConfig, DeepSeekProvider};
use crate::google::{GoogleConfig, GoogleProvider};
use crate::llama::{LlamaConfig, LlamaProvider};
use crate::openai::{OpenAiConfig, OpenAiProvider};
use crate::provider::{Provider, ProviderHealth, QueryRequest};
use std::collections::HashMap;
use std::sync::Arc;
use taskloom_kernel::error::CoreError;

/// Holds every constructed provider handle plus the name of the
/// process-wide default, used when an agent calls `providers.default()`.
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn Provider>>,
    default_name: Option<String>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            providers: HashMap::new(),
            default_name: None,
        }
    }

    /// Registers a provider handle under its own [`Provider::name`].
    pub fn register(&mut self, provider: Arc<dyn Provider>) {
        self.providers.insert(provider.name().to_string(), provider);
    }

    pub fn set_default(&mut self, name: impl Into<String>) {
        self.default_name = Some(name.into());
    }

    /// Builds a registry from environment variables, registering only the
    /// providers whose API key is present (a misconfigured provider is
    /// omitted rather than registered in a broken state, per SPEC_FULL.md §4.1.1).
    pub fn from_env() -> Self {
        let mut registry = Self::new();

        let openai = OpenAiConfig::from_env();
        if !openai.api_key.is_empty() {
            registry.register(Arc::new(OpenAiProvider::new(openai)));
        }

        let anthropic = AnthropicConfig::from_env();
        if !anthropic.api_key.is_empty() {
            registry.register(Arc::new(AnthropicProvider::new(anthropic)));
        }

        let google = GoogleConfig::from_env();
        if !google.api_key.is_empty() {
            registry.register(Arc::new(GoogleProvider::new(google)));
        }

        let deepseek = DeepSeekConfig::from_env();
        if !deepseek.api_key.is_empty() {
            registry.register(Arc::new(DeepSeekProvider::new(deepseek)));
        }

        // Llama/self-hosted backends often run without auth, so presence of
        // a base URL override (not just an API key) is enough to register it.
        if std::env::var("LLAMA_BASE_URL").is_ok() || std::env::var("LLAMA_API_KEY").is_ok() {
            registry.register(Arc::new(LlamaProvider::from_env()));
        }

        if let Ok(default_name) = std::env::var("DEFAULT_LLM_PROVIDER") {
            registry.set_default(default_name);
        } else if let Some(first) = registry.providers.keys().next().cloned() {
            registry.set_default(first);
        }

        registry
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn Provider>, CoreError> {
        self.providers
            .get(name)
            .cloned()
            .ok_or_else(|| CoreError::ProviderUnavailable(name.to_string()))
    }

    pub fn default_provider(&self) -> Result<Arc<dyn Provider>, CoreError> {
        let name = self
            .default_name
            .as_deref()
            .ok_or_else(|| CoreError::ProviderUnavailable("no default provider configured".to_string()))?;
        self.get(name)
    }

    pub fn available(&self) -> Vec<String> {
        let mut names: Vec<String> = self.providers.keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn health(&self) -> Vec<ProviderHealth> {
        let mut results = Vec::with_capacity(self.providers.len());
        for (name, provider) in &self.providers {
            let (healthy, last_error) = match provider.health_check().await {
                Ok(healthy) => (healthy, None),
                Err(e) => (false, Some(e.to_string())),
            };
            results.push(ProviderHealth {
                name: name.clone(),
                healthy,
                last_error,
            });
        }
        results.sort_by(|a, b| a.name.cmp(&b.name));
        results
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
