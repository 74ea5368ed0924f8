//! Llama provider: a self-hosted or local OpenAI-compatible endpoint
//! (e.g. llama.cpp's server, Ollama's OpenAI-compat mode, vLLM). No vendor
//! SDK applies here by definition, so this is raw `reqwest` against
//! whatever base URL the deployment points at.

use crate::http::query_openai_compatible;
use crate::provider::{Provider, QueryRequest};
use async_trait::async_trait;
use std::time::Duration;
use taskloom_kernel::error::CoreError;

#[derive(Debug, Clone)]
pub struct LlamaConfig {
    pub api_key: String,
    pub base_url: String,
    pub default_model: String,
    pub timeout_secs: u64,
}

impl Default for LlamaConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "http://localhost:8080/v1".to_string(),
            default_model: "llama-3".to_string(),
            timeout_secs: 300,
        }
    }
}

impl LlamaConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self {
            api_key: std::env::var("LLAMA_API_KEY").unwrap_or_default(),
            ..Default::default()
        };
        if let Ok(model) = std::env::var("LLAMA_DEFAULT_MODEL") {
            cfg.default_model = model;
        }
        if let Ok(base_url) = std::env::var("LLAMA_BASE_URL") {
            cfg.base_url = base_url;
        }
        cfg
    }
}

pub struct LlamaProvider {
    client: reqwest::Client,
    config: LlamaConfig,
}

impl LlamaProvider {
    pub fn new(config: LlamaConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("failed to build llama http client");
        Self { client, config }
    }

    pub fn from_env() -> Self {
        Self::new(LlamaConfig::from_env())
    }
}

#[async_trait]
impl Provider for LlamaProvider {
    fn name(&self) -> &str {
        "llama"
    }

    fn default_model(&self) -> &str {
        &self.config.default_model
    }

    async fn query(&self, request: QueryRequest) -> Result<String, CoreError> {
        let model = request.model.clone().unwrap_or_else(|| self.config.default_model.clone());
        query_openai_compatible(&self.client, &self.config.base_url, &self.config.api_key, &model, &request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_name_is_llama() {
        let provider = LlamaProvider::new(LlamaConfig::default());
        assert_eq!(provider.name(), "llama");
    }
}
