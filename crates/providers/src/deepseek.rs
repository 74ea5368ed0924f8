//! DeepSeek provider. Exposes an OpenAI-compatible `/v1/chat/completions`
//! endpoint but ships no Rust SDK, so this goes over raw `reqwest` like the
//! Anthropic and Google backends.

use crate::http::query_openai_compatible;
use crate::provider::{Provider, QueryRequest};
use async_trait::async_trait;
use std::time::Duration;
use taskloom_kernel::error::CoreError;

#[derive(Debug, Clone)]
pub struct DeepSeekConfig {
    pub api_key: String,
    pub base_url: String,
    pub default_model: String,
    pub timeout_secs: u64,
}

impl Default for DeepSeekConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.deepseek.com/v1".to_string(),
            default_model: "deepseek-chat".to_string(),
            timeout_secs: 300,
        }
    }
}

impl DeepSeekConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self {
            api_key: std::env::var("DEEPSEEK_API_KEY").unwrap_or_default(),
            ..Default::default()
        };
        if let Ok(model) = std::env::var("DEEPSEEK_DEFAULT_MODEL") {
            cfg.default_model = model;
        }
        if let Ok(base_url) = std::env::var("DEEPSEEK_BASE_URL") {
            cfg.base_url = base_url;
        }
        cfg
    }
}

pub struct DeepSeekProvider {
    client: reqwest::Client,
    config: DeepSeekConfig,
}

impl DeepSeekProvider {
    pub fn new(config: DeepSeekConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("failed to build deepseek http client");
        Self { client, config }
    }

    pub fn from_env() -> Self {
        Self::new(DeepSeekConfig::from_env())
    }
}

#[async_trait]
impl Provider for DeepSeekProvider {
    fn name(&self) -> &str {
        "deepseek"
    }

    fn default_model(&self) -> &str {
        &self.config.default_model
    }

    async fn query(&self, request: QueryRequest) -> Result<String, CoreError> {
        let model = request.model.clone().unwrap_or_else(|| self.config.default_model.clone());
        query_openai_compatible(&self.client, &self.config.base_url, &self.config.api_key, &model, &request).await
    }
}
