//! Anthropic Messages API provider. No official Rust SDK exists, so this
//! talks to the REST API directly over a raw [`reqwest::Client`].

use crate::http::{map_status_error, map_transport_error};
use crate::provider::{Provider, QueryRequest};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use taskloom_kernel::error::CoreError;

#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    pub api_key: String,
    pub base_url: String,
    pub version: String,
    pub default_model: String,
    pub default_max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.anthropic.com".to_string(),
            version: "2023-06-01".to_string(),
            default_model: "claude-3-5-sonnet-20241022".to_string(),
            default_max_tokens: 4096,
            timeout_secs: 300,
        }
    }
}

impl AnthropicConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self {
            api_key: std::env::var("ANTHROPIC_API_KEY").unwrap_or_default(),
            ..Default::default()
        };
        if let Ok(model) = std::env::var("ANTHROPIC_DEFAULT_MODEL") {
            cfg.default_model = model;
        }
        if let Ok(base_url) = std::env::var("ANTHROPIC_BASE_URL") {
            cfg.base_url = base_url;
        }
        cfg
    }
}

pub struct AnthropicProvider {
    client: reqwest::Client,
    config: AnthropicConfig,
}

impl AnthropicProvider {
    pub fn new(config: AnthropicConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("failed to build anthropic http client");
        Self { client, config }
    }

    pub fn from_env() -> Self {
        Self::new(AnthropicConfig::from_env())
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicContentBlock {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicMessageResponse {
    content: Vec<AnthropicContentBlock>,
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn default_model(&self) -> &str {
        &self.config.default_model
    }

    async fn query(&self, request: QueryRequest) -> Result<String, CoreError> {
        let model = request.model.as_deref().unwrap_or(&self.config.default_model);
        let max_tokens = request.max_tokens.unwrap_or(self.config.default_max_tokens);

        let mut body = serde_json::json!({
            "model": model,
            "max_tokens": max_tokens,
            "messages": [{ "role": "user", "content": request.prompt }],
        });
        if let Some(temperature) = request.temperature {
            body["temperature"] = serde_json::json!(temperature);
        }
        if let Some(system) = &request.system_instruction {
            body["system"] = serde_json::json!(system);
        }

        let url = format!("{}/v1/messages", self.config.base_url.trim_end_matches('/'));
        let resp = self
            .client
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", &self.config.version)
            .json(&body)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = resp.status();
        let text = resp.text().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, text));
        }

        let parsed: AnthropicMessageResponse = serde_json::from_str(&text)
            .map_err(|e| CoreError::UpstreamError(format!("malformed anthropic response: {e}")))?;

        Ok(parsed
            .content
            .into_iter()
            .filter_map(|b| b.text)
            .collect::<Vec<_>>()
            .join(""))
    }
}
