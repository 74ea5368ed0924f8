//! Google Gemini `generateContent` provider. No official Rust SDK; talks to
//! the REST API directly, matching the teacher's Anthropic/Google split of
//! using `reqwest` everywhere the vendor has no first-party SDK.

use crate::http::{map_status_error, map_transport_error};
use crate::provider::{Provider, QueryRequest};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use taskloom_kernel::error::CoreError;

#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub api_key: String,
    pub base_url: String,
    pub default_model: String,
    pub timeout_secs: u64,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            default_model: "gemini-1.5-flash".to_string(),
            timeout_secs: 300,
        }
    }
}

impl GoogleConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self {
            api_key: std::env::var("GOOGLE_API_KEY").unwrap_or_default(),
            ..Default::default()
        };
        if let Ok(model) = std::env::var("GOOGLE_DEFAULT_MODEL") {
            cfg.default_model = model;
        }
        if let Ok(base_url) = std::env::var("GOOGLE_BASE_URL") {
            cfg.base_url = base_url;
        }
        cfg
    }
}

pub struct GoogleProvider {
    client: reqwest::Client,
    config: GoogleConfig,
}

impl GoogleProvider {
    pub fn new(config: GoogleConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("failed to build google http client");
        Self { client, config }
    }

    pub fn from_env() -> Self {
        Self::new(GoogleConfig::from_env())
    }
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[async_trait]
impl Provider for GoogleProvider {
    fn name(&self) -> &str {
        "google"
    }

    fn default_model(&self) -> &str {
        &self.config.default_model
    }

    async fn query(&self, request: QueryRequest) -> Result<String, CoreError> {
        let model = request.model.as_deref().unwrap_or(&self.config.default_model);

        let mut contents = Vec::new();
        if let Some(system) = &request.system_instruction {
            contents.push(serde_json::json!({
                "role": "user",
                "parts": [{ "text": system }],
            }));
        }
        contents.push(serde_json::json!({
            "role": "user",
            "parts": [{ "text": request.prompt }],
        }));

        let mut generation_config = serde_json::json!({});
        if let Some(temperature) = request.temperature {
            generation_config["temperature"] = serde_json::json!(temperature);
        }
        if let Some(max_tokens) = request.max_tokens {
            generation_config["maxOutputTokens"] = serde_json::json!(max_tokens);
        }

        let body = serde_json::json!({
            "contents": contents,
            "generationConfig": generation_config,
        });

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.config.base_url.trim_end_matches('/'),
            model,
            self.config.api_key
        );

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = resp.status();
        let text = resp.text().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, text));
        }

        let parsed: GeminiResponse = serde_json::from_str(&text)
            .map_err(|e| CoreError::UpstreamError(format!("malformed google response: {e}")))?;

        Ok(parsed
            .candidates
            .into_iter()
            .next()
            .map(|c| c.content.parts.into_iter().filter_map(|p| p.text).collect::<Vec<_>>().join(""))
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_name_is_google() {
        let provider = GoogleProvider::new(GoogleConfig::default());
        assert_eq!(provider.name(), "google");
    }
}
