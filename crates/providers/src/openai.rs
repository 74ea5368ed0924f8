//! OpenAI provider, built on the official `async-openai` SDK crate rather
//! than a hand-rolled HTTP client, matching the teacher's split: use the
//! vendor SDK where one exists.

use crate::provider::{Provider, QueryRequest};
use async_openai::config::OpenAIConfig as SdkConfig;
use async_openai::types::{
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use async_trait::async_trait;
use std::time::Duration;
use taskloom_kernel::error::CoreError;

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: Option<String>,
    pub default_model: String,
    pub timeout_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: None,
            default_model: "gpt-4o-mini".to_string(),
            timeout_secs: 300,
        }
    }
}

impl OpenAiConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self {
            api_key: std::env::var("OPENAI_API_KEY").unwrap_or_default(),
            ..Default::default()
        };
        if let Ok(model) = std::env::var("OPENAI_DEFAULT_MODEL") {
            cfg.default_model = model;
        }
        if let Ok(base_url) = std::env::var("OPENAI_BASE_URL") {
            cfg.base_url = Some(base_url);
        }
        cfg
    }
}

pub struct OpenAiProvider {
    client: Client<SdkConfig>,
    config: OpenAiConfig,
}

impl OpenAiProvider {
    pub fn new(config: OpenAiConfig) -> Self {
        let mut sdk_config = SdkConfig::new().with_api_key(&config.api_key);
        if let Some(base_url) = &config.base_url {
            sdk_config = sdk_config.with_api_base(base_url);
        }
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("failed to build openai http client");
        let client = Client::with_config(sdk_config).with_http_client(http_client);
        Self { client, config }
    }

    pub fn from_env() -> Self {
        Self::new(OpenAiConfig::from_env())
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn default_model(&self) -> &str {
        &self.config.default_model
    }

    async fn query(&self, request: QueryRequest) -> Result<String, CoreError> {
        let model = request.model.clone().unwrap_or_else(|| self.config.default_model.clone());

        let mut messages = Vec::new();
        if let Some(system) = &request.system_instruction {
            messages.push(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(system.as_str())
                    .build()
                    .map_err(|e| CoreError::InvalidRequest(e.to_string()))?
                    .into(),
            );
        }
        messages.push(
            ChatCompletionRequestUserMessageArgs::default()
                .content(request.prompt.as_str())
                .build()
                .map_err(|e| CoreError::InvalidRequest(e.to_string()))?
                .into(),
        );

        let mut builder = CreateChatCompletionRequestArgs::default();
        builder.model(&model).messages(messages);
        if let Some(temperature) = request.temperature {
            builder.temperature(temperature);
        }
        if let Some(max_tokens) = request.max_tokens {
            builder.max_tokens(max_tokens);
        }
        let req = builder.build().map_err(|e| CoreError::InvalidRequest(e.to_string()))?;

        let response = self.client.chat().create(req).await.map_err(map_openai_error)?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| CoreError::UpstreamError("empty choices in openai response".to_string()))
    }
}

fn map_openai_error(err: async_openai::error::OpenAIError) -> CoreError {
    use async_openai::error::OpenAIError;
    match err {
        OpenAIError::ApiError(api_err) => {
            let code = api_err.code.as_deref().unwrap_or_default();
            let message = api_err.message.clone();
            match code {
                "invalid_api_key" | "insufficient_quota" => CoreError::AuthFailure(message),
                "rate_limit_exceeded" => CoreError::RateLimited(message),
                _ => CoreError::UpstreamError(message),
            }
        }
        OpenAIError::Reqwest(e) if e.is_timeout() => CoreError::Timeout(e.to_string()),
        other => CoreError::UpstreamError(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_to_gpt4o_mini() {
        let config = OpenAiConfig::default();
        assert_eq!(config.default_model, "gpt-4o-mini");
        assert!(config.base_url.is_none());
    }

    #[test]
    fn provider_name_is_openai() {
        let provider = OpenAiProvider::new(OpenAiConfig::default());
        assert_eq!(provider.name(), "openai");
    }
}
