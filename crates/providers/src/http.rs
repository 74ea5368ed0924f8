//! Shared HTTP plumbing for the raw-`reqwest` provider backends
//! (Anthropic, Google, DeepSeek, Llama) that have no official Rust SDK.

use crate::provider::QueryRequest;
use serde::Deserialize;
use taskloom_kernel::error::CoreError;

/// Maps a transport-level failure (connection refused, DNS, client-side
/// timeout) onto the shared error taxonomy.
pub fn map_transport_error(err: reqwest::Error) -> CoreError {
    if err.is_timeout() {
        CoreError::Timeout(err.to_string())
    } else {
        CoreError::UpstreamError(err.to_string())
    }
}

/// Maps a non-2xx HTTP status (with the response body already read) onto
/// the shared error taxonomy, per SPEC_FULL.md §4.1.1.
pub fn map_status_error(status: reqwest::StatusCode, body: String) -> CoreError {
    match status.as_u16() {
        401 | 403 => CoreError::AuthFailure(body),
        429 => CoreError::RateLimited(body),
        400 => CoreError::InvalidRequest(body),
        _ => CoreError::UpstreamError(format!("{status}: {body}")),
    }
}

#[derive(Debug, Deserialize)]
struct OpenAiCompatChoice {
    message: OpenAiCompatMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiCompatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiCompatResponse {
    #[serde(default)]
    choices: Vec<OpenAiCompatChoice>,
}

/// Issues a chat-completions request against an OpenAI-compatible endpoint
/// (used by both DeepSeek and Llama/self-hosted backends, which expose the
/// same wire shape as OpenAI's `/v1/chat/completions`).
pub async fn query_openai_compatible(
    client: &reqwest::Client,
    base_url: &str,
    api_key: &str,
    model: &str,
    request: &QueryRequest,
) -> Result<String, CoreError> {
    let mut messages = Vec::new();
    if let Some(system) = &request.system_instruction {
        messages.push(serde_json::json!({ "role": "system", "content": system }));
    }
    messages.push(serde_json::json!({ "role": "user", "content": request.prompt }));

    let mut body = serde_json::json!({
        "model": model,
        "messages": messages,
    });
    if let Some(temperature) = request.temperature {
        body["temperature"] = serde_json::json!(temperature);
    }
    if let Some(max_tokens) = request.max_tokens {
        body["max_tokens"] = serde_json::json!(max_tokens);
    }

    let url = format!("{}/chat/completions", base_url.trim_end_matches('/'));
    let mut req = client.post(&url).json(&body);
    if !api_key.is_empty() {
        req = req.bearer_auth(api_key);
    }

    let resp = req.send().await.map_err(map_transport_error)?;
    let status = resp.status();
    let text = resp.text().await.map_err(map_transport_error)?;
    if !status.is_success() {
        return Err(map_status_error(status, text));
    }

    let parsed: OpenAiCompatResponse = serde_json::from_str(&text)
        .map_err(|e| CoreError::UpstreamError(format!("malformed response: {e}")))?;

    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| CoreError::UpstreamError("empty choices in response".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_401_maps_to_auth_failure() {
        let err = map_status_error(reqwest::StatusCode::UNAUTHORIZED, "bad key".into());
        assert!(matches!(err, CoreError::AuthFailure(_)));
        assert!(!err.is_retriable());
    }

    #[test]
    fn status_429_maps_to_rate_limited() {
        let err = map_status_error(reqwest::StatusCode::TOO_MANY_REQUESTS, "slow down".into());
        assert!(matches!(err, CoreError::RateLimited(_)));
        assert!(err.is_retriable());
    }

    #[test]
    fn status_400_maps_to_invalid_request() {
        let err = map_status_error(reqwest::StatusCode::BAD_REQUEST, "bad body".into());
        assert!(matches!(err, CoreError::InvalidRequest(_)));
        assert!(!err.is_retriable());
    }

    #[test]
    fn status_500_maps_to_upstream_error() {
        let err = map_status_error(reqwest::StatusCode::INTERNAL_SERVER_ERROR, "oops".into());
        assert!(matches!(err, CoreError::UpstreamError(_)));
        assert!(err.is_retriable());
    }
}
