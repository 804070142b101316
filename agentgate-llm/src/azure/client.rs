//! Azure OpenAI HTTP client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};

use super::types::{ApiError, CompletionRequest, CompletionResponse};
use crate::{invalid_response, rate_limited, request_failed, ChatMessage, CompletionProvider, LlmResult};

const PROVIDER: &str = "azure-openai";

/// Default REST API version for chat completions.
pub const DEFAULT_API_VERSION: &str = "2024-10-21";

/// Connection settings for one Azure OpenAI deployment.
#[derive(Clone)]
pub struct AzureOpenAIConfig {
    /// Resource endpoint, e.g. `https://my-resource.openai.azure.com`
    pub endpoint: String,
    pub api_key: SecretString,
    pub deployment: String,
    pub api_version: String,
    /// Whole-request timeout. `None` leaves the transport defaults in place.
    pub timeout: Option<Duration>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl AzureOpenAIConfig {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        deployment: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: SecretString::from(api_key.into()),
            deployment: deployment.into(),
            api_version: DEFAULT_API_VERSION.to_string(),
            timeout: None,
            max_tokens: None,
            temperature: None,
        }
    }

    /// Full chat completions URL for this deployment.
    pub fn completions_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint.trim_end_matches('/'),
            self.deployment,
            self.api_version
        )
    }
}

impl std::fmt::Debug for AzureOpenAIConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureOpenAIConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"[REDACTED]")
            .field("deployment", &self.deployment)
            .field("api_version", &self.api_version)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Chat completion provider backed by an Azure OpenAI deployment.
pub struct AzureOpenAIProvider {
    client: Client,
    config: AzureOpenAIConfig,
    url: String,
}

impl AzureOpenAIProvider {
    pub fn new(config: AzureOpenAIConfig) -> LlmResult<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| request_failed(PROVIDER, 0, format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: config.completions_url(),
            config,
        })
    }
}

impl std::fmt::Debug for AzureOpenAIProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureOpenAIProvider")
            .field("url", &self.url)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

#[async_trait]
impl CompletionProvider for AzureOpenAIProvider {
    async fn complete(&self, messages: &[ChatMessage]) -> LlmResult<String> {
        let body = CompletionRequest {
            messages,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let response = self
            .client
            .post(&self.url)
            .header("api-key", self.config.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| request_failed(PROVIDER, 0, format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            let parsed: CompletionResponse = response
                .json()
                .await
                .map_err(|e| invalid_response(PROVIDER, format!("Failed to parse response: {}", e)))?;
            if let Some(usage) = &parsed.usage {
                tracing::debug!(
                    deployment = %self.config.deployment,
                    prompt_tokens = usage.prompt_tokens,
                    total_tokens = usage.total_tokens,
                    "Completion usage"
                );
            }
            return extract_answer(parsed);
        }

        let retry_after_ms = parse_retry_after_ms(response.headers()).unwrap_or(0);
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(classify_failure(status, retry_after_ms, &error_text))
    }

    fn model_id(&self) -> &str {
        &self.config.deployment
    }
}

/// First choice's content; a null content is an empty answer.
fn extract_answer(response: CompletionResponse) -> LlmResult<String> {
    response
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content.unwrap_or_default())
        .ok_or_else(|| invalid_response(PROVIDER, "No choices in response"))
}

fn classify_failure(status: StatusCode, retry_after_ms: i64, error_text: &str) -> agentgate_core::LlmError {
    let message = serde_json::from_str::<ApiError>(error_text)
        .map(|api_error| api_error.error.message)
        .unwrap_or_else(|_| error_text.to_string());

    match status {
        StatusCode::TOO_MANY_REQUESTS => rate_limited(PROVIDER, retry_after_ms),
        _ => request_failed(PROVIDER, status.as_u16() as i32, message),
    }
}

fn parse_retry_after_ms(headers: &reqwest::header::HeaderMap) -> Option<i64> {
    headers
        .get("retry-after")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<f64>().ok())
        .map(|seconds| (seconds * 1000.0) as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentgate_core::LlmError;

    fn parse(raw: &str) -> CompletionResponse {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn test_completions_url() {
        let mut config = AzureOpenAIConfig::new("https://res.openai.azure.com/", "k", "gpt-4o");
        assert_eq!(
            config.completions_url(),
            "https://res.openai.azure.com/openai/deployments/gpt-4o/chat/completions?api-version=2024-10-21"
        );
        config.api_version = "2025-01-01".to_string();
        assert!(config.completions_url().ends_with("api-version=2025-01-01"));
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = AzureOpenAIConfig::new("https://res", "super-secret", "dep");
        assert!(!format!("{:?}", config).contains("super-secret"));
        let provider = AzureOpenAIProvider::new(config).unwrap();
        assert!(!format!("{:?}", provider).contains("super-secret"));
    }

    #[test]
    fn test_extract_answer() {
        let answer = extract_answer(parse(
            r#"{"choices": [{"message": {"role": "assistant", "content": "hi"}, "finish_reason": "stop"}]}"#,
        ));
        assert_eq!(answer, Ok("hi".to_string()));

        let filtered = extract_answer(parse(r#"{"choices": [{"message": {"content": null}}]}"#));
        assert_eq!(filtered, Ok(String::new()));

        let empty = extract_answer(parse(r#"{"choices": []}"#));
        assert!(matches!(empty, Err(LlmError::InvalidResponse { .. })));
    }

    #[test]
    fn test_classify_failure() {
        let err = classify_failure(
            StatusCode::UNAUTHORIZED,
            0,
            r#"{"error": {"code": "401", "message": "Access denied"}}"#,
        );
        assert_eq!(err, request_failed(PROVIDER, 401, "Access denied"));

        let err = classify_failure(StatusCode::BAD_GATEWAY, 0, "upstream down");
        assert_eq!(err, request_failed(PROVIDER, 502, "upstream down"));

        let err = classify_failure(StatusCode::TOO_MANY_REQUESTS, 1500, "");
        assert_eq!(err, rate_limited(PROVIDER, 1500));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_fails_fast() {
        let mut config = AzureOpenAIConfig::new("http://127.0.0.1:9", "k", "dep");
        config.timeout = Some(Duration::from_secs(2));
        let provider = AzureOpenAIProvider::new(config).unwrap();
        let result = provider.complete(&[ChatMessage::user("hello")]).await;
        assert!(matches!(result, Err(LlmError::RequestFailed { status: 0, .. })));
    }
}
