//! AgentGate LLM - completion backend boundary
//!
//! Defines the [`CompletionProvider`] trait the chat dispatcher calls, plus
//! the Azure OpenAI implementation. Providers make exactly one attempt per
//! call and report failure immediately.

use agentgate_core::LlmError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod azure;

pub use azure::{AzureOpenAIConfig, AzureOpenAIProvider};

/// Result type alias for completion calls.
pub type LlmResult<T> = Result<T, LlmError>;

// ============================================================================
// MESSAGES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// One turn of a chat conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

// ============================================================================
// PROVIDER TRAIT
// ============================================================================

/// Produces a chat completion for a conversation.
///
/// Implementations must be thread-safe; one instance is shared by every
/// request handler.
#[async_trait]
pub trait CompletionProvider: Send + Sync + std::fmt::Debug {
    /// Return the assistant's answer text.
    async fn complete(&self, messages: &[ChatMessage]) -> LlmResult<String>;

    /// Identifier of the backing model or deployment.
    fn model_id(&self) -> &str;
}

/// Stand-in used when no backend is configured. Every call fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredProvider;

#[async_trait]
impl CompletionProvider for UnconfiguredProvider {
    async fn complete(&self, _messages: &[ChatMessage]) -> LlmResult<String> {
        Err(LlmError::ProviderNotConfigured)
    }

    fn model_id(&self) -> &str {
        "unconfigured"
    }
}

// ============================================================================
// ERROR HELPERS
// ============================================================================

pub(crate) fn request_failed(provider: &str, status: i32, message: impl Into<String>) -> LlmError {
    LlmError::RequestFailed {
        provider: provider.to_string(),
        status,
        message: message.into(),
    }
}

pub(crate) fn invalid_response(provider: &str, reason: impl Into<String>) -> LlmError {
    LlmError::InvalidResponse {
        provider: provider.to_string(),
        reason: reason.into(),
    }
}

pub(crate) fn rate_limited(provider: &str, retry_after_ms: i64) -> LlmError {
    LlmError::RateLimited {
        provider: provider.to_string(),
        retry_after_ms,
    }
}
