//! Error types for AgentGate operations

use thiserror::Error;

/// Registry storage errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Agent not found: {agent_id}")]
    AgentNotFound { agent_id: String },

    #[error("I/O failure on {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("Registry document is corrupt: {reason}")]
    Corrupt { reason: String },

    #[error("Serialization failed: {reason}")]
    Serialization { reason: String },

    #[error("{backend} backend failure: {reason}")]
    Backend { backend: String, reason: String },

    #[error("Injected write failure")]
    WriteRejected,
}

/// Completion backend errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LlmError {
    #[error("No completion provider configured")]
    ProviderNotConfigured,

    #[error("Request to {provider} failed with status {status}: {message}")]
    RequestFailed {
        provider: String,
        status: i32,
        message: String,
    },

    #[error("Rate limited by {provider}, retry after {retry_after_ms}ms")]
    RateLimited {
        provider: String,
        retry_after_ms: i64,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },
}

/// Payload validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing required fields: {fields}")]
    RequiredFieldMissing { fields: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Malformed payload: {reason}")]
    MalformedPayload { reason: String },
}

/// Master error type for all AgentGate errors.
#[derive(Debug, Clone, Error)]
pub enum AgentGateError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// Result type alias for AgentGate operations.
pub type GateResult<T> = Result<T, AgentGateError>;

// =============================================================================
// TESTS
// =============================================================================
