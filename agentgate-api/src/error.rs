//! Error Types for the AgentGate API
//!
//! This module defines error handling for the HTTP layer, including:
//! - ApiError struct for structured error responses
//! - ErrorCode enum carrying the stable machine-readable reason
//! - IntoResponse implementation for Axum HTTP responses
//!
//! All errors are serialized as JSON `{code, message, details?}` with the
//! status code implied by `code`.

use agentgate_core::{AgentGateError, LlmError, StorageError, ValidationError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// ERROR CODE ENUM
// ============================================================================

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ========================================================================
    // Authentication Errors (401)
    // ========================================================================
    /// No agent identity header on a chat call
    MissingIdentity,

    /// Admin credential missing or wrong
    Unauthorized,

    // ========================================================================
    // Authorization Errors (403)
    // ========================================================================
    /// Agent not registered, or disabled
    UnknownAgent,

    /// Agent lacks the role required for the capability
    MissingRole,

    // ========================================================================
    // Request Errors (400, 404)
    // ========================================================================
    InvalidBody,

    NotFound,

    // ========================================================================
    // Server Errors (5xx)
    // ========================================================================
    /// Completion backend failed or is not configured
    UpstreamError,

    /// Registry could not be read or persisted
    StorageError,

    InternalError,
}

impl ErrorCode {
    /// Get the HTTP status code for this error code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::MissingIdentity | ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::UnknownAgent | ErrorCode::MissingRole => StatusCode::FORBIDDEN,
            ErrorCode::InvalidBody => StatusCode::BAD_REQUEST,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::UpstreamError => StatusCode::BAD_GATEWAY,
            ErrorCode::StorageError | ErrorCode::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get a default message for this error code.
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::MissingIdentity => "Missing agent identity",
            ErrorCode::Unauthorized => "Unauthorized",
            ErrorCode::UnknownAgent => "Agent is not registered or is disabled",
            ErrorCode::MissingRole => "Agent lacks the required role",
            ErrorCode::InvalidBody => "Invalid request body",
            ErrorCode::NotFound => "Not found",
            ErrorCode::UpstreamError => "Completion backend request failed",
            ErrorCode::StorageError => "Agent registry storage failed",
            ErrorCode::InternalError => "Internal server error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ============================================================================
// API ERROR STRUCT
// ============================================================================

/// Structured error response for API operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ApiError {
    /// Error code categorizing the error
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,

    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Object>))]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Create a new API error with the given code, using the default message.
    pub fn from_code(code: ErrorCode) -> Self {
        Self::new(code, code.default_message())
    }

    /// Add additional details to the error.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }

    // ========================================================================
    // Convenience constructors for common errors
    // ========================================================================

    pub fn missing_identity() -> Self {
        Self::new(ErrorCode::MissingIdentity, "Missing x-agent-appid header")
    }

    /// Uniform admin rejection; never says why.
    pub fn unauthorized() -> Self {
        Self::from_code(ErrorCode::Unauthorized)
    }

    pub fn unknown_agent(agent_id: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::UnknownAgent,
            format!("Agent {} is not registered or is disabled", agent_id),
        )
    }

    pub fn missing_role(agent_id: impl fmt::Display, role: &str) -> Self {
        Self::new(
            ErrorCode::MissingRole,
            format!("Agent {} lacks required role '{}'", agent_id, role),
        )
    }

    pub fn invalid_body(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidBody, message)
    }

    pub fn agent_not_found(agent_id: impl fmt::Display) -> Self {
        Self::new(ErrorCode::NotFound, format!("Agent {} not found", agent_id))
    }

    pub fn upstream_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::UpstreamError, message)
    }

    pub fn storage_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::StorageError, message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

// ============================================================================
// AXUM INTEGRATION
// ============================================================================

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(self)).into_response()
    }
}

// ============================================================================
// CONVERSIONS FROM DOMAIN ERRORS
// ============================================================================

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::AgentNotFound { agent_id } => ApiError::agent_not_found(agent_id),
            other => {
                // Log the full error, return a summary
                tracing::error!(error = %other, "Registry storage error");
                ApiError::from_code(ErrorCode::StorageError)
            }
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::invalid_body(err.to_string())
    }
}

impl From<LlmError> for ApiError {
    fn from(err: LlmError) -> Self {
        tracing::error!(error = %err, "Completion backend error");
        let message = match err {
            LlmError::ProviderNotConfigured => "Completion backend is not configured",
            LlmError::RateLimited { .. } => "Completion backend is rate limiting requests",
            LlmError::RequestFailed { .. } | LlmError::InvalidResponse { .. } => {
                "Completion backend request failed"
            }
        };
        ApiError::upstream_error(message)
    }
}

impl From<AgentGateError> for ApiError {
    fn from(err: AgentGateError) -> Self {
        match err {
            AgentGateError::Storage(e) => e.into(),
            AgentGateError::Llm(e) => e.into(),
            AgentGateError::Validation(e) => e.into(),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::invalid_body(format!("Invalid JSON: {}", err))
    }
}

// ============================================================================
// RESULT TYPE ALIAS
// ============================================================================

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;
