//! AgentGate API - HTTP layer
//!
//! Exposes the agent registry admin API, the role-gated chat endpoint,
//! health probes and Prometheus metrics over Axum. Registry state lives in
//! one [`agentgate_registry::RegistryStore`] shared through [`AppState`].

#[macro_use]
pub mod macros;

pub mod auth;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod middleware;
#[cfg(feature = "openapi")]
pub mod openapi;
pub mod routes;
pub mod state;
pub mod telemetry;
pub mod types;

pub use auth::{AdminConfig, AdminCredential, ADMIN_KEY_HEADER, DEFAULT_ADMIN_KEY};
pub use config::{ApiConfig, CompletionConfig, RegistryBackendKind, RegistryConfig};
pub use dispatch::{ChatDispatcher, ChatError};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use middleware::{AdminAuth, AgentIdentity, AGENT_ID_HEADER, AGENT_ROLES_HEADER};
#[cfg(feature = "openapi")]
pub use openapi::ApiDoc;
pub use routes::{build_cors_layer, create_api_router, SecureRouterBuilder};
pub use state::AppState;
pub use types::*;
