//! OpenAPI document for the AgentGate API
//!
//! Generated with utoipa from the route annotations and schema derives.

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use agentgate_core::{AgentPatch, AgentRecord, AgentRegistration};

use crate::auth::ADMIN_KEY_HEADER;
use crate::error::{ApiError, ErrorCode};
use crate::routes::{chat, health, registry};
use crate::telemetry::metrics;
use crate::types::{
    ChatRequest, ChatResponse, DeleteResponse, DiscoveryDiagnostics, DiscoveryResponse,
    DiscoveryTiming, RankedCandidate, RegistryMutationResponse,
};

/// OpenAPI document for AgentGate.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "AgentGate API",
        version = "0.1.0",
        description = "Agent registry, role-based authorization gate and chat dispatch in front of a language-model endpoint",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:3000", description = "Local Development")
    ),
    tags(
        (name = "Registry", description = "Agent registration, lookup and discovery"),
        (name = "Chat", description = "Role-gated chat completions"),
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Observability", description = "Prometheus metrics")
    ),
    paths(
        // === Registry Routes ===
        registry::discover_agents,
        registry::register_agent,
        registry::get_agent,
        registry::update_agent,
        registry::delete_agent,

        // === Chat Routes ===
        chat::chat,

        // === Health & Metrics ===
        health::ping,
        health::liveness,
        health::readiness,
        metrics::metrics_handler,
    ),
    components(
        schemas(
            ApiError, ErrorCode,
            AgentRecord, AgentRegistration, AgentPatch,
            RegistryMutationResponse, DeleteResponse,
            DiscoveryResponse, DiscoveryDiagnostics, DiscoveryTiming, RankedCandidate,
            ChatRequest, ChatResponse,
            health::HealthResponse, health::HealthStatus, health::HealthDetails,
            health::ComponentHealth,
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Security scheme modifier for OpenAPI document.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "admin_key",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(ADMIN_KEY_HEADER))),
            );
        }
    }
}

impl ApiDoc {
    /// Generate OpenAPI spec as JSON string.
    pub fn to_json() -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&Self::openapi())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_generation() -> Result<(), String> {
        let openapi = ApiDoc::openapi();
        assert_eq!(openapi.info.title, "AgentGate API");

        let servers = openapi
            .servers
            .as_ref()
            .ok_or_else(|| "OpenAPI servers missing".to_string())?;
        assert_eq!(servers.len(), 1);
        Ok(())
    }

    #[test]
    fn test_openapi_json_serialization() -> Result<(), String> {
        let json = ApiDoc::to_json().map_err(|e| format!("Failed to serialize OpenAPI: {}", e))?;
        serde_json::from_str::<serde_json::Value>(&json)
            .map_err(|e| format!("Generated JSON invalid: {}", e))?;
        assert!(json.contains("\"admin_key\""));
        assert!(json.contains("x-admin-key"));
        Ok(())
    }

    #[test]
    fn test_openapi_paths_exist() {
        let openapi = ApiDoc::openapi();
        let paths = &openapi.paths.paths;

        assert!(paths.contains_key("/api/registry/discover"));
        assert!(paths.contains_key("/api/registry/register"));
        assert!(paths.contains_key("/api/registry/agents/{agent_id}"));
        assert!(paths.contains_key("/api/chat"));
        assert!(paths.contains_key("/health/ready"));
        assert!(paths.contains_key("/metrics"));
    }

    #[test]
    fn test_openapi_schemas_exist() -> Result<(), String> {
        let openapi = ApiDoc::openapi();
        let components = openapi
            .components
            .as_ref()
            .ok_or_else(|| "OpenAPI components missing".to_string())?;

        for name in ["ApiError", "AgentRecord", "DiscoveryResponse", "ChatResponse"] {
            assert!(components.schemas.contains_key(name), "missing schema {}", name);
        }
        Ok(())
    }
}
