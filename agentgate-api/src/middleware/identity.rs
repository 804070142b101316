//! Agent identity headers.

use axum::{extract::FromRequestParts, http::request::Parts};
use std::convert::Infallible;

/// Header naming the calling agent.
pub const AGENT_ID_HEADER: &str = "x-agent-appid";

/// Optional header with the caller's own view of its roles. Logged when it
/// disagrees with the registry, never trusted.
pub const AGENT_ROLES_HEADER: &str = "x-agent-roles";

/// Identity claimed by the caller. Extraction never fails; the gate decides
/// what a missing identity means.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentIdentity {
    pub agent_id: Option<String>,
    pub asserted_roles: Option<String>,
}

fn header_value(parts: &Parts, name: &str) -> Option<String> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AgentIdentity
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(AgentIdentity {
            agent_id: header_value(parts, AGENT_ID_HEADER),
            asserted_roles: header_value(parts, AGENT_ROLES_HEADER),
        })
    }
}
