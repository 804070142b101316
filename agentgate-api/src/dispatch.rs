//! Chat dispatch.
//!
//! Checks run in a fixed order: identity present, body well formed, gate
//! allows `agent.chat.invoke`, then exactly one completion call. Nothing on
//! this path writes to the registry.

use std::sync::Arc;
use std::time::Instant;

use agentgate_core::{AgentRecord, LlmError, StorageError, CHAT_INVOKE_ROLE};
use agentgate_llm::{ChatMessage, CompletionProvider};
use agentgate_registry::{AuthorizationGate, Decision};
use serde_json::Value;
use thiserror::Error;

use crate::error::ApiError;
use crate::telemetry::METRICS;
use crate::types::ChatResponse;

/// Why a chat call was refused or failed.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("missing agent identity")]
    MissingIdentity,

    #[error("invalid chat body: {0}")]
    InvalidBody(String),

    #[error("agent {agent_id} is not registered or is disabled")]
    UnknownAgent { agent_id: String },

    #[error("agent {agent_id} lacks role {required_role}")]
    MissingRole {
        agent_id: String,
        required_role: String,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Upstream(#[from] LlmError),
}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::MissingIdentity => ApiError::missing_identity(),
            ChatError::InvalidBody(message) => ApiError::invalid_body(message),
            ChatError::UnknownAgent { agent_id } => ApiError::unknown_agent(agent_id),
            ChatError::MissingRole {
                agent_id,
                required_role,
            } => ApiError::missing_role(agent_id, &required_role),
            ChatError::Storage(e) => e.into(),
            ChatError::Upstream(e) => e.into(),
        }
    }
}

/// Pull a non-blank `message` string out of a JSON object body.
pub fn parse_chat_message(body: &[u8]) -> Result<String, ChatError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| ChatError::InvalidBody(format!("Invalid JSON: {}", e)))?;

    let Value::Object(map) = value else {
        return Err(ChatError::InvalidBody(
            "Request body must be a JSON object".to_string(),
        ));
    };

    match map.get("message") {
        Some(Value::String(message)) if !message.trim().is_empty() => Ok(message.clone()),
        _ => Err(ChatError::InvalidBody(
            "Field 'message' must be a non-empty string".to_string(),
        )),
    }
}

fn system_prompt(agent: &AgentRecord) -> String {
    format!("You are agent '{}'. Be concise.", agent.name)
}

/// Authorizes chat calls and forwards them to the completion backend.
#[derive(Debug, Clone)]
pub struct ChatDispatcher {
    gate: AuthorizationGate,
    provider: Arc<dyn CompletionProvider>,
}

impl ChatDispatcher {
    pub fn new(gate: AuthorizationGate, provider: Arc<dyn CompletionProvider>) -> Self {
        Self { gate, provider }
    }

    pub fn provider(&self) -> &Arc<dyn CompletionProvider> {
        &self.provider
    }

    pub async fn handle_chat(
        &self,
        claimed_agent_id: Option<&str>,
        asserted_roles: Option<&str>,
        body: &[u8],
    ) -> Result<ChatResponse, ChatError> {
        let Some(claimed) = claimed_agent_id.map(str::trim).filter(|id| !id.is_empty()) else {
            record_decision(Decision::MissingIdentity.reason());
            return Err(ChatError::MissingIdentity);
        };

        let message = parse_chat_message(body)?;

        let decision = self
            .gate
            .authorize(Some(claimed), asserted_roles, CHAT_INVOKE_ROLE)
            .await?;
        record_decision(decision.reason());

        let agent = match decision {
            Decision::Allowed(agent) => agent,
            Decision::MissingIdentity => return Err(ChatError::MissingIdentity),
            Decision::UnknownAgent { agent_id } => {
                tracing::info!(%agent_id, "Chat refused: unknown or disabled agent");
                return Err(ChatError::UnknownAgent { agent_id });
            }
            Decision::MissingRole {
                agent_id,
                required_role,
            } => {
                tracing::info!(%agent_id, %required_role, "Chat refused: missing role");
                return Err(ChatError::MissingRole {
                    agent_id,
                    required_role,
                });
            }
        };

        let messages = [ChatMessage::system(system_prompt(&agent)), ChatMessage::user(message)];

        let start = Instant::now();
        let result = self.provider.complete(&messages).await;
        let elapsed = start.elapsed().as_secs_f64();
        if let Ok(m) = METRICS.as_ref() {
            m.record_completion(result.is_ok(), elapsed);
        }

        let answer = result.map_err(|e| {
            tracing::warn!(
                agent_id = %agent.agent_id,
                model = self.provider.model_id(),
                error = %e,
                "Completion backend call failed"
            );
            ChatError::Upstream(e)
        })?;

        tracing::info!(
            agent_id = %agent.agent_id,
            model = self.provider.model_id(),
            duration_ms = (elapsed * 1000.0) as u64,
            "Chat completed"
        );

        Ok(ChatResponse {
            agent_roles: agent.roles.iter().map(str::to_string).collect(),
            agent_name: agent.name,
            agent_id: agent.agent_id,
            answer,
        })
    }
}

fn record_decision(reason: &str) {
    if let Ok(m) = METRICS.as_ref() {
        m.record_authz_decision(reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_chat_message_accepts_object_with_message() {
        let message = parse_chat_message(br#"{"message":"hello","extra":1}"#);
        assert_eq!(message.ok().as_deref(), Some("hello"));
    }

    #[test]
    fn test_parse_chat_message_rejections() {
        let bodies: [&[u8]; 6] = [
            b"not json",
            b"[\"message\"]",
            b"{}",
            br#"{"message":"   "}"#,
            br#"{"message":42}"#,
            br#"{"message":null}"#,
        ];
        for body in bodies {
            assert!(
                matches!(parse_chat_message(body), Err(ChatError::InvalidBody(_))),
                "body {:?} should be rejected",
                String::from_utf8_lossy(body)
            );
        }
    }

    #[test]
    fn test_chat_errors_map_to_api_codes() {
        use crate::error::ErrorCode;

        let cases = [
            (ChatError::MissingIdentity, ErrorCode::MissingIdentity),
            (ChatError::InvalidBody("x".into()), ErrorCode::InvalidBody),
            (
                ChatError::UnknownAgent {
                    agent_id: "A".into(),
                },
                ErrorCode::UnknownAgent,
            ),
            (
                ChatError::MissingRole {
                    agent_id: "A".into(),
                    required_role: CHAT_INVOKE_ROLE.into(),
                },
                ErrorCode::MissingRole,
            ),
            (
                ChatError::Upstream(LlmError::ProviderNotConfigured),
                ErrorCode::UpstreamError,
            ),
        ];
        for (err, code) in cases {
            assert_eq!(ApiError::from(err).code, code);
        }
    }

    #[test]
    fn test_system_prompt_names_agent() {
        let agent = AgentRecord::new("AGENT-1", "Planner");
        assert_eq!(system_prompt(&agent), "You are agent 'Planner'. Be concise.");
    }
}
