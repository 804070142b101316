//! Authorization gate.
//!
//! Decides whether a claimed agent identity may exercise a capability. The
//! registry's stored role set is the only authority; roles asserted by the
//! caller in a header are logged when they disagree and otherwise ignored.

use std::fmt;
use std::sync::Arc;

use agentgate_core::{AgentRecord, Registry, RoleSet, StorageError};

use crate::store::RegistryStore;

/// Outcome of an authorization check.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// No identity was supplied.
    MissingIdentity,
    /// Identity is not registered, or the agent is disabled.
    UnknownAgent { agent_id: String },
    /// Agent is known and enabled but lacks the required role.
    MissingRole {
        agent_id: String,
        required_role: String,
    },
    Allowed(AgentRecord),
}

impl Decision {
    /// Stable machine-readable reason.
    pub fn reason(&self) -> &'static str {
        match self {
            Decision::MissingIdentity => "MISSING_IDENTITY",
            Decision::UnknownAgent { .. } => "UNKNOWN_AGENT",
            Decision::MissingRole { .. } => "MISSING_ROLE",
            Decision::Allowed(_) => "ALLOWED",
        }
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed(_))
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reason())
    }
}

/// Pure decision over a registry snapshot.
pub fn evaluate(registry: &Registry, claimed_agent_id: Option<&str>, required_role: &str) -> Decision {
    let agent_id = match claimed_agent_id.map(str::trim) {
        Some(id) if !id.is_empty() => id,
        _ => return Decision::MissingIdentity,
    };

    match registry.get(agent_id) {
        Some(record) if record.enabled => {
            if record.has_role(required_role) {
                Decision::Allowed(record.clone())
            } else {
                Decision::MissingRole {
                    agent_id: agent_id.to_string(),
                    required_role: required_role.to_string(),
                }
            }
        }
        _ => Decision::UnknownAgent {
            agent_id: agent_id.to_string(),
        },
    }
}

/// Registry-backed authorization gate.
#[derive(Debug, Clone)]
pub struct AuthorizationGate {
    store: Arc<RegistryStore>,
}

impl AuthorizationGate {
    pub fn new(store: Arc<RegistryStore>) -> Self {
        Self { store }
    }

    /// Authorize `claimed_agent_id` for `required_role`.
    ///
    /// Storage failures are returned as errors, never as a decision.
    pub async fn authorize(
        &self,
        claimed_agent_id: Option<&str>,
        asserted_roles: Option<&str>,
        required_role: &str,
    ) -> Result<Decision, StorageError> {
        if claimed_agent_id.map_or(true, |id| id.trim().is_empty()) {
            return Ok(Decision::MissingIdentity);
        }

        let registry = self.store.load().await?;
        let decision = evaluate(&registry, claimed_agent_id, required_role);

        if let Some(header) = asserted_roles {
            if let Some(record) = claimed_agent_id.and_then(|id| registry.get(id.trim())) {
                let asserted = RoleSet::parse_csv(header);
                if asserted != record.roles {
                    tracing::debug!(
                        agent_id = %record.agent_id,
                        asserted = %asserted,
                        registered = %record.roles,
                        "Asserted roles differ from registry; header ignored"
                    );
                }
            }
        }

        tracing::debug!(
            agent_id = claimed_agent_id.unwrap_or_default(),
            required_role,
            decision = decision.reason(),
            "Authorization decision"
        );
        Ok(decision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use agentgate_core::CHAT_INVOKE_ROLE;
    use proptest::prelude::*;

    fn registry_with(records: Vec<AgentRecord>) -> Registry {
        let mut registry = Registry::new();
        for record in records {
            registry.insert(record);
        }
        registry
    }

    fn gate_with(records: Vec<AgentRecord>) -> AuthorizationGate {
        let backend = Arc::new(MemoryBackend::with_registry(registry_with(records)));
        AuthorizationGate::new(Arc::new(RegistryStore::new(backend)))
    }

    #[test]
    fn test_blank_identity_is_missing() {
        let registry = Registry::new();
        assert_eq!(evaluate(&registry, None, CHAT_INVOKE_ROLE), Decision::MissingIdentity);
        assert_eq!(evaluate(&registry, Some("   "), CHAT_INVOKE_ROLE), Decision::MissingIdentity);
    }

    #[test]
    fn test_reason_codes_are_stable() {
        assert_eq!(Decision::MissingIdentity.reason(), "MISSING_IDENTITY");
        assert_eq!(
            Decision::UnknownAgent { agent_id: "x".into() }.reason(),
            "UNKNOWN_AGENT"
        );
        assert_eq!(
            Decision::Allowed(AgentRecord::new("x", "x")).to_string(),
            "ALLOWED"
        );
    }

    #[tokio::test]
    async fn test_allowed_agent() {
        let gate = gate_with(vec![AgentRecord::new("AGENT-1", "A1").with_roles([CHAT_INVOKE_ROLE])]);
        let decision = gate
            .authorize(Some("AGENT-1"), None, CHAT_INVOKE_ROLE)
            .await
            .unwrap();
        assert!(decision.is_allowed());
    }

    #[tokio::test]
    async fn test_asserted_roles_never_grant_access() {
        let gate = gate_with(vec![AgentRecord::new("AGENT-1", "A1").with_roles(["reader"])]);
        let decision = gate
            .authorize(Some("AGENT-1"), Some(CHAT_INVOKE_ROLE), CHAT_INVOKE_ROLE)
            .await
            .unwrap();
        assert_eq!(decision.reason(), "MISSING_ROLE");
    }

    #[tokio::test]
    async fn test_storage_failure_is_an_error() {
        let backend = Arc::new(MemoryBackend::new());
        backend.set_fail_writes(true);
        let gate = AuthorizationGate::new(Arc::new(RegistryStore::new(backend)));
        let result = gate.authorize(Some("AGENT-1"), None, CHAT_INVOKE_ROLE).await;
        assert_eq!(result, Err(StorageError::WriteRejected));
    }

    fn record_strategy() -> impl Strategy<Value = AgentRecord> {
        (
            "[A-Z]{1,3}-[0-9]{1,2}",
            prop::collection::vec(prop_oneof![Just(CHAT_INVOKE_ROLE), Just("reader"), Just("writer")], 0..3),
            any::<bool>(),
        )
            .prop_map(|(id, roles, enabled)| {
                AgentRecord::new(id.clone(), id).with_roles(roles).with_enabled(enabled)
            })
    }

    proptest! {
        #[test]
        fn prop_unregistered_ids_are_unknown(
            records in prop::collection::vec(record_strategy(), 0..6),
            probe in "[a-z]{1,8}",
        ) {
            // Registered ids are upper-case, probes are lower-case.
            let registry = registry_with(records);
            let decision = evaluate(&registry, Some(probe.as_str()), CHAT_INVOKE_ROLE);
            prop_assert_eq!(decision.reason(), "UNKNOWN_AGENT");
        }

        #[test]
        fn prop_disabled_agents_are_unknown(record in record_strategy()) {
            let record = record.with_enabled(false);
            let registry = registry_with(vec![record.clone()]);
            let decision = evaluate(&registry, Some(record.agent_id.as_str()), CHAT_INVOKE_ROLE);
            prop_assert_eq!(decision.reason(), "UNKNOWN_AGENT");
        }

        #[test]
        fn prop_enabled_without_role_is_missing_role(record in record_strategy()) {
            let roles: RoleSet = record.roles.iter().filter(|r| *r != CHAT_INVOKE_ROLE).collect();
            let record = AgentRecord { roles, ..record }.with_enabled(true);
            let registry = registry_with(vec![record.clone()]);
            let decision = evaluate(&registry, Some(record.agent_id.as_str()), CHAT_INVOKE_ROLE);
            prop_assert_eq!(decision.reason(), "MISSING_ROLE");
        }

        #[test]
        fn prop_allowed_iff_enabled_and_role(record in record_strategy()) {
            let registry = registry_with(vec![record.clone()]);
            let decision = evaluate(&registry, Some(record.agent_id.as_str()), CHAT_INVOKE_ROLE);
            prop_assert_eq!(
                decision.is_allowed(),
                record.enabled && record.has_role(CHAT_INVOKE_ROLE)
            );
        }
    }
}
