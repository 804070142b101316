//! AgentGate Test Utilities
//!
//! Shared test infrastructure for the AgentGate workspace:
//! - A scripted completion provider
//! - Registry and store fixtures
//! - Proptest generators for identifiers, roles and records

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub use agentgate_core::{
    AgentPatch, AgentRecord, AgentRegistration, LlmError, Registry, RoleSet, StorageError,
    CHAT_INVOKE_ROLE,
};
pub use agentgate_llm::{ChatMessage, ChatRole, CompletionProvider, LlmResult};
pub use agentgate_registry::{MemoryBackend, RegistryStore};

use async_trait::async_trait;

// ============================================================================
// MOCK COMPLETION PROVIDER
// ============================================================================

#[derive(Debug, Clone)]
enum Script {
    Answer(String),
    Fail(LlmError),
}

/// Completion provider that answers from a script and records every call.
#[derive(Debug)]
pub struct MockCompletionProvider {
    script: Script,
    calls: AtomicUsize,
    last_messages: Mutex<Vec<ChatMessage>>,
}

impl MockCompletionProvider {
    /// Always answer with `answer`.
    pub fn answering(answer: impl Into<String>) -> Self {
        Self::scripted(Script::Answer(answer.into()))
    }

    /// Always fail with `error`.
    pub fn failing(error: LlmError) -> Self {
        Self::scripted(Script::Fail(error))
    }

    /// Always fail like an unreachable backend returning 500.
    pub fn unavailable() -> Self {
        Self::failing(LlmError::RequestFailed {
            provider: "mock".to_string(),
            status: 500,
            message: "backend exploded".to_string(),
        })
    }

    fn scripted(script: Script) -> Self {
        Self {
            script,
            calls: AtomicUsize::new(0),
            last_messages: Mutex::new(Vec::new()),
        }
    }

    /// Number of `complete` calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Messages from the most recent call.
    pub fn last_messages(&self) -> Vec<ChatMessage> {
        self.last_messages
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl CompletionProvider for MockCompletionProvider {
    async fn complete(&self, messages: &[ChatMessage]) -> LlmResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_messages.lock() {
            *last = messages.to_vec();
        }
        match &self.script {
            Script::Answer(answer) => Ok(answer.clone()),
            Script::Fail(error) => Err(error.clone()),
        }
    }

    fn model_id(&self) -> &str {
        "mock-model"
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for AgentGate types.

    use super::*;
    use proptest::prelude::*;

    /// Agent identifiers in the shape gateways issue: `AGENT-<n>` or a slug.
    pub fn arb_agent_id() -> impl Strategy<Value = String> {
        prop_oneof![
            (1u32..10_000).prop_map(|n| format!("AGENT-{}", n)),
            "[a-z][a-z0-9-]{2,20}",
        ]
    }

    /// Dotted capability tokens such as `agent.chat.invoke`.
    pub fn arb_role() -> impl Strategy<Value = String> {
        prop_oneof![
            Just(CHAT_INVOKE_ROLE.to_string()),
            "[a-z]{2,8}\\.[a-z]{2,8}(\\.[a-z]{2,8})?",
        ]
    }

    pub fn arb_role_set() -> impl Strategy<Value = RoleSet> {
        prop::collection::vec(arb_role(), 0..5).prop_map(|roles| roles.into_iter().collect())
    }

    pub fn arb_agent_record() -> impl Strategy<Value = AgentRecord> {
        (arb_agent_id(), "[A-Za-z][A-Za-z0-9 ]{0,24}", arb_role_set(), any::<bool>()).prop_map(
            |(agent_id, name, roles, enabled)| {
                let mut record = AgentRecord::new(agent_id, name);
                record.roles = roles;
                record.enabled = enabled;
                record
            },
        )
    }

    /// A registry of up to `max` records with distinct identifiers.
    pub fn arb_registry(max: usize) -> impl Strategy<Value = Registry> {
        prop::collection::vec(arb_agent_record(), 0..max).prop_map(|records| {
            let mut registry = Registry::new();
            for record in records {
                registry.insert(record);
            }
            registry
        })
    }

    /// Admin key candidates, printable ASCII.
    pub fn arb_admin_key() -> impl Strategy<Value = String> {
        "[!-~]{1,48}"
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built records and stores for common scenarios.

    use super::*;

    /// Enabled agent holding `agent.chat.invoke`.
    pub fn chat_agent(agent_id: &str, name: &str) -> AgentRecord {
        AgentRecord::new(agent_id, name).with_roles([CHAT_INVOKE_ROLE])
    }

    /// Enabled agent without any roles.
    pub fn roleless_agent(agent_id: &str, name: &str) -> AgentRecord {
        AgentRecord::new(agent_id, name)
    }

    pub fn disabled_chat_agent(agent_id: &str, name: &str) -> AgentRecord {
        chat_agent(agent_id, name).with_enabled(false)
    }

    pub fn registry_with(records: impl IntoIterator<Item = AgentRecord>) -> Registry {
        let mut registry = Registry::new();
        for record in records {
            registry.insert(record);
        }
        registry
    }

    /// In-memory backend pre-populated with `records`, plus a store over it.
    pub fn memory_store(
        records: impl IntoIterator<Item = AgentRecord>,
    ) -> (Arc<MemoryBackend>, Arc<RegistryStore>) {
        let backend = Arc::new(MemoryBackend::with_registry(registry_with(records)));
        let store = Arc::new(RegistryStore::new(backend.clone()));
        (backend, store)
    }

    /// Store over an empty, already-initialized in-memory registry.
    pub fn empty_store() -> (Arc<MemoryBackend>, Arc<RegistryStore>) {
        memory_store(Vec::new())
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions over registry state.

    use super::*;

    /// Assert two registries hold exactly the same records.
    #[track_caller]
    pub fn assert_same_agents(left: &Registry, right: &Registry) {
        let left: Vec<&AgentRecord> = left.records().collect();
        let right: Vec<&AgentRecord> = right.records().collect();
        assert_eq!(left, right, "registries differ");
    }

    /// Assert the record carries the role.
    #[track_caller]
    pub fn assert_has_role(record: &AgentRecord, role: &str) {
        assert!(
            record.has_role(role),
            "agent {} lacks role {} (has {})",
            record.agent_id,
            role,
            record.roles
        );
    }
}
