//! The in-memory registry document.

use crate::AgentRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Full mapping of `agent_id` to record.
///
/// Durable form is `{"agents": {"<agent_id>": {...}}}`. On load, records
/// that omit `agent_id` inherit their map key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RegistryDocument")]
pub struct Registry {
    pub agents: BTreeMap<String, AgentRecord>,
}

#[derive(Deserialize)]
struct RegistryDocument {
    #[serde(default)]
    agents: BTreeMap<String, AgentRecord>,
}

impl From<RegistryDocument> for Registry {
    fn from(doc: RegistryDocument) -> Self {
        let agents = doc
            .agents
            .into_iter()
            .map(|(key, mut record)| {
                if record.agent_id.is_empty() {
                    record.agent_id = key.clone();
                }
                (key, record)
            })
            .collect();
        Registry { agents }
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, agent_id: &str) -> Option<&AgentRecord> {
        self.agents.get(agent_id)
    }

    pub fn get_mut(&mut self, agent_id: &str) -> Option<&mut AgentRecord> {
        self.agents.get_mut(agent_id)
    }

    /// Insert under the record's own id, returning the previous record.
    pub fn insert(&mut self, record: AgentRecord) -> Option<AgentRecord> {
        self.agents.insert(record.agent_id.clone(), record)
    }

    pub fn remove(&mut self, agent_id: &str) -> Option<AgentRecord> {
        self.agents.remove(agent_id)
    }

    pub fn contains(&self, agent_id: &str) -> bool {
        self.agents.contains_key(agent_id)
    }

    /// Records in key order.
    pub fn records(&self) -> impl Iterator<Item = &AgentRecord> {
        self.agents.values()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}
