//! Agent records and the payloads that create or modify them.

use crate::{RoleSet, Timestamp, ValidationError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Keys that callers can never set through the open metadata map.
const RESERVED_KEYS: [&str; 3] = ["agent_id", "createdAt", "updatedAt"];

fn default_enabled() -> bool {
    true
}

// ============================================================================
// AGENT RECORD
// ============================================================================

/// One registered caller identity.
///
/// Unknown fields supplied at registration are kept in `extra` and written
/// back verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AgentRecord {
    /// Stable, case-sensitive identifier of the calling principal
    #[serde(default)]
    pub agent_id: String,

    /// Display name
    pub name: String,

    /// Capability tokens held by this agent
    #[serde(default)]
    #[cfg_attr(feature = "openapi", schema(value_type = Vec<String>))]
    pub roles: RoleSet,

    /// Disabled agents are unknown to the authorization gate
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Application id asserted by the upstream gateway
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appid: Option<String>,

    #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "date-time"))]
    pub created_at: Option<Timestamp>,

    #[serde(rename = "updatedAt", default, skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "date-time"))]
    pub updated_at: Option<Timestamp>,

    /// Free-form metadata preserved across updates
    #[serde(flatten)]
    #[cfg_attr(feature = "openapi", schema(value_type = Object))]
    pub extra: Map<String, Value>,
}

impl AgentRecord {
    /// Minimal enabled record with no roles.
    pub fn new(agent_id: impl Into<String>, name: impl Into<String>) -> Self {
        let agent_id = agent_id.into();
        Self {
            appid: Some(agent_id.clone()),
            agent_id,
            name: name.into(),
            roles: RoleSet::new(),
            enabled: true,
            created_at: None,
            updated_at: None,
            extra: Map::new(),
        }
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.roles = roles.into_iter().collect();
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    /// Stamp timestamps for a write at `now`, keeping the first creation time.
    pub fn touch(&mut self, now: Timestamp, previous_created_at: Option<Timestamp>) {
        self.created_at = previous_created_at.or(self.created_at).or(Some(now));
        self.updated_at = Some(now);
    }
}

fn strip_reserved(extra: &mut Map<String, Value>) {
    for key in RESERVED_KEYS {
        extra.remove(key);
    }
}

/// Trimmed value, or `None` when nothing is left.
fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// ============================================================================
// REGISTRATION PAYLOAD
// ============================================================================

/// Body accepted by the register operation.
///
/// `appid` doubles as an alias for `agent_id` when the latter is absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AgentRegistration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appid: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Array of strings or a comma-separated string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Vec<String>>))]
    pub roles: Option<RoleSet>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    #[serde(flatten)]
    #[cfg_attr(feature = "openapi", schema(value_type = Object))]
    pub extra: Map<String, Value>,
}

impl AgentRegistration {
    /// Validate and build the full record, applying defaults.
    ///
    /// Timestamps are left unset; the store stamps them on write.
    pub fn into_record(self) -> Result<AgentRecord, ValidationError> {
        let appid = non_blank(self.appid);
        let agent_id = non_blank(self.agent_id).or_else(|| appid.clone());
        let name = non_blank(self.name);

        let (agent_id, name) = match (agent_id, name) {
            (Some(agent_id), Some(name)) => (agent_id, name),
            _ => {
                return Err(ValidationError::RequiredFieldMissing {
                    fields: "agent_id (or appid), name".to_string(),
                })
            }
        };

        let mut extra = self.extra;
        strip_reserved(&mut extra);

        Ok(AgentRecord {
            appid: Some(appid.unwrap_or_else(|| agent_id.clone())),
            agent_id,
            name,
            roles: self.roles.unwrap_or_default(),
            enabled: self.enabled.unwrap_or(true),
            created_at: None,
            updated_at: None,
            extra,
        })
    }
}

// ============================================================================
// PATCH PAYLOAD
// ============================================================================

/// Partial update merged into an existing record.
///
/// Typed fields overwrite when present; every other key lands in the
/// record's metadata map. The identifier and timestamps cannot be patched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AgentPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Vec<String>>))]
    pub roles: Option<RoleSet>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appid: Option<String>,

    #[serde(flatten)]
    #[cfg_attr(feature = "openapi", schema(value_type = Object))]
    pub extra: Map<String, Value>,
}

impl AgentPatch {
    pub fn validate(&self) -> Result<(), ValidationError> {
        match &self.name {
            Some(name) if name.trim().is_empty() => Err(ValidationError::InvalidValue {
                field: "name".to_string(),
                reason: "must not be empty".to_string(),
            }),
            _ => Ok(()),
        }
    }

    /// Merge into `record`. Does not touch timestamps.
    pub fn apply_to(mut self, record: &mut AgentRecord) {
        strip_reserved(&mut self.extra);

        if let Some(name) = non_blank(self.name) {
            record.name = name;
        }
        if let Some(roles) = self.roles {
            record.roles = roles;
        }
        if let Some(enabled) = self.enabled {
            record.enabled = enabled;
        }
        // A blank appid falls back to the agent id.
        if let Some(appid) = self.appid {
            record.appid = non_blank(Some(appid)).or_else(|| Some(record.agent_id.clone()));
        }
        record.extra.extend(self.extra);
    }
}
