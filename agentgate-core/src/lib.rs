//! AgentGate Core - Entity Types
//!
//! Pure data structures shared by the registry, the completion client and the
//! HTTP layer. Agent records, role sets, the registry document and the error
//! taxonomy live here; no I/O happens in this crate.

use chrono::{DateTime, Utc};

mod agent;
mod error;
mod registry;
mod roles;

pub use agent::{AgentPatch, AgentRecord, AgentRegistration};
pub use error::{AgentGateError, GateResult, LlmError, StorageError, ValidationError};
pub use registry::Registry;
pub use roles::{RoleSet, CHAT_INVOKE_ROLE};

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;
