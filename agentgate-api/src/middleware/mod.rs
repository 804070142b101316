//! Request extractors for admin authentication and agent identity.

pub mod admin;
pub mod identity;

pub use admin::{AdminAuth, AdminGuard, ReadGuard};
pub use identity::{AgentIdentity, AGENT_ID_HEADER, AGENT_ROLES_HEADER};
