//! AgentGate Registry - durable agent registry and authorization gate
//!
//! [`RegistryStore`] owns the process-wide registry and serializes every
//! mutation through one read-modify-write transaction. [`AuthorizationGate`]
//! answers "may this agent do that" against the store's current snapshot,
//! and [`discovery`] ranks agents for lookup.

pub mod backend;
pub mod discovery;
pub mod gate;
pub mod store;

pub use backend::{JsonFileBackend, LmdbBackend, MemoryBackend, RegistryBackend};
pub use discovery::{discover, DiscoveryOutcome, DiscoveryQuery, ScoredAgent, Stage};
pub use gate::{evaluate, AuthorizationGate, Decision};
pub use store::RegistryStore;
