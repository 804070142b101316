//! Shared application state for Axum routers.

use std::sync::Arc;
use std::time::Instant;

use agentgate_llm::CompletionProvider;
use agentgate_registry::{AuthorizationGate, RegistryStore};

use crate::auth::AdminCredential;
use crate::config::ApiConfig;
use crate::dispatch::ChatDispatcher;
use crate::middleware::AdminAuth;

/// Discovery defaults handed to the discover handler.
#[derive(Debug, Clone, Copy)]
pub struct DiscoverySettings {
    pub default_top: usize,
}

/// Application-wide state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    /// The one registry store for this process.
    pub store: Arc<RegistryStore>,
    pub dispatcher: Arc<ChatDispatcher>,
    pub admin: AdminAuth,
    pub discovery: DiscoverySettings,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        store: Arc<RegistryStore>,
        provider: Arc<dyn CompletionProvider>,
        admin: AdminCredential,
        api_config: &ApiConfig,
    ) -> Self {
        let gate = AuthorizationGate::new(store.clone());
        Self {
            dispatcher: Arc::new(ChatDispatcher::new(gate, provider)),
            store,
            admin: AdminAuth::new(admin, api_config.protect_reads),
            discovery: DiscoverySettings {
                default_top: api_config.discovery_top_k,
            },
            start_time: Instant::now(),
        }
    }
}

crate::impl_from_ref!(Arc<RegistryStore>, store);
crate::impl_from_ref!(Arc<ChatDispatcher>, dispatcher);
crate::impl_from_ref!(AdminAuth, admin);
crate::impl_from_ref!(DiscoverySettings, discovery);
crate::impl_from_ref!(Instant, start_time);
