//! AgentGate API server binary.

use std::net::SocketAddr;
use std::sync::Arc;

use agentgate_api::{
    create_api_router,
    telemetry::{init_tracing, TelemetryConfig},
    AdminConfig, ApiConfig, ApiError, ApiResult, AppState, CompletionConfig, RegistryConfig,
};
use agentgate_registry::RegistryStore;

#[tokio::main]
async fn main() -> ApiResult<()> {
    init_tracing(&TelemetryConfig::default())?;

    let api_config = ApiConfig::from_env();
    let admin_config = AdminConfig::from_env()?;
    let registry_config = RegistryConfig::from_env()?;
    let completion_config = CompletionConfig::from_env();

    let store = Arc::new(RegistryStore::new(registry_config.build_backend()?));
    let registry = store.load().await?;
    tracing::info!(
        backend = %store.backend_description(),
        agents = registry.len(),
        "Agent registry loaded"
    );

    let provider = completion_config.build_provider()?;
    let state = AppState::new(
        store,
        provider,
        admin_config.credential.clone(),
        &api_config,
    );
    let app = create_api_router(state, api_config, &admin_config)?;

    let addr = resolve_bind_addr()?;
    tracing::info!(%addr, "Starting AgentGate API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    let server = axum::serve(listener, app);
    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}

fn resolve_bind_addr() -> ApiResult<SocketAddr> {
    let host = std::env::var("AGENTGATE_API_BIND").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port_str = std::env::var("PORT")
        .ok()
        .or_else(|| std::env::var("AGENTGATE_API_PORT").ok())
        .unwrap_or_else(|| "3000".to_string());
    let port = port_str
        .parse::<u16>()
        .map_err(|_| ApiError::internal_error(format!("Invalid port value: {}", port_str)))?;

    let addr = format!("{}:{}", host, port);
    addr.parse::<SocketAddr>()
        .map_err(|e| ApiError::internal_error(format!("Invalid bind address {}: {}", addr, e)))
}
