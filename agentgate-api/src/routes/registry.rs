//! Registry REST API Routes
//!
//! Discovery and single-agent reads are public unless
//! `AGENTGATE_PROTECT_READS` is set. Mutations always require the admin
//! key; the guard extractor runs before the body is read.

use std::sync::Arc;
use std::time::Instant;

use agentgate_core::{AgentPatch, AgentRegistration, StorageError};
use agentgate_registry::{discover, DiscoveryQuery, RegistryStore};
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{ApiError, ApiResult};
use crate::middleware::{AdminGuard, ReadGuard};
use crate::state::{AppState, DiscoverySettings};
use crate::telemetry::METRICS;
use crate::types::{DeleteResponse, DiscoveryParams, DiscoveryResponse, RegistryMutationResponse};

// ============================================================================
// HELPERS
// ============================================================================

/// Parse a JSON object body. Anything else is `INVALID_BODY`.
fn parse_object<T: DeserializeOwned>(body: &[u8]) -> ApiResult<T> {
    let value: Value = serde_json::from_slice(body)?;
    if !value.is_object() {
        return Err(ApiError::invalid_body("Request body must be a JSON object"));
    }
    Ok(serde_json::from_value(value)?)
}

fn record_mutation<T>(operation: &str, result: &Result<T, StorageError>) {
    if let Ok(m) = METRICS.as_ref() {
        m.record_registry_mutation(operation, result.is_ok());
    }
}

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// GET /api/registry/discover - List or search agents
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/api/registry/discover",
    tag = "Registry",
    params(DiscoveryParams),
    responses(
        (status = 200, description = "Matching agents, best first", body = DiscoveryResponse),
        (status = 401, description = "Reads are protected and the admin key is missing or wrong", body = ApiError),
        (status = 500, description = "Registry could not be read", body = ApiError),
    ),
))]
pub async fn discover_agents(
    _guard: ReadGuard,
    State(store): State<Arc<RegistryStore>>,
    State(settings): State<DiscoverySettings>,
    Query(params): Query<DiscoveryParams>,
) -> ApiResult<impl IntoResponse> {
    let start = Instant::now();
    let registry = store.load().await?;

    let query = DiscoveryQuery {
        q: params.q.clone(),
        top: params.top(),
    };
    let outcome = discover(&registry, &query, settings.default_top);
    let total_ms = start.elapsed().as_secs_f64() * 1000.0;

    tracing::debug!(
        q = query.term().unwrap_or_default(),
        stage = outcome.stage.strategy(),
        candidates = outcome.ranked.len(),
        "Discovery completed"
    );

    Ok(Json(DiscoveryResponse::from_outcome(
        params.q.clone(),
        query.term(),
        outcome,
        params.debug(),
        total_ms,
    )))
}

/// POST /api/registry/register - Create or replace an agent
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/api/registry/register",
    tag = "Registry",
    request_body = AgentRegistration,
    responses(
        (status = 200, description = "Agent stored", body = RegistryMutationResponse),
        (status = 400, description = "Missing agent_id/appid or name, or malformed JSON", body = ApiError),
        (status = 401, description = "Admin key missing or wrong", body = ApiError),
        (status = 500, description = "Registry could not be persisted", body = ApiError),
    ),
    security(("admin_key" = []))
))]
pub async fn register_agent(
    _admin: AdminGuard,
    State(store): State<Arc<RegistryStore>>,
    body: Bytes,
) -> ApiResult<impl IntoResponse> {
    let registration: AgentRegistration = parse_object(&body)?;
    let record = registration.into_record()?;

    let result = store.upsert(record).await;
    record_mutation("register", &result);
    let agent = result?;

    tracing::info!(agent_id = %agent.agent_id, roles = %agent.roles, "Agent registered");
    Ok(Json(RegistryMutationResponse::ok(agent)))
}

/// GET /api/registry/agents/{agent_id} - Fetch one agent
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/api/registry/agents/{agent_id}",
    tag = "Registry",
    params(("agent_id" = String, Path, description = "Agent identifier")),
    responses(
        (status = 200, description = "Agent record", body = agentgate_core::AgentRecord),
        (status = 401, description = "Reads are protected and the admin key is missing or wrong", body = ApiError),
        (status = 404, description = "No such agent", body = ApiError),
    ),
))]
pub async fn get_agent(
    _guard: ReadGuard,
    State(store): State<Arc<RegistryStore>>,
    Path(agent_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let agent = store
        .get(&agent_id)
        .await?
        .ok_or_else(|| ApiError::agent_not_found(&agent_id))?;
    Ok(Json(agent))
}

/// PATCH /api/registry/agents/{agent_id} - Partially update an agent
#[cfg_attr(feature = "openapi", utoipa::path(
    patch,
    path = "/api/registry/agents/{agent_id}",
    tag = "Registry",
    params(("agent_id" = String, Path, description = "Agent identifier")),
    request_body = AgentPatch,
    responses(
        (status = 200, description = "Agent updated", body = RegistryMutationResponse),
        (status = 400, description = "Malformed patch", body = ApiError),
        (status = 401, description = "Admin key missing or wrong", body = ApiError),
        (status = 404, description = "No such agent", body = ApiError),
        (status = 500, description = "Registry could not be persisted", body = ApiError),
    ),
    security(("admin_key" = []))
))]
pub async fn update_agent(
    _admin: AdminGuard,
    State(store): State<Arc<RegistryStore>>,
    Path(agent_id): Path<String>,
    body: Bytes,
) -> ApiResult<impl IntoResponse> {
    let patch: AgentPatch = parse_object(&body)?;
    patch.validate()?;

    let result = store.patch(&agent_id, patch).await;
    record_mutation("update", &result);
    let agent = result?;

    tracing::info!(agent_id = %agent.agent_id, enabled = agent.enabled, "Agent updated");
    Ok(Json(RegistryMutationResponse::ok(agent)))
}

/// DELETE /api/registry/agents/{agent_id} - Remove an agent
#[cfg_attr(feature = "openapi", utoipa::path(
    delete,
    path = "/api/registry/agents/{agent_id}",
    tag = "Registry",
    params(("agent_id" = String, Path, description = "Agent identifier")),
    responses(
        (status = 200, description = "Agent removed", body = DeleteResponse),
        (status = 401, description = "Admin key missing or wrong", body = ApiError),
        (status = 404, description = "No such agent", body = ApiError),
        (status = 500, description = "Registry could not be persisted", body = ApiError),
    ),
    security(("admin_key" = []))
))]
pub async fn delete_agent(
    _admin: AdminGuard,
    State(store): State<Arc<RegistryStore>>,
    Path(agent_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let result = store.delete(&agent_id).await;
    record_mutation("delete", &result);

    if !result? {
        return Err(ApiError::agent_not_found(&agent_id));
    }

    tracing::info!(%agent_id, "Agent deleted");
    Ok(Json(DeleteResponse::ok(agent_id)))
}

// ============================================================================
// ROUTER
// ============================================================================

/// Create the registry router, mounted under `/api/registry`.
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/discover", get(discover_agents))
        .route("/register", post(register_agent))
        .route(
            "/agents/:agent_id",
            get(get_agent).patch(update_agent).delete(delete_agent),
        )
}
