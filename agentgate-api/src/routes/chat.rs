//! Chat REST API Route

use std::sync::Arc;

use axum::{body::Bytes, extract::State, response::IntoResponse, routing::post, Json, Router};

use crate::dispatch::ChatDispatcher;
use crate::error::ApiResult;
use crate::middleware::AgentIdentity;
use crate::state::AppState;
#[cfg(feature = "openapi")]
use crate::{
    error::ApiError,
    types::{ChatRequest, ChatResponse},
};

/// POST /api/chat - Authorized chat completion
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/api/chat",
    tag = "Chat",
    request_body = ChatRequest,
    params(
        ("x-agent-appid" = String, Header, description = "Calling agent identifier, injected by the gateway"),
        ("x-agent-roles" = Option<String>, Header, description = "Caller-asserted roles; logged, never trusted"),
    ),
    responses(
        (status = 200, description = "Completion answer", body = ChatResponse),
        (status = 400, description = "Body is not an object with a non-empty message", body = ApiError),
        (status = 401, description = "Missing agent identity", body = ApiError),
        (status = 403, description = "Agent unknown, disabled, or lacking agent.chat.invoke", body = ApiError),
        (status = 502, description = "Completion backend failed", body = ApiError),
    ),
))]
pub async fn chat(
    State(dispatcher): State<Arc<ChatDispatcher>>,
    identity: AgentIdentity,
    body: Bytes,
) -> ApiResult<impl IntoResponse> {
    let response = dispatcher
        .handle_chat(
            identity.agent_id.as_deref(),
            identity.asserted_roles.as_deref(),
            &body,
        )
        .await?;
    Ok(Json(response))
}

/// Create the chat router, mounted under `/api`.
pub fn create_router() -> Router<AppState> {
    Router::new().route("/chat", post(chat))
}
