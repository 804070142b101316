//! Shared helpers for the router-level integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use agentgate_api::{AdminConfig, AdminCredential, ApiConfig, AppState, SecureRouterBuilder};
use agentgate_llm::CompletionProvider;
use agentgate_registry::RegistryStore;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

pub const ADMIN_KEY: &str = "dev-admin-key";

/// Router over `store` and `provider` with the default admin key.
pub fn test_app(store: Arc<RegistryStore>, provider: Arc<dyn CompletionProvider>) -> Router {
    test_app_with(store, provider, ApiConfig::default())
}

pub fn test_app_with(
    store: Arc<RegistryStore>,
    provider: Arc<dyn CompletionProvider>,
    api_config: ApiConfig,
) -> Router {
    let credential = AdminCredential::new(ADMIN_KEY).expect("admin credential");
    let admin_config = AdminConfig {
        credential: credential.clone(),
    };
    let state = AppState::new(store, provider, credential, &api_config);
    SecureRouterBuilder::new(state, api_config, &admin_config)
        .expect("router config")
        .build()
}

/// Send a request and decode the JSON body (`Value::Null` when empty or not JSON).
pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("router is infallible");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should be readable");
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request should build")
}

pub fn admin_get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("x-admin-key", ADMIN_KEY)
        .body(Body::empty())
        .expect("request should build")
}

/// JSON request with an optional admin key.
pub fn json_request(method: &str, uri: &str, admin_key: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(key) = admin_key {
        builder = builder.header("x-admin-key", key);
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("request should build")
}

pub fn register(body: &str) -> Request<Body> {
    json_request("POST", "/api/registry/register", Some(ADMIN_KEY), body)
}

pub fn patch(agent_id: &str, body: &str) -> Request<Body> {
    json_request(
        "PATCH",
        &format!("/api/registry/agents/{}", agent_id),
        Some(ADMIN_KEY),
        body,
    )
}

pub fn delete(agent_id: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(format!("/api/registry/agents/{}", agent_id))
        .header("x-admin-key", ADMIN_KEY)
        .body(Body::empty())
        .expect("request should build")
}

/// Chat request with optional identity and asserted-roles headers.
pub fn chat(agent_id: Option<&str>, roles: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/chat")
        .header("content-type", "application/json");
    if let Some(id) = agent_id {
        builder = builder.header("x-agent-appid", id);
    }
    if let Some(roles) = roles {
        builder = builder.header("x-agent-roles", roles);
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("request should build")
}
