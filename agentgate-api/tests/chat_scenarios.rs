//! Chat dispatch scenarios through the real router.

mod support;

use std::sync::Arc;

use agentgate_core::{LlmError, CHAT_INVOKE_ROLE};
use agentgate_llm::ChatRole;
use agentgate_test_utils::{fixtures, MockCompletionProvider};
use axum::http::StatusCode;
use serde_json::json;

use support::*;

const HELLO: &str = r#"{"message":"hello there"}"#;

#[tokio::test]
async fn authorized_chat_returns_answer_with_registry_roles() {
    let (_backend, store) = fixtures::memory_store([fixtures::chat_agent("AGENT-1", "Planner")]);
    let provider = Arc::new(MockCompletionProvider::answering("General Kenobi"));
    let app = test_app(store, provider.clone());

    let (status, body) = send(&app, chat(Some("AGENT-1"), Some("something.else"), HELLO)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "agent_id": "AGENT-1",
            "agent_roles": [CHAT_INVOKE_ROLE],
            "agent_name": "Planner",
            "answer": "General Kenobi",
        })
    );

    assert_eq!(provider.call_count(), 1);
    let messages = provider.last_messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, ChatRole::System);
    assert_eq!(messages[0].content, "You are agent 'Planner'. Be concise.");
    assert_eq!(messages[1].role, ChatRole::User);
    assert_eq!(messages[1].content, "hello there");
}

#[tokio::test]
async fn chat_without_role_is_missing_role() {
    let (_backend, store) = fixtures::memory_store([fixtures::roleless_agent("AGENT-1", "A1")]);
    let provider = Arc::new(MockCompletionProvider::answering("unused"));
    let app = test_app(store, provider.clone());

    let (status, body) = send(&app, chat(Some("AGENT-1"), None, HELLO)).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "MISSING_ROLE");
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn forged_roles_header_does_not_grant_chat() {
    let (_backend, store) = fixtures::memory_store([fixtures::roleless_agent("AGENT-1", "A1")]);
    let provider = Arc::new(MockCompletionProvider::answering("unused"));
    let app = test_app(store, provider.clone());

    let (status, body) = send(&app, chat(Some("AGENT-1"), Some(CHAT_INVOKE_ROLE), HELLO)).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "MISSING_ROLE");
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn chat_without_identity_is_rejected_before_body_checks() {
    let (_backend, store) = fixtures::memory_store([fixtures::chat_agent("AGENT-1", "A1")]);
    let provider = Arc::new(MockCompletionProvider::answering("unused"));
    let app = test_app(store, provider.clone());

    let (status, body) = send(&app, chat(None, None, HELLO)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "MISSING_IDENTITY");

    let (status, body) = send(&app, chat(Some("   "), None, "garbage")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "MISSING_IDENTITY");

    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn unknown_agent_is_forbidden() {
    let (_backend, store) = fixtures::empty_store();
    let provider = Arc::new(MockCompletionProvider::answering("unused"));
    let app = test_app(store, provider.clone());

    let (status, body) = send(&app, chat(Some("ghost"), None, HELLO)).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "UNKNOWN_AGENT");
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn invalid_chat_body_is_bad_request() {
    let (_backend, store) = fixtures::memory_store([fixtures::chat_agent("AGENT-1", "A1")]);
    let provider = Arc::new(MockCompletionProvider::answering("unused"));
    let app = test_app(store, provider.clone());

    for body in ["not json", r#"["hello"]"#, r#"{"message":""}"#, r#"{"text":"hello"}"#] {
        let (status, response) = send(&app, chat(Some("AGENT-1"), None, body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body {}", body);
        assert_eq!(response["code"], "INVALID_BODY");
    }
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn backend_failure_is_upstream_error_and_registry_untouched() {
    let (backend, store) = fixtures::memory_store([fixtures::chat_agent("AGENT-1", "A1")]);
    let provider = Arc::new(MockCompletionProvider::unavailable());
    let app = test_app(store, provider.clone());
    let before = backend.persisted();

    let (status, body) = send(&app, chat(Some("AGENT-1"), None, HELLO)).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["code"], "UPSTREAM_ERROR");
    assert!(!body["message"].as_str().unwrap_or_default().contains("exploded"));
    assert_eq!(provider.call_count(), 1);
    assert_eq!(backend.save_count(), 0);
    assert_eq!(backend.persisted(), before);
}

#[tokio::test]
async fn unconfigured_backend_is_upstream_error() {
    let (_backend, store) = fixtures::memory_store([fixtures::chat_agent("AGENT-1", "A1")]);
    let provider = Arc::new(MockCompletionProvider::failing(LlmError::ProviderNotConfigured));
    let app = test_app(store, provider);

    let (status, body) = send(&app, chat(Some("AGENT-1"), None, HELLO)).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["code"], "UPSTREAM_ERROR");
}

#[tokio::test]
async fn disabling_an_agent_revokes_chat() {
    let (_backend, store) = fixtures::empty_store();
    let provider = Arc::new(MockCompletionProvider::answering("hi"));
    let app = test_app(store, provider.clone());

    let (status, _) = send(
        &app,
        register(r#"{"agent_id":"AGENT-1","name":"A1","roles":["agent.chat.invoke"]}"#),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, chat(Some("AGENT-1"), None, HELLO)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, patch("AGENT-1", r#"{"enabled":false}"#)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, chat(Some("AGENT-1"), None, HELLO)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "UNKNOWN_AGENT");
    assert_eq!(provider.call_count(), 1);
}

#[tokio::test]
async fn padded_registration_id_is_reachable_by_chat() {
    let (_backend, store) = fixtures::empty_store();
    let provider = Arc::new(MockCompletionProvider::answering("hi"));
    let app = test_app(store, provider.clone());

    let (status, body) = send(
        &app,
        register(r#"{"agent_id":" AGENT-9 ","name":" Nine ","roles":["agent.chat.invoke"]}"#),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["agent"]["agent_id"], "AGENT-9");
    assert_eq!(body["agent"]["name"], "Nine");

    let (status, body) = send(&app, chat(Some(" AGENT-9 "), None, HELLO)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["agent_id"], "AGENT-9");
    assert_eq!(provider.call_count(), 1);
}
