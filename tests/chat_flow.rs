//! End-to-end orchestrator tests over mock embedding and runtime backends.

mod common;

use common::{BagEmbedder, FailingEmbedder, ScriptedRuntime};
use std::sync::Arc;
use tempfile::TempDir;

use mentat_server::error::ChatError;
use mentat_server::models::{ChatRequest, Role};

fn request(message: &str, model: Option<&str>) -> ChatRequest {
    ChatRequest {
        message: message.to_string(),
        model: model.map(|s| s.to_string()),
        context: None,
        session: None,
    }
}

#[tokio::test]
async fn local_chat_happy_path_cleans_reasoning_and_records_turns() {
    let tmp = TempDir::new().unwrap();
    let runtime = Arc::new(ScriptedRuntime::new(
        &["deepseek-r1:1.5b"],
        "<think>let me work this out</think>Hello from the model",
    ));
    let service = common::test_service(&tmp, Arc::new(BagEmbedder), runtime.clone()).await;

    let outcome = service
        .handle(request("hi there", Some("deepseek-r1:1.5b")))
        .await
        .unwrap();

    assert_eq!(outcome.response, "Hello from the model");

    // One user turn, one assistant turn, assistant content already cleaned.
    let window = service.sessions().recent_window(&outcome.session, 10);
    assert_eq!(window.len(), 2);
    assert_eq!(window[0].role, Role::User);
    assert_eq!(window[0].content, "hi there");
    assert_eq!(window[1].role, Role::Assistant);
    assert_eq!(window[1].content, "Hello from the model");

    // Already installed: listing happened once, nothing was pulled.
    assert_eq!(runtime.pull_calls.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[tokio::test]
async fn missing_model_falls_back_to_configured_default() {
    let tmp = TempDir::new().unwrap();
    let runtime = Arc::new(ScriptedRuntime::new(&["deepseek-r1:1.5b"], "ok"));
    let service = common::test_service(&tmp, Arc::new(BagEmbedder), runtime).await;

    let outcome = service.handle(request("hello", None)).await.unwrap();
    assert_eq!(outcome.response, "ok");
}

#[tokio::test]
async fn empty_message_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let runtime = Arc::new(ScriptedRuntime::new(&[], "unused"));
    let service = common::test_service(&tmp, Arc::new(BagEmbedder), runtime).await;

    let err = service
        .handle(request("   ", Some("deepseek-r1:1.5b")))
        .await
        .unwrap_err();
    match err {
        ChatError::Validation(message) => assert_eq!(message, "Message cannot be empty."),
        other => panic!("expected Validation, got {:?}", other),
    }
}

#[tokio::test]
async fn empty_model_name_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let runtime = Arc::new(ScriptedRuntime::new(&[], "unused"));
    let service = common::test_service(&tmp, Arc::new(BagEmbedder), runtime).await;

    let err = service.handle(request("hi", Some(""))).await.unwrap_err();
    match err {
        ChatError::Validation(message) => assert_eq!(message, "Model name is required."),
        other => panic!("expected Validation, got {:?}", other),
    }
}

#[tokio::test]
async fn unknown_model_is_unsupported_not_defaulted() {
    let tmp = TempDir::new().unwrap();
    let runtime = Arc::new(ScriptedRuntime::new(&[], "unused"));
    let service = common::test_service(&tmp, Arc::new(BagEmbedder), runtime).await;

    let err = service.handle(request("hi", Some("foo-bar"))).await.unwrap_err();
    assert!(matches!(err, ChatError::UnsupportedModel(_)));
}

#[tokio::test]
async fn provisioning_failure_leaves_user_turn_but_no_assistant_turn() {
    let tmp = TempDir::new().unwrap();
    let runtime = Arc::new(ScriptedRuntime::failing_pull(&[]));
    let service = common::test_service(&tmp, Arc::new(BagEmbedder), runtime).await;

    // Session id is minted inside handle; pre-resolve one so we can inspect
    // the log afterwards.
    let session = service.sessions().resolve(None);
    let mut req = request("hi", Some("deepseek-r1:1.5b"));
    req.session = Some(session.clone());

    let err = service.handle(req).await.unwrap_err();
    match err {
        ChatError::Provisioning { model, cause } => {
            assert_eq!(model, "deepseek-r1:1.5b");
            assert!(cause.contains("pull failed"));
        }
        other => panic!("expected Provisioning, got {:?}", other),
    }

    let window = service.sessions().recent_window(&session, 10);
    assert_eq!(window.len(), 1, "only the user turn should be recorded");
    assert_eq!(window[0].role, Role::User);
}

#[tokio::test]
async fn retrieval_failure_degrades_to_no_context() {
    let tmp = TempDir::new().unwrap();
    let runtime = Arc::new(ScriptedRuntime::new(&["deepseek-r1:1.5b"], "still fine"));
    let service = common::test_service(&tmp, Arc::new(FailingEmbedder), runtime.clone()).await;

    let outcome = service
        .handle(request("hi", Some("deepseek-r1:1.5b")))
        .await
        .unwrap();
    assert_eq!(outcome.response, "still fine");

    let prompts = runtime.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    assert!(
        !prompts[0].contains("Context:"),
        "no context block expected when retrieval fails"
    );
}

#[tokio::test]
async fn retrieved_context_and_editor_context_reach_the_prompt() {
    let tmp = TempDir::new().unwrap();
    let runtime = Arc::new(ScriptedRuntime::new(&["deepseek-r1:1.5b"], "answer"));
    let service = common::test_service(&tmp, Arc::new(BagEmbedder), runtime.clone()).await;

    // Query text identical to the stored document embeds identically, so the
    // chunk is guaranteed to clear the similarity floor.
    let doc = "The capital of France is Paris.";
    service.store().ingest("geography.md", doc).await.unwrap();

    let mut req = request(doc, Some("deepseek-r1:1.5b"));
    req.context = Some("let city = lookup(\"FR\");".to_string());
    service.handle(req).await.unwrap();

    let prompts = runtime.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    let prompt = &prompts[0];
    assert!(prompt.contains("Context:\nThe capital of France is Paris."));
    assert!(prompt.contains("Current editor context:\nlet city = lookup(\"FR\");"));
    assert!(prompt.contains(&format!("User Query: {}", doc)));
}

#[tokio::test]
async fn session_accumulates_turns_across_requests() {
    let tmp = TempDir::new().unwrap();
    let runtime = Arc::new(ScriptedRuntime::new(&["deepseek-r1:1.5b"], "reply"));
    let service = common::test_service(&tmp, Arc::new(BagEmbedder), runtime).await;

    let first = service
        .handle(request("first message", Some("deepseek-r1:1.5b")))
        .await
        .unwrap();

    let mut second = request("second message", Some("deepseek-r1:1.5b"));
    second.session = Some(first.session.clone());
    let outcome = service.handle(second).await.unwrap();

    assert_eq!(outcome.session, first.session);
    let window = service.sessions().recent_window(&outcome.session, 10);
    assert_eq!(window.len(), 4);
    assert_eq!(window[2].content, "second message");
}
