//! HTTP-level tests for the OpenAI-compatible provider against a local mock server.

use std::sync::Arc;
use std::time::Duration;

use mockito::{Matcher, Server, ServerGuard};
use serde_json::json;

use docrelay_llm::providers::openai::{CompletionSettings, OpenAiProvider};
use docrelay_llm::{LlmError, LlmProvider, LogObserver, Message, RetryPolicy, Transport};

const COMPLETION_PATH: &str = "/v1/chat/completions";

fn settings(top_p: Option<f32>) -> CompletionSettings {
    CompletionSettings {
        model: "gpt-4o-mini".into(),
        max_tokens: 8192,
        temperature: 0.2,
        top_p,
    }
}

fn provider(server: &ServerGuard, top_p: Option<f32>) -> OpenAiProvider {
    OpenAiProvider::new(
        "sk-test".into(),
        format!("{}{}", server.url(), COMPLETION_PATH),
        settings(top_p),
    )
    .unwrap()
}

fn completion(content: &str) -> String {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [
            { "index": 0, "message": { "role": "assistant", "content": content }, "finish_reason": "stop" }
        ]
    })
    .to_string()
}

fn messages() -> Vec<Message> {
    vec![
        Message::system("Clean up OCR output."),
        Message::assistant("Previous cleaned chunk."),
        Message::user("Next chunk text."),
    ]
}

#[tokio::test]
async fn posts_payload_and_extracts_first_choice() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", COMPLETION_PATH)
        .match_header("authorization", "Bearer sk-test")
        .match_header("accept", "application/json")
        .match_header("content-type", "application/json")
        .match_body(Matcher::PartialJson(json!({
            "model": "gpt-4o-mini",
            "max_tokens": 8192,
            "messages": [
                { "role": "system", "content": "Clean up OCR output." },
                { "role": "assistant", "content": "Previous cleaned chunk." },
                { "role": "user", "content": "Next chunk text." }
            ]
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(completion("Cleaned."))
        .expect(1)
        .create_async()
        .await;

    let text = provider(&server, None).complete(&messages()).await.unwrap();
    assert_eq!(text, "Cleaned.");
    mock.assert_async().await;
}

#[tokio::test]
async fn includes_top_p_when_configured() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", COMPLETION_PATH)
        .match_body(Matcher::PartialJson(json!({ "top_p": 0.5 })))
        .with_status(200)
        .with_body(completion("ok"))
        .expect(1)
        .create_async()
        .await;

    provider(&server, Some(0.5)).complete(&messages()).await.unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn non_success_status_is_api_error() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", COMPLETION_PATH)
        .with_status(429)
        .with_body("rate limited")
        .create_async()
        .await;

    let err = provider(&server, None).complete(&messages()).await.unwrap_err();
    match err {
        LlmError::ApiError { status, body } => {
            assert_eq!(status, 429);
            assert_eq!(body, "rate limited");
        }
        other => panic!("expected ApiError, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_content_is_parse_error() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", COMPLETION_PATH)
        .with_status(200)
        .with_body(json!({ "choices": [] }).to_string())
        .create_async()
        .await;

    let err = provider(&server, None).complete(&messages()).await.unwrap_err();
    assert!(matches!(err, LlmError::ParseError(_)));
}

#[tokio::test]
async fn connection_fault_is_http_error() {
    // Nothing listens on port 1.
    let provider = OpenAiProvider::new(
        "sk-test".into(),
        format!("http://127.0.0.1:1{COMPLETION_PATH}"),
        settings(None),
    )
    .unwrap();
    let err = provider.complete(&messages()).await.unwrap_err();
    assert!(matches!(err, LlmError::HttpError(_)));
}

#[tokio::test]
async fn transport_delivers_completion_on_first_attempt() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", COMPLETION_PATH)
        .with_status(200)
        .with_body(completion("finally"))
        .expect(1)
        .create_async()
        .await;

    let transport = Transport::new(
        Arc::new(provider(&server, None)),
        RetryPolicy::new(3, Duration::from_millis(5)),
        Arc::new(LogObserver),
    );
    assert_eq!(transport.send(&messages()).await, "finally");
    mock.assert_async().await;
}

#[tokio::test]
async fn transport_surfaces_terminal_error_string() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", COMPLETION_PATH)
        .with_status(500)
        .with_body("boom")
        .expect(3)
        .create_async()
        .await;

    let transport = Transport::new(
        Arc::new(provider(&server, None)),
        RetryPolicy::new(2, Duration::from_millis(5)),
        Arc::new(LogObserver),
    );
    let delivery = transport.send_detailed(&messages()).await;
    assert!(delivery.outcome.is_failure());
    assert_eq!(delivery.outcome.attempts(), 3);
    assert_eq!(
        delivery.text,
        "Error occurred after 3 attempts: API request failed with status 500: boom"
    );
    mock.assert_async().await;
}
