//! Integration tests for `AnthropicClient` using wiremock HTTP mocks.

use sigscope_analysis::{AnalysisError, AnthropicClient, AnthropicConfig, LlmClient};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(base_url: &str, max_retries: u32) -> AnthropicClient {
    AnthropicClient::new(AnthropicConfig {
        api_key: "test-key".to_string(),
        base_url: base_url.to_string(),
        model: "claude-test".to_string(),
        max_tokens: 256,
        timeout_secs: 5,
        max_retries,
    })
    .expect("client construction should not fail")
    .with_backoff_base_ms(0)
}

fn text_response(text: &str) -> serde_json::Value {
    serde_json::json!({
        "id": "msg_01",
        "type": "message",
        "role": "assistant",
        "content": [{ "type": "text", "text": text }],
        "stop_reason": "end_turn"
    })
}

#[tokio::test]
async fn complete_returns_text_content() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "test-key"))
        .and(header("anthropic-version", "2023-06-01"))
        .and(body_partial_json(serde_json::json!({
            "model": "claude-test",
            "max_tokens": 256,
            "messages": [{ "role": "user", "content": "find themes" }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_response("[]")))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri(), 0);
    let text = client.complete("find themes").await.expect("should complete");
    assert_eq!(text, "[]");
}

#[tokio::test]
async fn complete_joins_text_blocks_and_skips_others() {
    let server = MockServer::start().await;

    let body = serde_json::json!({
        "content": [
            { "type": "text", "text": "[{\"theme\":" },
            { "type": "tool_use", "id": "t1", "name": "noop", "input": {} },
            { "type": "text", "text": " \"x\"}]" }
        ]
    });
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let client = test_client(&server.uri(), 0);
    let text = client.complete("p").await.expect("should complete");
    assert_eq!(text, "[{\"theme\": \"x\"}]");
}

#[tokio::test]
async fn auth_failure_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid x-api-key"))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri(), 3);
    let err = client.complete("p").await.unwrap_err();
    match err {
        AnalysisError::Api { status, body } => {
            assert_eq!(status, 401);
            assert!(body.contains("invalid"));
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn overloaded_response_is_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(529).set_body_string("overloaded"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_response("ok")))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri(), 2);
    let text = client.complete("p").await.expect("retry should succeed");
    assert_eq!(text, "ok");
}

#[tokio::test]
async fn server_errors_exhaust_retries() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let client = test_client(&server.uri(), 2);
    let err = client.complete("p").await.unwrap_err();
    assert!(matches!(err, AnalysisError::Api { status: 500, .. }));
}

#[tokio::test]
async fn blank_text_is_an_empty_response() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "content": [] })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri(), 2);
    let err = client.complete("p").await.unwrap_err();
    assert!(matches!(err, AnalysisError::EmptyResponse));
}

#[tokio::test]
async fn trailing_slash_in_base_url_is_tolerated() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_response("ok")))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&format!("{}/", server.uri()), 0);
    assert_eq!(client.complete("p").await.unwrap(), "ok");
}
