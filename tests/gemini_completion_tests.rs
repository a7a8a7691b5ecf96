//! Gemini provider and completion requester against a mock HTTP server.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use toolpilot::completion::{CompletionBackend, CompletionRequester};
use toolpilot::config::PilotConfig;
use toolpilot::error::PilotError;
use toolpilot::provider::google::GoogleProvider;
use toolpilot::provider::{ModelProvider, ProviderRequest};
use toolpilot::types::FinishReason;

fn gemini_reply(text: &str) -> serde_json::Value {
    json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": text}]},
            "finishReason": "STOP"
        }],
        "usageMetadata": {
            "promptTokenCount": 120,
            "candidatesTokenCount": 8,
            "totalTokenCount": 128
        }
    })
}

#[tokio::test]
async fn generate_text_returns_candidate_text_and_usage() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/gemini-2.0-flash:generateContent"))
        .and(query_param("key", "test-key"))
        .and(body_partial_json(json!({
            "contents": [{"role": "user", "parts": [{"text": "Query: add 2 and 3"}]}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_reply("FUNCTION_CALL: add|2|3")))
        .expect(1)
        .mount(&server)
        .await;

    let provider = GoogleProvider::new("gemini-2.0-flash", "test-key", Some(server.uri()));
    let response = provider
        .generate_text(&ProviderRequest::new("Query: add 2 and 3"))
        .await
        .unwrap();

    assert_eq!(response.text, "FUNCTION_CALL: add|2|3");
    assert_eq!(response.usage.input_tokens, 120);
    assert_eq!(response.usage.total_tokens, 128);
    assert_eq!(response.finish_reason, Some(FinishReason::Stop));
}

#[tokio::test]
async fn invalid_key_maps_to_authentication_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"code": 401, "message": "API key not valid"}
        })))
        .mount(&server)
        .await;

    let provider = GoogleProvider::new("gemini-2.0-flash", "bad", Some(server.uri()));
    let err = provider
        .generate_text(&ProviderRequest::new("hi"))
        .await
        .unwrap_err();

    assert!(matches!(err, PilotError::Authentication(msg) if msg == "API key not valid"));
}

#[tokio::test]
async fn quota_exhaustion_maps_to_rate_limit() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_string("Resource has been exhausted"))
        .mount(&server)
        .await;

    let provider = GoogleProvider::new("gemini-2.0-flash", "key", Some(server.uri()));
    let err = provider
        .generate_text(&ProviderRequest::new("hi"))
        .await
        .unwrap_err();

    assert!(matches!(err, PilotError::RateLimited { retry_after_ms: None }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn empty_candidate_list_is_an_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"candidates": []})))
        .mount(&server)
        .await;

    let provider = GoogleProvider::new("gemini-2.0-flash", "key", Some(server.uri()));
    let err = provider
        .generate_text(&ProviderRequest::new("hi"))
        .await
        .unwrap_err();

    assert!(matches!(err, PilotError::Api { status: 200, .. }));
}

#[tokio::test]
async fn requester_falls_back_to_alternate_model() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/gemini-2.0-flash:generateContent"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/models/gemini-1.5-pro:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_reply("FINAL_ANSWER: [5]")))
        .expect(1)
        .mount(&server)
        .await;

    let config = PilotConfig::default()
        .with_api_key("key")
        .with_base_url(server.uri());
    let requester = CompletionRequester::from_config(&config).unwrap();
    let completion = requester.complete("Query: add 2 and 3").await.unwrap();

    assert_eq!(completion.text, "FINAL_ANSWER: [5]");
    assert_eq!(completion.model, "gemini-1.5-pro");
}

#[tokio::test]
async fn requester_without_fallback_reports_generation_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal"))
        .expect(1)
        .mount(&server)
        .await;

    let config = PilotConfig::default()
        .with_api_key("key")
        .with_base_url(server.uri())
        .with_fallback_model(None);
    let requester = CompletionRequester::from_config(&config).unwrap();
    let err = requester.complete("hi").await.unwrap_err();

    assert!(matches!(err, PilotError::Generation(msg) if msg.contains("internal")));
}

#[tokio::test]
async fn slow_backend_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(gemini_reply("FINAL_ANSWER: late"))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let config = PilotConfig::default()
        .with_api_key("key")
        .with_base_url(server.uri())
        .with_completion_timeout(Duration::from_millis(200));
    let requester = CompletionRequester::from_config(&config).unwrap();
    let err = requester.complete("hi").await.unwrap_err();

    assert!(matches!(err, PilotError::Timeout(200)));
}
