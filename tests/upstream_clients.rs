//! Upstream clients against a mock HTTP server

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use relay_chat_bot::llm::providers::{DeepInfraProvider, StabilityProvider};
use relay_chat_bot::llm::{ImageProvider, TextProvider, UpstreamError};
use relay_chat_bot::retry::{NoopObserver, RetryError, RetryPolicy};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn text_provider(server: &MockServer) -> DeepInfraProvider {
    DeepInfraProvider::new(
        Some("test-key".to_string()),
        &format!("{}/chat", server.uri()),
        "test-model",
    )
    .with_policy(RetryPolicy::immediate())
}

fn image_provider(server: &MockServer) -> StabilityProvider {
    StabilityProvider::new(
        Some("image-key".to_string()),
        &format!("{}/image", server.uri()),
    )
    .with_policy(RetryPolicy::immediate())
}

fn completion(content: &str) -> serde_json::Value {
    json!({"choices": [{"message": {"role": "assistant", "content": content}}]})
}

#[tokio::test]
async fn test_chat_returns_completion_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({
            "model": "test-model",
            "max_tokens": 800,
            "messages": [
                {"role": "system", "content": "Ты полезный ассистент. Отвечай на русском языке."},
                {"role": "user", "content": "Привет"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("Здравствуйте!")))
        .expect(1)
        .mount(&server)
        .await;

    let answer = text_provider(&server).chat("Привет").await;
    assert_eq!(answer.ok().as_deref(), Some("Здравствуйте!"));
}

#[tokio::test]
async fn test_auth_error_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .expect(1)
        .mount(&server)
        .await;

    let result = text_provider(&server).chat("Привет").await;
    match result {
        Err(RetryError::Aborted(UpstreamError::ClientError { status, message })) => {
            assert_eq!(status, 401);
            assert_eq!(message, "invalid api key");
        }
        other => panic!("expected an aborted 401, got {other:?}"),
    }
}

#[tokio::test]
async fn test_rate_limit_exhausts_after_five_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .respond_with(ResponseTemplate::new(429))
        .expect(5)
        .mount(&server)
        .await;

    let result = text_provider(&server).chat("Привет").await;
    match result {
        Err(RetryError::Exhausted { attempts, last }) => {
            assert_eq!(attempts, 5);
            assert_eq!(last, UpstreamError::RateLimited);
        }
        other => panic!("expected exhaustion, got {other:?}"),
    }
}

#[tokio::test]
async fn test_transient_failure_then_success() {
    let server = MockServer::start().await;
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    Mock::given(method("POST"))
        .and(path("/chat"))
        .respond_with(move |_req: &wiremock::Request| {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                ResponseTemplate::new(503).set_body_string("Service Unavailable")
            } else {
                ResponseTemplate::new(200).set_body_json(completion("ok"))
            }
        })
        .expect(3)
        .mount(&server)
        .await;

    let answer = text_provider(&server).chat("ping").await;
    assert_eq!(answer.ok().as_deref(), Some("ok"));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_not_found_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .respond_with(ResponseTemplate::new(404))
        .expect(5)
        .mount(&server)
        .await;

    let result = text_provider(&server).chat("ping").await;
    assert!(matches!(result, Err(RetryError::Exhausted { attempts: 5, .. })));
}

#[tokio::test]
async fn test_timeout_is_retried() {
    let server = MockServer::start().await;
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    Mock::given(method("POST"))
        .and(path("/chat"))
        .respond_with(move |_req: &wiremock::Request| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                ResponseTemplate::new(200)
                    .set_delay(Duration::from_secs(5))
                    .set_body_json(completion("late"))
            } else {
                ResponseTemplate::new(200).set_body_json(completion("on time"))
            }
        })
        .mount(&server)
        .await;

    let provider = text_provider(&server).with_timeout(Duration::from_millis(200));
    let answer = provider.chat("ping").await;
    assert_eq!(answer.ok().as_deref(), Some("on time"));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_malformed_success_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .expect(1)
        .mount(&server)
        .await;

    let result = text_provider(&server).chat("ping").await;
    assert!(matches!(result, Err(RetryError::Aborted(UpstreamError::Decode(_)))));
}

#[tokio::test]
async fn test_translate_falls_back_to_input_on_server_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(5)
        .mount(&server)
        .await;

    let translated = text_provider(&server).translate("рыжий кот").await;
    assert_eq!(translated, "рыжий кот");
}

#[tokio::test]
async fn test_translate_uses_translation_parameters() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .and(body_partial_json(json!({"max_tokens": 500})))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("  red cat \n")))
        .expect(1)
        .mount(&server)
        .await;

    let translated = text_provider(&server).translate("рыжий кот").await;
    assert_eq!(translated, "red cat");
}

#[tokio::test]
async fn test_probe_is_a_single_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .and(body_partial_json(json!({"max_tokens": 10})))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    assert!(!text_provider(&server).probe().await);
}

#[tokio::test]
async fn test_generate_image_decodes_artifacts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/image"))
        .and(header("authorization", "Bearer image-key"))
        .and(header("accept", "application/json"))
        .and(body_partial_json(json!({
            "text_prompts": [{"text": "red cat", "weight": 1.0}],
            "cfg_scale": 7,
            "height": 1024,
            "width": 1024,
            "samples": 1,
            "steps": 30
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "artifacts": [{"base64": BASE64.encode(b"\x89PNG fake"), "seed": 1}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let images = image_provider(&server)
        .generate_image("red cat", &NoopObserver)
        .await;
    assert_eq!(images.ok(), Some(vec![b"\x89PNG fake".to_vec()]));
}

#[tokio::test]
async fn test_generate_image_bad_request_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/image"))
        .respond_with(ResponseTemplate::new(400).set_body_string("invalid prompts"))
        .expect(1)
        .mount(&server)
        .await;

    let result = image_provider(&server)
        .generate_image("forbidden", &NoopObserver)
        .await;
    assert!(matches!(
        result,
        Err(RetryError::Aborted(UpstreamError::ClientError { status: 400, .. }))
    ));
}

#[tokio::test]
async fn test_generate_image_without_key_skips_network() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let provider = StabilityProvider::new(None, &format!("{}/image", server.uri()))
        .with_policy(RetryPolicy::immediate());
    let result = provider.generate_image("cat", &NoopObserver).await;
    assert!(matches!(
        result,
        Err(RetryError::Aborted(UpstreamError::Configuration(_)))
    ));
}
