//! Ollama client against a mock server.

use std::time::Duration;
use url2tldr::config::RuntimeSettings;
use url2tldr::error::Url2TldrError;
use url2tldr::runtime::{Availability, ModelRuntime, OllamaRuntime};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn runtime(server: &MockServer) -> OllamaRuntime {
    let settings = RuntimeSettings {
        base_url: server.uri(),
        run_timeout_secs: 2,
        ..Default::default()
    };
    OllamaRuntime::new(&settings).expect("Failed to create runtime client")
}

#[tokio::test]
async fn test_probe_reports_version() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/version"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "version": "0.5.7" })))
        .mount(&server)
        .await;

    let availability = runtime(&server).probe().await.unwrap();
    assert_eq!(
        availability,
        Availability::Reachable {
            version: Some("0.5.7".to_string())
        }
    );
}

#[tokio::test]
async fn test_probe_foreign_service_is_unreachable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/version"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let availability = runtime(&server).probe().await.unwrap();
    assert!(!availability.is_reachable());
}

#[tokio::test]
async fn test_list_models() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "models": [
                { "name": "llama3.2:latest", "size": 2019393189 },
                { "name": "qwen2.5:7b", "size": 4683087332u64 }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let models = runtime(&server).list_models().await.unwrap();
    assert_eq!(models, vec!["llama3.2:latest", "qwen2.5:7b"]);
}

#[tokio::test]
async fn test_list_models_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "models": [] })))
        .mount(&server)
        .await;

    assert!(runtime(&server).list_models().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_run_sends_single_user_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(serde_json::json!({
            "model": "llama3.2:latest",
            "stream": false,
            "messages": [{ "role": "user", "content": "Summarize: hello" }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "model": "llama3.2:latest",
            "message": { "role": "assistant", "content": "- A greeting." },
            "done": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let output = runtime(&server)
        .run("llama3.2:latest", "Summarize: hello")
        .await
        .unwrap();
    assert_eq!(output, "- A greeting.");
}

#[tokio::test]
async fn test_run_unknown_model() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(serde_json::json!({ "error": "model 'nope' not found" })),
        )
        .mount(&server)
        .await;

    let err = runtime(&server).run("nope", "hi").await.unwrap_err();
    assert!(matches!(err, Url2TldrError::ModelNotFound(ref m) if m == "nope"));
}

#[tokio::test]
async fn test_run_generation_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(
            ResponseTemplate::new(500)
                .set_body_json(serde_json::json!({ "error": "model requires more system memory" })),
        )
        .mount(&server)
        .await;

    let err = runtime(&server).run("big", "hi").await.unwrap_err();
    match err {
        Url2TldrError::RunFailed(message) => assert_eq!(message, "model requires more system memory"),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_run_timeout_is_distinct() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let err = runtime(&server).run("slow", "hi").await.unwrap_err();
    assert!(matches!(err, Url2TldrError::Timeout { seconds: 2, .. }));
}
