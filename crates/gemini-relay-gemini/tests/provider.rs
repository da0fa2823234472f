//! Provider tests against a local stand-in for the Gemini API.

use std::{
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
    routing::post,
};
use futures::StreamExt;
use gemini_relay_core::{CompletionProvider, ProviderError};
use gemini_relay_gemini::{GeminiConfig, GeminiProvider};
use serde_json::Value;

const SSE_BODY: &str = concat!(
    "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"Hello\"}],\"role\":\"model\"},\"index\":0}]}\r\n\r\n",
    "data: {\"promptFeedback\":{}}\r\n\r\n",
    "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\", world\"}],\"role\":\"model\"},\"finishReason\":\"STOP\",\"index\":0}]}\r\n\r\n",
);

#[derive(Clone, Default)]
struct Seen {
    requests: Arc<Mutex<Vec<(String, Option<String>, Value)>>>,
}

async fn generate(
    State(seen): State<Seen>,
    Path(call): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let key = headers
        .get("x-goog-api-key")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    seen.requests
        .lock()
        .unwrap()
        .push((call.clone(), key, body));

    if call.starts_with("missing-model") {
        return (
            StatusCode::NOT_FOUND,
            [(header::CONTENT_TYPE, "application/json")],
            r#"{"error":{"code":404,"message":"models/missing-model is not found","status":"NOT_FOUND"}}"#,
        );
    }
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/event-stream")],
        SSE_BODY,
    )
}

async fn spawn_api() -> (SocketAddr, Seen) {
    let seen = Seen::default();
    let app = Router::new()
        .route("/v1beta/models/{call}", post(generate))
        .with_state(seen.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, seen)
}

fn provider(addr: SocketAddr, model: &str) -> GeminiProvider {
    let mut config = GeminiConfig::new("test-key")
        .with_model(model)
        .with_base_url(format!("http://{addr}"));
    config.idle_timeout = Duration::from_secs(5);
    GeminiProvider::new(config).unwrap()
}

#[tokio::test]
async fn test_streams_units_from_api() {
    let (addr, seen) = spawn_api().await;
    let provider = provider(addr, "test-model");

    let units: Vec<_> = provider
        .stream("prompt text")
        .await
        .unwrap()
        .collect()
        .await;

    let fragments: Vec<Vec<String>> = units
        .into_iter()
        .map(|u| u.unwrap().into_fragments().collect())
        .collect();
    assert_eq!(
        fragments,
        vec![vec!["Hello".to_string()], vec![], vec![", world".to_string()]]
    );

    let requests = seen.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    let (call, key, body) = &requests[0];
    assert_eq!(call, "test-model:streamGenerateContent");
    assert_eq!(key.as_deref(), Some("test-key"));
    assert_eq!(body["contents"][0]["role"], "user");
    assert_eq!(body["contents"][0]["parts"][0]["text"], "prompt text");
}

#[tokio::test]
async fn test_rejected_request_is_api_error() {
    let (addr, _seen) = spawn_api().await;
    let provider = provider(addr, "missing-model");

    match provider.stream("x").await {
        Err(ProviderError::Api { status, message }) => {
            assert_eq!(status, 404);
            assert_eq!(message, "NOT_FOUND: models/missing-model is not found");
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected an error"),
    }
}

#[tokio::test]
async fn test_unreachable_api_is_request_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let result = provider(addr, "test-model").stream("x").await;
    assert!(matches!(result, Err(ProviderError::Request(_))));
}

#[tokio::test]
async fn test_silent_api_times_out() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    // Accept connections and never answer.
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    let mut config = GeminiConfig::new("test-key").with_base_url(format!("http://{addr}"));
    config.idle_timeout = Duration::from_millis(200);
    let provider = GeminiProvider::new(config).unwrap();

    let result = tokio::time::timeout(Duration::from_secs(3), provider.stream("x"))
        .await
        .expect("stream() hung past the idle timeout");
    assert!(matches!(
        result,
        Err(ProviderError::IdleTimeout(d)) if d == Duration::from_millis(200)
    ));
}
