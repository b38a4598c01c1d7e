//! `GeminiDriver` against a local stub of the `generateContent` endpoint.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::post,
};
use nexus_orchestrator::llm::{
    FALLBACK_REPLY, GeminiDriver, LlmProtocol, LlmSettings, Orchestrator,
};
use nexus_orchestrator::mcp::ServerRegistry;
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Clone, Default)]
struct Captured {
    inner: Arc<Mutex<Vec<(String, Option<String>, Value)>>>,
}

impl Captured {
    fn take(&self) -> Vec<(String, Option<String>, Value)> {
        std::mem::take(&mut *self.inner.lock().unwrap())
    }
}

#[derive(Clone)]
struct Stub {
    captured: Captured,
    status: StatusCode,
    reply: Value,
    delay: Duration,
}

async fn generate(
    State(stub): State<Stub>,
    Path(model_action): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let key = headers
        .get("x-goog-api-key")
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string);
    stub.captured
        .inner
        .lock()
        .unwrap()
        .push((model_action, key, body));
    tokio::time::sleep(stub.delay).await;
    (stub.status, Json(stub.reply.clone()))
}

async fn spawn_stub(status: StatusCode, reply: Value, delay: Duration) -> (String, Captured) {
    let captured = Captured::default();
    let stub = Stub {
        captured: captured.clone(),
        status,
        reply,
        delay,
    };
    let app = Router::new()
        .route("/v1beta/models/{model_action}", post(generate))
        .with_state(stub);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), captured)
}

fn settings(base_url: String) -> LlmSettings {
    LlmSettings {
        base_url,
        api_key: Some("stub-key".to_string()),
        protocol: LlmProtocol::Gemini,
        timeout: Duration::from_secs(5),
        ..LlmSettings::default()
    }
}

#[tokio::test]
async fn test_generate_content_round_trip() {
    let reply = json!({
        "candidates": [{
            "content": {
                "role": "model",
                "parts": [
                    { "text": "Routing to Linear." },
                    { "functionCall": {
                        "name": "execute_mcp_tool",
                        "args": {
                            "serverName": "Linear Issues",
                            "toolName": "createIssue",
                            "arguments": "{\"title\":\"Bug\"}"
                        }
                    }}
                ]
            },
            "finishReason": "STOP"
        }]
    });
    let (base_url, captured) = spawn_stub(StatusCode::OK, reply, Duration::ZERO).await;
    let orchestrator = Orchestrator::new(settings(base_url));

    let result = orchestrator
        .converse("file a bug", &[], &ServerRegistry::demo().list())
        .await;

    assert_eq!(result.text, "Routing to Linear.");
    assert_eq!(result.tool_calls.len(), 1);
    assert_eq!(result.tool_calls[0].args["serverName"], "Linear Issues");
    assert_eq!(result.tool_calls[0].args["toolName"], "createIssue");
    assert_eq!(
        result.tool_calls[0].args["arguments"],
        "{\"title\":\"Bug\"}"
    );

    let requests = captured.take();
    assert_eq!(requests.len(), 1);
    let (model_action, key, body) = &requests[0];
    assert_eq!(model_action, "gemini-2.5-flash:generateContent");
    assert_eq!(key.as_deref(), Some("stub-key"));
    assert_eq!(body["contents"][0]["parts"][0]["text"], "file a bug");
    assert_eq!(
        body["tools"][0]["functionDeclarations"][0]["name"],
        "execute_mcp_tool"
    );
    let instruction = body["systemInstruction"]["parts"][0]["text"]
        .as_str()
        .unwrap();
    assert!(instruction.contains("- GitHub Integration (ws://github-mcp.internal:8080)"));
}

#[tokio::test]
async fn test_error_status_yields_fallback() {
    let (base_url, captured) = spawn_stub(
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({ "error": { "code": 500, "message": "boom" } }),
        Duration::ZERO,
    )
    .await;
    let orchestrator = Orchestrator::new(settings(base_url));

    let result = orchestrator.converse("hi", &[], &[]).await;

    assert_eq!(result.text, FALLBACK_REPLY);
    assert!(result.tool_calls.is_empty());
    assert_eq!(captured.take().len(), 1, "no retry");
}

#[tokio::test]
async fn test_malformed_body_yields_fallback() {
    let (base_url, _captured) =
        spawn_stub(StatusCode::OK, json!({ "unexpected": true }), Duration::ZERO).await;
    let orchestrator = Orchestrator::new(settings(base_url));

    assert!(orchestrator.converse("hi", &[], &[]).await.is_fallback());
}

#[tokio::test]
async fn test_timeout_yields_fallback() {
    let (base_url, _captured) = spawn_stub(
        StatusCode::OK,
        json!({ "candidates": [] }),
        Duration::from_secs(2),
    )
    .await;
    let orchestrator = Orchestrator::new(LlmSettings {
        timeout: Duration::from_millis(200),
        ..settings(base_url)
    });

    assert!(orchestrator.converse("hi", &[], &[]).await.is_fallback());
}

#[tokio::test]
async fn test_unreachable_backend_yields_fallback() {
    // Bind then drop to get a port nobody listens on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let driver = GeminiDriver::new(settings(format!("http://{addr}")));
    let orchestrator = Orchestrator::with_driver(settings(format!("http://{addr}")), Arc::new(driver));

    assert!(orchestrator.converse("hi", &[], &[]).await.is_fallback());
}
