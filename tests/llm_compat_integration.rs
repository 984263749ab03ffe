//! Integration tests for the OpenAI-compatible chat completions provider,
//! run against an in-process Axum server.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use secrecy::SecretString;
use serde_json::{Value, json};
use tokio::net::TcpListener;

use mail_advisor::error::LlmError;
use mail_advisor::llm::{
    ChatMessage, CompletionRequest, FinishReason, LlmProvider, OpenAiCompatProvider,
};

/// How the fake server answers.
#[derive(Clone, Copy)]
enum Mode {
    Ok,
    RateLimited,
    Unauthorized,
    Garbage,
}

struct FakeServer {
    mode: Mode,
    seen: Mutex<Vec<(Option<String>, Value)>>,
}

async fn completions(
    State(server): State<Arc<FakeServer>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    server.seen.lock().unwrap().push((auth, body));

    match server.mode {
        Mode::Ok => Json(json!({
            "id": "chatcmpl-1",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "Start a SIP."},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 42, "completion_tokens": 4}
        }))
        .into_response(),
        Mode::RateLimited => (
            StatusCode::TOO_MANY_REQUESTS,
            [("retry-after", "7")],
            "slow down",
        )
            .into_response(),
        Mode::Unauthorized => (StatusCode::UNAUTHORIZED, "bad key").into_response(),
        Mode::Garbage => (StatusCode::OK, "not json at all").into_response(),
    }
}

async fn start_server(mode: Mode) -> (String, Arc<FakeServer>) {
    let server = Arc::new(FakeServer {
        mode,
        seen: Mutex::new(Vec::new()),
    });
    let app = Router::new()
        .route("/v1/chat/completions", post(completions))
        .with_state(Arc::clone(&server));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    (format!("http://127.0.0.1:{port}/v1/"), server)
}

fn provider(base_url: &str) -> OpenAiCompatProvider {
    OpenAiCompatProvider::new(
        "groq",
        base_url,
        SecretString::from("test-key".to_string()),
        "llama-3.3-70b-versatile",
    )
}

fn request() -> CompletionRequest {
    CompletionRequest::new(vec![
        ChatMessage::system("You are a helpful and realistic financial advisor."),
        ChatMessage::user("How much should I invest?"),
    ])
    .with_temperature(0.3)
    .with_max_tokens(100)
}

#[tokio::test]
async fn completion_round_trip() {
    let (base, server) = start_server(Mode::Ok).await;

    let response = provider(&base).complete(request()).await.unwrap();

    assert_eq!(response.content, "Start a SIP.");
    assert_eq!(response.input_tokens, 42);
    assert_eq!(response.output_tokens, 4);
    assert_eq!(response.finish_reason, FinishReason::Stop);
    assert_eq!(response.response_id.as_deref(), Some("chatcmpl-1"));

    let seen = server.seen.lock().unwrap();
    let (auth, body) = &seen[0];
    assert_eq!(auth.as_deref(), Some("Bearer test-key"));
    assert_eq!(body["model"], "llama-3.3-70b-versatile");
    assert_eq!(body["max_tokens"], 100);
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"][1]["content"], "How much should I invest?");
}

#[tokio::test]
async fn rate_limit_carries_retry_after() {
    let (base, _server) = start_server(Mode::RateLimited).await;
    let err = provider(&base).complete(request()).await.unwrap_err();
    match err {
        LlmError::RateLimited { retry_after, .. } => {
            assert_eq!(retry_after, Some(Duration::from_secs(7)))
        }
        other => panic!("expected rate limit, got {other:?}"),
    }
}

#[tokio::test]
async fn unauthorized_is_auth_failure() {
    let (base, _server) = start_server(Mode::Unauthorized).await;
    let err = provider(&base).complete(request()).await.unwrap_err();
    assert!(matches!(err, LlmError::AuthFailed { ref provider } if provider == "groq"));
}

#[tokio::test]
async fn non_json_body_is_invalid_response() {
    let (base, _server) = start_server(Mode::Garbage).await;
    let err = provider(&base).complete(request()).await.unwrap_err();
    assert!(matches!(err, LlmError::InvalidResponse { .. }));
}
