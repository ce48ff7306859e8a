//! watsonx.ai client tests against an in-process mock of the provider and IAM.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Form, Json, Router};
use futures::stream::StreamExt;
use serde_json::{json, Value};

use watsonx_facade::config::{default_chat_options, WatsonxConfig};
use watsonx_facade::model::watsonx::WatsonxClient;
use watsonx_facade::model::{ChatModel, EmbeddingModel, ModelError};
use watsonx_facade::prompt::{Message, Prompt};

#[derive(Default)]
struct MockState {
    token_requests: AtomicUsize,
    last_generation: std::sync::Mutex<Option<Value>>,
}

async fn mock_token(
    State(state): State<Arc<MockState>>,
    Form(form): Form<Vec<(String, String)>>,
) -> impl IntoResponse {
    state.token_requests.fetch_add(1, Ordering::SeqCst);
    let api_key = form
        .iter()
        .find(|(k, _)| k == "apikey")
        .map(|(_, v)| v.as_str());
    if api_key != Some("test-key") {
        return (StatusCode::BAD_REQUEST, Json(json!({"errorMessage": "bad key"}))).into_response();
    }
    Json(json!({
        "access_token": "token-1",
        "token_type": "Bearer",
        "expires_in": 3600,
        "expiration": 4_102_444_800u64
    }))
    .into_response()
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        == Some("Bearer token-1")
}

async fn mock_generation(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let input = body["input"].as_str().unwrap_or_default().to_string();
    *state.last_generation.lock().unwrap() = Some(body);
    if input.contains("explode") {
        return (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded").into_response();
    }
    Json(json!({
        "model_id": "google/flan-ul2",
        "results": [{
            "generated_text": "I'm fine, thank you!",
            "generated_token_count": 6,
            "input_token_count": 5,
            "stop_reason": "eos_token"
        }]
    }))
    .into_response()
}

async fn mock_generation_stream(headers: HeaderMap) -> impl IntoResponse {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let body = concat!(
        "id: 1\nevent: message\ndata: {\"results\":[{\"generated_text\":\"Hello\"}]}\n\n",
        "id: 2\nevent: message\ndata: {\"results\":[{\"generated_text\":\" world\"}]}\n\n",
        "id: 3\nevent: message\ndata: {\"results\":[{\"generated_text\":\"\",\"stop_reason\":\"eos_token\"}]}\n\n",
    );
    ([("content-type", "text/event-stream")], body).into_response()
}

async fn mock_embeddings(headers: HeaderMap, Json(body): Json<Value>) -> impl IntoResponse {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let results: Vec<Value> = body["inputs"]
        .as_array()
        .unwrap()
        .iter()
        .enumerate()
        .map(|(i, _)| json!({ "embedding": [0.1 * (i as f64 + 1.0), 0.2, 0.3] }))
        .collect();
    Json(json!({ "model_id": body["model_id"], "results": results })).into_response()
}

async fn spawn_mock_watsonx(state: Arc<MockState>) -> String {
    let app = Router::new()
        .route("/identity/token", post(mock_token))
        .route("/ml/v1/text/generation", post(mock_generation))
        .route("/ml/v1/text/generation_stream", post(mock_generation_stream))
        .route("/ml/v1/text/embeddings", post(mock_embeddings))
        .with_state(state);
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{addr}")
}

fn test_client(base_url: &str, api_key: &str) -> WatsonxClient {
    let config = WatsonxConfig {
        base_url: base_url.to_string(),
        iam_url: format!("{base_url}/identity/token"),
        api_key: api_key.to_string(),
        project_id: "project-1".to_string(),
        ..Default::default()
    };
    WatsonxClient::new(config, default_chat_options(), "ibm/slate-30m-english-rtrvr")
}

fn question_prompt() -> Prompt {
    Prompt::new(vec![
        Message::system("Be polite."),
        Message::user("Hello, how are you?"),
    ])
}

#[tokio::test]
async fn test_call_sends_prompt_and_parses_result() {
    let state = Arc::new(MockState::default());
    let base_url = spawn_mock_watsonx(state.clone()).await;
    let client = test_client(&base_url, "test-key");

    let response = client.call(&question_prompt()).await.unwrap();
    assert_eq!(response.content(), "I'm fine, thank you!");
    assert_eq!(
        response.result().unwrap().finish_reason.as_deref(),
        Some("eos_token")
    );

    let sent = state.last_generation.lock().unwrap().clone().unwrap();
    assert_eq!(sent["input"], "Be polite.\nHello, how are you?");
    assert_eq!(sent["model_id"], "google/flan-ul2");
    assert_eq!(sent["project_id"], "project-1");
    assert_eq!(sent["parameters"]["decoding_method"], "greedy");
    assert_eq!(sent["parameters"]["max_new_tokens"], 20);
}

#[tokio::test]
async fn test_token_is_reused() {
    let state = Arc::new(MockState::default());
    let base_url = spawn_mock_watsonx(state.clone()).await;
    let client = test_client(&base_url, "test-key");

    client.call(&question_prompt()).await.unwrap();
    client.call(&question_prompt()).await.unwrap();

    assert_eq!(state.token_requests.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_bad_api_key_is_auth_error() {
    let state = Arc::new(MockState::default());
    let base_url = spawn_mock_watsonx(state).await;
    let client = test_client(&base_url, "wrong-key");

    let err = client.call(&question_prompt()).await.unwrap_err();
    assert!(matches!(err, ModelError::Auth(_)));
}

#[tokio::test]
async fn test_upstream_status_is_surfaced() {
    let state = Arc::new(MockState::default());
    let base_url = spawn_mock_watsonx(state).await;
    let client = test_client(&base_url, "test-key");

    let prompt = Prompt::new(vec![Message::user("explode")]);
    let err = client.call(&prompt).await.unwrap_err();
    match err {
        ModelError::Status { status, body } => {
            assert_eq!(status.as_u16(), 500);
            assert_eq!(body, "upstream exploded");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_stream_yields_chunks_in_order() {
    let state = Arc::new(MockState::default());
    let base_url = spawn_mock_watsonx(state).await;
    let client = test_client(&base_url, "test-key");

    let chunks: Vec<_> = client
        .stream(&question_prompt())
        .await
        .unwrap()
        .collect()
        .await;

    let texts: Vec<String> = chunks
        .into_iter()
        .map(|c| c.unwrap().content().to_string())
        .collect();
    assert_eq!(texts, vec!["Hello", " world", ""]);
}

#[tokio::test]
async fn test_embeddings_are_indexed_by_input() {
    let state = Arc::new(MockState::default());
    let base_url = spawn_mock_watsonx(state).await;
    let client = test_client(&base_url, "test-key");

    let inputs = vec!["This is a test text".to_string(), "second".to_string()];
    let response = client.embed_for_response(&inputs).await.unwrap();

    assert_eq!(response.results.len(), 2);
    assert_eq!(response.results[0].index, 0);
    assert_eq!(response.results[0].output, vec![0.1, 0.2, 0.3]);
    assert_eq!(response.results[1].index, 1);
}
