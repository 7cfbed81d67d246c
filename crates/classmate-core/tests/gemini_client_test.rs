//! Tests for `GeminiClient` against a local stand-in for the Generative
//! Language API.

use std::sync::{Arc, Mutex};

use axum::Json;
use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde_json::{Value, json};

use classmate_core::model::{
    GeminiClient, GeminiConfig, GenerationRequest, GenerativeModel, ModelError,
};

#[derive(Clone, Default)]
struct Recorded {
    key: Arc<Mutex<Option<String>>>,
    path: Arc<Mutex<Option<String>>>,
    body: Arc<Mutex<Option<Value>>>,
}

/// Start a server on an ephemeral port and return its base URL.
async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn client(base_url: String, key: Option<&str>) -> GeminiClient {
    let mut config = GeminiConfig::new(key.map(str::to_string));
    config.base_url = base_url;
    GeminiClient::new(config).unwrap()
}

fn request() -> GenerationRequest {
    GenerationRequest {
        flow: "test",
        prompt: "Write a haiku about chalk".into(),
        response_schema: json!({
            "type": "object",
            "properties": { "poem": { "type": "string" } },
            "required": ["poem"],
        }),
    }
}

fn candidate(text: &str) -> Value {
    json!({
        "candidates": [ { "content": { "role": "model", "parts": [ { "text": text } ] } } ]
    })
}

async fn generate_ok(
    State(rec): State<Recorded>,
    Path(model): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    *rec.key.lock().unwrap() = headers
        .get("x-goog-api-key")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    *rec.path.lock().unwrap() = Some(model);
    *rec.body.lock().unwrap() = Some(body);
    Json(candidate(r#"{"poem":"white dust on green slate"}"#))
}

#[tokio::test]
async fn generate_sends_prompt_schema_and_key() {
    let rec = Recorded::default();
    let app = Router::new()
        .route("/v1beta/models/{model}", post(generate_ok))
        .with_state(rec.clone());
    let base = serve(app).await;

    let value = client(base, Some("secret-key"))
        .generate(&request())
        .await
        .unwrap();
    assert_eq!(value, json!({ "poem": "white dust on green slate" }));

    assert_eq!(rec.key.lock().unwrap().as_deref(), Some("secret-key"));
    assert_eq!(
        rec.path.lock().unwrap().as_deref(),
        Some("gemini-2.5-flash:generateContent")
    );
    let body = rec.body.lock().unwrap().clone().unwrap();
    assert_eq!(
        body["contents"][0]["parts"][0]["text"],
        "Write a haiku about chalk"
    );
    assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
    assert_eq!(
        body["generationConfig"]["responseJsonSchema"]["required"],
        json!(["poem"])
    );
}

#[tokio::test]
async fn missing_key_fails_without_request() {
    // Nothing listens here; a request would surface as an HTTP error instead.
    let client = client("http://127.0.0.1:9".into(), None);
    let err = client.generate(&request()).await.unwrap_err();
    assert!(matches!(err, ModelError::MissingApiKey), "got {err:?}");
}

#[tokio::test]
async fn rate_limit_reports_retry_after() {
    let app = Router::new().route(
        "/v1beta/models/{model}",
        post(|| async {
            Response::builder()
                .status(StatusCode::TOO_MANY_REQUESTS)
                .header("retry-after", "17")
                .body(axum::body::Body::empty())
                .unwrap()
        }),
    );
    let base = serve(app).await;

    let err = client(base, Some("k")).generate(&request()).await.unwrap_err();
    assert!(
        matches!(err, ModelError::RateLimited { retry_after_secs: 17 }),
        "got {err:?}"
    );
}

#[tokio::test]
async fn server_error_carries_status_and_body() {
    let app = Router::new().route(
        "/v1beta/models/{model}",
        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "model overloaded").into_response() }),
    );
    let base = serve(app).await;

    let err = client(base, Some("k")).generate(&request()).await.unwrap_err();
    match err {
        ModelError::Api { status, message } => {
            assert_eq!(status, 500);
            assert!(message.contains("model overloaded"));
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn non_json_text_is_parse_error() {
    let app = Router::new().route(
        "/v1beta/models/{model}",
        post(|| async { Json(candidate("Sure! Here is your poem:")) }),
    );
    let base = serve(app).await;

    let err = client(base, Some("k")).generate(&request()).await.unwrap_err();
    assert!(matches!(err, ModelError::Parse(_)), "got {err:?}");
}

#[tokio::test]
async fn list_models_follows_pages() {
    async fn list(Query(params): Query<std::collections::HashMap<String, String>>) -> Json<Value> {
        match params.get("pageToken").map(String::as_str) {
            None => Json(json!({
                "models": [ { "name": "models/gemini-2.5-flash" }, { "name": "models/gemini-2.5-pro" } ],
                "nextPageToken": "page2",
            })),
            Some("page2") => Json(json!({
                "models": [ { "name": "models/gemini-2.0-flash-lite" } ],
            })),
            Some(other) => panic!("unexpected page token {other}"),
        }
    }

    let app = Router::new().route("/v1beta/models", get(list));
    let base = serve(app).await;

    let names = client(base, Some("k")).list_models().await.unwrap();
    assert_eq!(
        names,
        vec!["gemini-2.5-flash", "gemini-2.5-pro", "gemini-2.0-flash-lite"]
    );
}

#[tokio::test]
async fn page_token_is_sent_encoded() {
    const TOKEN: &str = "Cg1+b/c=&page=9 x";

    async fn list(Query(params): Query<std::collections::HashMap<String, String>>) -> Json<Value> {
        assert_eq!(params.get("pageSize").map(String::as_str), Some("1000"));
        assert!(!params.contains_key("page"));
        match params.get("pageToken").map(String::as_str) {
            None => Json(json!({
                "models": [ { "name": "models/gemini-2.5-flash" } ],
                "nextPageToken": TOKEN,
            })),
            Some(TOKEN) => Json(json!({
                "models": [ { "name": "models/gemini-2.5-flash-lite" } ],
            })),
            Some(other) => panic!("token arrived altered: {other:?}"),
        }
    }

    let app = Router::new().route("/v1beta/models", get(list));
    let base = serve(app).await;

    let names = client(base, Some("k")).list_models().await.unwrap();
    assert_eq!(names, vec!["gemini-2.5-flash", "gemini-2.5-flash-lite"]);
}
