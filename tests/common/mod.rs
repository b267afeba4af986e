#![allow(dead_code)]

use std::{
    path::Path,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use reqwest::Client;
use serde_json::{Value, json};
use tokio::net::TcpListener;

use inspire_studio::{
    app,
    config::AppConfig,
    openai::OpenAiClient,
    pipeline::ImageRequestPipeline,
    quote::QuoteRequestHandler,
    state::AppState,
};

pub const PNG_BYTES: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
    0x15, 0xC4, 0x89,
];

pub const API_KEY: &str = "test-key";

#[derive(Clone)]
pub enum ImageReply {
    /// `{base}` is replaced with the mock server's own base URL.
    Url(String),
    Error(u16, String),
    NoUrl,
}

#[derive(Clone)]
pub enum QuoteReply {
    Text(String),
    Error(u16),
}

pub struct MockProvider {
    pub base_url: String,
    pub image_hits: Arc<AtomicUsize>,
    pub file_hits: Arc<AtomicUsize>,
    pub last_image_body: Arc<Mutex<Option<Value>>>,
}

impl MockProvider {
    pub fn api_base(&self) -> String {
        format!("{}/v1", self.base_url)
    }

    pub fn file_url(&self, name: &str) -> String {
        format!("{}/files/{name}", self.base_url)
    }

    pub fn image_hits(&self) -> usize {
        self.image_hits.load(Ordering::SeqCst)
    }

    pub fn file_hits(&self) -> usize {
        self.file_hits.load(Ordering::SeqCst)
    }
}

#[derive(Clone)]
struct MockState {
    base_url: String,
    image_reply: ImageReply,
    quote_reply: QuoteReply,
    image_hits: Arc<AtomicUsize>,
    file_hits: Arc<AtomicUsize>,
    last_image_body: Arc<Mutex<Option<Value>>>,
}

pub async fn spawn(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// A URL on a port nothing listens on.
pub async fn unreachable_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/gone.png")
}

pub async fn spawn_provider(image_reply: ImageReply, quote_reply: QuoteReply) -> MockProvider {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    let state = MockState {
        base_url: base_url.clone(),
        image_reply,
        quote_reply,
        image_hits: Arc::new(AtomicUsize::new(0)),
        file_hits: Arc::new(AtomicUsize::new(0)),
        last_image_body: Arc::new(Mutex::new(None)),
    };
    let provider = MockProvider {
        base_url,
        image_hits: state.image_hits.clone(),
        file_hits: state.file_hits.clone(),
        last_image_body: state.last_image_body.clone(),
    };
    let router = Router::new()
        .route("/v1/images/generations", post(images_generations))
        .route("/v1/chat/completions", post(chat_completions))
        .route("/files/a.png", get(png_file))
        .route("/files/untyped", get(untyped_file))
        .route("/files/page.html", get(html_file))
        .route("/files/missing.png", get(missing_file))
        .with_state(state);
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    provider
}

async fn images_generations(State(state): State<MockState>, Json(body): Json<Value>) -> Response {
    state.image_hits.fetch_add(1, Ordering::SeqCst);
    *state.last_image_body.lock().unwrap() = Some(body);
    match state.image_reply {
        ImageReply::Url(url) => {
            let url = url.replace("{base}", &state.base_url);
            Json(json!({"created": 1, "data": [{"url": url}]})).into_response()
        }
        ImageReply::Error(status, message) => (
            StatusCode::from_u16(status).unwrap(),
            Json(json!({"error": {"message": message, "type": "invalid_request_error"}})),
        )
            .into_response(),
        ImageReply::NoUrl => Json(json!({"created": 1, "data": []})).into_response(),
    }
}

async fn chat_completions(State(state): State<MockState>) -> Response {
    match state.quote_reply {
        QuoteReply::Text(text) => {
            Json(json!({"choices": [{"message": {"role": "assistant", "content": text}}]}))
                .into_response()
        }
        QuoteReply::Error(status) => StatusCode::from_u16(status).unwrap().into_response(),
    }
}

async fn png_file(State(state): State<MockState>) -> Response {
    state.file_hits.fetch_add(1, Ordering::SeqCst);
    (
        [
            (header::CONTENT_TYPE, "image/png".to_string()),
            (header::CONTENT_LENGTH, PNG_BYTES.len().to_string()),
        ],
        PNG_BYTES.to_vec(),
    )
        .into_response()
}

async fn untyped_file(State(state): State<MockState>) -> Response {
    state.file_hits.fetch_add(1, Ordering::SeqCst);
    Response::new(Body::from(PNG_BYTES.to_vec()))
}

async fn html_file() -> Response {
    ([(header::CONTENT_TYPE, "text/html")], "<html></html>").into_response()
}

async fn missing_file(State(state): State<MockState>) -> Response {
    state.file_hits.fetch_add(1, Ordering::SeqCst);
    StatusCode::NOT_FOUND.into_response()
}

pub fn config(provider_base: &str, api_key: Option<&str>, data_dir: &Path) -> AppConfig {
    AppConfig::for_provider(provider_base, api_key, data_dir.to_path_buf())
}

pub fn pipeline(provider: &MockProvider) -> ImageRequestPipeline {
    pipeline_with_key(provider, Some(API_KEY))
}

pub fn pipeline_with_key(provider: &MockProvider, api_key: Option<&str>) -> ImageRequestPipeline {
    let config = config(&provider.api_base(), api_key, Path::new("unused"));
    let http = Client::new();
    ImageRequestPipeline::new(
        OpenAiClient::new(http.clone(), &config),
        http,
        config.generation_timeout,
        config.fetch_timeout,
    )
}

pub fn quote_handler(provider_base: &str, api_key: Option<&str>) -> QuoteRequestHandler {
    let config = config(provider_base, api_key, Path::new("unused"));
    QuoteRequestHandler::new(
        OpenAiClient::new(Client::new(), &config),
        config.generation_timeout,
    )
}

/// Runs the real application against `provider`, storing data in `data_dir`.
pub async fn spawn_app(provider: &MockProvider, data_dir: &Path) -> String {
    let state = AppState::new(&config(&provider.api_base(), Some(API_KEY), data_dir)).unwrap();
    spawn(app(state)).await
}
