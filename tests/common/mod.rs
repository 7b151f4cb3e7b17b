#![allow(dead_code)]

use anyhow::{bail, Result};
use async_trait::async_trait;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use newsrag::config::Config;
use newsrag::embedding::Embedder;
use newsrag::llm::LanguageModel;

/// Words the test embedder knows. A word matches a term when it starts with it.
pub const VOCAB: &[&str] = &[
    "apple", "profit", "iphone", "tesla", "deliveries", "oil", "crude", "bank", "rates", "gold",
];

/// One dimension per vocabulary term plus a catch-all for text with no known words.
pub const DIMS: usize = 11;

pub const APPLE_TEXT: &str = "Apple reported record profit in Q3 driven by iPhone sales.";
pub const CANNED_ANSWER: &str = "Apple reported record profit in Q3.";

pub const CORPUS_JSON: &str = r#"{
  "Technology": [
    {
      "full_text": "Apple reported record profit in Q3 driven by iPhone sales.",
      "ticker": "AAPL",
      "link": "https://news.example/apple-q3"
    }
  ],
  "Energy": [
    { "full_text": "Oil prices fell as crude inventories rose." }
  ],
  "Autos": [
    { "full_text": "Tesla deliveries beat estimates.", "ticker": "TSLA" }
  ],
  "Finance": [
    { "full_text": "Bank shares climbed after rates held steady." }
  ]
}"#;

/// Deterministic bag-of-words vector over [`VOCAB`].
pub fn vocab_vector(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; DIMS];
    for word in text.split(|c: char| !c.is_alphanumeric()) {
        let word = word.to_lowercase();
        if word.is_empty() {
            continue;
        }
        if let Some(i) = VOCAB.iter().position(|term| word.starts_with(term)) {
            v[i] += 1.0;
        }
    }
    if v.iter().all(|x| *x == 0.0) {
        v[DIMS - 1] = 1.0;
    }
    v
}

/// In-process embedder backed by [`vocab_vector`].
#[derive(Default)]
pub struct VocabEmbedder {
    pub calls: AtomicUsize,
}

#[async_trait]
impl Embedder for VocabEmbedder {
    fn model_name(&self) -> &str {
        "vocab"
    }
    fn dims(&self) -> usize {
        DIMS
    }
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| vocab_vector(t)).collect())
    }
}

/// Language model that records prompts and returns a fixed answer, or
/// fails every call when `fail` is set.
#[derive(Default)]
pub struct RecordingModel {
    pub prompts: Mutex<Vec<String>>,
    pub fail: bool,
}

impl RecordingModel {
    pub fn failing() -> Self {
        Self {
            prompts: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn prompt_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl LanguageModel for RecordingModel {
    fn model_name(&self) -> &str {
        "recording"
    }
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if self.fail {
            bail!("model unavailable");
        }
        Ok(CANNED_ANSWER.to_string())
    }
}

// ============ Mock Ollama server ============

/// Requests seen by the mock server.
#[derive(Clone, Default)]
pub struct MockOllama {
    pub embed_requests: Arc<AtomicUsize>,
    pub prompts: Arc<Mutex<Vec<String>>>,
}

impl MockOllama {
    pub fn prompt_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

async fn mock_embed(
    State(state): State<MockOllama>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, (StatusCode, String)> {
    state.embed_requests.fetch_add(1, Ordering::SeqCst);
    if body["model"] == "broken" {
        return Err((StatusCode::INTERNAL_SERVER_ERROR, "model crashed".to_string()));
    }
    let inputs = body["input"].as_array().cloned().unwrap_or_default();
    let embeddings: Vec<Vec<f32>> = inputs
        .iter()
        .map(|v| vocab_vector(v.as_str().unwrap_or_default()))
        .collect();
    Ok(Json(json!({ "model": body["model"], "embeddings": embeddings })))
}

async fn mock_generate(
    State(state): State<MockOllama>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, (StatusCode, String)> {
    let prompt = body["prompt"].as_str().unwrap_or_default().to_string();
    state.prompts.lock().unwrap().push(prompt);
    if body["model"] == "broken" {
        return Err((StatusCode::INTERNAL_SERVER_ERROR, "model crashed".to_string()));
    }
    assert_eq!(body["stream"], false);
    Ok(Json(json!({ "model": body["model"], "response": CANNED_ANSWER, "done": true })))
}

/// Serve `/api/embed` and `/api/generate` on an ephemeral port.
/// Returns the base URL and the shared request log.
pub async fn spawn_mock_ollama() -> (String, MockOllama) {
    let state = MockOllama::default();
    let app = Router::new()
        .route("/api/embed", post(mock_embed))
        .route("/api/generate", post(mock_generate))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), state)
}

/// Write the test corpus into `dir` and return a config pointing at it and at `url`.
pub fn test_config(dir: &Path, url: &str) -> Config {
    let corpus_path = dir.join("stock_news.json");
    std::fs::write(&corpus_path, CORPUS_JSON).unwrap();

    let mut config = Config::default();
    config.corpus.path = corpus_path;
    config.index.path = dir.join("financial_news_db");
    config.embedding.url = url.to_string();
    config.embedding.dims = DIMS;
    config.embedding.max_retries = 0;
    config.embedding.timeout_secs = 5;
    config.llm.url = url.to_string();
    config.llm.model = "mock-llm".to_string();
    config.llm.timeout_secs = 5;
    config
}

/// A base URL nothing listens on.
pub async fn closed_port_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}
