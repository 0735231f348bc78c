//! HTTP contract tests: the router is served on an ephemeral port and
//! exercised with a real client.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use medrag::assistant::Assistant;
use medrag::config::Config;
use medrag::retry::RetryPolicy;
use medrag::server::build_router;
use medrag_core::embedding::HashingEmbedder;
use medrag_core::generation::AnswerGenerator;
use medrag_core::index::memory::InMemoryIndex;
use medrag_core::ingest::{ingest_text, IngestOptions, NoProgress};
use medrag_core::transcript::{MemoryTranscript, TranscriptSink};
use medrag_core::RagError;

const CORPUS: &str = "Fever in infants is defined as a rectal temperature of 38 degrees Celsius or higher.\n\n\
Croup presents with a barking cough and inspiratory stridor.\n";

struct FixedGenerator(Result<String, String>);

#[async_trait]
impl AnswerGenerator for FixedGenerator {
    fn model_name(&self) -> &str {
        "fixed"
    }
    async fn generate(&self, _prompt: &str) -> medrag_core::Result<String> {
        self.0
            .clone()
            .map_err(|message| RagError::generation(message, false))
    }
}

async fn serve(generator: FixedGenerator) -> (SocketAddr, Arc<MemoryTranscript>) {
    let config = Config::with_db_path("unused.sqlite");
    let embedder = Arc::new(HashingEmbedder::new(128));
    let index = Arc::new(InMemoryIndex::new());
    let options = IngestOptions {
        max_chunk_size: 90,
        ..IngestOptions::new(config.corpus.source_label.clone())
    };
    ingest_text(CORPUS, &options, embedder.as_ref(), index.as_ref(), &NoProgress)
        .await
        .unwrap();

    let transcript = Arc::new(MemoryTranscript::new());
    let assistant = Assistant::new(
        &config,
        embedder,
        index,
        Arc::new(generator),
        transcript.clone(),
    )
    .unwrap()
    .with_retry(RetryPolicy::none());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = build_router(Arc::new(assistant));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, transcript)
}

async fn post(addr: SocketAddr, path: &str, body: Value) -> (u16, Value) {
    let resp = reqwest::Client::new()
        .post(format!("http://{addr}{path}"))
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap())
}

#[tokio::test]
async fn test_health() {
    let (addr, _) = serve(FixedGenerator(Ok(String::new()))).await;
    let body: Value = reqwest::get(format!("http://{addr}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_ask_returns_text_and_citations() {
    let reply = "A rectal temperature of 38 C or higher. [Nelson Textbook of Pediatrics: Fever]";
    let (addr, transcript) = serve(FixedGenerator(Ok(reply.to_string()))).await;

    let (status, body) = post(addr, "/ask", json!({ "question": "What defines fever in infants?" })).await;

    assert_eq!(status, 200);
    assert_eq!(body["text"], reply);
    assert!(body.get("content").is_none());
    assert_eq!(
        body["citations"],
        json!([{ "label": "Nelson Textbook of Pediatrics", "reference": "Fever" }])
    );
    let sources = body["sources"].as_array().unwrap();
    assert_eq!(sources.len(), 2);
    assert_eq!(sources[0]["sequence_index"], 0);
    assert_eq!(transcript.recent(5).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_ask_empty_question_is_bad_request() {
    let (addr, transcript) = serve(FixedGenerator(Ok("unused".to_string()))).await;

    let (status, body) = post(addr, "/ask", json!({ "question": "   " })).await;

    assert_eq!(status, 400);
    assert_eq!(body, json!({ "error": "question must not be empty" }));
    assert!(transcript.recent(5).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_malformed_body_returns_json_error() {
    let (addr, transcript) = serve(FixedGenerator(Ok("unused".to_string()))).await;
    let client = reqwest::Client::new();

    for path in ["/ask", "/retrieve"] {
        let resp = client
            .post(format!("http://{addr}{path}"))
            .header("content-type", "application/json")
            .body("{not json")
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 400);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body, json!({ "error": "invalid request body" }));
    }

    let (status, body) = post(addr, "/ask", json!({ "query": "missing field" })).await;
    assert_eq!(status, 400);
    assert_eq!(body, json!({ "error": "invalid request body" }));
    assert!(transcript.recent(5).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_ask_generation_failure_hides_cause() {
    let (addr, _) = serve(FixedGenerator(Err("upstream key sk-secret rejected".to_string()))).await;

    let (status, body) = post(addr, "/ask", json!({ "question": "What is croup?" })).await;

    assert_eq!(status, 500);
    assert_eq!(body, json!({ "error": "failed to generate an answer" }));
}

#[tokio::test]
async fn test_retrieve_ranks_passages() {
    let (addr, _) = serve(FixedGenerator(Ok(String::new()))).await;

    let (status, body) = post(
        addr,
        "/retrieve",
        json!({ "question": "barking cough and stridor", "k": 1 }),
    )
    .await;

    assert_eq!(status, 200);
    let passages = body["passages"].as_array().unwrap();
    assert_eq!(passages.len(), 1);
    assert_eq!(passages[0]["chunk"]["sequence_index"], 1);
    assert!(passages[0]["chunk"]["text"]
        .as_str()
        .unwrap()
        .starts_with("Croup"));
}

#[tokio::test]
async fn test_retrieve_zero_k_is_bad_request() {
    let (addr, _) = serve(FixedGenerator(Ok(String::new()))).await;

    let (status, body) = post(addr, "/retrieve", json!({ "question": "croup", "k": 0 })).await;

    assert_eq!(status, 400);
    assert!(body["error"].as_str().unwrap().contains('k'));
}
