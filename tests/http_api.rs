// file: tests/http_api.rs
// description: end-to-end tests of the HTTP surface against an in-memory store
// reference: https://actix.rs/docs/testing

use actix_web::http::StatusCode;
use actix_web::{App, test, web};
use async_trait::async_trait;
use docvec::database::MemoryStore;
use docvec::embedding::HashingEmbedder;
use docvec::{
    AppState, Config, DocumentProcessor, Embedder, Generator, RagPipeline, Result, VectorStore,
};
use serde_json::{Value, json};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

const BOUNDARY: &str = "docvec-test-boundary";

struct EchoGenerator;

#[async_trait]
impl Generator for EchoGenerator {
    fn model(&self) -> &str {
        "echo"
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        Ok(prompt.to_string())
    }
}

fn test_state(upload_dir: &Path, generator: Option<Arc<dyn Generator>>) -> AppState {
    let mut config = Config::default_config();
    config.server.upload_dir = upload_dir.to_path_buf();
    config.pipeline.chunk_size = 80;
    config.pipeline.chunk_overlap = 0;

    let embedder: Arc<dyn Embedder> = Arc::new(HashingEmbedder::new(32));
    let store: Arc<dyn VectorStore> = Arc::new(MemoryStore::new());

    let processor = Arc::new(DocumentProcessor::new(
        &config,
        embedder.clone(),
        Some(store.clone()),
    ));
    let rag = Arc::new(RagPipeline::new(&config, embedder, Some(store), generator).unwrap());
    AppState::new(&config, processor, rag)
}

fn multipart(field: &str, file_name: &str, content: &[u8]) -> (String, Vec<u8>) {
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    (format!("multipart/form-data; boundary={BOUNDARY}"), body)
}

fn upload_request(uri: &str, field: &str, file_name: &str, content: &[u8]) -> test::TestRequest {
    let (content_type, body) = multipart(field, file_name, content);
    test::TestRequest::post()
        .uri(uri)
        .insert_header(("content-type", content_type))
        .set_payload(body)
}

fn leftover_files(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
}

macro_rules! app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($state))
                .configure(docvec::server::configure),
        )
        .await
    };
}

#[actix_web::test]
async fn upload_document_returns_text_and_vector() {
    let dir = TempDir::new().unwrap();
    let app = app!(test_state(dir.path(), None));

    let req = upload_request("/upload/document", "file", "notes.txt", b"Hello vector world").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["document_id"], "document_notes_txt");
    assert_eq!(body["text"], "Hello vector world");
    assert_eq!(body["dimension"], 32);
    assert_eq!(body["vector"].as_array().unwrap().len(), 32);
    assert_eq!(body["stored"], true);

    assert_eq!(leftover_files(dir.path()), 0);
}

#[actix_web::test]
async fn identical_uploads_have_identical_vectors() {
    let dir = TempDir::new().unwrap();
    let app = app!(test_state(dir.path(), None));

    let mut vectors = Vec::new();
    for name in ["a.txt", "b.txt"] {
        let req = upload_request("/upload/all", "file", name, b"same content").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        vectors.push(body["vector"].clone());
    }
    assert_eq!(vectors[0], vectors[1]);
}

#[actix_web::test]
async fn route_rejects_wrong_format() {
    let dir = TempDir::new().unwrap();
    let app = app!(test_state(dir.path(), None));

    let req = upload_request("/upload/pdf", "file", "notes.txt", b"text").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert!(body["error"].as_str().unwrap().starts_with("Invalid file format"));
    assert_eq!(leftover_files(dir.path()), 0);
}

#[actix_web::test]
async fn missing_file_part_and_empty_name_are_rejected() {
    let dir = TempDir::new().unwrap();
    let app = app!(test_state(dir.path(), None));

    let req = upload_request("/upload/all", "attachment", "notes.txt", b"text").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "No file part");

    let req = upload_request("/upload/all", "file", "", b"text").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "No selected file");
}

#[actix_web::test]
async fn empty_text_is_rejected() {
    let dir = TempDir::new().unwrap();
    let app = app!(test_state(dir.path(), None));

    let req = upload_request("/upload/document", "file", "blank.txt", b"   \n ").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(leftover_files(dir.path()), 0);
}

#[actix_web::test]
async fn oversized_upload_is_rejected() {
    let dir = TempDir::new().unwrap();
    let mut state = test_state(dir.path(), None);
    state.max_upload_bytes = 16;
    let app = app!(state);

    let req = upload_request("/upload/all", "file", "big.txt", &[b'a'; 64]).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(leftover_files(dir.path()), 0);
}

#[actix_web::test]
async fn oversized_extra_field_counts_against_limit() {
    let dir = TempDir::new().unwrap();
    let mut state = test_state(dir.path(), None);
    state.max_upload_bytes = 16;
    let app = app!(state);

    let (content_type, file_part) = multipart("file", "small.txt", b"tiny");
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"comment\"\r\n\r\n{}\r\n",
        "x".repeat(64)
    )
    .into_bytes();
    body.extend_from_slice(&file_part);

    let req = test::TestRequest::post()
        .uri("/upload/all")
        .insert_header(("content-type", content_type))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(leftover_files(dir.path()), 0);
}

#[actix_web::test]
async fn stored_documents_can_be_fetched_and_deleted() {
    let dir = TempDir::new().unwrap();
    let app = app!(test_state(dir.path(), None));

    let req = upload_request("/upload/document", "file", "notes.txt", b"keep me").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::get().uri("/documents/document_notes_txt").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["text"], "keep me");
    assert_eq!(body["kind"], "txt");

    let req = test::TestRequest::delete().uri("/documents/document_notes_txt").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body, json!({ "deleted": true }));

    let req = test::TestRequest::get().uri("/documents/document_notes_txt").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn index_then_answer() {
    let dir = TempDir::new().unwrap();
    let app = app!(test_state(dir.path(), Some(Arc::new(EchoGenerator))));

    let text = b"Ferris is the unofficial mascot of Rust.\n\nPotatoes are tubers grown underground.";
    let req = upload_request("/index", "file", "facts.txt", text).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["document_id"], "all_facts_txt");
    assert_eq!(body["chunks"], 2);
    assert_eq!(leftover_files(dir.path()), 0);

    let req = test::TestRequest::post()
        .uri("/retrieve_and_answer")
        .set_json(json!({ "query": "Who is the mascot of Rust?", "top_k": 1 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    let answer = body["answer"].as_str().unwrap();
    assert!(answer.contains("[Who is the mascot of Rust?]"));
    assert!(answer.contains("Ferris"));
    assert_eq!(body["sources"].as_array().unwrap().len(), 1);
}

#[actix_web::test]
async fn answer_without_generator_is_unavailable() {
    let dir = TempDir::new().unwrap();
    let app = app!(test_state(dir.path(), None));

    let req = test::TestRequest::post()
        .uri("/retrieve_and_answer")
        .set_json(json!({ "query": "anything" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[actix_web::test]
async fn malformed_json_is_a_bad_request() {
    let dir = TempDir::new().unwrap();
    let app = app!(test_state(dir.path(), None));

    let req = test::TestRequest::post()
        .uri("/retrieve_and_answer")
        .insert_header(("content-type", "application/json"))
        .set_payload("{\"question\": 1}")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert!(body["error"].is_string());
}

#[actix_web::test]
async fn health_reports_components() {
    let dir = TempDir::new().unwrap();
    let app = app!(test_state(dir.path(), None));

    let req = test::TestRequest::get().uri("/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["overall_status"], "degraded");
    assert_eq!(body["checks"].as_array().unwrap().len(), 3);
}
