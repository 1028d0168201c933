//! End-to-end tests driving the HTTP router against mocked collaborators.
//!
//! Every external boundary (persistence store, embedding provider, generation
//! provider) is an httpmock server, so these tests exercise the full pipeline:
//! extraction, chunking, embedding, persistence, retrieval, prompt
//! composition, and stream reassembly.

use std::sync::Arc;

use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use cramkit::api::create_router;
use cramkit::config::{Config, EmbeddingConfig, GenerationConfig, RetrievalConfig, StoreConfig};
use cramkit::service::PrepService;
use httpmock::{Method::GET, Method::POST, MockServer};
use serde_json::{Value, json};
use tower::ServiceExt;

fn test_config(server: &MockServer) -> Config {
    Config {
        store: StoreConfig {
            base_url: server.base_url(),
            service_key: Some("test-key".into()),
        },
        embedding: EmbeddingConfig {
            base_url: server.base_url(),
            model: "nomic-embed-text".into(),
            dimension: 3,
        },
        generation: GenerationConfig {
            base_url: server.base_url(),
            model: "llama3:8b-instruct-q4_K_M".into(),
        },
        retrieval: RetrievalConfig {
            allow_scope_widening: true,
            fallback_page_size: 1000,
            fallback_context_chunks: 15,
            plan_context_chunks: 40,
            context_char_budget: 15_000,
        },
        server_port: None,
    }
}

fn router_for(server: &MockServer) -> axum::Router {
    let service = PrepService::new(test_config(server)).expect("service");
    create_router(Arc::new(service))
}

fn json_request(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    serde_json::from_slice(&bytes).expect("json body")
}

#[tokio::test]
async fn ingest_processes_an_uploaded_text_document() {
    let server = MockServer::start_async().await;

    let paragraph_one = format!("Graphs fundamentals. {}", "x".repeat(60));
    let paragraph_two = format!("Traversal algorithms. {}", "y".repeat(60));
    let document = format!("{paragraph_one}\n\n{paragraph_two}");

    let document_insert = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/rest/v1/documents")
                .header("apikey", "test-key");
            then.status(201);
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/embeddings");
            then.status(200)
                .json_body(json!({ "embedding": [0.1, 0.2, 0.3] }));
        })
        .await;
    let chunk_insert = server
        .mock_async(|when, then| {
            when.method(POST).path("/rest/v1/chunks");
            then.status(201);
        })
        .await;

    let app = router_for(&server);
    let request = json_request(
        "/ingest",
        json!({
            "subject_id": "subj-a",
            "filename": "graphs.txt",
            "content_type": "text/plain",
            "data": BASE64.encode(document.as_bytes()),
        }),
    );

    let response = app.oneshot(request).await.expect("router response");
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["chunks_total"], 2);
    assert_eq!(body["chunks_succeeded"], 2);
    assert_eq!(
        body["message"],
        "Processed 2 of 2 chunks from graphs.txt"
    );

    document_insert.assert();
    chunk_insert.assert_hits(2);
}

#[tokio::test]
async fn ingest_rejects_unsupported_formats_with_actionable_message() {
    let server = MockServer::start_async().await;
    let app = router_for(&server);

    let request = json_request(
        "/ingest",
        json!({
            "subject_id": "subj-a",
            "filename": "data.bin",
            "data": BASE64.encode(b"opaque"),
        }),
    );

    let response = app.oneshot(request).await.expect("router response");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = body_json(response).await;
    let message = body["error"].as_str().expect("error message");
    assert!(message.contains("Unsupported file format"));
}

#[tokio::test]
async fn chat_streams_reassembled_deltas_as_plain_text() {
    let server = MockServer::start_async().await;

    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/rest/v1/subjects")
                .query_param("id", "eq.subj-a");
            then.status(200)
                .json_body(json!([{ "id": "subj-a", "name": "Graphs" }]));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/embeddings");
            then.status(200)
                .json_body(json!({ "embedding": [0.1, 0.2, 0.3] }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/rest/v1/rpc/match_chunks");
            then.status(200).json_body(json!([
                { "content": "A graph is a set of vertices and edges.", "similarity": 0.9 }
            ]));
        })
        .await;
    let chat_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/chat")
                .body_contains("A graph is a set of vertices and edges.");
            then.status(200).body(concat!(
                "{\"message\":{\"role\":\"assistant\",\"content\":\"Based \"},\"done\":false}\n",
                "{\"message\":{\"role\":\"assistant\",\"content\":\"on \"},\"done\":false}\n",
                "{\"message\":{\"role\":\"assistant\",\"content\":\"the \"},\"done\":false}\n",
            ));
        })
        .await;

    let app = router_for(&server);
    let request = json_request(
        "/chat",
        json!({
            "messages": [{ "role": "user", "content": "What is a graph?" }],
            "subject_id": "subj-a",
        }),
    );

    let response = app.oneshot(request).await.expect("router response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"],
        "text/plain; charset=utf-8"
    );

    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("streamed body");
    assert_eq!(String::from_utf8(bytes.to_vec()).expect("utf8"), "Based on the ");

    chat_mock.assert();
}

#[tokio::test]
async fn exam_prep_streams_through_the_fallback_ladder() {
    let server = MockServer::start_async().await;

    // No explicit subject: scope resolves to the latest-created one.
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/rest/v1/subjects")
                .query_param("order", "created_at.desc");
            then.status(200)
                .json_body(json!([{ "id": "subj-latest", "name": "Databases" }]));
        })
        .await;
    // Embedding provider is down; retrieval must fall back to the scan.
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/embeddings");
            then.status(500).body("offline");
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/rest/v1/chunks")
                .query_param("subject_id", "eq.subj-latest");
            then.status(200)
                .json_body(json!([{ "content": "Normalization reduces redundancy." }]));
        })
        .await;
    let generate_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/generate")
                .body_contains("MID-SEMESTER")
                .body_contains("Normalization reduces redundancy.");
            then.status(200).body(concat!(
                "{\"response\":\"Q1 (5 marks): \",\"done\":false}\n",
                "{\"response\":\"Define normalization.\",\"done\":true}\n",
            ));
        })
        .await;

    let app = router_for(&server);
    let request = json_request("/exam-prep", json!({ "exam_type": "mid" }));

    let response = app.oneshot(request).await.expect("router response");
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("streamed body");
    assert_eq!(
        String::from_utf8(bytes.to_vec()).expect("utf8"),
        "Q1 (5 marks): Define normalization."
    );

    generate_mock.assert();
}

#[tokio::test]
async fn study_plan_returns_structured_json() {
    let server = MockServer::start_async().await;

    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/rest/v1/chunks")
                .query_param("subject_id", "eq.subj-a")
                .query_param("limit", "40");
            then.status(200)
                .json_body(json!([{ "content": "Unit 1 covers graph basics." }]));
        })
        .await;
    let plan = json!({
        "hitlist": [
            { "q": "Define a graph. [10 Marks]", "a": "A graph is a set of vertices and edges." }
        ],
        "summaries": [{ "unit": "Unit 1", "text": "Graphs and their representations." }],
        "flashcards": [{ "front": "Vertex", "back": "A node of a graph." }]
    });
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/generate")
                .body_contains("UNIT 1")
                .json_body_partial(r#"{"format":"json","stream":false}"#);
            then.status(200).json_body(json!({
                "response": plan.to_string(),
                "done": true
            }));
        })
        .await;

    let app = router_for(&server);
    let request = json_request(
        "/study-plan",
        json!({
            "subject_id": "subj-a",
            "urgency": "cram",
            "target_grade": "top",
            "explanation_style": "academic",
            "answer_length": "short",
            "target_unit": 1,
        }),
    );

    let response = app.oneshot(request).await.expect("router response");
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["hitlist"][0]["q"], "Define a graph. [10 Marks]");
    assert_eq!(body["summaries"][0]["unit"], "Unit 1");
    assert_eq!(body["flashcards"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn generation_outage_is_a_bad_gateway_not_a_partial_stream() {
    let server = MockServer::start_async().await;

    server
        .mock_async(|when, then| {
            when.method(GET).path("/rest/v1/subjects");
            then.status(200)
                .json_body(json!([{ "id": "subj-a", "name": "Graphs" }]));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/embeddings");
            then.status(200)
                .json_body(json!({ "embedding": [0.1, 0.2, 0.3] }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/rest/v1/rpc/match_chunks");
            then.status(200)
                .json_body(json!([{ "content": "ctx", "similarity": 0.5 }]));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/chat");
            then.status(503).body("model loading");
        })
        .await;

    let app = router_for(&server);
    let request = json_request(
        "/chat",
        json!({
            "messages": [{ "role": "user", "content": "hello" }],
            "subject_id": "subj-a",
        }),
    );

    let response = app.oneshot(request).await.expect("router response");
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    let body = body_json(response).await;
    assert!(body["error"].as_str().expect("message").contains("503"));
}

#[tokio::test]
async fn metrics_reflect_ingestion_counts() {
    let server = MockServer::start_async().await;

    server
        .mock_async(|when, then| {
            when.method(POST).path("/rest/v1/documents");
            then.status(201);
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/embeddings");
            then.status(200)
                .json_body(json!({ "embedding": [0.1, 0.2, 0.3] }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/rest/v1/chunks");
            then.status(201);
        })
        .await;

    let service = Arc::new(PrepService::new(test_config(&server)).expect("service"));
    let app = create_router(service.clone());

    let paragraph = format!("Long enough paragraph body. {}", "z".repeat(60));
    let ingest = json_request(
        "/ingest",
        json!({
            "subject_id": "subj-a",
            "filename": "notes.txt",
            "content_type": "text/plain",
            "data": BASE64.encode(paragraph.as_bytes()),
        }),
    );
    let response = app.clone().oneshot(ingest).await.expect("ingest response");
    assert_eq!(response.status(), StatusCode::OK);

    let metrics = app
        .oneshot(
            Request::builder()
                .method(Method::GET)
                .uri("/metrics")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("metrics response");
    assert_eq!(metrics.status(), StatusCode::OK);

    let body = body_json(metrics).await;
    assert_eq!(body["documents_ingested"], 1);
    assert_eq!(body["chunks_embedded"], 1);
    assert_eq!(body["chunks_failed"], 0);
}
