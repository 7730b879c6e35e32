//! Mock-server tests for `HttpEmbeddings`: verifies the request shape, the
//! 384-dim response is accepted, a wrong-shaped response is rejected, and a
//! non-2xx status surfaces as an error rather than a panic.

use serde_json::json;
use threadloom_embeddings::{Embeddings, HttpEmbeddings, EMBEDDING_DIM};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn vector_response(count: usize) -> serde_json::Value {
    json!({ "embeddings": vec![vec![0.1_f32; EMBEDDING_DIM]; count] })
}

#[tokio::test]
async fn encode_sends_bearer_auth_and_parses_vector() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .and(header("authorization", "Bearer secret"))
        .and(body_json(json!({ "model": "all-MiniLM-L6-v2", "input": ["hello"] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(vector_response(1)))
        .mount(&server)
        .await;

    let client = HttpEmbeddings::new(server.uri(), Some("secret".to_string()));
    let vector = client.encode("hello").await.expect("vector");
    assert_eq!(vector.len(), EMBEDDING_DIM);
}

#[tokio::test]
async fn encode_batch_chunks_requests_by_batch_size() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vector_response(2)))
        .mount(&server)
        .await;

    let client = HttpEmbeddings::new(server.uri(), None);
    let texts = vec!["a".to_string(), "b".to_string(), "c".to_string(), "d".to_string()];
    let vectors = client.encode_batch(&texts, 2).await.expect("vectors");
    assert_eq!(vectors.len(), 4);
}

#[tokio::test]
async fn wrong_dimension_response_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "embeddings": [[0.1_f32; 8]] })))
        .mount(&server)
        .await;

    let client = HttpEmbeddings::new(server.uri(), None);
    assert!(client.encode("hello").await.is_err());
}

#[tokio::test]
async fn server_error_surfaces_as_request_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = HttpEmbeddings::new(server.uri(), None);
    assert!(client.encode("hello").await.is_err());
}
