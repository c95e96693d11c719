//! Outbound provider clients against mocked HTTP APIs.

use elytra::counselor::{HttpMailer, Mailer, OutgoingEmail};
use elytra::db::{PineconeStore, VectorStore};
use elytra::llm::gemini::GeminiClient;
use elytra::llm::openai::OpenAIClient;
use elytra::llm::LLMClient;
use elytra::rag::embeddings::{EmbeddingProvider, GeminiEmbedder};
use elytra::types::{AppError, IndexRecord};
use futures::StreamExt;
use serde_json::{json, Map};
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn sse(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.to_string(), "text/event-stream")
}

async fn collect(client: &dyn LLMClient) -> Vec<Result<String, AppError>> {
    client
        .stream_with_system("system", "question")
        .await
        .expect("stream opens")
        .collect()
        .await
}

// ============= Gemini =============

#[tokio::test]
async fn test_gemini_embed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/text-embedding-004:embedContent"))
        .and(header("x-goog-api-key", "gemini-key"))
        .and(body_partial_json(json!({
            "model": "models/text-embedding-004",
            "content": { "parts": [{ "text": "data science" }] }
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "embedding": { "values": [0.5, -0.25] } })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let embedder = GeminiEmbedder::new("gemini-key".to_string(), server.uri(), "text-embedding-004");
    let values = embedder.embed("data science").await.unwrap();

    assert_eq!(values, vec![0.5, -0.25]);
}

#[tokio::test]
async fn test_gemini_embed_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "embedding": { "values": [] } })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_string("quota"))
        .mount(&server)
        .await;

    let embedder = GeminiEmbedder::new("k".to_string(), server.uri(), "text-embedding-004");

    assert!(matches!(embedder.embed("a").await, Err(AppError::Embedding(_))));
    match embedder.embed("a").await {
        Err(AppError::Embedding(msg)) => assert!(msg.contains("429")),
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn test_gemini_stream() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/gemini-1.5-flash:streamGenerateContent"))
        .and(query_param("alt", "sse"))
        .and(body_partial_json(json!({
            "systemInstruction": { "parts": [{ "text": "system" }] },
            "contents": [{ "role": "user", "parts": [{ "text": "question" }] }]
        })))
        .respond_with(sse(concat!(
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"Try \"}]}}]}\n\n",
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"TU Munich\"}]}}]}\n\n",
        )))
        .mount(&server)
        .await;

    let client = GeminiClient::new("k".to_string(), server.uri(), "gemini-1.5-flash".to_string(), 0.7);
    let chunks: Vec<String> = collect(&client)
        .await
        .into_iter()
        .map(|c| c.unwrap())
        .collect();

    assert_eq!(chunks, vec!["Try ", "TU Munich"]);
}

#[tokio::test]
async fn test_gemini_stream_error_event() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(sse(concat!(
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"Hi\"}]}}]}\n\n",
            "data: {\"error\":{\"message\":\"overloaded\"}}\n\n",
        )))
        .mount(&server)
        .await;

    let client = GeminiClient::new("k".to_string(), server.uri(), "m".to_string(), 0.7);
    let chunks = collect(&client).await;

    assert_eq!(chunks.len(), 2);
    assert!(chunks[0].is_ok());
    assert!(matches!(&chunks[1], Err(AppError::LLM(msg)) if msg == "overloaded"));
}

#[tokio::test]
async fn test_gemini_generate_http_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let client = GeminiClient::new("k".to_string(), server.uri(), "m".to_string(), 0.7);

    assert!(matches!(
        client.generate_with_system("", "q").await,
        Err(AppError::LLM(_))
    ));
}

// ============= OpenAI-compatible =============

fn completion_chunk(delta: serde_json::Value) -> String {
    let chunk = json!({
        "id": "chatcmpl-1",
        "object": "chat.completion.chunk",
        "created": 1_700_000_000,
        "model": "gpt-4o-mini",
        "choices": [{ "index": 0, "delta": delta, "finish_reason": null }]
    });
    format!("data: {}\n\n", chunk)
}

#[tokio::test]
async fn test_openai_stream_surfaces_http_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": { "message": "bad key", "type": "invalid_request_error" }
        })))
        .mount(&server)
        .await;

    let client = OpenAIClient::new("sk-bad".to_string(), server.uri(), "m".to_string(), 0.2);
    let outcome = match client.stream_with_system("system", "question").await {
        Ok(stream) => stream.collect::<Vec<_>>().await.into_iter().find_map(|c| c.err()),
        Err(e) => Some(e),
    };

    assert!(matches!(outcome, Some(AppError::LLM(_))));
}

#[tokio::test]
async fn test_openai_stream_stops_at_done() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({ "model": "gpt-4o-mini", "stream": true })))
        .respond_with(sse(&format!(
            "{}{}{}data: [DONE]\n\n{}",
            completion_chunk(json!({ "role": "assistant" })),
            completion_chunk(json!({ "content": "Hello" })),
            completion_chunk(json!({ "content": " there" })),
            completion_chunk(json!({ "content": "ignored" })),
        )))
        .mount(&server)
        .await;

    let client = OpenAIClient::new(
        "sk-test".to_string(),
        server.uri(),
        "gpt-4o-mini".to_string(),
        0.2,
    );
    let text: String = collect(&client)
        .await
        .into_iter()
        .map(|c| c.unwrap())
        .collect();

    assert_eq!(text, "Hello there");
}

// ============= Pinecone =============

#[tokio::test]
async fn test_pinecone_query() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .and(header("Api-Key", "pc-key"))
        .and(body_partial_json(json!({
            "vector": [0.5],
            "topK": 3,
            "includeMetadata": true,
            "namespace": "programs"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "matches": [
                { "id": "program-1", "score": 0.91, "metadata": { "Program": "MSc AI" } },
                { "id": "program-2", "score": 0.42 }
            ]
        })))
        .mount(&server)
        .await;

    let store = PineconeStore::new("pc-key".to_string(), server.uri()).with_namespace("programs");
    let matches = store.query(&[0.5], 3).await.unwrap();

    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0].metadata["Program"], "MSc AI");
    assert_eq!(matches[1].score, Some(0.42));
    assert!(matches[1].metadata.is_empty());
}

#[tokio::test]
async fn test_pinecone_upsert_and_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/vectors/upsert"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "upsertedCount": 1 })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
        .mount(&server)
        .await;

    let store = PineconeStore::new("pc-key".to_string(), server.uri());
    let record = IndexRecord {
        id: "program-1".to_string(),
        values: vec![0.1, 0.2],
        metadata: Map::new(),
    };

    assert_eq!(store.upsert(&[record]).await.unwrap(), 1);
    assert!(matches!(
        store.query(&[0.1], 5).await,
        Err(AppError::VectorStore(_))
    ));
}

// ============= Mail =============

fn email() -> OutgoingEmail {
    OutgoingEmail {
        from: "Elytra <counseling@elytra.test>".to_string(),
        to: vec!["student@example.com".to_string()],
        subject: "Meeting scheduled with Dr. Sarah Johnson".to_string(),
        html: "<p>hi</p>".to_string(),
    }
}

#[tokio::test]
async fn test_http_mailer_posts_json() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/emails"))
        .and(header("authorization", "Bearer mail-key"))
        .and(body_partial_json(json!({ "to": ["student@example.com"] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "msg_1" })))
        .expect(1)
        .mount(&server)
        .await;

    let mailer = HttpMailer::new(
        format!("{}/emails", server.uri()),
        Some("mail-key".to_string()),
    );

    mailer.send(&email()).await.unwrap();
}

#[tokio::test]
async fn test_http_mailer_without_key_fails() {
    let mailer = HttpMailer::new(
        "http://127.0.0.1:9/emails".to_string(),
        None,
    );

    assert!(matches!(mailer.send(&email()).await, Err(AppError::Mail(_))));
}
