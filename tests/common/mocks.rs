//! Mock providers shared by the integration suites.

use async_trait::async_trait;
use elytra::counselor::{Mailer, OutgoingEmail};
use elytra::db::VectorStore;
use elytra::llm::{LLMClient, TokenStream};
use elytra::rag::embeddings::EmbeddingProvider;
use elytra::types::{AppError, IndexRecord, Result, SearchMatch};
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use serde_json::{json, Map, Value};

/// LLM client with a canned answer, streamed in 5-character chunks.
#[derive(Clone)]
pub struct MockLLMClient {
    response: String,
    should_fail: bool,
}

impl MockLLMClient {
    pub fn new(response: &str) -> Self {
        Self {
            response: response.to_string(),
            should_fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            response: String::new(),
            should_fail: true,
        }
    }
}

#[async_trait]
impl LLMClient for MockLLMClient {
    async fn generate_with_system(&self, _system: &str, _prompt: &str) -> Result<String> {
        if self.should_fail {
            return Err(AppError::LLM("Mock LLM failure".to_string()));
        }
        Ok(self.response.clone())
    }

    async fn stream_with_system(&self, _system: &str, _prompt: &str) -> Result<TokenStream> {
        if self.should_fail {
            return Err(AppError::LLM("Mock LLM failure".to_string()));
        }
        let chunks: Vec<Result<String>> = self
            .response
            .chars()
            .collect::<Vec<_>>()
            .chunks(5)
            .map(|c| Ok(c.iter().collect()))
            .collect();
        Ok(Box::new(stream::iter(chunks).boxed()))
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}

/// Embedder returning a fixed vector, or failing.
pub struct MockEmbedder {
    should_fail: bool,
}

impl MockEmbedder {
    pub fn new() -> Self {
        Self { should_fail: false }
    }

    pub fn failing() -> Self {
        Self { should_fail: true }
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        if self.should_fail {
            return Err(AppError::Embedding("Mock embedding failure".to_string()));
        }
        Ok(vec![0.1, 0.2, 0.3])
    }

    fn model_name(&self) -> &str {
        "mock-embedding"
    }
}

/// Vector store with preset matches that records upserts.
pub struct MockVectorStore {
    matches: Vec<SearchMatch>,
    should_fail: bool,
    pub upserted: Mutex<Vec<IndexRecord>>,
}

impl MockVectorStore {
    pub fn with_matches(matches: Vec<SearchMatch>) -> Self {
        Self {
            matches,
            should_fail: false,
            upserted: Mutex::new(Vec::new()),
        }
    }

    pub fn empty() -> Self {
        Self::with_matches(Vec::new())
    }

    pub fn failing() -> Self {
        Self {
            matches: Vec::new(),
            should_fail: true,
            upserted: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl VectorStore for MockVectorStore {
    fn provider_name(&self) -> &'static str {
        "mock"
    }

    async fn query(&self, _vector: &[f32], top_k: usize) -> Result<Vec<SearchMatch>> {
        if self.should_fail {
            return Err(AppError::VectorStore("Mock search failure".to_string()));
        }
        Ok(self.matches.iter().take(top_k).cloned().collect())
    }

    async fn upsert(&self, records: &[IndexRecord]) -> Result<usize> {
        if self.should_fail {
            return Err(AppError::VectorStore("Mock upsert failure".to_string()));
        }
        self.upserted.lock().extend(records.iter().cloned());
        Ok(records.len())
    }
}

/// Mailer that records every message.
pub struct MockMailer {
    should_fail: bool,
    pub sent: Mutex<Vec<OutgoingEmail>>,
}

impl MockMailer {
    pub fn new() -> Self {
        Self {
            should_fail: false,
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            should_fail: true,
            sent: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Mailer for MockMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<()> {
        if self.should_fail {
            return Err(AppError::Mail("Mock mail failure".to_string()));
        }
        self.sent.lock().push(email.clone());
        Ok(())
    }
}

/// A search hit shaped like an indexed program.
pub fn program_match(id: &str, name: &str, university: &str, score: f64) -> SearchMatch {
    let metadata: Map<String, Value> = match json!({
        "Program": name,
        "University": university,
        "Location": "Berlin, Germany",
        "EligibilityMinimumGPA": "3.0",
    }) {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    SearchMatch {
        id: id.to_string(),
        score: Some(score),
        metadata,
    }
}
