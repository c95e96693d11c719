use super::context::format_contexts;
use super::embeddings::EmbeddingProvider;
use crate::db::vectorstore::VectorStore;
use crate::types::{AppError, Retrieval};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Step of retrieval that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrievalStage {
    Embedding,
    Search,
}

impl fmt::Display for RetrievalStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetrievalStage::Embedding => f.write_str("embedding"),
            RetrievalStage::Search => f.write_str("search"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{stage} failed: {source}")]
pub struct RetrievalError {
    pub stage: RetrievalStage,
    #[source]
    pub source: AppError,
}

impl RetrievalError {
    pub fn new(stage: RetrievalStage, source: AppError) -> Self {
        Self { stage, source }
    }
}

impl From<RetrievalError> for AppError {
    fn from(err: RetrievalError) -> Self {
        err.source
    }
}

/// Anything that can turn a query into formatted program contexts.
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn retrieve(&self, query: &str) -> Result<Retrieval, RetrievalError>;
}

/// Embed, search the index, format.
pub struct RagPipeline {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    top_k: usize,
}

impl RagPipeline {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        top_k: usize,
    ) -> Self {
        Self {
            embedder,
            store,
            top_k: top_k.max(1),
        }
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }
}

#[async_trait]
impl Retriever for RagPipeline {
    async fn retrieve(&self, query: &str) -> Result<Retrieval, RetrievalError> {
        let vector = self
            .embedder
            .embed(query)
            .await
            .map_err(|e| RetrievalError::new(RetrievalStage::Embedding, e))?;

        let matches = self
            .store
            .query(&vector, self.top_k)
            .await
            .map_err(|e| RetrievalError::new(RetrievalStage::Search, e))?;

        tracing::debug!(
            provider = self.store.provider_name(),
            matches = matches.len(),
            "Program search complete"
        );

        Ok(Retrieval {
            total_results: matches.len(),
            contexts: format_contexts(&matches),
        })
    }
}
