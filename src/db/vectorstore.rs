//! Vector index abstraction
//!
//! ```text
//!   RagPipeline ──► VectorStore::query ──► PineconeStore (HTTP)
//!   sync_index  ──► VectorStore::upsert ─┘
//! ```
//!
//! Tests substitute an in-process implementation of the trait.

use crate::types::{IndexRecord, Result, SearchMatch};
use async_trait::async_trait;

/// Similarity search over the program index.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Short name used in logs.
    fn provider_name(&self) -> &'static str;

    /// Return up to `top_k` nearest matches with their metadata, best first.
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<SearchMatch>>;

    /// Insert or replace records by id. Returns how many were written.
    async fn upsert(&self, records: &[IndexRecord]) -> Result<usize>;
}
