//! Retrieval Augmented Generation (RAG) Pipeline
//!
//! Grounds counselor answers in the program catalogue.
//!
//! # Module Structure
//!
//! - [`rag::embeddings`](crate::rag::embeddings) - Query embedding (Gemini `embedContent`)
//! - [`rag::context`](crate::rag::context) - Search hits rendered as program descriptions
//! - [`rag::pipeline`](crate::rag::pipeline) - Embed, search, format
//!
//! # Flow
//!
//! 1. **Embedding** - the question is embedded
//! 2. **Search** - top-K programs are fetched from the vector index with metadata
//! 3. **Formatting** - each hit becomes a plain-text context block
//! 4. **Generation** - the LLM answers with the contexts in its prompt
//!
//! # Example
//!
//! ```ignore
//! use elytra::rag::pipeline::{RagPipeline, Retriever};
//!
//! let rag = RagPipeline::new(embedder, vector_store, 5);
//! let retrieval = rag.retrieve("MS in data science in Canada").await?;
//! println!("{} programs", retrieval.total_results);
//! ```

pub mod context;
pub mod embeddings;
pub mod pipeline;
