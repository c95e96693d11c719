//! Database clients and the vector index.
//!
//! - **Turso/SQLite**: student and program records
//! - **Pinecone**: program embeddings for retrieval
//!
//! The relational backend is chosen by [`DatabaseProvider`]; remote Turso
//! needs the `turso` feature.

#![allow(missing_docs)]

pub mod pinecone;
pub mod provider;
pub mod turso;
pub mod vectorstore;

pub use pinecone::PineconeStore;
pub use provider::DatabaseProvider;
pub use turso::TursoClient;
pub use vectorstore::VectorStore;
