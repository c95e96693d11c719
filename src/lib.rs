//! # Elytra - AI Study-Abroad Counseling Server
//!
//! Elytra recommends academic programs to students. A question is embedded,
//! matched against a vector index of programs, and answered by an LLM that
//! sees the formatted program details and, when available, the student's
//! application profile.
//!
//! ## Overview
//!
//! Elytra can be used in two ways:
//!
//! 1. **As a standalone server** - Run the `elytra-server` binary
//! 2. **As a library** - Drive a [`ChatSession`](chat::ChatSession) from your own code
//!
//! ### Basic Example
//!
//! ```rust,ignore
//! use elytra::chat::{ChatSession, HttpChatTransport};
//! use elytra::chat::session::NullView;
//! use std::sync::Arc;
//!
//! let transport = HttpChatTransport::new("http://127.0.0.1:3000", token);
//! let mut session = ChatSession::new(Arc::new(transport.retriever()), Arc::new(transport));
//! session.submit("Affordable data science masters in Germany?", &mut NullView).await;
//! println!("{}", session.messages().last().unwrap().content);
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `turso` | Remote Turso database (in-memory and local SQLite are always available) |
//!
//! ## Modules
//!
//! - [`api`] - REST API handlers and routes
//! - [`auth`] - Session token verification and extractors
//! - [`chat`] - Chat state machine and completion transports
//! - [`counselor`] - Counselor roster and meeting emails
//! - [`db`] - libsql store and the Pinecone index
//! - [`llm`] - Completion providers and prompt assembly
//! - [`programs`] - Program records and admin upserts
//! - [`rag`] - Embedding, search and context formatting
//! - [`students`] - Student application profiles
//! - [`types`] - Common types and error handling

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

/// HTTP API handlers and routes.
pub mod api;
/// Session verification and middleware.
pub mod auth;
/// Counselor chat state machine and transports.
pub mod chat;
/// Command-line interface.
pub mod cli;
/// Counselor roster and meeting scheduling.
pub mod counselor;
/// Database clients (Turso/SQLite, Pinecone).
pub mod db;
/// LLM provider clients and abstractions.
pub mod llm;
/// Academic program records.
pub mod programs;
/// Retrieval Augmented Generation (RAG) components.
pub mod rag;
/// Student application profiles.
pub mod students;
/// Core types (requests, responses, errors).
pub mod types;
/// Configuration utilities (TOML).
pub mod utils;

// Re-export commonly used types
pub use db::{PineconeStore, TursoClient, VectorStore};
pub use llm::{LLMClient, Provider};
pub use types::{AppError, Result};
pub use utils::toml_config::{ElytraConfig, ElytraConfigManager};

use crate::auth::jwt::AuthService;
use crate::counselor::{HttpMailer, Mailer};
use crate::db::DatabaseProvider;
use crate::rag::embeddings::{EmbeddingProvider, GeminiEmbedder};
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// TOML configuration with hot-reload support
    pub config_manager: Arc<ElytraConfigManager>,
    /// Student and program store
    pub db: Arc<TursoClient>,
    /// Chat completion provider
    pub llm: Arc<dyn LLMClient>,
    /// Query embedding provider
    pub embedder: Arc<dyn EmbeddingProvider>,
    /// Program vector index
    pub vector_store: Arc<dyn VectorStore>,
    /// Meeting confirmation delivery
    pub mailer: Arc<dyn Mailer>,
    /// Session token verification
    pub auth_service: Arc<AuthService>,
}

impl AppState {
    /// Wire every provider from the loaded configuration.
    ///
    /// Required secrets must already be in the environment; see
    /// [`ElytraConfig::validate`].
    pub async fn from_config(config_manager: Arc<ElytraConfigManager>) -> Result<Self> {
        let config = config_manager.config();

        let auth_service = Arc::new(AuthService::new(
            config.jwt_secret()?,
            config.auth.jwt_access_expiry,
        ));

        let db = DatabaseProvider::from_config(&config).create_client().await?;
        tracing::info!(url = %config.database.url, "Database ready");

        let llm_key = config.secret(config.llm.api_key_env())?;
        let provider = Provider::from_config(&config.llm, llm_key);
        let llm: Arc<dyn LLMClient> = Arc::from(provider.create_client()?);
        tracing::info!(provider = provider.name(), model = llm.model_name(), "LLM ready");

        let embedder = GeminiEmbedder::from_config(
            &config.embeddings,
            config.secret(&config.embeddings.api_key_env)?,
        );
        let vector_store = PineconeStore::from_config(
            &config.pinecone,
            config.secret(&config.pinecone.api_key_env)?,
        );
        let mailer = HttpMailer::from_config(
            &config.mail,
            config.resolve_env(&config.mail.api_key_env),
        );

        Ok(Self {
            config_manager,
            db: Arc::new(db),
            llm,
            embedder: Arc::new(embedder),
            vector_store: Arc::new(vector_store),
            mailer: Arc::new(mailer),
            auth_service,
        })
    }
}
