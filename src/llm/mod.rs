//! LLM Provider Clients and Abstractions
//!
//! Every provider implements [`LLMClient`]; the `[llm]` config section picks
//! one at startup through [`Provider`].
//!
//! # Example
//!
//! ```ignore
//! use elytra::llm::{LLMClient, Provider};
//!
//! let client = Provider::from_config(&config.llm, api_key).create_client()?;
//! let mut stream = client.stream_with_system(system, &prompt).await?;
//! while let Some(chunk) = stream.next().await {
//!     print!("{}", chunk?);
//! }
//! ```
//!
//! # Streaming
//!
//! Both providers stream over server-sent events and yield `Result<String>`
//! text deltas. Gemini is parsed with `eventsource-stream`; the OpenAI client
//! goes through `async-openai`.

/// Core LLM client trait and provider selection.
pub mod client;
/// Google Gemini.
pub mod gemini;
/// OpenAI-compatible chat completions.
pub mod openai;
/// Counselor prompt assembly.
pub mod prompt;

pub use client::{LLMClient, Provider, TokenStream};
