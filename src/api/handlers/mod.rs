//! API request handlers.

/// Streaming counselor chat.
pub mod chat;
/// Counselor roster and meeting scheduling.
pub mod counselor;
/// Liveness probe.
pub mod health;
/// Program catalogue reads and admin upserts.
pub mod programs;
/// Program retrieval for a query.
pub mod recommendations;
/// Student application profiles.
pub mod students;
