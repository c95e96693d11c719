//! Configuration utilities.

/// TOML configuration (`elytra.toml`) with hot reload.
pub mod toml_config;
