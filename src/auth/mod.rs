//! Session resolution for the Elytra API
//!
//! Identity is owned by an external session provider. Elytra only verifies
//! the HS256 bearer tokens it signs and exposes the resulting claims to
//! handlers.
//!
//! # Module Structure
//!
//! - [`auth::jwt`](crate::auth::jwt) - token verification (and issuance for operators/tests)
//! - [`auth::middleware`](crate::auth::middleware) - Axum middleware and extractors
//!
//! # Extracting Claims in Handlers
//!
//! ```ignore
//! async fn protected_handler(AuthUser(claims): AuthUser) -> impl IntoResponse {
//!     format!("Hello, {}!", claims.email)
//! }
//! ```
//!
//! Handlers that must validate their payload before requiring a session take
//! `Option<AuthUser>` instead.
//!
//! # Configuration
//!
//! ```toml
//! [auth]
//! jwt_secret_env = "JWT_SECRET"   # env var holding the shared secret
//! jwt_access_expiry = 3600        # lifetime of operator-issued tokens
//! ```

/// JWT verification and issuance.
pub mod jwt;
/// Session middleware and extractors for protected routes.
pub mod middleware;
