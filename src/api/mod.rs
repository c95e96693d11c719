//! HTTP API Handlers and Routes
//!
//! # API Endpoints
//!
//! ## Public
//! - `GET /health` - Liveness probe
//! - `GET /api/counselors` - Counselor roster and time slots
//! - `GET /api-docs/openapi.json` - OpenAPI document for every endpoint below
//!
//! ## Students (`/api/students`)
//! - `POST /api/students` - Submit the application profile (validated before the session check)
//! - `GET /api/students/me` - Stored profile
//!
//! ## Counselor chat
//! - `POST /api/recommendations` - Formatted program contexts for a query
//! - `POST /api/chat` - Streamed answer (SSE `delta` / `done` / `error` events)
//! - `POST /api/email` - Schedule a meeting with a counselor
//!
//! ## Programs (`/api/programs`)
//! - `GET /api/programs`, `GET /api/programs/{id}` - Read the catalogue
//! - `POST /api/programs` - Create (admin)
//! - `POST /api/programs/{id}` - Update (admin)
//!
//! # Authentication
//!
//! Session endpoints require a bearer token signed by the session provider:
//! ```text
//! Authorization: Bearer <token>
//! ```

/// Request and response handlers for all API endpoints.
pub mod handlers;
/// Router configuration and route definitions.
pub mod routes;

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// OpenAPI document collected from the handler annotations.
#[derive(OpenApi)]
#[openapi(
    info(title = "Elytra API", description = "Student counseling, programs and recommendations"),
    paths(
        handlers::health::health,
        handlers::counselor::list_counselors,
        handlers::counselor::schedule_meeting,
        handlers::students::upload_student_info,
        handlers::students::get_my_profile,
        handlers::recommendations::recommend,
        handlers::chat::chat,
        handlers::programs::list_programs,
        handlers::programs::get_program,
        handlers::programs::create_program,
        handlers::programs::update_program,
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "students", description = "Student application profiles"),
        (name = "programs", description = "Program catalogue"),
        (name = "health", description = "Liveness"),
        (name = "recommendations", description = "Program contexts for a query"),
        (name = "chat", description = "Streamed counselor answers"),
        (name = "counselor", description = "Counselors and meetings"),
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
