use crate::api::handlers::{chat, counselor, health, programs, recommendations, students};
use crate::api::ApiDoc;
use crate::auth::jwt::AuthService;
use crate::auth::middleware::{require_session, session_middleware};
use crate::AppState;
use axum::{
    http::HeaderValue,
    middleware,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use utoipa::OpenApi;

/// Largest accepted request body.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

pub fn create_router(auth_service: Arc<AuthService>) -> Router<AppState> {
    // Session resolved if present, never required here
    let open_routes = Router::new()
        .route("/counselors", get(counselor::list_counselors))
        .route("/students", post(students::upload_student_info));

    let protected_routes = Router::new()
        .route("/chat", post(chat::chat))
        .route("/recommendations", post(recommendations::recommend))
        .route("/students/me", get(students::get_my_profile))
        .route("/email", post(counselor::schedule_meeting))
        .route(
            "/programs",
            get(programs::list_programs).post(programs::create_program),
        )
        .route(
            "/programs/{id}",
            get(programs::get_program).post(programs::update_program),
        )
        .route_layer(middleware::from_fn(require_session));

    let api = open_routes
        .merge(protected_routes)
        .layer(middleware::from_fn(move |req, next| {
            session_middleware(auth_service.clone(), req, next)
        }));

    Router::new()
        .route("/health", get(health::health))
        .route("/api-docs/openapi.json", get(openapi_json))
        .nest("/api", api)
}

/// Full application: routes, state and the HTTP middleware stack.
///
/// Layers run outermost first: trace, body limit, then CORS.
pub fn build_app(state: AppState) -> Router {
    let config = state.config_manager.config();
    create_router(state.auth_service.clone())
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
                .layer(cors_layer(&config.server.cors_origins)),
        )
}

/// Any origin when the list is empty, otherwise exactly the listed ones.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        return layer.allow_origin(Any);
    }
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
