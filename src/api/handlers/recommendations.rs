use crate::{
    auth::middleware::AuthUser,
    rag::pipeline::{RagPipeline, RetrievalError, RetrievalStage, Retriever},
    types::{AppError, RecommendationRequest, Retrieval},
    AppState,
};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Retrieve formatted program contexts for a query
///
/// Errors carry a `stage` field (`embedding` or `search`) so clients can
/// report which step failed.
#[utoipa::path(
    post,
    path = "/api/recommendations",
    request_body = RecommendationRequest,
    responses(
        (status = 200, description = "Formatted contexts", body = Retrieval),
        (status = 400, description = "Empty query"),
        (status = 401, description = "Unauthorized"),
        (status = 502, description = "Embedding or search provider failed")
    ),
    tag = "recommendations",
    security(("bearer" = []))
)]
pub async fn recommend(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Json(payload): Json<RecommendationRequest>,
) -> Response {
    if payload.query.trim().is_empty() {
        return AppError::InvalidInput("Query cannot be empty".to_string()).into_response();
    }

    let top_k = state.config_manager.config().rag.top_k;
    let rag = RagPipeline::new(state.embedder.clone(), state.vector_store.clone(), top_k);

    match rag.retrieve(&payload.query).await {
        Ok(retrieval) => {
            tracing::info!(
                user_id = %claims.sub,
                results = retrieval.total_results,
                "Recommendations retrieved"
            );
            Json(retrieval).into_response()
        }
        Err(e) => retrieval_failure(e),
    }
}

fn retrieval_failure(err: RetrievalError) -> Response {
    tracing::error!(stage = %err.stage, "Retrieval failed: {}", err.source);
    let message = match err.stage {
        RetrievalStage::Embedding => "Failed to process the query",
        RetrievalStage::Search => "Failed to search the program index",
    };
    let body = json!({
        "error": message,
        "stage": err.stage.to_string(),
    });
    (StatusCode::BAD_GATEWAY, Json(body)).into_response()
}
