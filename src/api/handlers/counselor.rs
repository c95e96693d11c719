use crate::{
    auth::middleware::AuthUser,
    counselor::{self, CounselorDirectory, MeetingRequest},
    types::Result,
    AppState,
};
use axum::{extract::State, Json};
use serde_json::{json, Value};

/// List counselors and bookable time slots
#[utoipa::path(
    get,
    path = "/api/counselors",
    responses((status = 200, description = "Counselor roster and time slots")),
    tag = "counselor"
)]
pub async fn list_counselors() -> Json<CounselorDirectory> {
    Json(CounselorDirectory::current())
}

/// Schedule a counseling session and email the confirmation
///
/// A blank `email` is replaced by the session's email.
#[utoipa::path(
    post,
    path = "/api/email",
    request_body = MeetingRequest,
    responses(
        (status = 200, description = "Meeting scheduled"),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Unauthorized"),
        (status = 502, description = "Mail provider failed")
    ),
    tag = "counselor",
    security(("bearer" = []))
)]
pub async fn schedule_meeting(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Json(request): Json<MeetingRequest>,
) -> Result<Json<Value>> {
    let config = state.config_manager.config();
    counselor::schedule_meeting(state.mailer.as_ref(), &config.mail.from, &claims, request).await?;
    Ok(Json(json!({ "success": true })))
}
