use crate::{
    auth::middleware::AuthUser,
    students::{self, StudentProfile, StudentProfileForm},
    types::{AppError, Result},
    AppState,
};
use axum::{extract::State, Json};
use serde_json::{json, Value};

/// Submit the student application profile
///
/// The form is validated before the session is checked, so an anonymous
/// caller with a bad form gets 400 and one with a good form gets 401.
#[utoipa::path(
    post,
    path = "/api/students",
    request_body = StudentProfileForm,
    responses(
        (status = 200, description = "Profile stored"),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "No session"),
        (status = 500, description = "Storage failure")
    ),
    tag = "students",
    security(("bearer" = []))
)]
pub async fn upload_student_info(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Json(form): Json<StudentProfileForm>,
) -> Result<Json<Value>> {
    let claims = user.map(|AuthUser(claims)| claims);
    let profile = students::upload_profile(&state.db, claims.as_ref(), &form)
        .await
        .map_err(AppError::from)?;

    Ok(Json(json!({
        "success": true,
        "student": profile,
    })))
}

/// Get the caller's stored profile
#[utoipa::path(
    get,
    path = "/api/students/me",
    responses(
        (status = 200, description = "Stored profile", body = StudentProfile),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "No profile on record")
    ),
    tag = "students",
    security(("bearer" = []))
)]
pub async fn get_my_profile(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<Json<StudentProfile>> {
    Ok(Json(students::load_profile(&state.db, &claims).await?))
}
