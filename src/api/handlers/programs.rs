use crate::{
    auth::middleware::{AdminUser, AuthUser},
    programs::{self, FormFields, Program, ProgramResult, UpsertOutcome},
    types::{AppError, Result},
    AppState,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Form, Json,
};

/// List all programs
#[utoipa::path(
    get,
    path = "/api/programs",
    responses(
        (status = 200, description = "All programs", body = Vec<Program>),
        (status = 401, description = "Unauthorized")
    ),
    tag = "programs",
    security(("bearer" = []))
)]
pub async fn list_programs(
    State(state): State<AppState>,
    AuthUser(_claims): AuthUser,
) -> Result<Json<Vec<Program>>> {
    Ok(Json(state.db.list_programs().await?))
}

/// Get one program
#[utoipa::path(
    get,
    path = "/api/programs/{id}",
    params(("id" = i64, Path, description = "Program id")),
    responses(
        (status = 200, description = "Program", body = Program),
        (status = 404, description = "Not found")
    ),
    tag = "programs",
    security(("bearer" = []))
)]
pub async fn get_program(
    State(state): State<AppState>,
    AuthUser(_claims): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Program>> {
    state
        .db
        .get_program(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Program {} not found", id)))
}

/// Create a program from an admin form
#[utoipa::path(
    post,
    path = "/api/programs",
    request_body(content = String, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 201, description = "Created", body = ProgramResult),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Admin role required"),
        (status = 500, description = "Failed to create program", body = ProgramResult)
    ),
    tag = "programs",
    security(("bearer" = []))
)]
pub async fn create_program(
    State(state): State<AppState>,
    AdminUser(claims): AdminUser,
    Form(fields): Form<FormFields>,
) -> Result<(StatusCode, Json<ProgramResult>)> {
    tracing::debug!(admin = %claims.sub, "Create program requested");
    let outcome = programs::create_program(&state.db, &fields).await;
    respond(outcome, StatusCode::CREATED, "Failed to create program")
}

/// Update a program from an admin form
///
/// The literal value `Not Specified` clears a field.
#[utoipa::path(
    post,
    path = "/api/programs/{id}",
    params(("id" = i64, Path, description = "Program id")),
    request_body(content = String, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Updated", body = ProgramResult),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Failed to update program", body = ProgramResult),
        (status = 500, description = "Failed to update program", body = ProgramResult)
    ),
    tag = "programs",
    security(("bearer" = []))
)]
pub async fn update_program(
    State(state): State<AppState>,
    AdminUser(claims): AdminUser,
    Path(id): Path<i64>,
    Form(fields): Form<FormFields>,
) -> Result<(StatusCode, Json<ProgramResult>)> {
    tracing::debug!(admin = %claims.sub, program_id = id, "Update program requested");
    let outcome = programs::update_program(&state.db, id, &fields).await;
    respond(outcome, StatusCode::OK, "Failed to update program")
}

fn respond(
    outcome: UpsertOutcome,
    success: StatusCode,
    failure_message: &str,
) -> Result<(StatusCode, Json<ProgramResult>)> {
    match outcome {
        UpsertOutcome::Saved(program) => Ok((
            success,
            Json(ProgramResult {
                success: true,
                program: Some(program),
                error: None,
            }),
        )),
        UpsertOutcome::Invalid(fields) => Err(AppError::Validation(fields)),
        UpsertOutcome::Failed { not_found } => {
            let status = if not_found {
                StatusCode::NOT_FOUND
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            Ok((
                status,
                Json(ProgramResult {
                    success: false,
                    program: None,
                    error: Some(failure_message.to_string()),
                }),
            ))
        }
    }
}
