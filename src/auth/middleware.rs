use crate::auth::jwt::AuthService;
use crate::types::{AppError, Claims};
use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts, Request},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use std::convert::Infallible;
use std::sync::Arc;

/// Resolves the caller's session from the `Authorization` header.
///
/// A valid bearer token puts its `Claims` into the request extensions. A
/// missing or invalid token is not rejected here: handlers decide through the
/// extractors below, so that some of them can validate input before they
/// require a session.
pub async fn session_middleware(
    auth_service: Arc<AuthService>,
    mut req: Request,
    next: Next,
) -> Response {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "));

    if let Some(token) = token {
        match auth_service.verify_token(token) {
            Ok(claims) => {
                req.extensions_mut().insert(claims);
            }
            Err(e) => tracing::debug!("Rejected session token: {}", e),
        }
    }

    next.run(req).await
}

/// Rejects requests without a resolved session.
pub async fn require_session(req: Request, next: Next) -> Result<Response, AppError> {
    if req.extensions().get::<Claims>().is_none() {
        return Err(AppError::Auth("You must be logged in".to_string()));
    }
    Ok(next.run(req).await)
}

/// Extractor for the authenticated caller.
pub struct AuthUser(pub Claims);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Claims>()
            .cloned()
            .map(AuthUser)
            .ok_or_else(|| AppError::Auth("You must be logged in".to_string()))
    }
}

impl<S> OptionalFromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(parts.extensions.get::<Claims>().cloned().map(AuthUser))
    }
}

/// Extractor for callers holding the admin role.
pub struct AdminUser(pub Claims);

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthUser(claims) =
            <AuthUser as FromRequestParts<S>>::from_request_parts(parts, state).await?;
        if !claims.is_admin() {
            return Err(AppError::Forbidden(
                "Admin access is required".to_string(),
            ));
        }
        Ok(AdminUser(claims))
    }
}
