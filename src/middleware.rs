//! Authentication Middleware
//!
//! Bearer token validation for protected routes.

use crate::error::AuthError;
use crate::extractors::{bearer_token, Subject};
use crate::handlers::AuthState;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

/// Require a valid bearer token
///
/// Validates the token from the Authorization header and stores its
/// subject in request extensions for the [`crate::AuthUser`] extractor.
pub async fn require_auth(
    State(auth): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = bearer_token(req.headers()).ok_or(AuthError::InvalidToken)?;

    let subject = auth.tokens().validate(token).map_err(|e| {
        tracing::debug!("Bearer token rejected: {e}");
        AuthError::from(e)
    })?;

    req.extensions_mut().insert(Subject(subject));

    Ok(next.run(req).await)
}
