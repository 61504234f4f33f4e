//! Authentication Extractors
//!
//! Axum extractors for bearer tokens, the current user and request bodies
//! whose rejections render as [`AuthError`] JSON.

use crate::error::AuthError;
use crate::handlers::AuthState;
use crate::models::User;

use axum::{
    async_trait,
    extract::{FromRef, FromRequest, FromRequestParts},
    http::{header, request::Parts, HeaderMap},
};

/// JSON body; malformed input is a 400 `validation_error`
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AuthError))]
pub struct JsonBody<T>(pub T);

/// URL-encoded form body
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Form), rejection(AuthError))]
pub struct FormBody<T>(pub T);

/// Path parameters
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AuthError))]
pub struct PathParam<T>(pub T);

/// Query string
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AuthError))]
pub struct QueryParams<T>(pub T);

/// Token subject stored in request extensions by [`crate::middleware::require_auth`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject(pub String);

/// Pull the token out of an `Authorization: Bearer <token>` header.
///
/// The scheme is matched case-insensitively.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// The user a valid bearer token was issued for
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    AuthState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = AuthState::from_ref(state);

        // Token already checked by middleware
        if let Some(Subject(username)) = parts.extensions.get::<Subject>().cloned() {
            return auth.user_by_subject(&username).await.map(AuthUser);
        }

        let token = bearer_token(&parts.headers).ok_or(AuthError::InvalidToken)?;
        auth.current_user(token).await.map(AuthUser)
    }
}
