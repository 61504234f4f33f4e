//! Authentication HTTP Handlers
//!
//! REST API endpoints for registration, login and the current user.

use crate::error::AuthError;
use crate::extractors::{AuthUser, FormBody, JsonBody};
use crate::middleware;
use crate::models::*;
use crate::note_store::NoteStore;
use crate::notes;
use crate::service::AuthService;

use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    middleware as axum_middleware,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use validator::Validate;

/// Shared auth service state
pub type AuthState = Arc<AuthService>;

/// Shared note store state
pub type NoteState = Arc<dyn NoteStore>;

/// Router state; handlers pick the part they need through [`FromRef`]
#[derive(Clone, FromRef)]
pub struct AppState {
    pub auth: AuthState,
    pub notes: NoteState,
}

impl AppState {
    pub fn new(auth: AuthState, notes: NoteState) -> Self {
        Self { auth, notes }
    }
}

// ============================================
// Route Builder
// ============================================

/// Create auth and note routes, nested under `prefix` (e.g. `/api/v1`)
pub fn create_routes(state: AppState, prefix: &str) -> Router {
    let routes = auth_routes(&state).merge(notes::note_routes(&state));

    let router = match prefix.trim_end_matches('/') {
        "" => routes,
        prefix => Router::new().nest(prefix, routes),
    };

    router.with_state(state)
}

fn auth_routes(state: &AppState) -> Router<AppState> {
    // Public routes (no authentication required)
    let public = Router::new()
        .route("/auth/register", post(register))
        .route("/auth/token", post(login_for_access_token))
        .route("/auth/nextauth/callback/credentials", post(nextauth_callback));

    // Protected routes (require authentication)
    let protected = Router::new()
        .route("/auth/me", get(read_users_me))
        .route_layer(axum_middleware::from_fn_with_state(
            state.auth.clone(),
            middleware::require_auth,
        ));

    public.merge(protected)
}

// ============================================
// Registration
// ============================================

/// POST /auth/register
///
/// Register a new user account
pub async fn register(
    State(auth): State<AuthState>,
    JsonBody(req): JsonBody<RegisterRequest>,
) -> Result<impl IntoResponse, AuthError> {
    req.validate()?;

    let user = auth.register(req).await?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

// ============================================
// Login
// ============================================

/// POST /auth/token
///
/// OAuth2 password flow: exchange username (or email) and password for a
/// bearer token
pub async fn login_for_access_token(
    State(auth): State<AuthState>,
    FormBody(form): FormBody<LoginForm>,
) -> Result<Json<TokenResponse>, AuthError> {
    form.validate()?;

    let response = auth.login(&form.username, &form.password).await?;

    Ok(Json(response))
}

/// POST /auth/nextauth/callback/credentials
///
/// Email/password login for the frontend's credentials provider
pub async fn nextauth_callback(
    State(auth): State<AuthState>,
    JsonBody(req): JsonBody<CredentialsRequest>,
) -> Result<Json<CredentialsResponse>, AuthError> {
    let (email, password) = req
        .credentials()
        .ok_or_else(|| AuthError::Validation("Email and password are required".to_string()))?;

    let (user, access_token) = auth.login_by_email(email, password).await?;

    Ok(Json(CredentialsResponse::new(&user, access_token)))
}

// ============================================
// User Profile
// ============================================

/// GET /auth/me
///
/// Get current user profile
pub async fn read_users_me(AuthUser(user): AuthUser) -> Json<UserResponse> {
    Json(UserResponse::from(user))
}
