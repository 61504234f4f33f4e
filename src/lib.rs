//! Notes App Authentication
//!
//! User registration and login API providing:
//! - Argon2id password hashing with a random salt per hash
//! - Stateless HS256 JWT access tokens with expiry
//! - Current-user resolution from a bearer token
//! - Per-user notes with tags behind that token
//!
//! # Configuration
//!
//! All configuration is loaded from environment variables:
//! - `SECRET_KEY` - Secret key for signing JWTs (required, min 32 chars)
//! - `ALGORITHM` - Signing algorithm (default: "HS256", the only one supported)
//! - `ACCESS_TOKEN_EXPIRE_MINUTES` - Access token lifetime in minutes (default: 30)
//! - `ARGON2_MEMORY_COST` / `ARGON2_TIME_COST` / `ARGON2_PARALLELISM` - hashing cost
//! - `API_V1_STR` - Route prefix (default: "/api/v1")
//! - `DATABASE_URL` - PostgreSQL connection string (optional, in-memory store otherwise)
//!
//! # Usage
//!
//! ```rust,ignore
//! use notes_auth::{AppConfig, AppState, AuthService, MemoryNoteStore, MemoryUserStore};
//!
//! let config = AppConfig::from_env()?;
//! let auth = Arc::new(AuthService::from_config(Arc::new(MemoryUserStore::new()), &config)?);
//! let state = AppState::new(auth, Arc::new(MemoryNoteStore::new()));
//! let app = notes_auth::app(state, &config.api_prefix);
//! ```

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod note_store;
pub mod notes;
pub mod password;
pub mod service;
pub mod store;
pub mod token;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::AuthError;
pub use extractors::AuthUser;
pub use handlers::{AppState, AuthState, NoteState};
pub use models::*;
pub use note_store::{MemoryNoteStore, NoteStore, PgNoteStore};
pub use password::{CredentialVerifier, HashingConfig};
pub use service::AuthService;
pub use store::{MemoryUserStore, PgUserStore, UserStore};
pub use token::{TokenConfig, TokenError, TokenService};

use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

/// Build the full application router
///
/// Auth and note routes nested under `api_prefix`. CORS mirrors the caller's
/// origin and allows credentials, so cookie-carrying browser frontends work.
pub fn app(state: AppState, api_prefix: &str) -> Router {
    handlers::create_routes(state, api_prefix)
        .layer(ServiceBuilder::new().layer(CorsLayer::very_permissive()))
}
