//! User Store
//!
//! Persistence for user records. The auth service only needs to look users
//! up and create new ones, so that is all the trait exposes.

use crate::error::AuthError;
use crate::models::{NewUser, User};

use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::RwLock;

/// Lookup and creation of user records
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AuthError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError>;

    /// Match on either username or email
    async fn find_by_login(&self, login: &str) -> Result<Option<User>, AuthError>;

    /// Persist a new user.
    ///
    /// Fails with [`AuthError::EmailExists`] or [`AuthError::UsernameTaken`]
    /// when a uniqueness constraint would be violated.
    async fn create(&self, user: NewUser) -> Result<User, AuthError>;
}

// ============================================
// PostgreSQL
// ============================================

/// Columns of a [`User`] row.
///
/// `hashed_password` is nullable in databases that also hold OAuth-only
/// accounts. An empty hash never verifies, so those users cannot log in
/// with a password.
const USER_COLUMNS: &str = "id, email, username, \
    COALESCE(hashed_password, '') AS hashed_password, \
    COALESCE(is_active, TRUE) AS is_active, profile_picture";

/// Map a unique violation on `users` to the field that collided.
///
/// Covers both the constraints created by [`PgUserStore::ensure_schema`]
/// (`users_username_key`) and index-backed ones such as `ix_users_username`.
pub fn unique_violation_error(constraint: Option<&str>) -> AuthError {
    match constraint {
        Some(name) if name.contains("username") => AuthError::UsernameTaken,
        _ => AuthError::EmailExists,
    }
}

/// PostgreSQL-backed user store
#[derive(Debug, Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create the users table if it does not exist yet
    pub async fn ensure_schema(&self) -> Result<(), AuthError> {
        tracing::info!("Ensuring users table exists");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id BIGSERIAL PRIMARY KEY,
                email VARCHAR(255) NOT NULL,
                username VARCHAR(100) NOT NULL,
                hashed_password VARCHAR(255),
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                profile_picture VARCHAR(512),
                CONSTRAINT users_email_key UNIQUE (email),
                CONSTRAINT users_username_key UNIQUE (username)
            )
            "#,
        )
        .execute(&self.db)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AuthError> {
        let user = sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1"))
            .bind(username)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        let user = sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    async fn find_by_login(&self, login: &str) -> Result<Option<User>, AuthError> {
        let user = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1 OR email = $1 ORDER BY id LIMIT 1"
        ))
        .bind(login)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn create(&self, user: NewUser) -> Result<User, AuthError> {
        let result = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (email, username, hashed_password) VALUES ($1, $2, $3) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.password_hash)
        .fetch_one(&self.db)
        .await;

        match result {
            Ok(user) => Ok(user),
            Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
                Err(unique_violation_error(err.constraint()))
            }
            Err(err) => Err(err.into()),
        }
    }
}

// ============================================
// In-memory
// ============================================

#[derive(Debug, Default)]
struct MemoryState {
    next_id: i64,
    users: Vec<User>,
}

/// In-process user store, lost on restart
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    state: RwLock<MemoryState>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users
    pub async fn len(&self) -> usize {
        self.state.read().await.users.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn find(&self, pred: impl Fn(&User) -> bool) -> Option<User> {
        self.state
            .read()
            .await
            .users
            .iter()
            .find(|u| pred(u))
            .cloned()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AuthError> {
        Ok(self.find(|u| u.username == username).await)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        Ok(self.find(|u| u.email == email).await)
    }

    async fn find_by_login(&self, login: &str) -> Result<Option<User>, AuthError> {
        Ok(self.find(|u| u.username == login || u.email == login).await)
    }

    async fn create(&self, user: NewUser) -> Result<User, AuthError> {
        let mut state = self.state.write().await;

        if state.users.iter().any(|u| u.email == user.email) {
            return Err(AuthError::EmailExists);
        }
        if state.users.iter().any(|u| u.username == user.username) {
            return Err(AuthError::UsernameTaken);
        }

        state.next_id += 1;
        let user = User {
            id: state.next_id,
            email: user.email,
            username: user.username,
            password_hash: user.password_hash,
            is_active: true,
            profile_picture: None,
        };
        state.users.push(user.clone());

        Ok(user)
    }
}
