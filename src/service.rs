//! Authentication Service
//!
//! Registration, login and current-user resolution on top of the credential
//! verifier, the token service and a [`UserStore`].

use crate::config::AppConfig;
use crate::error::AuthError;
use crate::models::*;
use crate::password::CredentialVerifier;
use crate::store::UserStore;
use crate::token::TokenService;

use std::sync::Arc;

/// Authentication service
pub struct AuthService {
    store: Arc<dyn UserStore>,
    verifier: CredentialVerifier,
    tokens: TokenService,
}

impl AuthService {
    /// Create a new authentication service
    pub fn new(store: Arc<dyn UserStore>, verifier: CredentialVerifier, tokens: TokenService) -> Self {
        Self {
            store,
            verifier,
            tokens,
        }
    }

    /// Build the service from application configuration
    pub fn from_config(store: Arc<dyn UserStore>, config: &AppConfig) -> Result<Self, AuthError> {
        let verifier = CredentialVerifier::new(config.hashing_config())?;
        let tokens = TokenService::new(config.token_config()?);
        Ok(Self::new(store, verifier, tokens))
    }

    /// Get reference to the token service
    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    // ============================================
    // User Registration
    // ============================================

    /// Register a new user
    pub async fn register(&self, req: RegisterRequest) -> Result<User, AuthError> {
        tracing::info!(
            email = %req.email,
            username = %req.username,
            "Attempting to register user"
        );

        if self.store.find_by_email(&req.email).await?.is_some() {
            tracing::warn!(email = %req.email, "Registration failed: email already registered");
            return Err(AuthError::EmailExists);
        }

        if self.store.find_by_username(&req.username).await?.is_some() {
            tracing::warn!(username = %req.username, "Registration failed: username already taken");
            return Err(AuthError::UsernameTaken);
        }

        let password_hash = self.verifier.hash_async(&req.password).await?;

        let user = self
            .store
            .create(NewUser {
                email: req.email,
                username: req.username,
                password_hash,
            })
            .await?;

        tracing::info!(user_id = user.id, username = %user.username, "User registered");
        Ok(user)
    }

    // ============================================
    // Login
    // ============================================

    /// Log in with a username or email and return a bearer token
    pub async fn login(&self, login: &str, password: &str) -> Result<TokenResponse, AuthError> {
        tracing::info!(login = %login, "Login attempt");

        let user = self.store.find_by_login(login).await?;
        let user = self.check_password(login, user, password).await?;

        let access_token = self.tokens.issue(&user.username)?;
        tracing::info!(username = %user.username, "Successful login");

        Ok(TokenResponse::bearer(access_token))
    }

    /// Log in with an email only, returning the user alongside the token
    pub async fn login_by_email(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(User, String), AuthError> {
        let user = self.store.find_by_email(email).await?;
        let user = self.check_password(email, user, password).await?;

        let access_token = self.tokens.issue(&user.username)?;
        Ok((user, access_token))
    }

    /// Unknown users and wrong passwords fail the same way.
    async fn check_password(
        &self,
        login: &str,
        user: Option<User>,
        password: &str,
    ) -> Result<User, AuthError> {
        let Some(user) = user else {
            tracing::warn!(login = %login, "Login failed: user not found");
            return Err(AuthError::InvalidCredentials);
        };

        if !self.verifier.verify_async(password, &user.password_hash).await {
            tracing::warn!(login = %login, "Login failed: invalid password");
            return Err(AuthError::InvalidCredentials);
        }

        Ok(user)
    }

    // ============================================
    // Current User
    // ============================================

    /// Resolve the user a bearer token was issued for
    pub async fn current_user(&self, token: &str) -> Result<User, AuthError> {
        let username = self.tokens.validate(token)?;
        self.user_by_subject(&username).await
    }

    /// Load the user named by an already validated token subject
    pub async fn user_by_subject(&self, username: &str) -> Result<User, AuthError> {
        self.store
            .find_by_username(username)
            .await?
            .ok_or(AuthError::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::password::HashingConfig;
    use crate::store::MemoryUserStore;
    use crate::token::{TokenConfig, TokenError};
    use chrono::{Duration, Utc};

    const SECRET: &[u8] = b"service-test-secret-that-is-long-enough";

    fn service() -> AuthService {
        let verifier = CredentialVerifier::new(HashingConfig {
            memory_cost: 1024,
            time_cost: 1,
            parallelism: 1,
        })
        .unwrap();
        let tokens = TokenService::new(TokenConfig::new(SECRET, Duration::minutes(30)));
        AuthService::new(Arc::new(MemoryUserStore::new()), verifier, tokens)
    }

    fn register_request(email: &str, username: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.into(),
            username: username.into(),
            password: password.into(),
        }
    }

    #[tokio::test]
    async fn test_register_stores_hash_not_plaintext() {
        let auth = service();
        let user = auth
            .register(register_request("alice@example.com", "alice", "s3cret!"))
            .await
            .unwrap();

        assert_ne!(user.password_hash, "s3cret!");
        assert!(user.password_hash.starts_with("$argon2id$"));
    }

    #[tokio::test]
    async fn test_register_rejects_duplicates() {
        let auth = service();
        auth.register(register_request("alice@example.com", "alice", "pw"))
            .await
            .unwrap();

        let dup_email = auth
            .register(register_request("alice@example.com", "alicia", "pw"))
            .await;
        assert_eq!(dup_email.unwrap_err(), AuthError::EmailExists);

        let dup_name = auth
            .register(register_request("other@example.com", "alice", "pw"))
            .await;
        assert_eq!(dup_name.unwrap_err(), AuthError::UsernameTaken);
    }

    #[tokio::test]
    async fn test_login_with_username_or_email() {
        let auth = service();
        auth.register(register_request("alice@example.com", "alice", "pw"))
            .await
            .unwrap();

        for login in ["alice", "alice@example.com"] {
            let response = auth.login(login, "pw").await.unwrap();
            assert_eq!(response.token_type, "bearer");
            assert_eq!(auth.tokens().validate(&response.access_token).unwrap(), "alice");
        }
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let auth = service();
        auth.register(register_request("alice@example.com", "alice", "pw"))
            .await
            .unwrap();

        let wrong_password = auth.login("alice", "nope").await.unwrap_err();
        let unknown_user = auth.login("mallory", "pw").await.unwrap_err();

        assert_eq!(wrong_password, AuthError::InvalidCredentials);
        assert_eq!(unknown_user, AuthError::InvalidCredentials);
    }

    #[tokio::test]
    async fn test_user_without_password_hash_cannot_log_in() {
        let store = Arc::new(MemoryUserStore::new());
        store
            .create(NewUser {
                email: "oauth@example.com".into(),
                username: "oauth".into(),
                password_hash: String::new(),
            })
            .await
            .unwrap();
        let auth = AuthService::new(store, service().verifier, service().tokens);

        assert_eq!(
            auth.login("oauth", "").await.unwrap_err(),
            AuthError::InvalidCredentials
        );
    }

    #[tokio::test]
    async fn test_login_by_email() {
        let auth = service();
        auth.register(register_request("alice@example.com", "alice", "pw"))
            .await
            .unwrap();

        let (user, token) = auth.login_by_email("alice@example.com", "pw").await.unwrap();
        assert_eq!(user.username, "alice");
        assert_eq!(auth.tokens().validate(&token).unwrap(), "alice");

        // Usernames are not accepted here.
        assert_eq!(
            auth.login_by_email("alice", "pw").await.unwrap_err(),
            AuthError::InvalidCredentials
        );
    }

    #[tokio::test]
    async fn test_current_user() {
        let auth = service();
        auth.register(register_request("alice@example.com", "alice", "pw"))
            .await
            .unwrap();
        let token = auth.login("alice", "pw").await.unwrap().access_token;

        let user = auth.current_user(&token).await.unwrap();
        assert_eq!(user.email, "alice@example.com");
    }

    #[tokio::test]
    async fn test_current_user_rejects_bad_tokens() {
        let auth = service();
        auth.register(register_request("alice@example.com", "alice", "pw"))
            .await
            .unwrap();

        assert_eq!(
            auth.current_user("garbage").await.unwrap_err(),
            AuthError::InvalidToken
        );

        let expired = auth
            .tokens()
            .issue_at("alice", Utc::now() - Duration::hours(1))
            .unwrap();
        assert_eq!(
            auth.current_user(&expired).await.unwrap_err(),
            AuthError::ExpiredToken
        );
    }

    #[tokio::test]
    async fn test_current_user_for_unknown_subject() {
        let auth = service();
        let token = auth.tokens().issue("ghost").unwrap();

        assert_eq!(
            auth.current_user(&token).await.unwrap_err(),
            AuthError::InvalidToken
        );
    }

    #[test]
    fn test_token_error_conversion() {
        let err: AuthError = TokenError::ExpiredToken.into();
        assert!(err.is_unauthorized());
    }
}
