//! Application Configuration
//!
//! All configuration values are loaded from environment variables.
//! No hardcoded secrets or sensitive data.

use crate::error::AuthError;
use crate::password::HashingConfig;
use crate::token::TokenConfig;

use chrono::{Duration, Utc};
use std::env;

/// Application configuration loaded from environment
#[derive(Clone)]
pub struct AppConfig {
    /// Token signing secret (from SECRET_KEY env var)
    pub secret_key: String,

    /// Token signing algorithm (from ALGORITHM env var, only HS256 is supported)
    pub algorithm: String,

    /// Access token lifetime in minutes (from ACCESS_TOKEN_EXPIRE_MINUTES env var)
    pub access_token_expire_minutes: i64,

    /// Argon2 memory cost in KiB (from ARGON2_MEMORY_COST env var)
    pub argon2_memory_cost: u32,

    /// Argon2 time cost (iterations) (from ARGON2_TIME_COST env var)
    pub argon2_time_cost: u32,

    /// Argon2 parallelism (from ARGON2_PARALLELISM env var)
    pub argon2_parallelism: u32,

    /// Route prefix for the versioned API (from API_V1_STR env var)
    pub api_prefix: String,

    /// Service name used in logs (from PROJECT_NAME env var)
    pub project_name: String,

    /// PostgreSQL connection string (from DATABASE_URL env var)
    pub database_url: Option<String>,

    /// Listen address (from BIND_ADDR env var)
    pub bind_addr: String,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AuthError> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self, AuthError> {
        let defaults = HashingConfig::default();

        Ok(Self {
            secret_key: var("SECRET_KEY").ok_or_else(|| {
                AuthError::Config("SECRET_KEY environment variable must be set".to_string())
            })?,

            algorithm: var("ALGORITHM").unwrap_or_else(|| "HS256".to_string()),

            access_token_expire_minutes: var("ACCESS_TOKEN_EXPIRE_MINUTES")
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),

            argon2_memory_cost: var("ARGON2_MEMORY_COST")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.memory_cost), // 19 MiB

            argon2_time_cost: var("ARGON2_TIME_COST")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.time_cost),

            argon2_parallelism: var("ARGON2_PARALLELISM")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.parallelism),

            api_prefix: var("API_V1_STR").unwrap_or_else(|| "/api/v1".to_string()),

            project_name: var("PROJECT_NAME").unwrap_or_else(|| "Notes App API".to_string()),

            database_url: var("DATABASE_URL").filter(|v| !v.is_empty()),

            bind_addr: var("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8000".to_string()),
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.secret_key.len() < 32 {
            return Err(AuthError::Config(
                "SECRET_KEY must be at least 32 characters".to_string(),
            ));
        }

        if !self.algorithm.eq_ignore_ascii_case("HS256") {
            return Err(AuthError::Config(format!(
                "ALGORITHM {} is not supported, use HS256",
                self.algorithm
            )));
        }

        if self.access_token_expire_minutes <= 0 {
            return Err(AuthError::Config(
                "ACCESS_TOKEN_EXPIRE_MINUTES must be positive".to_string(),
            ));
        }

        self.token_lifetime()?;

        if !self.api_prefix.is_empty() && !self.api_prefix.starts_with('/') {
            return Err(AuthError::Config(
                "API_V1_STR must start with '/'".to_string(),
            ));
        }

        Ok(())
    }

    /// Token service settings
    pub fn token_config(&self) -> Result<TokenConfig, AuthError> {
        Ok(TokenConfig::new(self.secret_key.as_bytes(), self.token_lifetime()?))
    }

    /// Token lifetime; must leave `now + lifetime` representable
    fn token_lifetime(&self) -> Result<Duration, AuthError> {
        Duration::try_minutes(self.access_token_expire_minutes)
            .filter(|lifetime| Utc::now().checked_add_signed(*lifetime).is_some())
            .ok_or_else(|| {
                AuthError::Config(format!(
                    "ACCESS_TOKEN_EXPIRE_MINUTES {} is too large",
                    self.access_token_expire_minutes
                ))
            })
    }

    /// Password hashing settings
    pub fn hashing_config(&self) -> HashingConfig {
        HashingConfig {
            memory_cost: self.argon2_memory_cost,
            time_cost: self.argon2_time_cost,
            parallelism: self.argon2_parallelism,
        }
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("secret_key", &"[REDACTED]")
            .field("algorithm", &self.algorithm)
            .field("access_token_expire_minutes", &self.access_token_expire_minutes)
            .field("argon2_memory_cost", &self.argon2_memory_cost)
            .field("argon2_time_cost", &self.argon2_time_cost)
            .field("argon2_parallelism", &self.argon2_parallelism)
            .field("api_prefix", &self.api_prefix)
            .field("project_name", &self.project_name)
            .field("database_url", &self.database_url.as_ref().map(|_| "[REDACTED]"))
            .field("bind_addr", &self.bind_addr)
            .finish()
    }
}
