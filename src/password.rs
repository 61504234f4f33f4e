//! Credential Verifier
//!
//! Argon2id password hashing. Every hash gets a fresh random salt and is
//! stored as a PHC string, so the algorithm, cost parameters and salt travel
//! with the hash and verification needs nothing else.

use crate::error::AuthError;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};

/// Argon2 cost parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashingConfig {
    /// Memory cost in KiB
    pub memory_cost: u32,
    /// Number of iterations
    pub time_cost: u32,
    /// Degree of parallelism
    pub parallelism: u32,
}

impl Default for HashingConfig {
    fn default() -> Self {
        Self {
            memory_cost: Params::DEFAULT_M_COST,
            time_cost: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

/// Hashes new passwords and checks plaintexts against stored hashes.
#[derive(Clone)]
pub struct CredentialVerifier {
    argon2: Argon2<'static>,
}

impl CredentialVerifier {
    /// Build a verifier with the given cost parameters.
    pub fn new(config: HashingConfig) -> Result<Self, AuthError> {
        let params = Params::new(
            config.memory_cost,
            config.time_cost,
            config.parallelism,
            None,
        )
        .map_err(|e| AuthError::Config(format!("invalid Argon2 parameters: {e}")))?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// Hash a plaintext password for storage.
    pub fn hash(&self, plaintext: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);

        let hash = self
            .argon2
            .hash_password(plaintext.as_bytes(), &salt)?
            .to_string();

        Ok(hash)
    }

    /// Check a plaintext against a stored hash.
    ///
    /// Uses the salt and cost parameters embedded in `stored_hash`, not the
    /// ones this verifier was built with. Anything that does not parse as a
    /// supported PHC string is simply a mismatch.
    pub fn verify(&self, plaintext: &str, stored_hash: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(stored_hash) else {
            return false;
        };

        self.argon2
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok()
    }

    /// [`hash`](Self::hash) on the blocking thread pool.
    pub async fn hash_async(&self, plaintext: &str) -> Result<String, AuthError> {
        let verifier = self.clone();
        let plaintext = plaintext.to_owned();

        tokio::task::spawn_blocking(move || verifier.hash(&plaintext))
            .await
            .map_err(|e| {
                tracing::error!("Password hashing task failed: {e}");
                AuthError::Internal
            })?
    }

    /// [`verify`](Self::verify) on the blocking thread pool.
    pub async fn verify_async(&self, plaintext: &str, stored_hash: &str) -> bool {
        let verifier = self.clone();
        let plaintext = plaintext.to_owned();
        let stored_hash = stored_hash.to_owned();

        tokio::task::spawn_blocking(move || verifier.verify(&plaintext, &stored_hash))
            .await
            .unwrap_or(false)
    }
}

impl std::fmt::Debug for CredentialVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialVerifier").finish_non_exhaustive()
    }
}
