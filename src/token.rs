//! Token Service
//!
//! Issues and validates HS256 access tokens in the compact JWT format
//! (`header.payload.signature`). Tokens are stateless: a token is valid as
//! long as its signature checks out against the server secret and its `exp`
//! claim is still in the future. There is no revocation.
//!
//! Signature verification always happens before the expiry check, so a
//! tampered token is reported as [`TokenError::InvalidToken`] even when its
//! claims are also expired.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// The only signing algorithm accepted in either direction.
pub const ALGORITHM: Algorithm = Algorithm::HS256;

/// Token failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// Bad signature, wrong algorithm, or a structurally broken token.
    #[error("Invalid token")]
    InvalidToken,

    /// Correctly signed, but `exp` has passed.
    #[error("Token has expired")]
    ExpiredToken,

    /// The claims could not be encoded or the lifetime overflowed.
    #[error("Failed to encode token")]
    Encoding,
}

/// JWT claims for access tokens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (username)
    pub sub: String,
    /// Issued at timestamp
    pub iat: i64,
    /// Expiration timestamp
    pub exp: i64,
}

/// Signing secret and token lifetime
#[derive(Clone)]
pub struct TokenConfig {
    pub secret: Vec<u8>,
    pub lifetime: Duration,
}

impl TokenConfig {
    pub fn new(secret: impl Into<Vec<u8>>, lifetime: Duration) -> Self {
        Self {
            secret: secret.into(),
            lifetime,
        }
    }
}

impl std::fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenConfig")
            .field("secret", &"[REDACTED]")
            .field("lifetime", &self.lifetime)
            .finish()
    }
}

/// Issue a token for `subject`, valid for `lifetime` from now.
pub fn issue(subject: &str, secret: &[u8], lifetime: Duration) -> Result<String, TokenError> {
    encode_claims(subject, &EncodingKey::from_secret(secret), lifetime, Utc::now())
}

/// Validate a token and return its subject.
pub fn validate(token: &str, secret: &[u8]) -> Result<String, TokenError> {
    decode_subject(token, &DecodingKey::from_secret(secret), Utc::now())
}

fn encode_claims(
    subject: &str,
    key: &EncodingKey,
    lifetime: Duration,
    now: DateTime<Utc>,
) -> Result<String, TokenError> {
    let exp = now
        .checked_add_signed(lifetime)
        .ok_or(TokenError::Encoding)?;

    let claims = Claims {
        sub: subject.to_owned(),
        iat: now.timestamp(),
        exp: exp.timestamp(),
    };

    encode(&Header::new(ALGORITHM), &claims, key).map_err(|_| TokenError::Encoding)
}

fn decode_subject(
    token: &str,
    key: &DecodingKey,
    now: DateTime<Utc>,
) -> Result<String, TokenError> {
    let mut validation = Validation::new(ALGORITHM);
    // Expiry is checked below against the caller's clock.
    validation.validate_exp = false;
    validation.leeway = 0;
    validation.set_required_spec_claims(&["exp", "sub"]);

    let claims = decode::<Claims>(token, key, &validation)
        .map_err(|_| TokenError::InvalidToken)?
        .claims;

    if claims.sub.is_empty() {
        return Err(TokenError::InvalidToken);
    }

    if now.timestamp() >= claims.exp {
        return Err(TokenError::ExpiredToken);
    }

    Ok(claims.sub)
}

/// Token service bound to one secret and lifetime.
///
/// Keys are derived once at construction and shared read-only, so a single
/// instance can serve any number of concurrent requests.
pub struct TokenService {
    lifetime: Duration,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenService {
    pub fn new(config: TokenConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(&config.secret);
        let decoding_key = DecodingKey::from_secret(&config.secret);

        Self {
            lifetime: config.lifetime,
            encoding_key,
            decoding_key,
        }
    }

    /// Configured token lifetime
    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    pub fn issue(&self, subject: &str) -> Result<String, TokenError> {
        self.issue_at(subject, Utc::now())
    }

    /// Issue as if the current time were `now`.
    pub fn issue_at(&self, subject: &str, now: DateTime<Utc>) -> Result<String, TokenError> {
        encode_claims(subject, &self.encoding_key, self.lifetime, now)
    }

    pub fn validate(&self, token: &str) -> Result<String, TokenError> {
        self.validate_at(token, Utc::now())
    }

    /// Validate as if the current time were `now`.
    pub fn validate_at(&self, token: &str, now: DateTime<Utc>) -> Result<String, TokenError> {
        decode_subject(token, &self.decoding_key, now)
    }
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("lifetime", &self.lifetime)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const SECRET: &[u8] = b"test-secret-key-that-is-long-enough";

    fn service() -> TokenService {
        TokenService::new(TokenConfig::new(SECRET, Duration::minutes(30)))
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn mutate_char(token: &str, index: usize) -> String {
        let mut chars: Vec<char> = token.chars().collect();
        chars[index] = if chars[index] == 'A' { 'B' } else { 'A' };
        chars.into_iter().collect()
    }

    #[test]
    fn test_issue_then_validate() {
        let token = issue("alice", SECRET, Duration::minutes(30)).unwrap();
        assert_eq!(validate(&token, SECRET).unwrap(), "alice");
    }

    #[test]
    fn test_compact_format() {
        let token = service().issue("alice").unwrap();
        let parts: Vec<&str> = token.split('.').collect();

        assert_eq!(parts.len(), 3);
        let header = jsonwebtoken::decode_header(&token).unwrap();
        assert_eq!(header.alg, Algorithm::HS256);
    }

    #[test]
    fn test_claims_carry_subject_and_expiry() {
        let svc = service();
        let token = svc.issue_at("alice", t0()).unwrap();

        let mut validation = Validation::new(ALGORITHM);
        validation.validate_exp = false;
        let claims = decode::<Claims>(&token, &DecodingKey::from_secret(SECRET), &validation)
            .unwrap()
            .claims;

        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.iat, t0().timestamp());
        assert_eq!(claims.exp, (t0() + Duration::minutes(30)).timestamp());
    }

    #[test]
    fn test_thirty_minute_scenario() {
        let svc = service();
        let token = svc.issue_at("alice", t0()).unwrap();

        assert_eq!(
            svc.validate_at(&token, t0() + Duration::minutes(29)).unwrap(),
            "alice"
        );
        assert_eq!(
            svc.validate_at(&token, t0() + Duration::minutes(31)),
            Err(TokenError::ExpiredToken)
        );
    }

    #[test]
    fn test_expiry_boundary() {
        let svc = service();
        let token = svc.issue_at("bob", t0()).unwrap();
        let expires_at = t0() + Duration::minutes(30);

        assert!(svc
            .validate_at(&token, expires_at - Duration::seconds(1))
            .is_ok());
        assert_eq!(
            svc.validate_at(&token, expires_at),
            Err(TokenError::ExpiredToken)
        );
        assert_eq!(
            svc.validate_at(&token, expires_at + Duration::days(365)),
            Err(TokenError::ExpiredToken)
        );
    }

    #[test]
    fn test_wrong_secret_is_invalid() {
        let token = issue("alice", SECRET, Duration::minutes(30)).unwrap();

        assert_eq!(
            validate(&token, b"wrong-secret-key-that-is-different"),
            Err(TokenError::InvalidToken)
        );
    }

    #[test]
    fn test_wrong_secret_beats_expiry() {
        let svc = service();
        let token = svc.issue_at("alice", t0()).unwrap();
        let other = TokenService::new(TokenConfig::new(
            b"another-secret-key-of-enough-length".to_vec(),
            Duration::minutes(30),
        ));

        assert_eq!(
            other.validate_at(&token, t0() + Duration::hours(2)),
            Err(TokenError::InvalidToken)
        );
    }

    #[test]
    fn test_any_mutation_is_invalid() {
        let svc = service();
        let token = svc.issue_at("alice", t0()).unwrap();
        let payload_start = token.find('.').unwrap() + 1;

        for index in payload_start..token.len() {
            if token.as_bytes()[index] == b'.' {
                continue;
            }
            let tampered = mutate_char(&token, index);
            assert_eq!(
                svc.validate_at(&tampered, t0()),
                Err(TokenError::InvalidToken),
                "mutation at {index} was accepted"
            );
        }
    }

    #[test]
    fn test_extended_expiry_is_rejected() {
        let svc = service();
        let token = svc.issue_at("alice", t0()).unwrap();
        let parts: Vec<&str> = token.split('.').collect();

        // Splice a payload with a later expiry under the original signature.
        let forged_claims = Claims {
            sub: "alice".into(),
            iat: t0().timestamp(),
            exp: (t0() + Duration::days(30)).timestamp(),
        };
        let forged = issue_with_other_key(&forged_claims);
        let forged_payload = forged.split('.').nth(1).unwrap();
        let tampered = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);

        assert_eq!(
            svc.validate_at(&tampered, t0() + Duration::hours(1)),
            Err(TokenError::InvalidToken)
        );
    }

    fn issue_with_other_key(claims: &Claims) -> String {
        encode(
            &Header::new(ALGORITHM),
            claims,
            &EncodingKey::from_secret(b"attacker-controlled-secret-value!!"),
        )
        .unwrap()
    }

    #[test]
    fn test_malformed_tokens() {
        let svc = service();

        for token in ["", "not-a-jwt", "a.b", "a.b.c", "...", "Bearer abc.def.ghi"] {
            assert_eq!(svc.validate(token), Err(TokenError::InvalidToken), "{token:?}");
        }
    }

    #[test]
    fn test_other_algorithm_rejected() {
        let claims = Claims {
            sub: "alice".into(),
            iat: Utc::now().timestamp(),
            exp: (Utc::now() + Duration::minutes(5)).timestamp(),
        };
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();

        assert_eq!(validate(&token, SECRET), Err(TokenError::InvalidToken));
    }

    #[test]
    fn test_empty_subject_rejected() {
        let token = issue("", SECRET, Duration::minutes(30)).unwrap();
        assert_eq!(validate(&token, SECRET), Err(TokenError::InvalidToken));
    }

    #[test]
    fn test_missing_subject_rejected() {
        #[derive(Serialize)]
        struct NoSubject {
            exp: i64,
        }

        let token = encode(
            &Header::new(ALGORITHM),
            &NoSubject {
                exp: (Utc::now() + Duration::minutes(5)).timestamp(),
            },
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();

        assert_eq!(validate(&token, SECRET), Err(TokenError::InvalidToken));
    }

    #[test]
    fn test_lifetime_overflow() {
        let svc = TokenService::new(TokenConfig::new(SECRET, Duration::days(365 * 1_000_000)));
        assert_eq!(svc.issue("alice"), Err(TokenError::Encoding));
    }

    #[test]
    fn test_config_debug_redacts_secret() {
        let rendered = format!("{:?}", TokenConfig::new(SECRET, Duration::minutes(30)));
        assert!(rendered.contains("REDACTED"));
        assert!(!rendered.contains("test-secret"));
    }
}
