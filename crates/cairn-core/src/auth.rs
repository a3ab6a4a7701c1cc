//! Credentials and bearer tokens.
//!
//! Passwords are hashed with argon2id (PHC string format); bearer tokens
//! are HS256 JWTs carrying the user id and global role. Token verification
//! is fail-closed: any decode error is an authentication failure, with the
//! detail logged rather than returned.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::model::{Role, User, UserId};

/// Errors from hashing or token handling.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid or expired token")]
    InvalidToken,

    #[error("password hashing failed: {0}")]
    Hash(String),

    #[error("token signing failed: {0}")]
    Sign(String),
}

/// Hashes a password into a PHC-format argon2id string.
///
/// # Errors
///
/// Returns [`AuthError::Hash`] if the hasher fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Hash(e.to_string()))
}

/// Verifies a password against a stored PHC string. A malformed stored
/// hash counts as a mismatch, not an error the caller can distinguish.
#[must_use]
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// JWT claims carried by a bearer token.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenClaims {
    /// User id.
    pub sub: String,
    /// Global role at issue time.
    pub role: Role,
    /// Expiry, seconds since epoch.
    pub exp: usize,
}

impl TokenClaims {
    /// Parses the subject back into a user id.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidToken`] if the subject is not a UUID.
    pub fn user_id(&self) -> Result<UserId, AuthError> {
        Uuid::parse_str(&self.sub).map_err(|_| AuthError::InvalidToken)
    }
}

/// Issues and verifies bearer tokens with a shared HS256 secret.
pub struct TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenSigner {
    #[must_use]
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::hours(ttl_hours.max(1)),
        }
    }

    /// Issues a token for `user`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Sign`] if encoding fails.
    pub fn issue(&self, user: &User) -> Result<String, AuthError> {
        let exp = usize::try_from((Utc::now() + self.ttl).timestamp()).unwrap_or(usize::MAX);
        let claims = TokenClaims {
            sub: user.id.to_string(),
            role: user.role,
            exp,
        };
        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AuthError::Sign(e.to_string()))
    }

    /// Verifies a token and returns its claims.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidToken`] on any decode or expiry failure.
    pub fn verify(&self, token: &str) -> Result<TokenClaims, AuthError> {
        decode::<TokenClaims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|_| AuthError::InvalidToken)
    }
}
