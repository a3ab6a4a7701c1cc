//! Error taxonomy.
//!
//! Five categories, one per HTTP status the API can answer with. Handlers
//! resolve existence before authorization: a missing entity is `NotFound`
//! even when the caller would also have failed the authorization check.

use thiserror::Error;

use crate::auth::AuthError;
use crate::store::StoreError;

/// Domain error, rendered by the server as the failure envelope.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or missing input (400).
    #[error("{0}")]
    Validation(String),

    /// Missing or invalid bearer token (401).
    #[error("{0}")]
    Authentication(String),

    /// Authenticated but lacking scope or ownership (403).
    #[error("{0}")]
    Authorization(String),

    /// A referenced entity id did not resolve (404).
    #[error("{0}")]
    NotFound(String),

    /// Unexpected persistence or runtime fault (500). The message is for
    /// logs; it is never rendered to the caller.
    #[error("{0}")]
    Internal(String),
}

impl Error {
    #[must_use]
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    #[must_use]
    pub fn not_found(entity: &str) -> Self {
        Self::NotFound(format!("{entity} not found"))
    }

    /// The uniform 403 used when an authorization predicate returns false.
    #[must_use]
    pub fn forbidden() -> Self {
        Self::Authorization("not authorized to perform this action".to_string())
    }

    #[must_use]
    pub fn unauthenticated() -> Self {
        Self::Authentication("authentication required".to_string())
    }
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(entity) => Self::not_found(entity),
            StoreError::Conflict(msg) => Self::Validation(msg),
            StoreError::Storage(msg) => Self::Internal(msg),
        }
    }
}

impl From<AuthError> for Error {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidToken => Self::Authentication(err.to_string()),
            AuthError::Hash(msg) | AuthError::Sign(msg) => Self::Internal(msg),
        }
    }
}
