//! HTTP error rendering.
//!
//! Wraps the core error taxonomy into the failure envelope. Internal
//! faults log their detail and render a generic message; nothing internal
//! leaks to the caller.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use cairn_core::Error;
use cairn_core::auth::AuthError;
use cairn_core::store::StoreError;
use serde::Serialize;
use tracing::error;

/// A handler-level failure, rendered as `{"success": false, "message"}`.
#[derive(Debug)]
pub struct ApiError(pub Error);

#[derive(Serialize)]
struct FailureBody {
    success: bool,
    message: String,
}

impl ApiError {
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match &self.0 {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::Authentication(_) => StatusCode::UNAUTHORIZED,
            Error::Authorization(_) => StatusCode::FORBIDDEN,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self.0 {
            Error::Internal(detail) => {
                error!(detail = %detail, "internal error while handling request");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(FailureBody { success: false, message })).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self(Error::from(err))
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        Self(Error::from(err))
    }
}
