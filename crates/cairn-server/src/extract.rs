//! Request extractors.
//!
//! [`Auth`] resolves the bearer token into a [`Caller`]; the wrapper
//! extractors exist so malformed bodies, query strings, and path ids are
//! rendered through the failure envelope instead of axum's default
//! rejections.

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, FromRequestParts, Path, Query, Request};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use cairn_core::{Caller, Error};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// The authenticated caller, resolved from the `Authorization: Bearer`
/// header. The user is re-read from the store on every request so role
/// changes take effect without waiting for token expiry.
pub struct Auth(pub Caller);

impl FromRequestParts<AppState> for Auth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError(Error::unauthenticated()))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError(Error::Authentication("malformed authorization header".into())))?;

        let claims = state.tokens.verify(token).map_err(ApiError::from)?;
        let user_id = claims.user_id().map_err(ApiError::from)?;

        let user = state
            .users
            .get_user(user_id)?
            .ok_or_else(|| ApiError(Error::Authentication("unknown user".into())))?;

        Ok(Self(Caller::new(user.id, user.role)))
    }
}

/// JSON body with envelope-shaped rejections.
pub struct Body<T>(pub T);

impl<S, T> FromRequest<S> for Body<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(axum::Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(ApiError(Error::Validation(reject_text(&rejection)))),
        }
    }
}

fn reject_text(rejection: &JsonRejection) -> String {
    match rejection {
        JsonRejection::MissingJsonContentType(_) => {
            "expected a JSON request body".to_string()
        }
        other => other.body_text(),
    }
}

/// Query string with envelope-shaped rejections.
pub struct Params<T>(pub T);

impl<S, T> FromRequestParts<S> for Params<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(Self(value)),
            Err(rejection) => Err(ApiError(Error::Validation(rejection.body_text()))),
        }
    }
}

/// A UUID path segment with envelope-shaped rejections.
pub struct Id(pub Uuid);

impl<S> FromRequestParts<S> for Id
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<Uuid>::from_request_parts(parts, state).await {
            Ok(Path(id)) => Ok(Self(id)),
            Err(_) => Err(ApiError(Error::Validation("invalid id in path".into()))),
        }
    }
}
