//! Registration, login, and caller introspection.
//!
//! The only two unauthenticated routes live here. Login failures are
//! deliberately indistinguishable (unknown email vs wrong password).

use axum::extract::State;
use axum::response::Response;
use cairn_core::Error;
use cairn_core::auth::{hash_password, verify_password};
use cairn_core::model::{NewUser, PublicUser, Role};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::error::ApiError;
use crate::extract::{Auth, Body};
use crate::response::{created, ok};
use crate::state::AppState;

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RegisterBody {
    pub email: String,
    pub name: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LoginBody {
    pub email: String,
    pub password: String,
}

pub async fn register(
    State(state): State<AppState>,
    Body(body): Body<RegisterBody>,
) -> Result<Response, ApiError> {
    let email = body.email.trim().to_string();
    if !email.contains('@') {
        return Err(ApiError(Error::validation("a valid email is required")));
    }
    if body.name.trim().is_empty() {
        return Err(ApiError(Error::validation("name must not be empty")));
    }
    if body.password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError(Error::validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        ))));
    }

    let password_hash = hash_password(&body.password)?;
    let user = state.users.insert_user(NewUser {
        email,
        name: body.name.trim().to_string(),
        password_hash,
        role: Role::User,
    })?;

    info!(user = %user.id, "registered user");
    Ok(created(PublicUser::from(&user)))
}

pub async fn login(
    State(state): State<AppState>,
    Body(body): Body<LoginBody>,
) -> Result<Response, ApiError> {
    let invalid = || ApiError(Error::Authentication("invalid email or password".into()));

    let user = state
        .users
        .find_user_by_email(body.email.trim())?
        .ok_or_else(invalid)?;
    if !verify_password(&body.password, &user.password_hash) {
        return Err(invalid());
    }

    let token = state.tokens.issue(&user)?;
    Ok(ok(json!({
        "token": token,
        "user": PublicUser::from(&user),
    })))
}

pub async fn me(State(state): State<AppState>, Auth(caller): Auth) -> Result<Response, ApiError> {
    let user = state
        .users
        .get_user(caller.id)?
        .ok_or_else(|| ApiError(Error::not_found("user")))?;
    Ok(ok(PublicUser::from(&user)))
}
