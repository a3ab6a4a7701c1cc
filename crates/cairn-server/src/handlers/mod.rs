//! Request handlers.
//!
//! Every mutating handler follows the same shape: resolve existence (404),
//! evaluate the authorization policy (403), apply the single mutation,
//! hand one activity record to the recorder, and shape the response
//! envelope. Validation short-circuits before any lookup.

pub mod activity;
pub mod auth;
pub mod comments;
pub mod projects;
pub mod tasks;

use axum::response::Response;
use cairn_core::model::{Comment, Project, Task};
use cairn_core::page::{PageParams, Sort};
use cairn_core::{Caller, Error, can_access_project, can_mutate_privileged};
use serde::Serialize;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::error::ApiError;
use crate::response::ok;
use crate::state::AppState;

/// Liveness probe; no auth, no envelope payload worth paginating.
pub async fn health() -> Response {
    ok(json!({ "status": "ok" }))
}

pub(crate) fn page_params(
    state: &AppState,
    page: Option<u64>,
    limit: Option<u64>,
) -> PageParams {
    PageParams::clamped(
        page.unwrap_or(1),
        limit.unwrap_or(state.pagination.default_limit),
        state.pagination.max_limit,
    )
}

pub(crate) fn sort_from(raw: Option<&str>) -> Sort {
    raw.map(Sort::parse).unwrap_or_default()
}

pub(crate) fn require_project(state: &AppState, id: Uuid) -> Result<Project, ApiError> {
    state
        .projects
        .get_project(id)?
        .ok_or_else(|| ApiError(Error::not_found("project")))
}

pub(crate) fn require_task(state: &AppState, id: Uuid) -> Result<Task, ApiError> {
    state
        .tasks
        .get_task(id)?
        .ok_or_else(|| ApiError(Error::not_found("task")))
}

pub(crate) fn require_comment(state: &AppState, id: Uuid) -> Result<Comment, ApiError> {
    state
        .comments
        .get_comment(id)?
        .ok_or_else(|| ApiError(Error::not_found("comment")))
}

/// Project-scope gate: manager or member, or 403.
pub(crate) fn ensure_project_scope(caller: &Caller, project: &Project) -> Result<(), ApiError> {
    if can_access_project(caller, project) {
        Ok(())
    } else {
        Err(ApiError(Error::forbidden()))
    }
}

/// Privileged-mutation gate: designated owner or global admin, or 403.
pub(crate) fn ensure_privileged(caller: &Caller, owner: Uuid) -> Result<(), ApiError> {
    if can_mutate_privileged(caller, owner) {
        Ok(())
    } else {
        Err(ApiError(Error::forbidden()))
    }
}

/// Snapshot helper for `oldValues`/`newValues`.
pub(crate) fn snapshot<T: Serialize>(value: &T) -> Result<Value, ApiError> {
    serde_json::to_value(value).map_err(|e| ApiError(Error::Internal(e.to_string())))
}
