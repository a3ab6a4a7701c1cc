//! Comment handlers.
//!
//! Reading and creating follow the parent project's scope. Editing and
//! deleting follow authorship: only the comment's author or a global admin
//! may touch it, no matter who manages the project.

use axum::extract::State;
use axum::response::Response;
use cairn_core::Error;
use cairn_core::model::{
    ActivityAction, Attachment, CommentPatch, EntityType, NewActivity, NewComment,
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use super::{
    ensure_privileged, ensure_project_scope, page_params, require_comment, require_project,
    require_task, snapshot,
};
use crate::error::ApiError;
use crate::extract::{Auth, Body, Id, Params};
use crate::response::{created, ok, paged};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

/// GET /comments/task/{task_id} - newest first, parent-project scope.
pub async fn list_for_task(
    State(state): State<AppState>,
    Auth(caller): Auth,
    Id(task_id): Id,
    Params(query): Params<ListQuery>,
) -> Result<Response, ApiError> {
    let task = require_task(&state, task_id)?;
    let project = require_project(&state, task.project)?;
    ensure_project_scope(&caller, &project)?;

    let params = page_params(&state, query.page, query.limit);
    let page = state.comments.list_comments_for_task(task.id, &params)?;
    Ok(paged(page))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateBody {
    pub content: String,
    pub task: uuid::Uuid,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

/// POST /comments - anyone in the parent project's scope.
pub async fn create(
    State(state): State<AppState>,
    Auth(caller): Auth,
    Body(body): Body<CreateBody>,
) -> Result<Response, ApiError> {
    if body.content.trim().is_empty() {
        return Err(ApiError(Error::validation(
            "comment content must not be empty",
        )));
    }

    let task = require_task(&state, body.task)?;
    let project = require_project(&state, task.project)?;
    ensure_project_scope(&caller, &project)?;

    let comment = state.comments.insert_comment(NewComment {
        content: body.content,
        task: task.id,
        user: caller.id,
        attachments: body.attachments,
    })?;

    state.recorder.record(
        NewActivity::new(
            ActivityAction::Comment,
            EntityType::Comment,
            comment.id,
            caller.id,
            format!("commented on task \"{}\"", task.title),
        )
        .in_project(task.project),
    );

    info!(comment = %comment.id, task = %task.id, "created comment");
    Ok(created(comment))
}

/// PUT /comments/{id} - author or admin only. Authorship is the whole
/// gate; project membership is neither required nor sufficient.
pub async fn update(
    State(state): State<AppState>,
    Auth(caller): Auth,
    Id(id): Id,
    Body(patch): Body<CommentPatch>,
) -> Result<Response, ApiError> {
    if patch.is_empty() {
        return Err(ApiError(Error::validation("no fields to update")));
    }

    let comment = require_comment(&state, id)?;
    ensure_privileged(&caller, comment.user)?;

    let old_values = snapshot(&comment)?;
    let updated = state
        .comments
        .update_comment(id, &patch)?
        .ok_or_else(|| ApiError(Error::not_found("comment")))?;

    let mut entry = NewActivity::new(
        ActivityAction::Update,
        EntityType::Comment,
        updated.id,
        caller.id,
        "updated a comment".to_string(),
    )
    .with_snapshots(old_values, snapshot(&updated)?);
    if let Some(task) = state.tasks.get_task(updated.task)? {
        entry = entry.in_project(task.project);
    }
    state.recorder.record(entry);

    Ok(ok(updated))
}

/// DELETE /comments/{id} - author or admin only.
pub async fn remove(
    State(state): State<AppState>,
    Auth(caller): Auth,
    Id(id): Id,
) -> Result<Response, ApiError> {
    let comment = require_comment(&state, id)?;
    ensure_privileged(&caller, comment.user)?;

    state.comments.delete_comment(comment.id)?;

    let mut entry = NewActivity::new(
        ActivityAction::Delete,
        EntityType::Comment,
        comment.id,
        caller.id,
        "deleted a comment".to_string(),
    );
    if let Some(task) = state.tasks.get_task(comment.task)? {
        entry = entry.in_project(task.project);
    }
    state.recorder.record(entry);

    info!(comment = %comment.id, "deleted comment");
    Ok(ok(json!({})))
}
