//! Project handlers.

use axum::extract::State;
use axum::response::Response;
use cairn_core::Error;
use cairn_core::model::{
    ActivityAction, EntityType, NewActivity, NewProject, ProjectPatch, ProjectStatus,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, json};
use tracing::info;
use uuid::Uuid;

use super::{
    ensure_privileged, ensure_project_scope, page_params, require_project, snapshot, sort_from,
};
use crate::error::ApiError;
use crate::extract::{Auth, Body, Id, Params};
use crate::response::{created, ok, paged};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub status: Option<ProjectStatus>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub sort: Option<String>,
}

/// GET /projects - projects where the caller is manager or member.
pub async fn list(
    State(state): State<AppState>,
    Auth(caller): Auth,
    Params(query): Params<ListQuery>,
) -> Result<Response, ApiError> {
    let params = page_params(&state, query.page, query.limit);
    let sort = sort_from(query.sort.as_deref());
    let page = state
        .projects
        .list_projects_for_user(caller.id, query.status, &params, &sort)?;
    Ok(paged(page))
}

/// GET /projects/{id} - project plus a task-status histogram.
pub async fn detail(
    State(state): State<AppState>,
    Auth(caller): Auth,
    Id(id): Id,
) -> Result<Response, ApiError> {
    let project = require_project(&state, id)?;
    ensure_project_scope(&caller, &project)?;

    let counts = state.tasks.task_status_counts(project.id)?;
    let mut stats = Map::new();
    for (status, count) in counts {
        stats.insert(status.to_string(), count.into());
    }

    Ok(ok(json!({ "project": project, "taskStats": stats })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateBody {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub status: Option<ProjectStatus>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub color: Option<String>,
}

/// POST /projects - any authenticated caller; they become manager and
/// sole initial member.
pub async fn create(
    State(state): State<AppState>,
    Auth(caller): Auth,
    Body(body): Body<CreateBody>,
) -> Result<Response, ApiError> {
    if body.name.trim().is_empty() {
        return Err(ApiError(Error::validation("project name must not be empty")));
    }

    let project = state.projects.insert_project(NewProject {
        name: body.name.trim().to_string(),
        description: body.description,
        manager: caller.id,
        status: body.status.unwrap_or_default(),
        start_date: body.start_date,
        end_date: body.end_date,
        color: body.color,
    })?;

    state.recorder.record(
        NewActivity::new(
            ActivityAction::Create,
            EntityType::Project,
            project.id,
            caller.id,
            format!("created project \"{}\"", project.name),
        )
        .in_project(project.id),
    );

    info!(project = %project.id, manager = %caller.id, "created project");
    Ok(created(project))
}

/// PUT /projects/{id} - privileged (manager or admin); partial merge.
pub async fn update(
    State(state): State<AppState>,
    Auth(caller): Auth,
    Id(id): Id,
    Body(patch): Body<ProjectPatch>,
) -> Result<Response, ApiError> {
    if patch.is_empty() {
        return Err(ApiError(Error::validation("no fields to update")));
    }

    let project = require_project(&state, id)?;
    ensure_privileged(&caller, project.manager)?;

    let old_values = snapshot(&project)?;
    let updated = state
        .projects
        .update_project(id, &patch)?
        .ok_or_else(|| ApiError(Error::not_found("project")))?;

    state.recorder.record(
        NewActivity::new(
            ActivityAction::Update,
            EntityType::Project,
            updated.id,
            caller.id,
            format!("updated project \"{}\"", updated.name),
        )
        .in_project(updated.id)
        .with_snapshots(old_values, snapshot(&updated)?),
    );

    Ok(ok(updated))
}

/// DELETE /projects/{id} - privileged; cascades to the project's tasks.
/// Comments under those tasks are retained (the historical gap), which the
/// activity description states outright.
pub async fn remove(
    State(state): State<AppState>,
    Auth(caller): Auth,
    Id(id): Id,
) -> Result<Response, ApiError> {
    let project = require_project(&state, id)?;
    ensure_privileged(&caller, project.manager)?;

    let tasks_removed = state.tasks.delete_tasks_in_project(project.id)?;
    state.projects.delete_project(project.id)?;

    state.recorder.record(
        NewActivity::new(
            ActivityAction::Delete,
            EntityType::Project,
            project.id,
            caller.id,
            format!(
                "deleted project \"{}\" ({tasks_removed} tasks removed; comments retained)",
                project.name
            ),
        )
        .in_project(project.id),
    );

    info!(project = %project.id, tasks_removed, "deleted project");
    Ok(ok(json!({})))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MemberBody {
    pub member_id: Uuid,
}

/// POST /projects/{id}/members - privileged. Adding an existing member is
/// a validation error, not a silent no-op.
pub async fn add_member(
    State(state): State<AppState>,
    Auth(caller): Auth,
    Id(id): Id,
    Body(body): Body<MemberBody>,
) -> Result<Response, ApiError> {
    let project = require_project(&state, id)?;
    ensure_privileged(&caller, project.manager)?;

    if project.members.contains(&body.member_id) {
        return Err(ApiError(Error::validation(
            "user is already a member of this project",
        )));
    }

    let updated = state
        .projects
        .add_member(id, body.member_id)?
        .ok_or_else(|| ApiError(Error::not_found("project")))?;

    state.recorder.record(
        NewActivity::new(
            ActivityAction::Update,
            EntityType::Project,
            updated.id,
            caller.id,
            format!("added member {} to project \"{}\"", body.member_id, updated.name),
        )
        .in_project(updated.id),
    );

    Ok(ok(updated))
}

/// DELETE /projects/{id}/members - privileged. Removing a non-member is
/// an idempotent no-op that still succeeds.
pub async fn remove_member(
    State(state): State<AppState>,
    Auth(caller): Auth,
    Id(id): Id,
    Body(body): Body<MemberBody>,
) -> Result<Response, ApiError> {
    let project = require_project(&state, id)?;
    ensure_privileged(&caller, project.manager)?;

    let updated = state
        .projects
        .remove_member(id, body.member_id)?
        .ok_or_else(|| ApiError(Error::not_found("project")))?;

    state.recorder.record(
        NewActivity::new(
            ActivityAction::Update,
            EntityType::Project,
            updated.id,
            caller.id,
            format!(
                "removed member {} from project \"{}\"",
                body.member_id, updated.name
            ),
        )
        .in_project(updated.id),
    );

    Ok(ok(updated))
}
