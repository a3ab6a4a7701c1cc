//! Task handlers.
//!
//! Updates are open to anyone in the parent project's scope; deletion is
//! privileged (project manager or admin). The asymmetry is deliberate -
//! members coordinate work by editing tasks, only the manager retires them.

use axum::extract::State;
use axum::response::Response;
use cairn_core::Error;
use cairn_core::model::{
    ActivityAction, EntityType, NewActivity, NewTask, TaskFilter, TaskPatch, TaskPriority,
    TaskStatus,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    ensure_privileged, ensure_project_scope, page_params, require_project, require_task, snapshot,
    sort_from,
};
use crate::error::ApiError;
use crate::extract::{Auth, Body, Id, Params};
use crate::response::{created, ok, paged};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub project: Option<Uuid>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assigned_to: Option<Uuid>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub sort: Option<String>,
}

/// GET /tasks - optionally narrowed by project, status, priority, or
/// assignee. A `project` filter is scope-checked; without one the listing
/// spans every project (the historical behavior, kept and logged).
pub async fn list(
    State(state): State<AppState>,
    Auth(caller): Auth,
    Params(query): Params<ListQuery>,
) -> Result<Response, ApiError> {
    if let Some(project_id) = query.project {
        let project = require_project(&state, project_id)?;
        ensure_project_scope(&caller, &project)?;
    } else {
        warn!(caller = %caller.id, "unscoped task listing");
    }

    let filter = TaskFilter {
        project: query.project,
        status: query.status,
        priority: query.priority,
        assigned_to: query.assigned_to,
    };
    let params = page_params(&state, query.page, query.limit);
    let sort = sort_from(query.sort.as_deref());
    let page = state.tasks.list_tasks(&filter, &params, &sort)?;
    Ok(paged(page))
}

/// GET /tasks/{id} - requires parent-project scope.
pub async fn detail(
    State(state): State<AppState>,
    Auth(caller): Auth,
    Id(id): Id,
) -> Result<Response, ApiError> {
    let task = require_task(&state, id)?;
    let project = require_project(&state, task.project)?;
    ensure_project_scope(&caller, &project)?;
    Ok(ok(task))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateBody {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub project: Uuid,
    pub assigned_to: Option<Uuid>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub estimated_hours: Option<f64>,
    pub actual_hours: Option<f64>,
}

/// POST /tasks - anyone in the parent project's scope.
pub async fn create(
    State(state): State<AppState>,
    Auth(caller): Auth,
    Body(body): Body<CreateBody>,
) -> Result<Response, ApiError> {
    if body.title.trim().is_empty() {
        return Err(ApiError(Error::validation("task title must not be empty")));
    }

    let project = require_project(&state, body.project)?;
    ensure_project_scope(&caller, &project)?;

    let task = state.tasks.insert_task(NewTask {
        title: body.title.trim().to_string(),
        description: body.description,
        project: project.id,
        assigned_to: body.assigned_to,
        created_by: caller.id,
        status: body.status.unwrap_or_default(),
        priority: body.priority.unwrap_or_default(),
        due_date: body.due_date,
        tags: body.tags,
        estimated_hours: body.estimated_hours,
        actual_hours: body.actual_hours,
    })?;

    state.recorder.record(
        NewActivity::new(
            ActivityAction::Create,
            EntityType::Task,
            task.id,
            caller.id,
            format!("created task \"{}\"", task.title),
        )
        .in_project(task.project),
    );

    info!(task = %task.id, project = %task.project, "created task");
    Ok(created(task))
}

/// PUT /tasks/{id} - anyone in the parent project's scope; partial merge.
/// A status change logs as `status-change`, an assignee change as `assign`,
/// anything else as a plain `update`. One record per request, status wins
/// when both change.
pub async fn update(
    State(state): State<AppState>,
    Auth(caller): Auth,
    Id(id): Id,
    Body(patch): Body<TaskPatch>,
) -> Result<Response, ApiError> {
    if patch.is_empty() {
        return Err(ApiError(Error::validation("no fields to update")));
    }

    let task = require_task(&state, id)?;
    let project = require_project(&state, task.project)?;
    ensure_project_scope(&caller, &project)?;

    let action = if patch.changes_status(&task) {
        ActivityAction::StatusChange
    } else if patch.changes_assignee(&task) {
        ActivityAction::Assign
    } else {
        ActivityAction::Update
    };

    let old_values = snapshot(&task)?;
    let updated = state
        .tasks
        .update_task(id, &patch)?
        .ok_or_else(|| ApiError(Error::not_found("task")))?;

    let description = match action {
        ActivityAction::StatusChange => format!(
            "moved task \"{}\" from {} to {}",
            updated.title, task.status, updated.status
        ),
        ActivityAction::Assign => match updated.assigned_to {
            Some(assignee) => format!("assigned task \"{}\" to {assignee}", updated.title),
            None => format!("unassigned task \"{}\"", updated.title),
        },
        _ => format!("updated task \"{}\"", updated.title),
    };

    state.recorder.record(
        NewActivity::new(action, EntityType::Task, updated.id, caller.id, description)
            .in_project(updated.project)
            .with_snapshots(old_values, snapshot(&updated)?),
    );

    Ok(ok(updated))
}

/// DELETE /tasks/{id} - privileged against the parent project's manager.
pub async fn remove(
    State(state): State<AppState>,
    Auth(caller): Auth,
    Id(id): Id,
) -> Result<Response, ApiError> {
    let task = require_task(&state, id)?;
    let project = require_project(&state, task.project)?;
    ensure_privileged(&caller, project.manager)?;

    state.tasks.delete_task(task.id)?;

    state.recorder.record(
        NewActivity::new(
            ActivityAction::Delete,
            EntityType::Task,
            task.id,
            caller.id,
            format!("deleted task \"{}\"", task.title),
        )
        .in_project(task.project),
    );

    info!(task = %task.id, project = %task.project, "deleted task");
    Ok(ok(json!({})))
}
