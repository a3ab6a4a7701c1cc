//! Activity feed handlers. Read-only; records are appended by the other
//! handlers through the recorder.

use axum::extract::State;
use axum::response::Response;
use cairn_core::model::ActivityFilter;
use serde::Deserialize;
use uuid::Uuid;

use super::{ensure_project_scope, page_params, require_project, sort_from};
use crate::error::ApiError;
use crate::extract::{Auth, Id, Params};
use crate::response::paged;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub project_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub sort: Option<String>,
}

/// GET /activity - optionally narrowed by project or actor. A `projectId`
/// filter is scope-checked against the caller.
pub async fn list(
    State(state): State<AppState>,
    Auth(caller): Auth,
    Params(query): Params<ListQuery>,
) -> Result<Response, ApiError> {
    if let Some(project_id) = query.project_id {
        let project = require_project(&state, project_id)?;
        ensure_project_scope(&caller, &project)?;
    }

    let filter = ActivityFilter {
        project: query.project_id,
        user: query.user_id,
    };
    let params = page_params(&state, query.page, query.limit);
    let sort = sort_from(query.sort.as_deref());
    let page = state.activity.list_activity(&filter, &params, &sort)?;
    Ok(paged(page))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub sort: Option<String>,
}

/// GET /activity/project/{project_id} - the feed for one project.
pub async fn list_for_project(
    State(state): State<AppState>,
    Auth(caller): Auth,
    Id(project_id): Id,
    Params(query): Params<ProjectQuery>,
) -> Result<Response, ApiError> {
    let project = require_project(&state, project_id)?;
    ensure_project_scope(&caller, &project)?;

    let filter = ActivityFilter {
        project: Some(project.id),
        user: None,
    };
    let params = page_params(&state, query.page, query.limit);
    let sort = sort_from(query.sort.as_deref());
    let page = state.activity.list_activity(&filter, &params, &sort)?;
    Ok(paged(page))
}
