//! Projects: the authorization root for everything else.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ProjectId, UserId};

/// Lifecycle status of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProjectStatus {
    Active,
    Completed,
    OnHold,
    Cancelled,
}

impl Default for ProjectStatus {
    fn default() -> Self {
        Self::Active
    }
}

impl std::fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::OnHold => "on-hold",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// A stored project document.
///
/// The manager is the owning authority: implicitly a member for access
/// checks, and the owner for the privileged-mutation check. Tasks and
/// comments under this project have no ACL of their own; they inherit the
/// manager/member scope from here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub manager: UserId,
    pub members: Vec<UserId>,
    pub status: ProjectStatus,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub color: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for creating a project; the caller becomes manager and sole
/// member, and the store assigns id and timestamps.
#[derive(Debug, Clone)]
pub struct NewProject {
    pub name: String,
    pub description: String,
    pub manager: UserId,
    pub status: ProjectStatus,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub color: Option<String>,
}

/// Partial update: only supplied fields change.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProjectPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<ProjectStatus>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub color: Option<String>,
}

impl ProjectPatch {
    /// Merges the supplied fields into `project`. The store is responsible
    /// for bumping `updated_at`.
    pub fn apply(&self, project: &mut Project) {
        if let Some(name) = &self.name {
            project.name = name.clone();
        }
        if let Some(description) = &self.description {
            project.description = description.clone();
        }
        if let Some(status) = self.status {
            project.status = status;
        }
        if let Some(start_date) = self.start_date {
            project.start_date = Some(start_date);
        }
        if let Some(end_date) = self.end_date {
            project.end_date = Some(end_date);
        }
        if let Some(color) = &self.color {
            project.color = Some(color.clone());
        }
    }

    /// True when no field is supplied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.start_date.is_none()
            && self.end_date.is_none()
            && self.color.is_none()
    }
}
