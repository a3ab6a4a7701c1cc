//! Append-only activity records.
//!
//! Every mutation on a project, task, or comment produces exactly one
//! record. Records are never updated or deleted; the store only appends
//! and queries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::{ActivityId, ProjectId, UserId};

/// What kind of mutation a record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActivityAction {
    Create,
    Update,
    Delete,
    Comment,
    Assign,
    StatusChange,
}

impl std::fmt::Display for ActivityAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Comment => "comment",
            Self::Assign => "assign",
            Self::StatusChange => "status-change",
        };
        f.write_str(s)
    }
}

/// Which entity type a record refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Project,
    Task,
    Comment,
    User,
}

/// A stored activity record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLog {
    pub id: ActivityId,
    pub action: ActivityAction,
    pub entity_type: EntityType,
    pub entity_id: Uuid,
    pub description: String,
    /// Snapshot of the entity before an update; update actions only.
    #[serde(default)]
    pub old_values: Option<Value>,
    /// Snapshot of the entity after an update; update actions only.
    #[serde(default)]
    pub new_values: Option<Value>,
    /// The actor who performed the mutation.
    pub user: UserId,
    /// Project scope, when the entity ladders up to one.
    #[serde(default)]
    pub project: Option<ProjectId>,
    pub created_at: DateTime<Utc>,
}

/// An activity record before the store assigns id and timestamp.
#[derive(Debug, Clone)]
pub struct NewActivity {
    pub action: ActivityAction,
    pub entity_type: EntityType,
    pub entity_id: Uuid,
    pub description: String,
    pub old_values: Option<Value>,
    pub new_values: Option<Value>,
    pub user: UserId,
    pub project: Option<ProjectId>,
}

impl NewActivity {
    /// Starts a record with the required fields; snapshots and project
    /// scope are attached with the builder methods.
    #[must_use]
    pub fn new(
        action: ActivityAction,
        entity_type: EntityType,
        entity_id: Uuid,
        user: UserId,
        description: impl Into<String>,
    ) -> Self {
        Self {
            action,
            entity_type,
            entity_id,
            description: description.into(),
            old_values: None,
            new_values: None,
            user,
            project: None,
        }
    }

    #[must_use]
    pub fn in_project(mut self, project: ProjectId) -> Self {
        self.project = Some(project);
        self
    }

    #[must_use]
    pub fn with_snapshots(mut self, old_values: Value, new_values: Value) -> Self {
        self.old_values = Some(old_values);
        self.new_values = Some(new_values);
        self
    }
}

/// Filters for listing activity.
#[derive(Debug, Clone, Default)]
pub struct ActivityFilter {
    pub project: Option<ProjectId>,
    pub user: Option<UserId>,
}

impl ActivityFilter {
    /// True iff `entry` matches every supplied filter field.
    #[must_use]
    pub fn matches(&self, entry: &ActivityLog) -> bool {
        self.project.is_none_or(|p| entry.project == Some(p))
            && self.user.is_none_or(|u| entry.user == u)
    }
}
