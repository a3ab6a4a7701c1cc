//! Tasks: work items owned by a project.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::{ProjectId, TaskId, UserId};

/// Workflow status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Review,
    Completed,
}

impl Default for TaskStatus {
    fn default() -> Self {
        Self::Todo
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Todo => "todo",
            Self::InProgress => "in-progress",
            Self::Review => "review",
            Self::Completed => "completed",
        };
        f.write_str(s)
    }
}

/// Priority of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
    Critical,
}

impl Default for TaskPriority {
    fn default() -> Self {
        Self::Medium
    }
}

impl TaskPriority {
    /// Rank used for priority sorting (critical highest).
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Low => 0,
            Self::Medium => 1,
            Self::High => 2,
            Self::Critical => 3,
        }
    }
}

/// A stored task document.
///
/// `project` and `created_by` are immutable after creation; the patch type
/// below deliberately has no fields for them. A task carries no ACL of its
/// own - its authorization scope is its parent project's manager/members.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub project: ProjectId,
    #[serde(default)]
    pub assigned_to: Option<UserId>,
    pub created_by: UserId,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub estimated_hours: Option<f64>,
    #[serde(default)]
    pub actual_hours: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for creating a task; the store assigns id and timestamps.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub project: ProjectId,
    pub assigned_to: Option<UserId>,
    pub created_by: UserId,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
    pub estimated_hours: Option<f64>,
    pub actual_hours: Option<f64>,
}

/// Distinguishes "field absent" from "field set to null" so that
/// `{"assignedTo": null}` unassigns while an absent field leaves the
/// assignment alone.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: serde::Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Partial update: only supplied fields change.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    #[serde(default, deserialize_with = "double_option")]
    pub assigned_to: Option<Option<UserId>>,
    pub due_date: Option<DateTime<Utc>>,
    pub tags: Option<Vec<String>>,
    pub estimated_hours: Option<f64>,
    pub actual_hours: Option<f64>,
}

impl TaskPatch {
    /// Merges the supplied fields into `task`. The store is responsible
    /// for bumping `updated_at`.
    pub fn apply(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(description) = &self.description {
            task.description = description.clone();
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(assigned_to) = self.assigned_to {
            task.assigned_to = assigned_to;
        }
        if let Some(due_date) = self.due_date {
            task.due_date = Some(due_date);
        }
        if let Some(tags) = &self.tags {
            task.tags = tags.clone();
        }
        if let Some(estimated_hours) = self.estimated_hours {
            task.estimated_hours = Some(estimated_hours);
        }
        if let Some(actual_hours) = self.actual_hours {
            task.actual_hours = Some(actual_hours);
        }
    }

    /// True when no field is supplied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.assigned_to.is_none()
            && self.due_date.is_none()
            && self.tags.is_none()
            && self.estimated_hours.is_none()
            && self.actual_hours.is_none()
    }

    /// True when this patch changes the task's status.
    #[must_use]
    pub fn changes_status(&self, task: &Task) -> bool {
        self.status.is_some_and(|status| status != task.status)
    }

    /// True when this patch changes the task's assignee.
    #[must_use]
    pub fn changes_assignee(&self, task: &Task) -> bool {
        self.assigned_to
            .is_some_and(|assignee| assignee != task.assigned_to)
    }
}

/// Filters for listing tasks.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub project: Option<ProjectId>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assigned_to: Option<UserId>,
}

impl TaskFilter {
    /// True iff `task` matches every supplied filter field.
    #[must_use]
    pub fn matches(&self, task: &Task) -> bool {
        self.project.is_none_or(|p| task.project == p)
            && self.status.is_none_or(|s| task.status == s)
            && self.priority.is_none_or(|p| task.priority == p)
            && self.assigned_to.is_none_or(|u| task.assigned_to == Some(u))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_task() -> Task {
        Task {
            id: uuid::Uuid::new_v4(),
            title: "Wire the API".into(),
            description: String::new(),
            project: uuid::Uuid::new_v4(),
            assigned_to: Some(uuid::Uuid::new_v4()),
            created_by: uuid::Uuid::new_v4(),
            status: TaskStatus::Todo,
            priority: TaskPriority::Medium,
            due_date: None,
            tags: vec!["backend".into()],
            estimated_hours: Some(8.0),
            actual_hours: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_patch_absent_assignee_is_untouched() {
        let mut task = sample_task();
        let before = task.assigned_to;
        let patch: TaskPatch = serde_json::from_str(r#"{"status":"review"}"#).unwrap();
        assert!(!patch.changes_assignee(&task));
        patch.apply(&mut task);
        assert_eq!(task.assigned_to, before);
        assert_eq!(task.status, TaskStatus::Review);
    }

    #[test]
    fn test_patch_null_assignee_unassigns() {
        let mut task = sample_task();
        let patch: TaskPatch = serde_json::from_str(r#"{"assignedTo":null}"#).unwrap();
        assert!(patch.changes_assignee(&task));
        patch.apply(&mut task);
        assert_eq!(task.assigned_to, None);
    }

    #[test]
    fn test_patch_rejects_project_reassignment() {
        // `project` is immutable after creation; the patch type has no such
        // field, so supplying one is a validation failure.
        let id = uuid::Uuid::new_v4();
        let body = format!(r#"{{"project":"{id}"}}"#);
        assert!(serde_json::from_str::<TaskPatch>(&body).is_err());
    }

    #[test]
    fn test_filter_matches_all_supplied_fields() {
        let task = sample_task();
        let filter = TaskFilter {
            project: Some(task.project),
            status: Some(TaskStatus::Todo),
            priority: None,
            assigned_to: task.assigned_to,
        };
        assert!(filter.matches(&task));

        let mismatch = TaskFilter {
            status: Some(TaskStatus::Completed),
            ..filter
        };
        assert!(!mismatch.matches(&task));
    }

    #[test]
    fn test_priority_rank_ordering() {
        assert!(TaskPriority::Critical.rank() > TaskPriority::High.rank());
        assert!(TaskPriority::High.rank() > TaskPriority::Medium.rank());
        assert!(TaskPriority::Medium.rank() > TaskPriority::Low.rank());
    }
}
