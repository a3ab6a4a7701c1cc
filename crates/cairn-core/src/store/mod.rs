//! Store traits.
//!
//! The persistence layer is a thin collaborator: each trait does lookups,
//! whole-document replaces, and filtered list queries, nothing else. The
//! in-memory implementations here back the unit and integration tests; the
//! server crate provides the durable SQLite implementations.
//!
//! Update methods re-read the latest stored document, apply the partial
//! merge, and replace the document in place (last-write-wins, no version
//! tokens). `Ok(None)` from an update or get means the id did not resolve.

mod memory;

use std::cmp::Ordering;

use thiserror::Error;

use crate::model::{
    ActivityFilter, ActivityLog, Comment, CommentId, CommentPatch, NewActivity, NewComment,
    NewProject, NewTask, NewUser, Project, ProjectId, ProjectPatch, ProjectStatus, Task,
    TaskFilter, TaskId, TaskPatch, TaskStatus, User, UserId,
};
use crate::page::{Page, PageParams, Sort};

pub use memory::InMemoryStore;

/// Errors surfaced by a store implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The referenced entity does not exist. Carries the entity kind for
    /// the 404 message.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// A uniqueness constraint was violated (duplicate user email).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The underlying storage failed.
    #[error("storage error: {0}")]
    Storage(String),
}

/// User accounts. Consumed by the auth edge; the policy layer only ever
/// sees ids and roles.
pub trait UserStore: Send + Sync {
    /// Inserts a user, assigning id and timestamps.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] if the email is already registered.
    fn insert_user(&self, new: NewUser) -> Result<User, StoreError>;

    fn get_user(&self, id: UserId) -> Result<Option<User>, StoreError>;

    fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
}

/// Projects.
pub trait ProjectStore: Send + Sync {
    /// Inserts a project, assigning id and timestamps. The store records
    /// `new.manager` as manager and sole initial member.
    fn insert_project(&self, new: NewProject) -> Result<Project, StoreError>;

    fn get_project(&self, id: ProjectId) -> Result<Option<Project>, StoreError>;

    /// Projects where `user` is manager or member, optionally narrowed by
    /// status.
    fn list_projects_for_user(
        &self,
        user: UserId,
        status: Option<ProjectStatus>,
        params: &PageParams,
        sort: &Sort,
    ) -> Result<Page<Project>, StoreError>;

    /// Partial-merge update against the latest stored document.
    fn update_project(
        &self,
        id: ProjectId,
        patch: &ProjectPatch,
    ) -> Result<Option<Project>, StoreError>;

    /// Returns `true` if the project existed and was removed.
    fn delete_project(&self, id: ProjectId) -> Result<bool, StoreError>;

    /// Appends a member if absent (idempotent at this layer; the duplicate
    /// domain error is the handler's job).
    fn add_member(&self, id: ProjectId, user: UserId) -> Result<Option<Project>, StoreError>;

    /// Removes a member if present; removing a non-member is a no-op.
    fn remove_member(&self, id: ProjectId, user: UserId) -> Result<Option<Project>, StoreError>;
}

/// Tasks.
pub trait TaskStore: Send + Sync {
    fn insert_task(&self, new: NewTask) -> Result<Task, StoreError>;

    fn get_task(&self, id: TaskId) -> Result<Option<Task>, StoreError>;

    fn list_tasks(
        &self,
        filter: &TaskFilter,
        params: &PageParams,
        sort: &Sort,
    ) -> Result<Page<Task>, StoreError>;

    /// Partial-merge update against the latest stored document.
    fn update_task(&self, id: TaskId, patch: &TaskPatch) -> Result<Option<Task>, StoreError>;

    /// Returns `true` if the task existed and was removed.
    fn delete_task(&self, id: TaskId) -> Result<bool, StoreError>;

    /// Cascade helper: removes every task under `project`, returning how
    /// many were deleted.
    fn delete_tasks_in_project(&self, project: ProjectId) -> Result<u64, StoreError>;

    /// Grouped count of task statuses within a project, for the project
    /// detail view.
    fn task_status_counts(
        &self,
        project: ProjectId,
    ) -> Result<Vec<(TaskStatus, u64)>, StoreError>;
}

/// Comments.
pub trait CommentStore: Send + Sync {
    fn insert_comment(&self, new: NewComment) -> Result<Comment, StoreError>;

    fn get_comment(&self, id: CommentId) -> Result<Option<Comment>, StoreError>;

    /// Comments on a task, newest first.
    fn list_comments_for_task(
        &self,
        task: TaskId,
        params: &PageParams,
    ) -> Result<Page<Comment>, StoreError>;

    fn update_comment(
        &self,
        id: CommentId,
        patch: &CommentPatch,
    ) -> Result<Option<Comment>, StoreError>;

    fn delete_comment(&self, id: CommentId) -> Result<bool, StoreError>;
}

/// Append-only activity records. No update or delete methods exist on
/// purpose.
pub trait ActivityStore: Send + Sync {
    /// Appends a record, assigning id and timestamp.
    fn append_activity(&self, entry: NewActivity) -> Result<ActivityLog, StoreError>;

    fn list_activity(
        &self,
        filter: &ActivityFilter,
        params: &PageParams,
        sort: &Sort,
    ) -> Result<Page<ActivityLog>, StoreError>;
}

fn directed(ord: Ordering, sort: &Sort) -> Ordering {
    if sort.descending { ord.reverse() } else { ord }
}

/// Sorts projects by the requested field; unknown fields fall back to
/// creation time. Ids break ties so ordering is total.
pub fn sort_projects(items: &mut [Project], sort: &Sort) {
    items.sort_by(|a, b| {
        let ord = match sort.field.as_str() {
            "name" => a.name.cmp(&b.name),
            "updatedAt" => a.updated_at.cmp(&b.updated_at),
            _ => a.created_at.cmp(&b.created_at),
        };
        directed(ord.then_with(|| a.id.cmp(&b.id)), sort)
    });
}

/// Sorts tasks by the requested field; unknown fields fall back to
/// creation time.
pub fn sort_tasks(items: &mut [Task], sort: &Sort) {
    items.sort_by(|a, b| {
        let ord = match sort.field.as_str() {
            "title" => a.title.cmp(&b.title),
            "dueDate" => a.due_date.cmp(&b.due_date),
            "priority" => a.priority.rank().cmp(&b.priority.rank()),
            "updatedAt" => a.updated_at.cmp(&b.updated_at),
            _ => a.created_at.cmp(&b.created_at),
        };
        directed(ord.then_with(|| a.id.cmp(&b.id)), sort)
    });
}

/// Sorts activity records; only creation time is meaningful here.
pub fn sort_activity(items: &mut [ActivityLog], sort: &Sort) {
    items.sort_by(|a, b| {
        let ord = a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id));
        directed(ord, sort)
    });
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    use super::*;
    use crate::model::TaskPriority;

    fn task_at(title: &str, priority: TaskPriority, offset_secs: i64) -> Task {
        let at = Utc::now() + Duration::seconds(offset_secs);
        Task {
            id: Uuid::new_v4(),
            title: title.into(),
            description: String::new(),
            project: Uuid::new_v4(),
            assigned_to: None,
            created_by: Uuid::new_v4(),
            status: TaskStatus::Todo,
            priority,
            due_date: None,
            tags: vec![],
            estimated_hours: None,
            actual_hours: None,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn test_default_sort_is_newest_first() {
        let mut tasks = vec![
            task_at("old", TaskPriority::Low, -60),
            task_at("new", TaskPriority::Low, 0),
        ];
        sort_tasks(&mut tasks, &Sort::default());
        assert_eq!(tasks[0].title, "new");
    }

    #[test]
    fn test_priority_sort_uses_rank_not_name() {
        // Alphabetically "critical" < "low"; by rank it is the highest.
        let mut tasks = vec![
            task_at("a", TaskPriority::Low, 0),
            task_at("b", TaskPriority::Critical, 0),
        ];
        sort_tasks(&mut tasks, &Sort::parse("-priority"));
        assert_eq!(tasks[0].priority, TaskPriority::Critical);
    }

    #[test]
    fn test_unknown_sort_field_falls_back_to_created_at() {
        let mut tasks = vec![
            task_at("old", TaskPriority::Low, -60),
            task_at("new", TaskPriority::Low, 0),
        ];
        sort_tasks(&mut tasks, &Sort::parse("bogus"));
        assert_eq!(tasks[0].title, "old");
    }
}
