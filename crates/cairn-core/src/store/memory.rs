//! In-memory store, used by tests and by the server's `--in-memory` mode.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use uuid::Uuid;

use super::{
    ActivityStore, CommentStore, ProjectStore, StoreError, TaskStore, UserStore, sort_activity,
    sort_projects, sort_tasks,
};
use crate::model::{
    ActivityFilter, ActivityLog, Comment, CommentId, CommentPatch, NewActivity, NewComment,
    NewProject, NewTask, NewUser, Project, ProjectId, ProjectPatch, ProjectStatus, Task,
    TaskFilter, TaskId, TaskPatch, TaskStatus, User, UserId,
};
use crate::page::{Page, PageParams, Sort};

#[derive(Default)]
struct Inner {
    users: HashMap<UserId, User>,
    projects: HashMap<ProjectId, Project>,
    tasks: HashMap<TaskId, Task>,
    comments: HashMap<CommentId, Comment>,
    activity: Vec<ActivityLog>,
}

/// Hash-map backed implementation of every store trait.
#[derive(Default)]
pub struct InMemoryStore {
    inner: RwLock<Inner>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>, StoreError> {
        self.inner
            .read()
            .map_err(|_| StoreError::Storage("store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>, StoreError> {
        self.inner
            .write()
            .map_err(|_| StoreError::Storage("store lock poisoned".into()))
    }
}

impl UserStore for InMemoryStore {
    fn insert_user(&self, new: NewUser) -> Result<User, StoreError> {
        let mut inner = self.write()?;
        if inner
            .users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(&new.email))
        {
            return Err(StoreError::Conflict(format!(
                "email {} is already registered",
                new.email
            )));
        }
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: new.email,
            name: new.name,
            password_hash: new.password_hash,
            role: new.role,
            created_at: now,
            updated_at: now,
        };
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    fn get_user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .read()?
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }
}

impl ProjectStore for InMemoryStore {
    fn insert_project(&self, new: NewProject) -> Result<Project, StoreError> {
        let now = Utc::now();
        let project = Project {
            id: Uuid::new_v4(),
            name: new.name,
            description: new.description,
            manager: new.manager,
            members: vec![new.manager],
            status: new.status,
            start_date: new.start_date,
            end_date: new.end_date,
            color: new.color,
            created_at: now,
            updated_at: now,
        };
        self.write()?.projects.insert(project.id, project.clone());
        Ok(project)
    }

    fn get_project(&self, id: ProjectId) -> Result<Option<Project>, StoreError> {
        Ok(self.read()?.projects.get(&id).cloned())
    }

    fn list_projects_for_user(
        &self,
        user: UserId,
        status: Option<ProjectStatus>,
        params: &PageParams,
        sort: &Sort,
    ) -> Result<Page<Project>, StoreError> {
        let inner = self.read()?;
        let mut items: Vec<Project> = inner
            .projects
            .values()
            .filter(|p| p.manager == user || p.members.contains(&user))
            .filter(|p| status.is_none_or(|s| p.status == s))
            .cloned()
            .collect();
        drop(inner);
        sort_projects(&mut items, sort);
        Ok(Page::slice(items, params))
    }

    fn update_project(
        &self,
        id: ProjectId,
        patch: &ProjectPatch,
    ) -> Result<Option<Project>, StoreError> {
        let mut inner = self.write()?;
        let Some(project) = inner.projects.get_mut(&id) else {
            return Ok(None);
        };
        patch.apply(project);
        project.updated_at = Utc::now();
        Ok(Some(project.clone()))
    }

    fn delete_project(&self, id: ProjectId) -> Result<bool, StoreError> {
        Ok(self.write()?.projects.remove(&id).is_some())
    }

    fn add_member(&self, id: ProjectId, user: UserId) -> Result<Option<Project>, StoreError> {
        let mut inner = self.write()?;
        let Some(project) = inner.projects.get_mut(&id) else {
            return Ok(None);
        };
        if !project.members.contains(&user) {
            project.members.push(user);
            project.updated_at = Utc::now();
        }
        Ok(Some(project.clone()))
    }

    fn remove_member(&self, id: ProjectId, user: UserId) -> Result<Option<Project>, StoreError> {
        let mut inner = self.write()?;
        let Some(project) = inner.projects.get_mut(&id) else {
            return Ok(None);
        };
        let before = project.members.len();
        project.members.retain(|m| *m != user);
        if project.members.len() != before {
            project.updated_at = Utc::now();
        }
        Ok(Some(project.clone()))
    }
}

impl TaskStore for InMemoryStore {
    fn insert_task(&self, new: NewTask) -> Result<Task, StoreError> {
        let now = Utc::now();
        let task = Task {
            id: Uuid::new_v4(),
            title: new.title,
            description: new.description,
            project: new.project,
            assigned_to: new.assigned_to,
            created_by: new.created_by,
            status: new.status,
            priority: new.priority,
            due_date: new.due_date,
            tags: new.tags,
            estimated_hours: new.estimated_hours,
            actual_hours: new.actual_hours,
            created_at: now,
            updated_at: now,
        };
        self.write()?.tasks.insert(task.id, task.clone());
        Ok(task)
    }

    fn get_task(&self, id: TaskId) -> Result<Option<Task>, StoreError> {
        Ok(self.read()?.tasks.get(&id).cloned())
    }

    fn list_tasks(
        &self,
        filter: &TaskFilter,
        params: &PageParams,
        sort: &Sort,
    ) -> Result<Page<Task>, StoreError> {
        let inner = self.read()?;
        let mut items: Vec<Task> = inner
            .tasks
            .values()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect();
        drop(inner);
        sort_tasks(&mut items, sort);
        Ok(Page::slice(items, params))
    }

    fn update_task(&self, id: TaskId, patch: &TaskPatch) -> Result<Option<Task>, StoreError> {
        let mut inner = self.write()?;
        let Some(task) = inner.tasks.get_mut(&id) else {
            return Ok(None);
        };
        patch.apply(task);
        task.updated_at = Utc::now();
        Ok(Some(task.clone()))
    }

    fn delete_task(&self, id: TaskId) -> Result<bool, StoreError> {
        Ok(self.write()?.tasks.remove(&id).is_some())
    }

    fn delete_tasks_in_project(&self, project: ProjectId) -> Result<u64, StoreError> {
        let mut inner = self.write()?;
        let before = inner.tasks.len();
        inner.tasks.retain(|_, t| t.project != project);
        Ok((before - inner.tasks.len()) as u64)
    }

    fn task_status_counts(
        &self,
        project: ProjectId,
    ) -> Result<Vec<(TaskStatus, u64)>, StoreError> {
        let inner = self.read()?;
        let mut counts: HashMap<TaskStatus, u64> = HashMap::new();
        for task in inner.tasks.values().filter(|t| t.project == project) {
            *counts.entry(task.status).or_default() += 1;
        }
        let mut counts: Vec<_> = counts.into_iter().collect();
        counts.sort_by_key(|(status, _)| format!("{status}"));
        Ok(counts)
    }
}

impl CommentStore for InMemoryStore {
    fn insert_comment(&self, new: NewComment) -> Result<Comment, StoreError> {
        let now = Utc::now();
        let comment = Comment {
            id: Uuid::new_v4(),
            content: new.content,
            task: new.task,
            user: new.user,
            attachments: new.attachments,
            created_at: now,
            updated_at: now,
        };
        self.write()?.comments.insert(comment.id, comment.clone());
        Ok(comment)
    }

    fn get_comment(&self, id: CommentId) -> Result<Option<Comment>, StoreError> {
        Ok(self.read()?.comments.get(&id).cloned())
    }

    fn list_comments_for_task(
        &self,
        task: TaskId,
        params: &PageParams,
    ) -> Result<Page<Comment>, StoreError> {
        let inner = self.read()?;
        let mut items: Vec<Comment> = inner
            .comments
            .values()
            .filter(|c| c.task == task)
            .cloned()
            .collect();
        drop(inner);
        // Newest first, ids as tiebreaker.
        items.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(Page::slice(items, params))
    }

    fn update_comment(
        &self,
        id: CommentId,
        patch: &CommentPatch,
    ) -> Result<Option<Comment>, StoreError> {
        let mut inner = self.write()?;
        let Some(comment) = inner.comments.get_mut(&id) else {
            return Ok(None);
        };
        patch.apply(comment);
        comment.updated_at = Utc::now();
        Ok(Some(comment.clone()))
    }

    fn delete_comment(&self, id: CommentId) -> Result<bool, StoreError> {
        Ok(self.write()?.comments.remove(&id).is_some())
    }
}

impl ActivityStore for InMemoryStore {
    fn append_activity(&self, entry: NewActivity) -> Result<ActivityLog, StoreError> {
        let record = ActivityLog {
            id: Uuid::new_v4(),
            action: entry.action,
            entity_type: entry.entity_type,
            entity_id: entry.entity_id,
            description: entry.description,
            old_values: entry.old_values,
            new_values: entry.new_values,
            user: entry.user,
            project: entry.project,
            created_at: Utc::now(),
        };
        self.write()?.activity.push(record.clone());
        Ok(record)
    }

    fn list_activity(
        &self,
        filter: &ActivityFilter,
        params: &PageParams,
        sort: &Sort,
    ) -> Result<Page<ActivityLog>, StoreError> {
        let inner = self.read()?;
        let mut items: Vec<ActivityLog> = inner
            .activity
            .iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        drop(inner);
        sort_activity(&mut items, sort);
        Ok(Page::slice(items, params))
    }
}
