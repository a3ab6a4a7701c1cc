//! Durable store backed by SQLite.
//!
//! Entities are persisted as JSON documents in a `doc` column, with a few
//! extracted columns for indexed lookups (parent ids, unique email). An
//! update re-reads the latest document under the connection lock, applies
//! the partial merge, and writes the whole document back - last-write-wins
//! per document, matching the in-memory implementation and the concurrency
//! model the API promises.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use cairn_core::model::{
    ActivityFilter, ActivityLog, Comment, CommentId, CommentPatch, NewActivity, NewComment,
    NewProject, NewTask, NewUser, Project, ProjectId, ProjectPatch, ProjectStatus, Task,
    TaskFilter, TaskId, TaskPatch, TaskStatus, User, UserId,
};
use cairn_core::page::{Page, PageParams, Sort};
use cairn_core::store::{
    ActivityStore, CommentStore, ProjectStore, StoreError, TaskStore, UserStore, sort_activity,
    sort_projects, sort_tasks,
};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

/// SQLite-backed implementation of every store trait.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Opens (or creates) the database file and ensures the schema.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Storage`] if the file cannot be opened or the
    /// schema cannot be created.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(storage)?;
        Self::from_connection(conn)
    }

    /// In-memory database, used by tests.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Storage`] if the schema cannot be created.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(storage)?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA busy_timeout=5000;")
            .map_err(storage)?;
        Self::init_schema(&conn)?;
        Ok(Self { conn: Arc::new(Mutex::new(conn)) })
    }

    fn init_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                email TEXT NOT NULL UNIQUE COLLATE NOCASE,
                doc TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS projects (
                id TEXT PRIMARY KEY,
                doc TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS tasks (
                id TEXT PRIMARY KEY,
                project_id TEXT NOT NULL,
                doc TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_tasks_project ON tasks(project_id);
            CREATE TABLE IF NOT EXISTS comments (
                id TEXT PRIMARY KEY,
                task_id TEXT NOT NULL,
                doc TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_comments_task ON comments(task_id);
            CREATE TABLE IF NOT EXISTS activity (
                id TEXT PRIMARY KEY,
                project_id TEXT,
                user_id TEXT NOT NULL,
                doc TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_activity_project ON activity(project_id);
            CREATE INDEX IF NOT EXISTS idx_activity_user ON activity(user_id);",
        )
        .map_err(storage)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Storage("connection lock poisoned".into()))
    }
}

fn storage(err: impl std::fmt::Display) -> StoreError {
    StoreError::Storage(err.to_string())
}

fn encode<T: Serialize>(value: &T) -> Result<String, StoreError> {
    serde_json::to_string(value).map_err(storage)
}

fn decode<T: DeserializeOwned>(doc: &str) -> Result<T, StoreError> {
    serde_json::from_str(doc).map_err(storage)
}

/// Runs a single-column `doc` query and decodes every row.
fn collect_docs<T: DeserializeOwned>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn rusqlite::ToSql],
) -> Result<Vec<T>, StoreError> {
    let mut stmt = conn.prepare(sql).map_err(storage)?;
    let rows = stmt
        .query_map(params, |row| row.get::<_, String>(0))
        .map_err(storage)?;
    let mut items = Vec::new();
    for row in rows {
        items.push(decode(&row.map_err(storage)?)?);
    }
    Ok(items)
}

fn get_doc<T: DeserializeOwned>(
    conn: &Connection,
    table: &str,
    id: Uuid,
) -> Result<Option<T>, StoreError> {
    let sql = format!("SELECT doc FROM {table} WHERE id = ?1");
    let doc: Option<String> = conn
        .query_row(&sql, params![id.to_string()], |row| row.get(0))
        .optional()
        .map_err(storage)?;
    doc.as_deref().map(decode).transpose()
}

impl UserStore for SqliteStore {
    fn insert_user(&self, new: NewUser) -> Result<User, StoreError> {
        let conn = self.lock()?;
        let existing: Option<String> = conn
            .query_row(
                "SELECT id FROM users WHERE email = ?1 COLLATE NOCASE",
                params![new.email],
                |row| row.get(0),
            )
            .optional()
            .map_err(storage)?;
        if existing.is_some() {
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
        conn.execute(
            "INSERT INTO users (id, email, doc) VALUES (?1, ?2, ?3)",
            params![user.id.to_string(), user.email, encode(&user)?],
        )
        .map_err(storage)?;
        Ok(user)
    }

    fn get_user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let conn = self.lock()?;
        get_doc(&conn, "users", id)
    }

    fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let conn = self.lock()?;
        let doc: Option<String> = conn
            .query_row(
                "SELECT doc FROM users WHERE email = ?1 COLLATE NOCASE",
                params![email],
                |row| row.get(0),
            )
            .optional()
            .map_err(storage)?;
        doc.as_deref().map(decode).transpose()
    }
}

impl ProjectStore for SqliteStore {
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
        self.lock()?
            .execute(
                "INSERT INTO projects (id, doc) VALUES (?1, ?2)",
                params![project.id.to_string(), encode(&project)?],
            )
            .map_err(storage)?;
        Ok(project)
    }

    fn get_project(&self, id: ProjectId) -> Result<Option<Project>, StoreError> {
        let conn = self.lock()?;
        get_doc(&conn, "projects", id)
    }

    fn list_projects_for_user(
        &self,
        user: UserId,
        status: Option<ProjectStatus>,
        params: &PageParams,
        sort: &Sort,
    ) -> Result<Page<Project>, StoreError> {
        // Membership lives inside the document, so the narrowing happens
        // after decode.
        let conn = self.lock()?;
        let all: Vec<Project> = collect_docs(&conn, "SELECT doc FROM projects", &[])?;
        drop(conn);
        let mut items: Vec<Project> = all
            .into_iter()
            .filter(|p| p.manager == user || p.members.contains(&user))
            .filter(|p| status.is_none_or(|s| p.status == s))
            .collect();
        sort_projects(&mut items, sort);
        Ok(Page::slice(items, params))
    }

    fn update_project(
        &self,
        id: ProjectId,
        patch: &ProjectPatch,
    ) -> Result<Option<Project>, StoreError> {
        let conn = self.lock()?;
        let Some(mut project) = get_doc::<Project>(&conn, "projects", id)? else {
            return Ok(None);
        };
        patch.apply(&mut project);
        project.updated_at = Utc::now();
        conn.execute(
            "UPDATE projects SET doc = ?2 WHERE id = ?1",
            params![id.to_string(), encode(&project)?],
        )
        .map_err(storage)?;
        Ok(Some(project))
    }

    fn delete_project(&self, id: ProjectId) -> Result<bool, StoreError> {
        let changed = self
            .lock()?
            .execute("DELETE FROM projects WHERE id = ?1", params![id.to_string()])
            .map_err(storage)?;
        Ok(changed > 0)
    }

    fn add_member(&self, id: ProjectId, user: UserId) -> Result<Option<Project>, StoreError> {
        let conn = self.lock()?;
        let Some(mut project) = get_doc::<Project>(&conn, "projects", id)? else {
            return Ok(None);
        };
        if !project.members.contains(&user) {
            project.members.push(user);
            project.updated_at = Utc::now();
            conn.execute(
                "UPDATE projects SET doc = ?2 WHERE id = ?1",
                params![id.to_string(), encode(&project)?],
            )
            .map_err(storage)?;
        }
        Ok(Some(project))
    }

    fn remove_member(&self, id: ProjectId, user: UserId) -> Result<Option<Project>, StoreError> {
        let conn = self.lock()?;
        let Some(mut project) = get_doc::<Project>(&conn, "projects", id)? else {
            return Ok(None);
        };
        let before = project.members.len();
        project.members.retain(|m| *m != user);
        if project.members.len() != before {
            project.updated_at = Utc::now();
            conn.execute(
                "UPDATE projects SET doc = ?2 WHERE id = ?1",
                params![id.to_string(), encode(&project)?],
            )
            .map_err(storage)?;
        }
        Ok(Some(project))
    }
}

impl TaskStore for SqliteStore {
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
        self.lock()?
            .execute(
                "INSERT INTO tasks (id, project_id, doc) VALUES (?1, ?2, ?3)",
                params![
                    task.id.to_string(),
                    task.project.to_string(),
                    encode(&task)?
                ],
            )
            .map_err(storage)?;
        Ok(task)
    }

    fn get_task(&self, id: TaskId) -> Result<Option<Task>, StoreError> {
        let conn = self.lock()?;
        get_doc(&conn, "tasks", id)
    }

    fn list_tasks(
        &self,
        filter: &TaskFilter,
        params: &PageParams,
        sort: &Sort,
    ) -> Result<Page<Task>, StoreError> {
        let conn = self.lock()?;
        let all: Vec<Task> = match filter.project {
            Some(project) => collect_docs(
                &conn,
                "SELECT doc FROM tasks WHERE project_id = ?1",
                &[&project.to_string()],
            )?,
            None => collect_docs(&conn, "SELECT doc FROM tasks", &[])?,
        };
        drop(conn);
        let mut items: Vec<Task> = all.into_iter().filter(|t| filter.matches(t)).collect();
        sort_tasks(&mut items, sort);
        Ok(Page::slice(items, params))
    }

    fn update_task(&self, id: TaskId, patch: &TaskPatch) -> Result<Option<Task>, StoreError> {
        let conn = self.lock()?;
        let Some(mut task) = get_doc::<Task>(&conn, "tasks", id)? else {
            return Ok(None);
        };
        patch.apply(&mut task);
        task.updated_at = Utc::now();
        conn.execute(
            "UPDATE tasks SET doc = ?2 WHERE id = ?1",
            params![id.to_string(), encode(&task)?],
        )
        .map_err(storage)?;
        Ok(Some(task))
    }

    fn delete_task(&self, id: TaskId) -> Result<bool, StoreError> {
        let changed = self
            .lock()?
            .execute("DELETE FROM tasks WHERE id = ?1", params![id.to_string()])
            .map_err(storage)?;
        Ok(changed > 0)
    }

    fn delete_tasks_in_project(&self, project: ProjectId) -> Result<u64, StoreError> {
        let changed = self
            .lock()?
            .execute(
                "DELETE FROM tasks WHERE project_id = ?1",
                params![project.to_string()],
            )
            .map_err(storage)?;
        Ok(changed as u64)
    }

    fn task_status_counts(
        &self,
        project: ProjectId,
    ) -> Result<Vec<(TaskStatus, u64)>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT json_extract(doc, '$.status') AS status, COUNT(*)
                 FROM tasks WHERE project_id = ?1 GROUP BY status ORDER BY status",
            )
            .map_err(storage)?;
        let rows = stmt
            .query_map(params![project.to_string()], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, u64>(1)?))
            })
            .map_err(storage)?;

        let mut counts = Vec::new();
        for row in rows {
            let (status, count) = row.map_err(storage)?;
            let status: TaskStatus = decode(&format!("\"{status}\""))?;
            counts.push((status, count));
        }
        Ok(counts)
    }
}

impl CommentStore for SqliteStore {
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
        self.lock()?
            .execute(
                "INSERT INTO comments (id, task_id, doc) VALUES (?1, ?2, ?3)",
                params![
                    comment.id.to_string(),
                    comment.task.to_string(),
                    encode(&comment)?
                ],
            )
            .map_err(storage)?;
        Ok(comment)
    }

    fn get_comment(&self, id: CommentId) -> Result<Option<Comment>, StoreError> {
        let conn = self.lock()?;
        get_doc(&conn, "comments", id)
    }

    fn list_comments_for_task(
        &self,
        task: TaskId,
        params: &PageParams,
    ) -> Result<Page<Comment>, StoreError> {
        let conn = self.lock()?;
        let mut items: Vec<Comment> = collect_docs(
            &conn,
            "SELECT doc FROM comments WHERE task_id = ?1",
            &[&task.to_string()],
        )?;
        drop(conn);
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
        let conn = self.lock()?;
        let Some(mut comment) = get_doc::<Comment>(&conn, "comments", id)? else {
            return Ok(None);
        };
        patch.apply(&mut comment);
        comment.updated_at = Utc::now();
        conn.execute(
            "UPDATE comments SET doc = ?2 WHERE id = ?1",
            params![id.to_string(), encode(&comment)?],
        )
        .map_err(storage)?;
        Ok(Some(comment))
    }

    fn delete_comment(&self, id: CommentId) -> Result<bool, StoreError> {
        let changed = self
            .lock()?
            .execute("DELETE FROM comments WHERE id = ?1", params![id.to_string()])
            .map_err(storage)?;
        Ok(changed > 0)
    }
}

impl ActivityStore for SqliteStore {
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
        self.lock()?
            .execute(
                "INSERT INTO activity (id, project_id, user_id, doc) VALUES (?1, ?2, ?3, ?4)",
                params![
                    record.id.to_string(),
                    record.project.map(|p| p.to_string()),
                    record.user.to_string(),
                    encode(&record)?
                ],
            )
            .map_err(storage)?;
        Ok(record)
    }

    fn list_activity(
        &self,
        filter: &ActivityFilter,
        params: &PageParams,
        sort: &Sort,
    ) -> Result<Page<ActivityLog>, StoreError> {
        let conn = self.lock()?;
        let all: Vec<ActivityLog> = match (filter.project, filter.user) {
            (Some(project), Some(user)) => collect_docs(
                &conn,
                "SELECT doc FROM activity WHERE project_id = ?1 AND user_id = ?2",
                &[&project.to_string(), &user.to_string()],
            )?,
            (Some(project), None) => collect_docs(
                &conn,
                "SELECT doc FROM activity WHERE project_id = ?1",
                &[&project.to_string()],
            )?,
            (None, Some(user)) => collect_docs(
                &conn,
                "SELECT doc FROM activity WHERE user_id = ?1",
                &[&user.to_string()],
            )?,
            (None, None) => collect_docs(&conn, "SELECT doc FROM activity", &[])?,
        };
        drop(conn);
        let mut items = all;
        sort_activity(&mut items, sort);
        Ok(Page::slice(items, params))
    }
}
