//! Entity model.
//!
//! All entities serialize with camelCase field names and kebab-case enum
//! values; that vocabulary is the wire format and the stored document
//! format, so it must not drift. Timestamps are assigned by the store,
//! never by handlers.

mod activity;
mod comment;
mod project;
mod task;
mod user;

pub use activity::{ActivityAction, ActivityFilter, ActivityLog, EntityType, NewActivity};
pub use comment::{Attachment, Comment, CommentPatch, NewComment};
pub use project::{NewProject, Project, ProjectPatch, ProjectStatus};
pub use task::{NewTask, Task, TaskFilter, TaskPatch, TaskPriority, TaskStatus};
pub use user::{NewUser, PublicUser, Role, User};

use uuid::Uuid;

/// Entity id aliases. Everything is a v4 UUID; the aliases exist so
/// signatures say which entity they mean.
pub type UserId = Uuid;
pub type ProjectId = Uuid;
pub type TaskId = Uuid;
pub type CommentId = Uuid;
pub type ActivityId = Uuid;
