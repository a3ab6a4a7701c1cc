//! Comments attached to tasks.
//!
//! Comments use the authorship authorization axis: any project member may
//! create one, but only its author (or a global admin) may change or delete
//! it. Project role is irrelevant for mutation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CommentId, TaskId, UserId};

/// A file reference attached to a comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub filename: String,
    pub url: String,
    pub mimetype: String,
}

/// A stored comment document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: CommentId,
    pub content: String,
    pub task: TaskId,
    /// Author, set at creation.
    pub user: UserId,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for creating a comment; the store assigns id and timestamps.
#[derive(Debug, Clone)]
pub struct NewComment {
    pub content: String,
    pub task: TaskId,
    pub user: UserId,
    pub attachments: Vec<Attachment>,
}

/// Partial update: only supplied fields change.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CommentPatch {
    pub content: Option<String>,
    pub attachments: Option<Vec<Attachment>>,
}

impl CommentPatch {
    /// Merges the supplied fields into `comment`.
    pub fn apply(&self, comment: &mut Comment) {
        if let Some(content) = &self.content {
            comment.content = content.clone();
        }
        if let Some(attachments) = &self.attachments {
            comment.attachments = attachments.clone();
        }
    }

    /// True when no field is supplied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.content.is_none() && self.attachments.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_cannot_move_comment() {
        // `task` and `user` are immutable; the patch type rejects them.
        assert!(serde_json::from_str::<CommentPatch>(r#"{"task":"x"}"#).is_err());
        assert!(serde_json::from_str::<CommentPatch>(r#"{"user":"x"}"#).is_err());
    }

    #[test]
    fn test_patch_replaces_attachments_wholesale() {
        let mut comment = Comment {
            id: uuid::Uuid::new_v4(),
            content: "see attached".into(),
            task: uuid::Uuid::new_v4(),
            user: uuid::Uuid::new_v4(),
            attachments: vec![Attachment {
                filename: "old.txt".into(),
                url: "/files/old.txt".into(),
                mimetype: "text/plain".into(),
            }],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let patch: CommentPatch =
            serde_json::from_str(r#"{"attachments":[]}"#).unwrap();
        patch.apply(&mut comment);
        assert!(comment.attachments.is_empty());
        assert_eq!(comment.content, "see attached");
    }
}
