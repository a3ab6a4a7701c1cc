//! Authorization policy.
//!
//! Two pure predicates, no hidden state, no side effects. Callers translate
//! a `false` into [`crate::Error::Authorization`].
//!
//! The asymmetry between the two checks is deliberate and load-bearing:
//! updates to projects and tasks use the broad project-scope check (any
//! member may update), while deletes and membership changes use the narrow
//! privileged check (owner or global admin). Collapsing one into the other
//! changes who can destroy data.

use crate::model::{Project, Role, UserId};

/// The authenticated actor issuing a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub id: UserId,
    pub role: Role,
}

impl Caller {
    #[must_use]
    pub const fn new(id: UserId, role: Role) -> Self {
        Self { id, role }
    }

    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin)
    }
}

/// Project-scope check: is the caller the project's manager or one of its
/// members? The manager is implicitly authorized as if it were a member.
///
/// Gates read and create access to projects, tasks, comments, and activity.
/// Note that a global admin gets no shortcut here; the scope is strictly
/// manager-or-member.
#[must_use]
pub fn can_access_project(caller: &Caller, project: &Project) -> bool {
    caller.id == project.manager || project.members.contains(&caller.id)
}

/// Privileged-mutation check: is the caller the entity's designated owner,
/// or a global admin?
///
/// Used for project/task deletion (owner = project manager) and comment
/// update/delete (owner = comment author).
#[must_use]
pub fn can_mutate_privileged(caller: &Caller, owner: UserId) -> bool {
    caller.id == owner || caller.is_admin()
}
