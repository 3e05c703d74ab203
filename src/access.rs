//! Role-to-capability mapping.
//!
//! The mapping is a pure function of the caller's role in one project. It is
//! checked at the top of every privileged operation, so a refusal happens
//! before any store traffic.

use std::fmt;

use crate::error::Error;
use crate::fields::Role;

/// The operations a caller can be granted or refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    CreateTasks,
    EditTasks,
    DeleteTasks,
    ReviewSubmissions,
    ListTasks,
    ManageMembers,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Capability::CreateTasks => "create tasks",
            Capability::EditTasks => "edit tasks",
            Capability::DeleteTasks => "delete tasks",
            Capability::ReviewSubmissions => "review submissions",
            Capability::ListTasks => "list tasks",
            Capability::ManageMembers => "manage members",
        };
        f.write_str(s)
    }
}

/// Whether `role` includes `cap`.
///
/// Admins hold every capability. Members can list tasks and nothing else;
/// reviewing is admin-only even for a member's own submission.
pub fn allows(role: Role, cap: Capability) -> bool {
    match role {
        Role::Admin => true,
        Role::Member => matches!(cap, Capability::ListTasks),
    }
}

/// Gate an operation on `cap`, naming the missing capability on refusal.
pub fn require(role: Role, cap: Capability) -> Result<(), Error> {
    if allows(role, cap) {
        Ok(())
    } else {
        Err(Error::Forbidden(cap))
    }
}
