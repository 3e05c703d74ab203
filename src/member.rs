//! People, projects and the membership rows that tie them together.

use serde::{Deserialize, Serialize};

use crate::fields::Role;
use crate::task::{MemberId, ProjectId};

/// A person known to the workspace.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Member {
    pub id: MemberId,
    /// Display name shown in the feed and listings.
    pub name: String,
    pub joined_at_utc: i64,
}

/// A project that tasks and submissions belong to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub created_at_utc: i64,
}

/// One user's role within one project.
///
/// A user with no row for a project is not a member there at all, which is
/// distinct from being a member with a non-privileged role.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Membership {
    pub user: MemberId,
    pub project: ProjectId,
    pub role: Role,
}
