//! Caller context resolved once per command.

use crate::error::Error;
use crate::fields::Role;
use crate::store::IdentityStore;
use crate::task::{MemberId, ProjectId};

/// Who is acting, in which project, with what role.
///
/// Every engine operation takes the session as a plain argument. Nothing is
/// read from ambient process state, so two calls acting as different users
/// can interleave in one process without seeing each other.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Session {
    pub user: MemberId,
    pub project: ProjectId,
    pub role: Role,
}

impl Session {
    /// Resolve the caller's role in `project`.
    ///
    /// Fails with `NotFound` when the project or user is unknown, and with
    /// `NotAMember` when both exist but no membership row ties them.
    pub fn resolve(
        store: &impl IdentityStore,
        user: MemberId,
        project: ProjectId,
    ) -> Result<Session, Error> {
        if store.project_name(project)?.is_none() {
            return Err(Error::NotFound(format!("project {project}")));
        }
        if store.member_name(user)?.is_none() {
            return Err(Error::NotFound(format!("user {user}")));
        }
        match store.role_in(user, project)? {
            Some(role) => Ok(Session {
                user,
                project,
                role,
            }),
            None => Err(Error::NotAMember { user, project }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Workspace;

    fn seeded() -> Workspace {
        let mut ws = Workspace::default();
        let alice = ws.add_member("Alice".into(), 100);
        let bob = ws.add_member("Bob".into(), 110);
        let proj = ws.add_project("Orbit".into(), 120);
        ws.add_membership(alice, proj, Role::Admin);
        ws.add_membership(bob, proj, Role::Member);
        ws
    }

    #[test]
    fn resolves_role_from_membership_row() {
        let ws = seeded();
        let s = Session::resolve(&ws, 1, 1).unwrap();
        assert_eq!(s.role, Role::Admin);
        let s = Session::resolve(&ws, 2, 1).unwrap();
        assert_eq!(s.role, Role::Member);
    }

    #[test]
    fn unknown_project_is_not_found() {
        let ws = seeded();
        let err = Session::resolve(&ws, 1, 99).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn existing_user_without_row_is_not_a_member() {
        let mut ws = seeded();
        let carol = ws.add_member("Carol".into(), 130);
        let err = Session::resolve(&ws, carol, 1).unwrap_err();
        match err {
            Error::NotAMember { user, project } => {
                assert_eq!(user, carol);
                assert_eq!(project, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
