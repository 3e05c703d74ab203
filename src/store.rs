//! Collaborator traits and the file-backed workspace store.
//!
//! The engine modules speak only to the traits here; the `Workspace` struct
//! is the bundled binding, one JSON document per team. Any other binding
//! satisfying the same signatures would do.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::StoreError;
use crate::fields::{Role, SubmissionStatus, TaskStatus};
use crate::member::{Member, Membership, Project};
use crate::task::{
    MemberId, NewSubmission, NewTask, PersistedTask, ProjectId, Submission, SubmissionId, TaskId,
    TaskPatch,
};

/// Persisted task operations used by plan commit and the listings.
pub trait TaskStore {
    fn list_by_project(&self, project: ProjectId) -> Result<Vec<PersistedTask>, StoreError>;
    /// Bulk insert; returns the assigned ids in input order.
    fn insert_tasks(&mut self, tasks: Vec<NewTask>) -> Result<Vec<TaskId>, StoreError>;
    /// Replace the editable fields of one task.
    fn update_task(&mut self, id: TaskId, patch: TaskPatch) -> Result<(), StoreError>;
    fn delete_tasks(&mut self, ids: &[TaskId]) -> Result<(), StoreError>;
}

/// Submission rows.
pub trait SubmissionStore {
    fn submission(&self, id: SubmissionId) -> Result<Option<Submission>, StoreError>;
    fn submissions_by_project(&self, project: ProjectId) -> Result<Vec<Submission>, StoreError>;
    /// Open a new attempt under review and mark the originating task submitted.
    fn add_submission(&mut self, sub: NewSubmission) -> Result<SubmissionId, StoreError>;
}

/// The named actions that settle a review as one mutation pair.
///
/// Each action applies the submission verdict and the task side effect
/// together or not at all, so callers never see one row settled without the
/// other.
pub trait ReviewActions {
    fn approve_submission(
        &mut self,
        submission: SubmissionId,
        task: TaskId,
    ) -> Result<(), StoreError>;

    fn reject_submission(
        &mut self,
        submission: SubmissionId,
        task: TaskId,
    ) -> Result<(), StoreError>;
}

/// Identity lookups. `Ok(None)` means the row is gone; `Err` means the store
/// itself failed. Callers treat the two very differently.
pub trait IdentityStore {
    fn member_name(&self, id: MemberId) -> Result<Option<String>, StoreError>;
    fn project_name(&self, id: ProjectId) -> Result<Option<String>, StoreError>;
    fn role_in(&self, user: MemberId, project: ProjectId) -> Result<Option<Role>, StoreError>;
    fn members_of(&self, project: ProjectId) -> Result<Vec<Member>, StoreError>;
}

/// Every table of one team workspace, stored as a single JSON document.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Workspace {
    pub members: Vec<Member>,
    pub projects: Vec<Project>,
    pub memberships: Vec<Membership>,
    pub tasks: Vec<PersistedTask>,
    #[serde(default)]
    pub submissions: Vec<Submission>,
}

impl Workspace {
    /// Load a workspace file; a path that does not exist yet is an empty
    /// workspace, anything unreadable or unparseable is an error.
    pub fn load(path: &Path) -> Result<Workspace, StoreError> {
        if !path.exists() {
            return Ok(Workspace::default());
        }
        let mut buf = String::new();
        File::open(path)?.read_to_string(&mut buf)?;
        let ws: Workspace = serde_json::from_str(&buf)?;
        debug!(path = %path.display(), tasks = ws.tasks.len(), "loaded workspace");
        Ok(ws)
    }

    /// Save to JSON using a temp file + rename so readers never see a torn write.
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        let tmp = path.with_extension("json.tmp");
        let data = serde_json::to_string_pretty(self)?;
        let mut f = File::create(&tmp)?;
        f.write_all(data.as_bytes())?;
        f.flush()?;
        fs::rename(tmp, path)?;
        Ok(())
    }

    fn next_task_id(&self) -> TaskId {
        self.tasks.iter().map(|t| t.id).max().unwrap_or(0) + 1
    }

    fn next_member_id(&self) -> MemberId {
        self.members.iter().map(|m| m.id).max().unwrap_or(0) + 1
    }

    fn next_project_id(&self) -> ProjectId {
        self.projects.iter().map(|p| p.id).max().unwrap_or(0) + 1
    }

    fn next_submission_id(&self) -> SubmissionId {
        self.submissions.iter().map(|s| s.id).max().unwrap_or(0) + 1
    }

    pub fn add_member(&mut self, name: String, now_utc: i64) -> MemberId {
        let id = self.next_member_id();
        self.members.push(Member {
            id,
            name,
            joined_at_utc: now_utc,
        });
        id
    }

    pub fn add_project(&mut self, name: String, now_utc: i64) -> ProjectId {
        let id = self.next_project_id();
        self.projects.push(Project {
            id,
            name,
            created_at_utc: now_utc,
        });
        id
    }

    /// Record a membership row; refuses a second row for the same pair since
    /// a role never changes after creation.
    pub fn add_membership(&mut self, user: MemberId, project: ProjectId, role: Role) -> bool {
        let taken = self
            .memberships
            .iter()
            .any(|m| m.user == user && m.project == project);
        if taken {
            return false;
        }
        self.memberships.push(Membership {
            user,
            project,
            role,
        });
        true
    }

    pub fn task(&self, id: TaskId) -> Option<&PersistedTask> {
        self.tasks.iter().find(|t| t.id == id)
    }

    fn task_mut(&mut self, id: TaskId) -> Option<&mut PersistedTask> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }
}

impl TaskStore for Workspace {
    fn list_by_project(&self, project: ProjectId) -> Result<Vec<PersistedTask>, StoreError> {
        Ok(self
            .tasks
            .iter()
            .filter(|t| t.project == project)
            .cloned()
            .collect())
    }

    fn insert_tasks(&mut self, tasks: Vec<NewTask>) -> Result<Vec<TaskId>, StoreError> {
        let now = Utc::now().timestamp();
        let mut ids = Vec::with_capacity(tasks.len());
        for new in tasks {
            let id = self.next_task_id();
            self.tasks.push(PersistedTask {
                id,
                title: new.title,
                description: new.description,
                deadline: new.deadline,
                assignee: new.assignee,
                project: new.project,
                created_by: new.created_by,
                status: TaskStatus::InProgress,
                submitted: false,
                created_at_utc: now,
                updated_at_utc: now,
            });
            ids.push(id);
        }
        Ok(ids)
    }

    fn update_task(&mut self, id: TaskId, patch: TaskPatch) -> Result<(), StoreError> {
        let task = self
            .task_mut(id)
            .ok_or_else(|| StoreError::Backend(format!("task {id} does not exist")))?;
        task.title = patch.title;
        task.description = patch.description;
        task.deadline = patch.deadline;
        task.assignee = patch.assignee;
        task.updated_at_utc = Utc::now().timestamp();
        Ok(())
    }

    fn delete_tasks(&mut self, ids: &[TaskId]) -> Result<(), StoreError> {
        self.tasks.retain(|t| !ids.contains(&t.id));
        // Submissions for a deleted task have nothing left to act on.
        self.submissions.retain(|s| !ids.contains(&s.task));
        Ok(())
    }
}

impl SubmissionStore for Workspace {
    fn submission(&self, id: SubmissionId) -> Result<Option<Submission>, StoreError> {
        Ok(self.submissions.iter().find(|s| s.id == id).cloned())
    }

    fn submissions_by_project(&self, project: ProjectId) -> Result<Vec<Submission>, StoreError> {
        Ok(self
            .submissions
            .iter()
            .filter(|s| s.project == project)
            .cloned()
            .collect())
    }

    fn add_submission(&mut self, sub: NewSubmission) -> Result<SubmissionId, StoreError> {
        let now = Utc::now().timestamp();
        let task = self
            .task_mut(sub.task)
            .ok_or_else(|| StoreError::Backend(format!("task {} does not exist", sub.task)))?;
        task.submitted = true;
        task.updated_at_utc = now;
        let id = self.next_submission_id();
        self.submissions.push(Submission {
            id,
            task: sub.task,
            project: sub.project,
            submitted_by: sub.submitted_by,
            file: sub.file,
            notes: sub.notes,
            status: SubmissionStatus::UnderReview,
            created_at_utc: now,
        });
        Ok(id)
    }
}

impl ReviewActions for Workspace {
    fn approve_submission(
        &mut self,
        submission: SubmissionId,
        task: TaskId,
    ) -> Result<(), StoreError> {
        // Look both rows up before touching either, so a bad id cannot
        // leave a half-applied pair.
        let sub_at = self
            .submissions
            .iter()
            .position(|s| s.id == submission)
            .ok_or_else(|| StoreError::Backend(format!("submission {submission} does not exist")))?;
        let task_at = self
            .tasks
            .iter()
            .position(|t| t.id == task)
            .ok_or_else(|| StoreError::Backend(format!("task {task} does not exist")))?;
        if self.submissions[sub_at].status != SubmissionStatus::UnderReview {
            return Err(StoreError::Backend(format!(
                "submission {submission} is already settled"
            )));
        }
        self.submissions[sub_at].status = SubmissionStatus::Approved;
        let t = &mut self.tasks[task_at];
        t.status = TaskStatus::Finished;
        t.updated_at_utc = Utc::now().timestamp();
        Ok(())
    }

    fn reject_submission(
        &mut self,
        submission: SubmissionId,
        task: TaskId,
    ) -> Result<(), StoreError> {
        let sub_at = self
            .submissions
            .iter()
            .position(|s| s.id == submission)
            .ok_or_else(|| StoreError::Backend(format!("submission {submission} does not exist")))?;
        let task_at = self
            .tasks
            .iter()
            .position(|t| t.id == task)
            .ok_or_else(|| StoreError::Backend(format!("task {task} does not exist")))?;
        if self.submissions[sub_at].status != SubmissionStatus::UnderReview {
            return Err(StoreError::Backend(format!(
                "submission {submission} is already settled"
            )));
        }
        self.submissions[sub_at].status = SubmissionStatus::Rejected;
        let t = &mut self.tasks[task_at];
        t.submitted = false;
        t.updated_at_utc = Utc::now().timestamp();
        Ok(())
    }
}

impl IdentityStore for Workspace {
    fn member_name(&self, id: MemberId) -> Result<Option<String>, StoreError> {
        Ok(self.members.iter().find(|m| m.id == id).map(|m| m.name.clone()))
    }

    fn project_name(&self, id: ProjectId) -> Result<Option<String>, StoreError> {
        Ok(self.projects.iter().find(|p| p.id == id).map(|p| p.name.clone()))
    }

    fn role_in(&self, user: MemberId, project: ProjectId) -> Result<Option<Role>, StoreError> {
        Ok(self
            .memberships
            .iter()
            .find(|m| m.user == user && m.project == project)
            .map(|m| m.role))
    }

    fn members_of(&self, project: ProjectId) -> Result<Vec<Member>, StoreError> {
        let rows = self
            .memberships
            .iter()
            .filter(|m| m.project == project)
            .filter_map(|m| self.members.iter().find(|u| u.id == m.user))
            .cloned()
            .collect();
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use chrono::NaiveDate;
    use crate::draft::{self, Plan};

    fn scratch_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("tt-ws-{tag}-{}.json", std::process::id()))
    }

    fn new_task(title: &str, project: ProjectId) -> NewTask {
        NewTask {
            title: title.into(),
            description: "d".into(),
            deadline: None,
            assignee: Some(2),
            project,
            created_by: 1,
        }
    }

    #[test]
    fn insert_assigns_sequential_ids() {
        let mut ws = Workspace::default();
        let ids = ws
            .insert_tasks(vec![new_task("a", 1), new_task("b", 1)])
            .unwrap();
        assert_eq!(ids, vec![1, 2]);
        let ids = ws.insert_tasks(vec![new_task("c", 1)]).unwrap();
        assert_eq!(ids, vec![3]);
    }

    #[test]
    fn update_task_replaces_editable_fields() {
        let mut ws = Workspace::default();
        let ids = ws.insert_tasks(vec![new_task("a", 1)]).unwrap();
        ws.update_task(
            ids[0],
            TaskPatch {
                title: "renamed".into(),
                description: "new body".into(),
                deadline: None,
                assignee: Some(4),
            },
        )
        .unwrap();
        let t = ws.task(ids[0]).unwrap();
        assert_eq!(t.title, "renamed");
        assert_eq!(t.assignee, Some(4));

        let err = ws
            .update_task(
                99,
                TaskPatch {
                    title: "x".into(),
                    description: "y".into(),
                    deadline: None,
                    assignee: None,
                },
            )
            .unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));
    }

    #[test]
    fn delete_prunes_orphaned_submissions() {
        let mut ws = Workspace::default();
        let ids = ws
            .insert_tasks(vec![new_task("a", 1), new_task("b", 1)])
            .unwrap();
        ws.add_submission(NewSubmission {
            task: ids[0],
            project: 1,
            submitted_by: 2,
            file: crate::task::FileMeta {
                name: "proof.zip".into(),
                size_bytes: 10,
            },
            notes: None,
        })
        .unwrap();
        ws.delete_tasks(&[ids[0]]).unwrap();
        assert!(ws.task(ids[0]).is_none());
        assert!(ws.submissions.is_empty());
        assert!(ws.task(ids[1]).is_some());
    }

    #[test]
    fn membership_rows_are_unique_per_pair() {
        let mut ws = Workspace::default();
        let user = ws.add_member("Ana".into(), 0);
        let project = ws.add_project("Orbit".into(), 0);
        assert!(ws.add_membership(user, project, Role::Admin));
        assert!(!ws.add_membership(user, project, Role::Member));
        assert_eq!(ws.role_in(user, project).unwrap(), Some(Role::Admin));
    }

    #[test]
    fn members_of_follows_membership_order() {
        let mut ws = Workspace::default();
        let a = ws.add_member("Ana".into(), 0);
        let b = ws.add_member("Ben".into(), 0);
        let p = ws.add_project("Orbit".into(), 0);
        ws.add_membership(b, p, Role::Member);
        ws.add_membership(a, p, Role::Admin);
        let names: Vec<String> = ws.members_of(p).unwrap().into_iter().map(|m| m.name).collect();
        assert_eq!(names, vec!["Ben".to_string(), "Ana".to_string()]);
    }

    #[test]
    fn save_then_load_round_trips() {
        let path = scratch_path("roundtrip");
        let mut ws = Workspace::default();
        let admin = ws.add_member("Ana".into(), 100);
        let project = ws.add_project("Orbit".into(), 100);
        ws.add_membership(admin, project, Role::Admin);
        ws.insert_tasks(vec![new_task("a", project)]).unwrap();
        ws.save(&path).unwrap();

        let loaded = Workspace::load(&path).unwrap();
        assert_eq!(loaded.members.len(), 1);
        assert_eq!(loaded.tasks.len(), 1);
        assert_eq!(loaded.tasks[0].title, "a");
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn missing_file_loads_as_empty_workspace() {
        let ws = Workspace::load(Path::new("/nonexistent/tt-nowhere.json")).unwrap();
        assert!(ws.tasks.is_empty());
        assert!(ws.members.is_empty());
    }

    #[test]
    fn corrupt_file_is_an_error_not_a_fresh_start() {
        let path = scratch_path("corrupt");
        std::fs::write(&path, "{ not json").unwrap();
        let err = Workspace::load(&path).unwrap_err();
        assert!(matches!(err, StoreError::Data(_)));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn competing_saves_are_last_write_wins() {
        let path = scratch_path("lastwrite");
        let mut ws = Workspace::default();
        let ana = ws.add_member("Ana".into(), 0);
        let ben = ws.add_member("Ben".into(), 0);
        let project = ws.add_project("Orbit".into(), 0);
        ws.save(&path).unwrap();

        // Two sessions load the same file and plan without seeing each other.
        let mut first = Workspace::load(&path).unwrap();
        let mut second = Workspace::load(&path).unwrap();
        let today = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();

        let mut plan = Plan::new(project);
        plan.insert("first writer".into(), "d".into(), None, Some(ana));
        let snapshot = first.list_by_project(project).unwrap();
        draft::commit(&plan, &snapshot, &mut first, ana, today).unwrap();
        first.save(&path).unwrap();

        let mut plan = Plan::new(project);
        plan.insert("second writer".into(), "d".into(), None, Some(ben));
        let snapshot = second.list_by_project(project).unwrap();
        draft::commit(&plan, &snapshot, &mut second, ben, today).unwrap();
        second.save(&path).unwrap();

        // No version token guards the file; the later save wins outright and
        // the first writer's task is gone.
        let after = Workspace::load(&path).unwrap();
        let tasks = after.list_by_project(project).unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "second writer");
        assert_eq!(tasks[0].assignee, Some(ben));
        std::fs::remove_file(&path).ok();
    }
}
