//! The editable task plan and its reconciliation against persisted state.
//!
//! A plan is an ordered list of drafts edited entirely in memory. Nothing
//! touches the store until [`commit`], which validates the whole plan, diffs
//! it against the persisted snapshot and applies the minimal create/update/
//! delete set. A plan that matches the snapshot commits to `NoChanges`
//! without a single store call.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Error;
use crate::store::TaskStore;
use crate::task::{MemberId, NewTask, PersistedTask, ProjectId, TaskId, TaskPatch};

/// Identifier of one draft within a plan.
///
/// A draft mirroring a committed task keeps that task's id; a draft for a
/// task that does not exist yet gets a plan-local counter value. The two
/// flavors are distinct variants, so they cannot collide no matter what the
/// counter reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DraftId {
    Persisted(TaskId),
    /// Rendered with a `+` prefix to keep it apart from task ids.
    Fresh(u64),
}

impl fmt::Display for DraftId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DraftId::Persisted(id) => write!(f, "{id}"),
            DraftId::Fresh(n) => write!(f, "+{n}"),
        }
    }
}

impl FromStr for DraftId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse = |digits: &str, what: &str| {
            digits
                .parse::<u64>()
                .map_err(|_| format!("'{s}' is not a valid {what}"))
        };
        match s.strip_prefix('+') {
            Some(rest) => Ok(DraftId::Fresh(parse(rest, "draft number")?)),
            None => Ok(DraftId::Persisted(parse(s, "task id")?)),
        }
    }
}

/// A locally held, not-yet-committed representation of one task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Draft {
    pub id: DraftId,
    pub title: String,
    pub description: String,
    pub deadline: Option<NaiveDate>,
    pub assignee: Option<MemberId>,
}

/// One field problem found by validation.
#[derive(Debug, Clone, PartialEq)]
pub struct DraftIssue {
    pub draft: DraftId,
    pub field: &'static str,
    pub problem: &'static str,
}

impl fmt::Display for DraftIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "draft {}: {} {}", self.draft, self.field, self.problem)
    }
}

/// Partial edit applied to one draft; `None` keeps the current value.
#[derive(Debug, Clone, Default)]
pub struct DraftPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub deadline: Option<Option<NaiveDate>>,
    pub assignee: Option<Option<MemberId>>,
}

/// An ordered, locally edited list of task drafts for one project.
///
/// Order is presentation order only; committing in a different order never
/// changes what is created, updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Plan {
    pub project: ProjectId,
    pub drafts: Vec<Draft>,
    next_fresh: u64,
}

impl Plan {
    /// Start an empty plan for fresh authoring.
    pub fn new(project: ProjectId) -> Plan {
        Plan {
            project,
            drafts: Vec::new(),
            next_fresh: 1,
        }
    }

    /// Start a plan mirroring the persisted tasks of a project.
    pub fn from_snapshot(project: ProjectId, snapshot: &[PersistedTask]) -> Plan {
        let drafts = snapshot
            .iter()
            .map(|t| Draft {
                id: DraftId::Persisted(t.id),
                title: t.title.clone(),
                description: t.description.clone(),
                deadline: t.deadline,
                assignee: t.assignee,
            })
            .collect();
        Plan {
            project,
            drafts,
            next_fresh: 1,
        }
    }

    /// Append a new draft and return its plan-local id.
    pub fn insert(
        &mut self,
        title: String,
        description: String,
        deadline: Option<NaiveDate>,
        assignee: Option<MemberId>,
    ) -> DraftId {
        let id = DraftId::Fresh(self.next_fresh);
        self.next_fresh += 1;
        self.drafts.push(Draft {
            id,
            title,
            description,
            deadline,
            assignee,
        });
        id
    }

    pub fn get(&self, id: DraftId) -> Option<&Draft> {
        self.drafts.iter().find(|d| d.id == id)
    }

    fn position(&self, id: DraftId) -> Result<usize, Error> {
        self.drafts
            .iter()
            .position(|d| d.id == id)
            .ok_or(Error::UnknownDraft(id))
    }

    /// Apply a partial edit to the draft with `id`.
    pub fn update(&mut self, id: DraftId, patch: DraftPatch) -> Result<(), Error> {
        let at = self.position(id)?;
        let draft = &mut self.drafts[at];
        if let Some(title) = patch.title {
            draft.title = title;
        }
        if let Some(description) = patch.description {
            draft.description = description;
        }
        if let Some(deadline) = patch.deadline {
            draft.deadline = deadline;
        }
        if let Some(assignee) = patch.assignee {
            draft.assignee = assignee;
        }
        Ok(())
    }

    /// Set the assignee of the draft with `id`.
    pub fn assign(&mut self, id: DraftId, member: MemberId) -> Result<(), Error> {
        self.update(
            id,
            DraftPatch {
                assignee: Some(Some(member)),
                ..DraftPatch::default()
            },
        )
    }

    /// Remove and return the draft with `id`.
    pub fn remove(&mut self, id: DraftId) -> Result<Draft, Error> {
        let at = self.position(id)?;
        Ok(self.drafts.remove(at))
    }

    /// Move the draft with `id` to `index`, clamped to the list end.
    pub fn reorder(&mut self, id: DraftId, index: usize) -> Result<(), Error> {
        let at = self.position(id)?;
        let draft = self.drafts.remove(at);
        let index = index.min(self.drafts.len());
        self.drafts.insert(index, draft);
        Ok(())
    }

    /// Check every draft, collecting one issue per bad field.
    ///
    /// Titles and descriptions must be non-empty after trimming. A deadline
    /// may fall on `today` but not before it; time of day plays no part.
    pub fn validate(&self, today: NaiveDate) -> Vec<DraftIssue> {
        let mut issues = Vec::new();
        for d in &self.drafts {
            if d.title.trim().is_empty() {
                issues.push(DraftIssue {
                    draft: d.id,
                    field: "title",
                    problem: "must not be empty",
                });
            }
            if d.description.trim().is_empty() {
                issues.push(DraftIssue {
                    draft: d.id,
                    field: "description",
                    problem: "must not be empty",
                });
            }
            if let Some(deadline) = d.deadline {
                if deadline < today {
                    issues.push(DraftIssue {
                        draft: d.id,
                        field: "deadline",
                        problem: "lies in the past",
                    });
                }
            }
        }
        issues
    }
}

/// The minimal mutation set that turns a persisted snapshot into a plan.
#[derive(Debug, Default, PartialEq)]
pub struct TaskDiff {
    pub to_create: Vec<Draft>,
    pub to_update: Vec<(TaskId, TaskPatch)>,
    pub to_delete: Vec<TaskId>,
}

impl TaskDiff {
    pub fn is_empty(&self) -> bool {
        self.to_create.is_empty() && self.to_update.is_empty() && self.to_delete.is_empty()
    }
}

/// Partition drafts against the persisted snapshot by id match.
///
/// A draft whose id matches no snapshot entry is a create, whether its id is
/// fresh or refers to a task someone else deleted in the meantime. A matched
/// pair with at least one changed field is an update; an untouched pair
/// appears in no set at all. Snapshot entries no draft claims are deletes.
pub fn diff(drafts: &[Draft], snapshot: &[PersistedTask]) -> TaskDiff {
    let by_id: HashMap<TaskId, &PersistedTask> =
        snapshot.iter().map(|t| (t.id, t)).collect();
    let mut kept: HashSet<TaskId> = HashSet::new();
    let mut out = TaskDiff::default();
    for d in drafts {
        let persisted = match d.id {
            DraftId::Persisted(id) => by_id.get(&id).map(|p| (id, *p)),
            DraftId::Fresh(_) => None,
        };
        match persisted {
            Some((id, p)) => {
                kept.insert(id);
                let changed = d.title != p.title
                    || d.description != p.description
                    || d.deadline != p.deadline
                    || d.assignee != p.assignee;
                if changed {
                    out.to_update.push((
                        id,
                        TaskPatch {
                            title: d.title.clone(),
                            description: d.description.clone(),
                            deadline: d.deadline,
                            assignee: d.assignee,
                        },
                    ));
                }
            }
            None => out.to_create.push(d.clone()),
        }
    }
    for t in snapshot {
        if !kept.contains(&t.id) {
            out.to_delete.push(t.id);
        }
    }
    out
}

/// What a successful commit did.
#[derive(Debug, PartialEq)]
pub enum CommitOutcome {
    /// The plan already matched the persisted set; the store was not contacted.
    NoChanges,
    Applied {
        created: Vec<TaskId>,
        updated: usize,
        deleted: usize,
    },
}

/// Validate the plan and apply its diff against `snapshot` to the store.
///
/// Validation and assignment completeness are checked before anything is
/// sent, so a refused commit leaves no partial effect. Store failures abort
/// mid-sequence and are surfaced as-is; no retry happens here.
pub fn commit(
    plan: &Plan,
    snapshot: &[PersistedTask],
    store: &mut impl TaskStore,
    actor: MemberId,
    today: NaiveDate,
) -> Result<CommitOutcome, Error> {
    let issues = plan.validate(today);
    if !issues.is_empty() {
        return Err(Error::Validation(issues));
    }
    let unassigned: Vec<DraftId> = plan
        .drafts
        .iter()
        .filter(|d| d.assignee.is_none())
        .map(|d| d.id)
        .collect();
    if !unassigned.is_empty() {
        return Err(Error::IncompleteAssignment(unassigned));
    }

    let changes = diff(&plan.drafts, snapshot);
    if changes.is_empty() {
        return Ok(CommitOutcome::NoChanges);
    }
    debug!(
        project = plan.project,
        create = changes.to_create.len(),
        update = changes.to_update.len(),
        delete = changes.to_delete.len(),
        "committing plan"
    );
    let TaskDiff {
        to_create,
        to_update,
        to_delete,
    } = changes;

    let created = if to_create.is_empty() {
        Vec::new()
    } else {
        let rows: Vec<NewTask> = to_create
            .into_iter()
            .map(|d| NewTask {
                title: d.title,
                description: d.description,
                deadline: d.deadline,
                assignee: d.assignee,
                project: plan.project,
                created_by: actor,
            })
            .collect();
        store.insert_tasks(rows)?
    };
    let updated = to_update.len();
    for (id, patch) in to_update {
        store.update_task(id, patch)?;
    }
    let deleted = to_delete.len();
    if !to_delete.is_empty() {
        store.delete_tasks(&to_delete)?;
    }
    Ok(CommitOutcome::Applied {
        created,
        updated,
        deleted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::fields::TaskStatus;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    fn persisted(id: TaskId, title: &str, assignee: MemberId) -> PersistedTask {
        PersistedTask {
            id,
            title: title.to_string(),
            description: format!("{title} description"),
            deadline: Some(day(20)),
            assignee: Some(assignee),
            project: 1,
            created_by: 9,
            status: TaskStatus::InProgress,
            submitted: false,
            created_at_utc: 0,
            updated_at_utc: 0,
        }
    }

    /// Counts every store call so tests can assert none happened.
    #[derive(Default)]
    struct RecordingStore {
        inserted: Vec<NewTask>,
        updated: Vec<(TaskId, TaskPatch)>,
        deleted: Vec<TaskId>,
        calls: usize,
    }

    impl TaskStore for RecordingStore {
        fn list_by_project(
            &self,
            _project: ProjectId,
        ) -> Result<Vec<PersistedTask>, StoreError> {
            Ok(Vec::new())
        }

        fn insert_tasks(&mut self, tasks: Vec<NewTask>) -> Result<Vec<TaskId>, StoreError> {
            self.calls += 1;
            let start = 100 + self.inserted.len() as TaskId;
            let ids = (0..tasks.len() as TaskId).map(|n| start + n).collect();
            self.inserted.extend(tasks);
            Ok(ids)
        }

        fn update_task(&mut self, id: TaskId, patch: TaskPatch) -> Result<(), StoreError> {
            self.calls += 1;
            self.updated.push((id, patch));
            Ok(())
        }

        fn delete_tasks(&mut self, ids: &[TaskId]) -> Result<(), StoreError> {
            self.calls += 1;
            self.deleted.extend_from_slice(ids);
            Ok(())
        }
    }

    #[test]
    fn draft_id_parses_both_flavors() {
        assert_eq!("42".parse::<DraftId>().unwrap(), DraftId::Persisted(42));
        assert_eq!("+3".parse::<DraftId>().unwrap(), DraftId::Fresh(3));
        assert!("+x".parse::<DraftId>().is_err());
        assert_eq!(DraftId::Fresh(3).to_string(), "+3");
        assert_eq!(DraftId::Persisted(42).to_string(), "42");
    }

    #[test]
    fn insert_allocates_distinct_local_ids() {
        let mut plan = Plan::new(1);
        let a = plan.insert("a".into(), "d".into(), None, None);
        let b = plan.insert("b".into(), "d".into(), None, None);
        assert_ne!(a, b);
        assert_eq!(plan.drafts.len(), 2);
    }

    #[test]
    fn update_and_remove_unknown_draft_fail() {
        let mut plan = Plan::new(1);
        let err = plan.update(DraftId::Fresh(7), DraftPatch::default()).unwrap_err();
        assert!(matches!(err, Error::UnknownDraft(DraftId::Fresh(7))));
        let err = plan.remove(DraftId::Persisted(7)).unwrap_err();
        assert!(matches!(err, Error::UnknownDraft(DraftId::Persisted(7))));
    }

    #[test]
    fn reorder_moves_and_clamps() {
        let mut plan = Plan::new(1);
        let a = plan.insert("a".into(), "d".into(), None, None);
        let b = plan.insert("b".into(), "d".into(), None, None);
        let c = plan.insert("c".into(), "d".into(), None, None);
        plan.reorder(c, 0).unwrap();
        assert_eq!(plan.drafts[0].id, c);
        plan.reorder(a, 99).unwrap();
        assert_eq!(plan.drafts.last().unwrap().id, a);
        assert_eq!(plan.drafts[1].id, b);
    }

    #[test]
    fn validate_flags_each_bad_field() {
        let today = day(10);
        let mut plan = Plan::new(1);
        plan.insert("".into(), "x".into(), None, None);
        let issues = plan.validate(today);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].field, "title");

        let mut plan = Plan::new(1);
        plan.insert("t".into(), "d".into(), Some(day(9)), None);
        let issues = plan.validate(today);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].field, "deadline");

        let mut plan = Plan::new(1);
        plan.insert("t".into(), "d".into(), Some(day(11)), None);
        assert!(plan.validate(today).is_empty());
    }

    #[test]
    fn deadline_today_is_allowed() {
        let mut plan = Plan::new(1);
        plan.insert("t".into(), "d".into(), Some(day(10)), None);
        assert!(plan.validate(day(10)).is_empty());
    }

    #[test]
    fn diff_partitions_drafts_and_snapshot() {
        let snapshot = vec![persisted(1, "keep", 5), persisted(2, "edit", 5), persisted(3, "drop", 5)];
        let mut plan = Plan::from_snapshot(1, &snapshot);
        plan.update(
            DraftId::Persisted(2),
            DraftPatch {
                title: Some("edited".into()),
                ..DraftPatch::default()
            },
        )
        .unwrap();
        plan.remove(DraftId::Persisted(3)).unwrap();
        let fresh = plan.insert("new".into(), "d".into(), None, Some(5));

        let d = diff(&plan.drafts, &snapshot);
        assert_eq!(d.to_create.len(), 1);
        assert_eq!(d.to_create[0].id, fresh);
        assert_eq!(d.to_update.len(), 1);
        assert_eq!(d.to_update[0].0, 2);
        assert_eq!(d.to_update[0].1.title, "edited");
        assert_eq!(d.to_delete, vec![3]);

        // Every id lands in exactly one set, or in none when unchanged.
        assert!(d.to_update.iter().all(|(id, _)| *id != 1));
        assert!(!d.to_delete.contains(&1));
    }

    #[test]
    fn diff_of_untouched_snapshot_is_empty() {
        let snapshot = vec![persisted(1, "a", 5), persisted(2, "b", 5)];
        let plan = Plan::from_snapshot(1, &snapshot);
        assert!(diff(&plan.drafts, &snapshot).is_empty());
    }

    #[test]
    fn draft_for_vanished_task_becomes_a_create() {
        let snapshot = vec![persisted(1, "still here", 5)];
        let mut plan = Plan::from_snapshot(1, &snapshot);
        plan.drafts.push(Draft {
            id: DraftId::Persisted(99),
            title: "ghost".into(),
            description: "d".into(),
            deadline: None,
            assignee: Some(5),
        });
        let d = diff(&plan.drafts, &snapshot);
        assert_eq!(d.to_create.len(), 1);
        assert_eq!(d.to_create[0].title, "ghost");
        assert!(d.to_update.is_empty());
        assert!(d.to_delete.is_empty());
    }

    #[test]
    fn commit_requires_every_draft_assigned() {
        let mut plan = Plan::new(1);
        let unassigned = plan.insert("A".into(), "d".into(), None, None);
        let mut store = RecordingStore::default();
        let err = commit(&plan, &[], &mut store, 9, day(10)).unwrap_err();
        match err {
            Error::IncompleteAssignment(ids) => assert_eq!(ids, vec![unassigned]),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(store.calls, 0);

        plan.assign(unassigned, 5).unwrap();
        let out = commit(&plan, &[], &mut store, 9, day(10)).unwrap();
        match out {
            CommitOutcome::Applied { created, updated, deleted } => {
                assert_eq!(created.len(), 1);
                assert_eq!(updated, 0);
                assert_eq!(deleted, 0);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(store.inserted.len(), 1);
        assert_eq!(store.inserted[0].title, "A");
        assert_eq!(store.inserted[0].created_by, 9);
    }

    #[test]
    fn commit_rejects_invalid_drafts_before_checking_assignment() {
        let mut plan = Plan::new(1);
        plan.insert("".into(), "d".into(), None, None);
        let mut store = RecordingStore::default();
        let err = commit(&plan, &[], &mut store, 9, day(10)).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(store.calls, 0);
    }

    #[test]
    fn unchanged_plan_commits_to_no_changes_without_store_calls() {
        let snapshot = vec![persisted(1, "a", 5), persisted(2, "b", 5)];
        let plan = Plan::from_snapshot(1, &snapshot);
        let mut store = RecordingStore::default();
        let out = commit(&plan, &snapshot, &mut store, 9, day(10)).unwrap();
        assert_eq!(out, CommitOutcome::NoChanges);
        assert_eq!(store.calls, 0);
    }

    #[test]
    fn commit_applies_all_three_operation_kinds() {
        let snapshot = vec![persisted(1, "keep", 5), persisted(2, "edit", 5), persisted(3, "drop", 5)];
        let mut plan = Plan::from_snapshot(1, &snapshot);
        plan.update(
            DraftId::Persisted(2),
            DraftPatch {
                deadline: Some(Some(day(25))),
                ..DraftPatch::default()
            },
        )
        .unwrap();
        plan.remove(DraftId::Persisted(3)).unwrap();
        plan.insert("new".into(), "d".into(), Some(day(12)), Some(6));

        let mut store = RecordingStore::default();
        let out = commit(&plan, &snapshot, &mut store, 9, day(10)).unwrap();
        match out {
            CommitOutcome::Applied { created, updated, deleted } => {
                assert_eq!(created.len(), 1);
                assert_eq!(updated, 1);
                assert_eq!(deleted, 1);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(store.updated[0].0, 2);
        assert_eq!(store.updated[0].1.deadline, Some(day(25)));
        assert_eq!(store.deleted, vec![3]);
        // Untouched task 1 generated no traffic.
        assert!(store.updated.iter().all(|(id, _)| *id != 1));
        assert!(!store.deleted.contains(&1));
    }
}
