//! Task and submission data structures.
//!
//! This module defines the records the workspace store persists: the `PersistedTask`
//! owned by a project, the payload types the store accepts for creation and update,
//! and the `Submission` a member hands in as proof of completion.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::fields::{SubmissionStatus, TaskStatus};

/// Identifier of a persisted task.
pub type TaskId = u64;
/// Identifier of a team member.
pub type MemberId = u64;
/// Identifier of a submission.
pub type SubmissionId = u64;
/// Identifier of a project workspace.
pub type ProjectId = u64;

/// A task owned by a project, as the store persists it.
///
/// Created only through a plan commit; mutated by later commits, by
/// submission review, and by re-submission. Tasks reference their assignee
/// by id only; display names are resolved at read time, never stored here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedTask {
    pub id: TaskId,
    pub title: String,
    pub description: String,
    pub deadline: Option<NaiveDate>,
    pub assignee: Option<MemberId>,
    pub project: ProjectId,
    pub created_by: MemberId,
    pub status: TaskStatus,
    /// True while a proof-of-completion submission is under review.
    #[serde(default)]
    pub submitted: bool,
    pub created_at_utc: i64,
    pub updated_at_utc: i64,
}

/// Payload for creating a task; the store allocates the id and timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub deadline: Option<NaiveDate>,
    pub assignee: Option<MemberId>,
    pub project: ProjectId,
    pub created_by: MemberId,
}

/// New values for the four editable fields of a task.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskPatch {
    pub title: String,
    pub description: String,
    pub deadline: Option<NaiveDate>,
    pub assignee: Option<MemberId>,
}

/// Metadata of an uploaded proof file.
///
/// Content storage is someone else's job; this is only what the review queue
/// and the feed display.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileMeta {
    pub name: String,
    pub size_bytes: u64,
}

/// A member's proof-of-completion artifact for one task.
///
/// Created once per attempt. Its status is set exactly once after creation;
/// a rejected attempt leaves room for the task to accept a fresh submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub id: SubmissionId,
    pub task: TaskId,
    pub project: ProjectId,
    pub submitted_by: MemberId,
    pub file: FileMeta,
    pub notes: Option<String>,
    pub status: SubmissionStatus,
    pub created_at_utc: i64,
}

/// Payload for recording a submission; the store allocates id, status and timestamp.
#[derive(Debug, Clone)]
pub struct NewSubmission {
    pub task: TaskId,
    pub project: ProjectId,
    pub submitted_by: MemberId,
    pub file: FileMeta,
    pub notes: Option<String>,
}
