//! Proof-of-work submissions and their one-shot review.
//!
//! A submission starts under review and is settled exactly once. Approval
//! finishes the task; rejection reopens it for another attempt. Both verdicts
//! ride a single named store action that applies the submission and task
//! mutations as one pair, so a dropped connection cannot leave one row
//! settled and the other not.

use tracing::debug;

use crate::error::Error;
use crate::fields::{SubmissionStatus, TaskStatus};
use crate::session::Session;
use crate::store::{ReviewActions, SubmissionStore, TaskStore};
use crate::task::{FileMeta, NewSubmission, SubmissionId, TaskId};

/// The two ways a review can settle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Approve,
    Reject,
}

/// Hand in proof of work for a task assigned to the caller.
///
/// The task must belong to the session's project, be assigned to the session
/// user, still be in progress, and have no submission currently under
/// review. On success the task is marked submitted alongside the new row.
pub fn submit<S>(
    store: &mut S,
    session: &Session,
    task: TaskId,
    file: FileMeta,
    notes: Option<String>,
) -> Result<SubmissionId, Error>
where
    S: TaskStore + SubmissionStore,
{
    let tasks = store.list_by_project(session.project)?;
    let task = tasks
        .into_iter()
        .find(|t| t.id == task)
        .ok_or_else(|| Error::NotFound(format!("task {task}")))?;
    if task.assignee != Some(session.user) {
        return Err(Error::NotAssignee(task.id));
    }
    if task.status == TaskStatus::Finished || task.submitted {
        return Err(Error::NotOpenForSubmission(task.id));
    }
    debug!(task = task.id, user = session.user, "submitting proof of work");
    let id = store.add_submission(NewSubmission {
        task: task.id,
        project: session.project,
        submitted_by: session.user,
        file,
        notes,
    })?;
    Ok(id)
}

/// Settle a submission that is under review.
///
/// The guard runs locally against the fetched row, so a submission already
/// settled is refused before any mutating call goes out. Returns the id of
/// the task the verdict acted on.
pub fn decide<S>(store: &mut S, submission: SubmissionId, verdict: Verdict) -> Result<TaskId, Error>
where
    S: SubmissionStore + ReviewActions,
{
    let sub = store
        .submission(submission)?
        .ok_or_else(|| Error::NotFound(format!("submission {submission}")))?;
    if sub.status != SubmissionStatus::UnderReview {
        return Err(Error::InvalidTransition {
            submission,
            status: sub.status,
        });
    }
    debug!(submission, task = sub.task, ?verdict, "settling review");
    match verdict {
        Verdict::Approve => store.approve_submission(sub.id, sub.task)?,
        Verdict::Reject => store.reject_submission(sub.id, sub.task)?,
    }
    Ok(sub.task)
}
