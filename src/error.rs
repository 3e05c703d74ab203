//! Error types for the task workflow engine.
//!
//! Validation and transition problems are caught locally, before any store
//! call is issued, so no partial side effect can exist for those classes.
//! Store failures are carried verbatim with no retry; whether to try again
//! is the caller's call, not the engine's.

use thiserror::Error;

use crate::access::Capability;
use crate::draft::{DraftId, DraftIssue};
use crate::fields::{format_submission_status, SubmissionStatus};
use crate::task::{MemberId, ProjectId, SubmissionId, TaskId};

/// Errors reported by a persistence collaborator.
///
/// The file-backed workspace speaks in I/O and JSON terms; a remote binding
/// would use `Backend` for whatever its transport reports.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("workspace I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("workspace file is not valid JSON: {0}")]
    Data(#[from] serde_json::Error),
    /// The collaborator refused or could not apply an operation.
    #[error("store rejected the operation: {0}")]
    Backend(String),
}

/// Everything an engine operation can fail with.
#[derive(Debug, Error)]
pub enum Error {
    /// One or more drafts failed field validation.
    #[error("plan has invalid drafts: {}", list_issues(.0))]
    Validation(Vec<DraftIssue>),

    /// Commit was attempted while at least one draft had no assignee.
    #[error("every draft must be assigned before commit; unassigned: {}", list_ids(.0))]
    IncompleteAssignment(Vec<DraftId>),

    /// A plan operation referenced a local id that is not in the list.
    #[error("no draft {0} in the current plan")]
    UnknownDraft(DraftId),

    /// An operation referenced an entity that does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// A review transition was attempted on a submission no longer under review.
    #[error("submission {submission} is already {}", status_label(.status))]
    InvalidTransition {
        submission: SubmissionId,
        status: SubmissionStatus,
    },

    /// A new submission was refused: the task is finished, or an earlier
    /// attempt is still under review.
    #[error("task {0} is not open for submission")]
    NotOpenForSubmission(TaskId),

    /// A submission was attempted by someone other than the task's assignee.
    #[error("task {0} is assigned to somebody else")]
    NotAssignee(TaskId),

    /// The caller's role does not include the required capability.
    #[error("your role may not {0}")]
    Forbidden(Capability),

    /// Role resolution for a user with no membership row in the project.
    #[error("user {user} is not a member of project {project}")]
    NotAMember { user: MemberId, project: ProjectId },

    /// The persistence collaborator reported a failure; surfaced verbatim.
    #[error("store failure: {0}")]
    Collaborator(#[from] StoreError),

    /// Command-line usage problem outside the engine's taxonomy.
    #[error("{0}")]
    Usage(String),
}

fn list_issues(issues: &[DraftIssue]) -> String {
    issues
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

fn list_ids(ids: &[DraftId]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn status_label(status: &SubmissionStatus) -> &'static str {
    format_submission_status(*status)
}
