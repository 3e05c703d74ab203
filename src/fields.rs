//! Enumerations and field types for the team task workflow.
//!
//! This module defines the structured data types used to classify tasks,
//! submissions and team members: task and submission statuses, member roles,
//! and the filter/sort options accepted by the listing commands.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Lifecycle status of a persisted task.
///
/// `Finished` is terminal: a finished task is never reopened, not even when a
/// later submission for it is rejected.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    InProgress,
    Finished,
}

/// Review status of a submission.
///
/// A submission starts under review and moves exactly once to approved or
/// rejected; neither outcome can be revisited.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum SubmissionStatus {
    UnderReview,
    Approved,
    Rejected,
}

/// Membership role within one project workspace.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    Admin,
    Member,
}

/// Available sorting options for task lists.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SortKey {
    Deadline,
    Status,
    Id,
}

/// Filtering options for tasks based on deadlines.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DueFilter {
    Today,
    ThisWeek,
    Overdue,
    None,
}

/// Format a task status for display.
pub fn format_task_status(s: TaskStatus) -> &'static str {
    match s {
        TaskStatus::InProgress => "InProgress",
        TaskStatus::Finished => "Finished",
    }
}

/// Format a submission status for display.
pub fn format_submission_status(s: SubmissionStatus) -> &'static str {
    match s {
        SubmissionStatus::UnderReview => "UnderReview",
        SubmissionStatus::Approved => "Approved",
        SubmissionStatus::Rejected => "Rejected",
    }
}

/// Format a member role for display.
pub fn format_role(r: Role) -> &'static str {
    match r {
        Role::Admin => "Admin",
        Role::Member => "Member",
    }
}
