//! Command implementations for the CLI interface.
//!
//! This module contains the subcommand definitions and their handlers, from
//! workspace bootstrap through plan editing, submission and review. Handlers
//! return `Result` and leave printing the failure to `main`.

use std::fs;
use std::path::Path;

use chrono::{Datelike, Duration, Local, NaiveDate, Utc};
use clap::Subcommand;
use clap_complete::{generate, Shell};
use crossterm::style::Stylize;
use tracing::info;

use crate::access::{require, Capability};
use crate::discover::{self, discover_teams};
use crate::draft::{self, CommitOutcome, DraftId, DraftPatch, Plan};
use crate::error::{Error, StoreError};
use crate::fields::{
    format_role, format_submission_status, format_task_status, DueFilter, Role, SortKey,
    SubmissionStatus, TaskStatus,
};
use crate::member::Member;
use crate::notify::{self, format_tier, tier_color, NotifyPolicy, Tier};
use crate::review::{self, Verdict};
use crate::session::Session;
use crate::store::{IdentityStore, SubmissionStore, TaskStore, Workspace};
use crate::task::{FileMeta, MemberId, PersistedTask, ProjectId, SubmissionId, TaskId};

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new team workspace with its founding member.
    Init {
        /// Team name.
        name: String,
        /// Founding member's display name.
        #[arg(long)]
        admin: String,
    },

    /// List team workspaces in the data directory.
    Teams,

    /// Manage projects in the workspace.
    Project {
        #[command(subcommand)]
        action: ProjectAction,
    },

    /// Manage the roster and project roles.
    Member {
        #[command(subcommand)]
        action: MemberAction,
    },

    /// Edit and commit the task plan for a project.
    Plan {
        #[command(subcommand)]
        action: PlanAction,
    },

    /// List or inspect tasks.
    Task {
        #[command(subcommand)]
        action: TaskAction,
    },

    /// Hand in proof of work for a task assigned to you.
    Submit {
        /// Task id.
        task: TaskId,
        /// Path of the artifact; its name and size are recorded.
        #[arg(long)]
        file: String,
        /// Note for the reviewer.
        #[arg(long)]
        notes: Option<String>,
    },

    /// Review submissions.
    Review {
        #[command(subcommand)]
        action: ReviewAction,
    },

    /// Show your assignment feed with deadline urgency.
    Inbox,

    /// Generate shell completion scripts.
    Completions {
        /// Shell to generate completions for.
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum ProjectAction {
    /// Create a project; the acting user becomes its admin.
    Add {
        /// Project name.
        name: String,
    },
    /// List projects in the workspace.
    List,
}

#[derive(Subcommand)]
pub enum MemberAction {
    /// Add a person to the team roster.
    Add {
        /// Display name.
        name: String,
    },
    /// Give a roster member a role in the project.
    Invite {
        /// Member id or name.
        member: String,
        /// Role within the project.
        #[arg(long, value_enum, default_value_t = Role::Member)]
        role: Role,
    },
    /// List project members and their roles.
    List,
}

#[derive(Subcommand)]
pub enum PlanAction {
    /// Start a plan from the project's current tasks.
    Start {
        /// Start from an empty list instead.
        #[arg(long)]
        empty: bool,
    },
    /// Append a draft to the plan.
    Add {
        /// Draft title.
        title: String,
        /// Longer description.
        #[arg(long)]
        desc: Option<String>,
        /// Deadline: YYYY-MM-DD, "today", "tomorrow", or "in Nd".
        #[arg(long)]
        deadline: Option<String>,
        /// Assignee (member id or name).
        #[arg(long)]
        assignee: Option<String>,
    },
    /// Edit one draft's fields.
    Edit {
        /// Draft id: a task id like 42, or a fresh id like +3.
        id: DraftId,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        desc: Option<String>,
        /// Deadline: YYYY-MM-DD, "today", "tomorrow", or "in Nd".
        #[arg(long)]
        deadline: Option<String>,
        /// Assignee (member id or name).
        #[arg(long)]
        assignee: Option<String>,
        /// Remove the deadline.
        #[arg(long)]
        clear_deadline: bool,
        /// Remove the assignee.
        #[arg(long)]
        clear_assignee: bool,
    },
    /// Remove a draft from the plan.
    Rm {
        /// Draft id.
        id: DraftId,
    },
    /// Move a draft to a new position (0-based).
    Move {
        /// Draft id.
        id: DraftId,
        /// Target position.
        index: usize,
    },
    /// Assign a draft to a member.
    Assign {
        /// Draft id.
        id: DraftId,
        /// Member id or name.
        member: String,
    },
    /// Show the plan and the changes it would commit.
    Show,
    /// Validate the plan and apply it to the project.
    Commit,
    /// Throw the plan away.
    Discard,
}

#[derive(Subcommand)]
pub enum TaskAction {
    /// List the tasks you can see.
    List {
        /// Include finished tasks.
        #[arg(long)]
        all: bool,
        /// Filter by status.
        #[arg(long, value_enum)]
        status: Option<TaskStatus>,
        /// Filter by assignee (id or name).
        #[arg(long)]
        assignee: Option<String>,
        /// Due filter: today | this-week | overdue | none.
        #[arg(long, value_enum)]
        due: Option<DueFilter>,
        /// Sort key.
        #[arg(long, value_enum, default_value_t = SortKey::Deadline)]
        sort: SortKey,
        /// Limit number of rows printed.
        #[arg(long)]
        limit: Option<usize>,
    },
    /// View one task in detail.
    View {
        /// Task id.
        id: TaskId,
    },
}

#[derive(Subcommand)]
pub enum ReviewAction {
    /// List submissions waiting for review.
    List,
    /// Approve a submission; the task is finished.
    Approve {
        /// Submission id.
        submission: SubmissionId,
    },
    /// Reject a submission; the task reopens for a new attempt.
    Reject {
        /// Submission id.
        submission: SubmissionId,
    },
}

// ---- identifier and input resolution ----

/// Resolve a member given as an id or a (case-insensitive) display name.
pub fn resolve_member(ws: &Workspace, identifier: &str) -> Result<MemberId, Error> {
    if let Ok(id) = identifier.parse::<MemberId>() {
        if ws.members.iter().any(|m| m.id == id) {
            return Ok(id);
        }
        return Err(Error::NotFound(format!("user {id}")));
    }
    let matches: Vec<&Member> = ws
        .members
        .iter()
        .filter(|m| m.name.to_lowercase() == identifier.to_lowercase())
        .collect();
    match matches.len() {
        0 => Err(Error::NotFound(format!("user '{identifier}'"))),
        1 => Ok(matches[0].id),
        _ => Err(Error::Usage(format!(
            "multiple members are named '{identifier}'; use the id instead"
        ))),
    }
}

/// Resolve a project given as an id or a (case-insensitive) name.
pub fn resolve_project(ws: &Workspace, identifier: &str) -> Result<ProjectId, Error> {
    if let Ok(id) = identifier.parse::<ProjectId>() {
        if ws.projects.iter().any(|p| p.id == id) {
            return Ok(id);
        }
        return Err(Error::NotFound(format!("project {id}")));
    }
    let matches: Vec<ProjectId> = ws
        .projects
        .iter()
        .filter(|p| p.name.to_lowercase() == identifier.to_lowercase())
        .map(|p| p.id)
        .collect();
    match matches.len() {
        0 => Err(Error::NotFound(format!("project '{identifier}'"))),
        1 => Ok(matches[0]),
        _ => Err(Error::Usage(format!(
            "multiple projects are named '{identifier}'; use the id instead"
        ))),
    }
}

/// Build the acting session from the global --user/--project flags.
///
/// A missing --project is forgiven when the workspace has exactly one.
pub fn resolve_session(
    ws: &Workspace,
    user: Option<&str>,
    project: Option<&str>,
) -> Result<Session, Error> {
    let user = match user {
        Some(u) => resolve_member(ws, u)?,
        None => return Err(Error::Usage("pass --user to say who is acting".into())),
    };
    let project = match project {
        Some(p) => resolve_project(ws, p)?,
        None => match ws.projects.as_slice() {
            [only] => only.id,
            [] => {
                return Err(Error::Usage(
                    "no projects yet; run 'tt project add <name>'".into(),
                ))
            }
            _ => {
                return Err(Error::Usage(
                    "several projects exist; pass --project".into(),
                ))
            }
        },
    };
    Session::resolve(ws, user, project)
}

/// Parse a deadline: "today", "tomorrow", "in Nd", "in Nw", or YYYY-MM-DD.
pub fn parse_deadline_input(s: &str) -> Option<NaiveDate> {
    let s = s.trim().to_lowercase();
    let today = Local::now().date_naive();
    match s.as_str() {
        "today" => return Some(today),
        "tomorrow" => return Some(today + Duration::days(1)),
        _ => {}
    }
    if let Some(rest) = s.strip_prefix("in ") {
        if let Some(n) = rest.strip_suffix('d') {
            if let Ok(days) = n.trim().parse::<i64>() {
                return Some(today + Duration::days(days));
            }
        }
        if let Some(n) = rest.strip_suffix('w') {
            if let Ok(weeks) = n.trim().parse::<i64>() {
                return Some(today + Duration::weeks(weeks));
            }
        }
    }
    NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()
}

fn parse_deadline_arg(s: &str) -> Result<NaiveDate, Error> {
    parse_deadline_input(s)
        .ok_or_else(|| Error::Usage(format!("cannot parse deadline '{s}'")))
}

// ---- shared printing helpers ----

/// Truncate a string to a maximum width, adding ellipsis if needed.
fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= width {
            out.push('…');
            break;
        }
        out.push(ch);
    }
    out
}

fn due_label(deadline: Option<NaiveDate>, today: NaiveDate) -> String {
    match deadline {
        None => "-".into(),
        Some(d) => notify::format_countdown((d - today).num_days()),
    }
}

fn member_label(ws: &Workspace, id: Option<MemberId>) -> String {
    id.and_then(|m| ws.members.iter().find(|u| u.id == m))
        .map(|m| m.name.clone())
        .unwrap_or_else(|| "-".into())
}

fn stamp_date(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|d| d.date_naive().to_string())
        .unwrap_or_else(|| "-".into())
}

/// Monday-to-Sunday bounds of the week containing `today`.
fn week_bounds(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let weekday = today.weekday().num_days_from_monday() as i64;
    let start = today - Duration::days(weekday);
    (start, start + Duration::days(6))
}

/// Restrict a task listing to what the session may see.
///
/// Admins see the whole project; members only their own assignments. Every
/// read path goes through here, so a task hidden from a member does not
/// exist for them, not even as an id.
fn visible_to(session: &Session, mut tasks: Vec<PersistedTask>) -> Vec<PersistedTask> {
    if session.role == Role::Member {
        tasks.retain(|t| t.assignee == Some(session.user));
    }
    tasks
}

fn print_task_table(ws: &Workspace, tasks: &[PersistedTask], today: NaiveDate) {
    println!(
        "{:<5} {:<12} {:<10} {:<10} {:<14} {}",
        "ID", "Status", "Due", "Submitted", "Assignee", "Title"
    );
    for t in tasks {
        println!(
            "{:<5} {:<12} {:<10} {:<10} {:<14} {}",
            t.id,
            format_task_status(t.status),
            due_label(t.deadline, today),
            if t.submitted { "yes" } else { "-" },
            truncate(&member_label(ws, t.assignee), 14),
            truncate(&t.title, 40)
        );
    }
}

// ---- plan side-file persistence ----

fn load_plan(ws_path: &Path, project: ProjectId) -> Result<Plan, Error> {
    let path = discover::plan_path(ws_path);
    if !path.exists() {
        return Err(Error::Usage(
            "no plan in progress; run 'tt plan start'".into(),
        ));
    }
    let raw = fs::read_to_string(&path).map_err(StoreError::from)?;
    let plan: Plan = serde_json::from_str(&raw).map_err(StoreError::from)?;
    if plan.project != project {
        return Err(Error::Usage(format!(
            "the current plan belongs to project {}; pass --project {} or discard it",
            plan.project, plan.project
        )));
    }
    Ok(plan)
}

fn save_plan(ws_path: &Path, plan: &Plan) -> Result<(), Error> {
    let path = discover::plan_path(ws_path);
    let tmp = path.with_extension("tmp");
    let data = serde_json::to_string_pretty(plan).map_err(StoreError::from)?;
    fs::write(&tmp, data).map_err(StoreError::from)?;
    fs::rename(&tmp, &path).map_err(StoreError::from)?;
    Ok(())
}

// ---- workspace and roster commands ----

/// Create a team workspace file and its founding member.
pub fn cmd_init(dir: &Path, name: &str, admin: &str) -> Result<(), Error> {
    let team = discover::create_team(name, dir)?;
    let mut ws = Workspace::load(&team.file_path)?;
    let id = ws.add_member(admin.to_string(), Utc::now().timestamp());
    ws.save(&team.file_path)?;
    info!(team = %team.name, "created workspace");
    println!("Created team '{}' with member '{admin}' (id {id}).", team.display_name);
    println!("Workspace file: {}", team.file_path.display());
    Ok(())
}

/// List workspace files in the data directory.
pub fn cmd_teams(dir: &Path) -> Result<(), Error> {
    let teams = discover_teams(dir)?;
    if teams.is_empty() {
        println!("No teams yet. Run 'tt init <name> --admin <you>'.");
        return Ok(());
    }
    println!("{:<20} File", "Team");
    for t in teams {
        println!("{:<20} {}", truncate(&t.display_name, 20), t.file_path.display());
    }
    Ok(())
}

/// Create a project; the acting user gets its admin membership.
pub fn cmd_project_add(
    ws: &mut Workspace,
    ws_path: &Path,
    user: Option<&str>,
    name: String,
) -> Result<(), Error> {
    let user = match user {
        Some(u) => resolve_member(ws, u)?,
        None => return Err(Error::Usage("pass --user to say who is acting".into())),
    };
    let id = ws.add_project(name.clone(), Utc::now().timestamp());
    ws.add_membership(user, id, Role::Admin);
    ws.save(ws_path)?;
    info!(project = id, "created project");
    println!(
        "Created project '{name}' (id {id}); {} is its admin.",
        member_label(ws, Some(user))
    );
    Ok(())
}

pub fn cmd_project_list(ws: &Workspace) -> Result<(), Error> {
    if ws.projects.is_empty() {
        println!("No projects yet. Run 'tt project add <name>'.");
        return Ok(());
    }
    println!("{:<5} {:<24} {:<8} Members", "ID", "Name", "Tasks");
    for p in &ws.projects {
        let tasks = ws.tasks.iter().filter(|t| t.project == p.id).count();
        let members = ws.memberships.iter().filter(|m| m.project == p.id).count();
        println!("{:<5} {:<24} {:<8} {}", p.id, truncate(&p.name, 24), tasks, members);
    }
    Ok(())
}

/// Add a person to the roster. Roles are granted per project via invite.
pub fn cmd_member_add(ws: &mut Workspace, ws_path: &Path, name: String) -> Result<(), Error> {
    let id = ws.add_member(name.clone(), Utc::now().timestamp());
    ws.save(ws_path)?;
    println!("Added '{name}' to the roster (id {id}).");
    Ok(())
}

/// Give a roster member a role in the session's project.
pub fn cmd_member_invite(
    ws: &mut Workspace,
    ws_path: &Path,
    session: &Session,
    member: &str,
    role: Role,
) -> Result<(), Error> {
    require(session.role, Capability::ManageMembers)?;
    let member = resolve_member(ws, member)?;
    if !ws.add_membership(member, session.project, role) {
        return Err(Error::Usage(format!(
            "{} is already a member of this project",
            member_label(ws, Some(member))
        )));
    }
    ws.save(ws_path)?;
    println!(
        "{} joined the project as {}.",
        member_label(ws, Some(member)),
        format_role(role)
    );
    Ok(())
}

pub fn cmd_member_list(ws: &Workspace, session: &Session) -> Result<(), Error> {
    require(session.role, Capability::ListTasks)?;
    let members = ws.members_of(session.project)?;
    println!("{:<5} {:<8} {:<20} Joined", "ID", "Role", "Name");
    for m in members {
        let role = ws
            .role_in(m.id, session.project)?
            .map(format_role)
            .unwrap_or("-");
        println!(
            "{:<5} {:<8} {:<20} {}",
            m.id,
            role,
            truncate(&m.name, 20),
            stamp_date(m.joined_at_utc)
        );
    }
    Ok(())
}

// ---- plan commands ----

pub fn cmd_plan_start(
    ws: &Workspace,
    ws_path: &Path,
    session: &Session,
    empty: bool,
) -> Result<(), Error> {
    require(session.role, Capability::EditTasks)?;
    if discover::plan_path(ws_path).exists() {
        return Err(Error::Usage(
            "a plan is already in progress; commit or discard it first".into(),
        ));
    }
    let plan = if empty {
        Plan::new(session.project)
    } else {
        Plan::from_snapshot(session.project, &ws.list_by_project(session.project)?)
    };
    let count = plan.drafts.len();
    save_plan(ws_path, &plan)?;
    println!("Started a plan with {count} draft(s).");
    Ok(())
}

pub fn cmd_plan_add(
    ws: &Workspace,
    ws_path: &Path,
    session: &Session,
    title: String,
    desc: Option<String>,
    deadline: Option<String>,
    assignee: Option<String>,
) -> Result<(), Error> {
    require(session.role, Capability::EditTasks)?;
    let mut plan = load_plan(ws_path, session.project)?;
    let deadline = match deadline {
        Some(s) => Some(parse_deadline_arg(&s)?),
        None => None,
    };
    let assignee = match assignee {
        Some(a) => Some(resolve_member(ws, &a)?),
        None => None,
    };
    let id = plan.insert(title, desc.unwrap_or_default(), deadline, assignee);
    save_plan(ws_path, &plan)?;
    println!("Added draft {id}.");
    Ok(())
}

pub fn cmd_plan_edit(
    ws: &Workspace,
    ws_path: &Path,
    session: &Session,
    id: DraftId,
    title: Option<String>,
    desc: Option<String>,
    deadline: Option<String>,
    assignee: Option<String>,
    clear_deadline: bool,
    clear_assignee: bool,
) -> Result<(), Error> {
    require(session.role, Capability::EditTasks)?;
    if deadline.is_some() && clear_deadline {
        return Err(Error::Usage(
            "--deadline and --clear-deadline are mutually exclusive".into(),
        ));
    }
    if assignee.is_some() && clear_assignee {
        return Err(Error::Usage(
            "--assignee and --clear-assignee are mutually exclusive".into(),
        ));
    }
    let mut plan = load_plan(ws_path, session.project)?;
    let deadline = if clear_deadline {
        Some(None)
    } else {
        match deadline {
            Some(s) => Some(Some(parse_deadline_arg(&s)?)),
            None => None,
        }
    };
    let assignee = if clear_assignee {
        Some(None)
    } else {
        match assignee {
            Some(a) => Some(Some(resolve_member(ws, &a)?)),
            None => None,
        }
    };
    plan.update(
        id,
        DraftPatch {
            title,
            description: desc,
            deadline,
            assignee,
        },
    )?;
    let title = plan.get(id).map(|d| d.title.clone()).unwrap_or_default();
    save_plan(ws_path, &plan)?;
    println!("Updated draft {id} ('{title}').");
    Ok(())
}

pub fn cmd_plan_rm(ws_path: &Path, session: &Session, id: DraftId) -> Result<(), Error> {
    require(session.role, Capability::EditTasks)?;
    let mut plan = load_plan(ws_path, session.project)?;
    let removed = plan.remove(id)?;
    save_plan(ws_path, &plan)?;
    println!("Removed draft {id} ('{}').", removed.title);
    Ok(())
}

pub fn cmd_plan_move(
    ws_path: &Path,
    session: &Session,
    id: DraftId,
    index: usize,
) -> Result<(), Error> {
    require(session.role, Capability::EditTasks)?;
    let mut plan = load_plan(ws_path, session.project)?;
    plan.reorder(id, index)?;
    save_plan(ws_path, &plan)?;
    println!("Moved draft {id} to position {index}.");
    Ok(())
}

pub fn cmd_plan_assign(
    ws: &Workspace,
    ws_path: &Path,
    session: &Session,
    id: DraftId,
    member: &str,
) -> Result<(), Error> {
    require(session.role, Capability::EditTasks)?;
    let member = resolve_member(ws, member)?;
    let mut plan = load_plan(ws_path, session.project)?;
    plan.assign(id, member)?;
    save_plan(ws_path, &plan)?;
    println!("Assigned draft {id} to {}.", member_label(ws, Some(member)));
    Ok(())
}

pub fn cmd_plan_show(ws: &Workspace, ws_path: &Path, session: &Session) -> Result<(), Error> {
    require(session.role, Capability::EditTasks)?;
    let plan = load_plan(ws_path, session.project)?;
    let today = Local::now().date_naive();
    println!("{:<6} {:<10} {:<14} Title", "ID", "Due", "Assignee");
    for d in &plan.drafts {
        println!(
            "{:<6} {:<10} {:<14} {}",
            d.id.to_string(),
            due_label(d.deadline, today),
            truncate(&member_label(ws, d.assignee), 14),
            truncate(&d.title, 40)
        );
    }
    let snapshot = ws.list_by_project(session.project)?;
    let diff = draft::diff(&plan.drafts, &snapshot);
    println!(
        "\nPending: {} to create, {} to update, {} to delete.",
        diff.to_create.len(),
        diff.to_update.len(),
        diff.to_delete.len()
    );
    let issues = plan.validate(today);
    for issue in &issues {
        println!("  ! {issue}");
    }
    let unassigned = plan.drafts.iter().filter(|d| d.assignee.is_none()).count();
    if unassigned > 0 {
        println!("  ! {unassigned} draft(s) still unassigned; commit will refuse them.");
    }
    Ok(())
}

pub fn cmd_plan_commit(
    ws: &mut Workspace,
    ws_path: &Path,
    session: &Session,
) -> Result<(), Error> {
    require(session.role, Capability::CreateTasks)?;
    require(session.role, Capability::EditTasks)?;
    require(session.role, Capability::DeleteTasks)?;
    let plan = load_plan(ws_path, session.project)?;
    let snapshot = ws.list_by_project(session.project)?;
    let today = Local::now().date_naive();
    let outcome = draft::commit(&plan, &snapshot, ws, session.user, today)?;
    match outcome {
        CommitOutcome::NoChanges => {
            println!("Nothing to commit; the plan matches the project.");
        }
        CommitOutcome::Applied {
            created,
            updated,
            deleted,
        } => {
            ws.save(ws_path)?;
            info!(
                project = session.project,
                created = created.len(),
                updated,
                deleted,
                "plan committed"
            );
            let ids: Vec<String> = created.iter().map(|id| id.to_string()).collect();
            if ids.is_empty() {
                println!("Committed: updated {updated}, deleted {deleted}.");
            } else {
                println!(
                    "Committed: created {} (id {}), updated {updated}, deleted {deleted}.",
                    ids.len(),
                    ids.join(", ")
                );
            }
        }
    }
    fs::remove_file(discover::plan_path(ws_path)).ok();
    Ok(())
}

pub fn cmd_plan_discard(ws_path: &Path, session: &Session) -> Result<(), Error> {
    require(session.role, Capability::EditTasks)?;
    let path = discover::plan_path(ws_path);
    if path.exists() {
        fs::remove_file(&path).map_err(StoreError::from)?;
        println!("Plan discarded.");
    } else {
        println!("No plan in progress.");
    }
    Ok(())
}

// ---- task commands ----

pub fn cmd_task_list(
    ws: &Workspace,
    session: &Session,
    all: bool,
    status: Option<TaskStatus>,
    assignee: Option<String>,
    due: Option<DueFilter>,
    sort: SortKey,
    limit: Option<usize>,
) -> Result<(), Error> {
    require(session.role, Capability::ListTasks)?;
    let today = Local::now().date_naive();
    let mut tasks = visible_to(session, ws.list_by_project(session.project)?);
    if let Some(s) = status {
        tasks.retain(|t| t.status == s);
    } else if !all {
        tasks.retain(|t| t.status != TaskStatus::Finished);
    }
    if let Some(a) = assignee {
        let member = resolve_member(ws, &a)?;
        tasks.retain(|t| t.assignee == Some(member));
    }
    if let Some(f) = due {
        let (week_start, week_end) = week_bounds(today);
        tasks.retain(|t| match f {
            DueFilter::Today => t.deadline == Some(today),
            DueFilter::ThisWeek => t
                .deadline
                .map_or(false, |d| d >= week_start && d <= week_end),
            DueFilter::Overdue => {
                t.deadline.map_or(false, |d| d < today) && t.status != TaskStatus::Finished
            }
            DueFilter::None => t.deadline.is_none(),
        });
    }
    match sort {
        SortKey::Deadline => tasks.sort_by_key(|t| (t.deadline.is_none(), t.deadline)),
        SortKey::Status => tasks.sort_by_key(|t| (status_key(t.status), t.id)),
        SortKey::Id => tasks.sort_by_key(|t| t.id),
    }
    if let Some(n) = limit {
        tasks.truncate(n);
    }
    if tasks.is_empty() {
        println!("No tasks to show.");
        return Ok(());
    }
    print_task_table(ws, &tasks, today);
    Ok(())
}

fn status_key(s: TaskStatus) -> u8 {
    match s {
        TaskStatus::InProgress => 0,
        TaskStatus::Finished => 1,
    }
}

pub fn cmd_task_view(ws: &Workspace, session: &Session, id: TaskId) -> Result<(), Error> {
    require(session.role, Capability::ListTasks)?;
    let task = visible_to(session, ws.list_by_project(session.project)?)
        .into_iter()
        .find(|t| t.id == id)
        .ok_or_else(|| Error::NotFound(format!("task {id}")))?;
    let today = Local::now().date_naive();
    println!("Task {}: {}", task.id, task.title);
    println!("  Status:      {}", format_task_status(task.status));
    println!("  Description: {}", task.description);
    match task.deadline {
        Some(d) => println!("  Deadline:    {d} ({})", due_label(Some(d), today)),
        None => println!("  Deadline:    -"),
    }
    println!("  Assignee:    {}", member_label(ws, task.assignee));
    println!("  Created by:  {}", member_label(ws, Some(task.created_by)));
    println!("  Submitted:   {}", if task.submitted { "yes" } else { "no" });
    let subs: Vec<_> = ws
        .submissions_by_project(session.project)?
        .into_iter()
        .filter(|s| s.task == id)
        .collect();
    if !subs.is_empty() {
        println!("  Submissions:");
        for s in subs {
            println!(
                "    #{} {} by {} ({}, {} bytes) on {}",
                s.id,
                format_submission_status(s.status),
                member_label(ws, Some(s.submitted_by)),
                s.file.name,
                s.file.size_bytes,
                stamp_date(s.created_at_utc)
            );
        }
    }
    Ok(())
}

// ---- submission and review commands ----

pub fn cmd_submit(
    ws: &mut Workspace,
    ws_path: &Path,
    session: &Session,
    task: TaskId,
    file: &str,
    notes: Option<String>,
) -> Result<(), Error> {
    let meta = fs::metadata(file)
        .map_err(|e| Error::Usage(format!("cannot read '{file}': {e}")))?;
    let name = Path::new(file)
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| Error::Usage(format!("'{file}' has no file name")))?
        .to_string();
    let id = review::submit(
        ws,
        session,
        task,
        FileMeta {
            name,
            size_bytes: meta.len(),
        },
        notes,
    )?;
    ws.save(ws_path)?;
    println!("Submitted proof for task {task} (submission {id}); it is now under review.");
    Ok(())
}

pub fn cmd_review_list(ws: &Workspace, session: &Session) -> Result<(), Error> {
    require(session.role, Capability::ReviewSubmissions)?;
    let pending: Vec<_> = ws
        .submissions_by_project(session.project)?
        .into_iter()
        .filter(|s| s.status == SubmissionStatus::UnderReview)
        .collect();
    if pending.is_empty() {
        println!("No submissions waiting for review.");
        return Ok(());
    }
    println!("{:<5} {:<5} {:<14} {:<24} {:<10} Title", "ID", "Task", "By", "File", "Since");
    for s in pending {
        let title = ws
            .task(s.task)
            .map(|t| t.title.clone())
            .unwrap_or_else(|| "-".into());
        println!(
            "{:<5} {:<5} {:<14} {:<24} {:<10} {}",
            s.id,
            s.task,
            truncate(&member_label(ws, Some(s.submitted_by)), 14),
            truncate(&s.file.name, 24),
            stamp_date(s.created_at_utc),
            truncate(&title, 36)
        );
    }
    Ok(())
}

pub fn cmd_review_decide(
    ws: &mut Workspace,
    ws_path: &Path,
    session: &Session,
    submission: SubmissionId,
    verdict: Verdict,
) -> Result<(), Error> {
    require(session.role, Capability::ReviewSubmissions)?;
    let task = review::decide(ws, submission, verdict)?;
    ws.save(ws_path)?;
    info!(submission, task, ?verdict, "review settled");
    match verdict {
        Verdict::Approve => {
            println!("Approved submission {submission}; task {task} is finished.")
        }
        Verdict::Reject => {
            println!("Rejected submission {submission}; task {task} is open for a new attempt.")
        }
    }
    Ok(())
}

// ---- feed ----

pub fn cmd_inbox(ws: &Workspace, ws_path: &Path, session: &Session) -> Result<(), Error> {
    require(session.role, Capability::ListTasks)?;
    let today = Local::now().date_naive();
    let policy = NotifyPolicy::load(&discover::policy_path(ws_path))?;
    let mut records = ws.list_by_project(session.project)?;
    records.retain(|t| t.assignee == Some(session.user) && t.status == TaskStatus::InProgress);
    let mut views = notify::synthesize(ws, &records, &policy, today)?;
    if views.is_empty() {
        println!("Inbox empty.");
        return Ok(());
    }
    views.sort_by_key(|v| match &v.urgency {
        Some(u) => (0u8, u.tier, u.days_left),
        None => (1, Tier::Upcoming, i64::MAX),
    });
    for v in views {
        match &v.urgency {
            Some(u) => {
                let tag = format!("[{}]", format_tier(u.tier)).with(tier_color(u.tier));
                println!("{tag} {}", v.title);
                println!("    {} ({}, {})", v.message, u.countdown, v.project_name);
            }
            None => {
                println!("{}", v.title);
                println!("    {} ({})", v.message, v.project_name);
            }
        }
    }
    Ok(())
}

// ---- completions ----

pub fn cmd_completions(shell: Shell) {
    use clap::CommandFactory;

    use crate::cli::Cli;

    let mut app = Cli::command();
    let app_name = app.get_name().to_string();
    generate(shell, &mut app, app_name, &mut std::io::stdout());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::NewTask;

    fn roster() -> Workspace {
        let mut ws = Workspace::default();
        ws.add_member("Ana".into(), 0);
        ws.add_member("Ben".into(), 0);
        ws.add_member("ben".into(), 0);
        ws
    }

    fn assigned(id: TaskId, assignee: Option<MemberId>) -> PersistedTask {
        PersistedTask {
            id,
            title: format!("task {id}"),
            description: "d".into(),
            deadline: None,
            assignee,
            project: 1,
            created_by: 1,
            status: TaskStatus::InProgress,
            submitted: false,
            created_at_utc: 0,
            updated_at_utc: 0,
        }
    }

    #[test]
    fn member_resolution_accepts_id_or_unique_name() {
        let ws = roster();
        assert_eq!(resolve_member(&ws, "1").unwrap(), 1);
        assert_eq!(resolve_member(&ws, "ana").unwrap(), 1);
        assert!(matches!(
            resolve_member(&ws, "9").unwrap_err(),
            Error::NotFound(_)
        ));
        assert!(matches!(
            resolve_member(&ws, "Carol").unwrap_err(),
            Error::NotFound(_)
        ));
        // "Ben" and "ben" collide case-insensitively.
        assert!(matches!(
            resolve_member(&ws, "BEN").unwrap_err(),
            Error::Usage(_)
        ));
    }

    #[test]
    fn deadline_input_accepts_relative_forms() {
        let today = Local::now().date_naive();
        assert_eq!(parse_deadline_input("today"), Some(today));
        assert_eq!(parse_deadline_input("Tomorrow"), Some(today + Duration::days(1)));
        assert_eq!(parse_deadline_input("in 3d"), Some(today + Duration::days(3)));
        assert_eq!(parse_deadline_input("in 2w"), Some(today + Duration::weeks(2)));
        assert_eq!(
            parse_deadline_input("2026-09-01"),
            NaiveDate::from_ymd_opt(2026, 9, 1)
        );
        assert_eq!(parse_deadline_input("whenever"), None);
    }

    #[test]
    fn week_bounds_are_monday_to_sunday() {
        // 2026-03-11 is a Wednesday.
        let wed = NaiveDate::from_ymd_opt(2026, 3, 11).unwrap();
        let (start, end) = week_bounds(wed);
        assert_eq!(start, NaiveDate::from_ymd_opt(2026, 3, 9).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2026, 3, 15).unwrap());
    }

    #[test]
    fn truncate_is_char_aware() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a very long title", 7), "a very…");
    }

    #[test]
    fn listing_scope_follows_role() {
        let tasks = vec![assigned(1, Some(1)), assigned(2, Some(2)), assigned(3, None)];
        let admin = Session {
            user: 1,
            project: 1,
            role: Role::Admin,
        };
        let member = Session {
            user: 2,
            project: 1,
            role: Role::Member,
        };
        assert_eq!(visible_to(&admin, tasks.clone()).len(), 3);
        let own = visible_to(&member, tasks);
        assert_eq!(own.len(), 1);
        assert_eq!(own[0].id, 2);
    }

    #[test]
    fn members_view_of_foreign_task_is_not_found() {
        let mut ws = roster();
        let project = ws.add_project("Orbit".into(), 0);
        ws.add_membership(1, project, Role::Admin);
        ws.add_membership(2, project, Role::Member);
        let ids = ws
            .insert_tasks(vec![NewTask {
                title: "quarterly numbers".into(),
                description: "d".into(),
                deadline: None,
                assignee: Some(1),
                project,
                created_by: 1,
            }])
            .unwrap();
        let member = Session {
            user: 2,
            project,
            role: Role::Member,
        };
        // The id exists, but for the member it must not.
        assert!(matches!(
            cmd_task_view(&ws, &member, ids[0]).unwrap_err(),
            Error::NotFound(_)
        ));
        let admin = Session {
            user: 1,
            project,
            role: Role::Admin,
        };
        assert!(cmd_task_view(&ws, &admin, ids[0]).is_ok());
    }
}
