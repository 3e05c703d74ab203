//! # tt - Team task assignment and review CLI
//!
//! A small collaboration tool for teams that plan work as drafts, assign it,
//! and check what assignees hand back.
//!
//! ## Key Features
//!
//! - **Draft Plans**: edit an ordered working copy of a project's task list
//!   offline, then commit it as one batch of creates, updates and deletes
//! - **Submission Review**: assignees hand in proof of work; an admin settles
//!   each submission exactly once, finishing or reopening the task
//! - **Assignment Feed**: a per-member inbox that ranks open assignments by
//!   deadline urgency, with configurable tiers
//! - **Project Roles**: admins run the project; members see and work only
//!   their own assignments
//! - **Local File Storage**: each team is one JSON file, portable and
//!   diff-friendly
//!
//! ## Quick Start
//!
//! ```bash
//! # Create a team and its first member
//! tt init acme --admin Ana
//!
//! # Create a project (the acting user becomes its admin)
//! tt -u ana project add Orbit
//!
//! # Grow the roster
//! tt member add Ben
//! tt -u ana member invite ben
//!
//! # Plan work and hand it out
//! tt -u ana plan start --empty
//! tt -u ana plan add "Ship the report" --deadline "in 3d" --assignee ben
//! tt -u ana plan commit
//!
//! # Work it
//! tt -u ben inbox
//! tt -u ben submit 1 --file report.pdf
//! tt -u ana review approve 1
//! ```
//!
//! Data is stored locally in `~/.tt/` with each team as a separate JSON file.
//! Pass `--db <file>` to use a workspace file somewhere else, `--team` to pick
//! a team by name; with neither, the most recently touched team is used.

use std::path::{Path, PathBuf};

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

pub mod access;
pub mod cli;
pub mod cmd;
pub mod discover;
pub mod draft;
pub mod error;
pub mod fields;
pub mod member;
pub mod notify;
pub mod review;
pub mod session;
pub mod store;
pub mod task;

use cli::Cli;
use cmd::*;
use discover::{most_recent_team, Team};
use error::{Error, StoreError};
use review::Verdict;
use store::Workspace;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(Cli::parse()) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Error> {
    let Cli {
        db,
        team,
        user,
        project,
        command,
    } = cli;

    // Completions never touch the data directory.
    if let Commands::Completions { shell } = &command {
        cmd_completions(*shell);
        return Ok(());
    }

    let data_dir = match db.as_ref() {
        Some(path) => path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf(),
        None => {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            let dir = PathBuf::from(home).join(".tt");
            std::fs::create_dir_all(&dir).map_err(StoreError::from)?;
            dir
        }
    };

    // Commands that operate on the data directory, not one workspace.
    match &command {
        Commands::Init { name, admin } => return cmd_init(&data_dir, name, admin),
        Commands::Teams => return cmd_teams(&data_dir),
        _ => {}
    }

    let ws_path = workspace_path(db, team.as_deref(), &data_dir)?;
    let mut ws = Workspace::load(&ws_path)?;
    let user = user.as_deref();
    let project = project.as_deref();

    match command {
        Commands::Init { .. } | Commands::Teams | Commands::Completions { .. } => {
            unreachable!("handled above")
        }

        Commands::Project { action } => match action {
            ProjectAction::Add { name } => cmd_project_add(&mut ws, &ws_path, user, name),
            ProjectAction::List => cmd_project_list(&ws),
        },

        Commands::Member { action } => match action {
            MemberAction::Add { name } => cmd_member_add(&mut ws, &ws_path, name),
            MemberAction::Invite { member, role } => {
                let session = resolve_session(&ws, user, project)?;
                cmd_member_invite(&mut ws, &ws_path, &session, &member, role)
            }
            MemberAction::List => {
                let session = resolve_session(&ws, user, project)?;
                cmd_member_list(&ws, &session)
            }
        },

        Commands::Plan { action } => {
            let session = resolve_session(&ws, user, project)?;
            match action {
                PlanAction::Start { empty } => cmd_plan_start(&ws, &ws_path, &session, empty),

                PlanAction::Add {
                    title,
                    desc,
                    deadline,
                    assignee,
                } => cmd_plan_add(&ws, &ws_path, &session, title, desc, deadline, assignee),

                PlanAction::Edit {
                    id,
                    title,
                    desc,
                    deadline,
                    assignee,
                    clear_deadline,
                    clear_assignee,
                } => cmd_plan_edit(
                    &ws,
                    &ws_path,
                    &session,
                    id,
                    title,
                    desc,
                    deadline,
                    assignee,
                    clear_deadline,
                    clear_assignee,
                ),

                PlanAction::Rm { id } => cmd_plan_rm(&ws_path, &session, id),

                PlanAction::Move { id, index } => cmd_plan_move(&ws_path, &session, id, index),

                PlanAction::Assign { id, member } => {
                    cmd_plan_assign(&ws, &ws_path, &session, id, &member)
                }

                PlanAction::Show => cmd_plan_show(&ws, &ws_path, &session),

                PlanAction::Commit => cmd_plan_commit(&mut ws, &ws_path, &session),

                PlanAction::Discard => cmd_plan_discard(&ws_path, &session),
            }
        }

        Commands::Task { action } => {
            let session = resolve_session(&ws, user, project)?;
            match action {
                TaskAction::List {
                    all,
                    status,
                    assignee,
                    due,
                    sort,
                    limit,
                } => cmd_task_list(&ws, &session, all, status, assignee, due, sort, limit),

                TaskAction::View { id } => cmd_task_view(&ws, &session, id),
            }
        }

        Commands::Submit { task, file, notes } => {
            let session = resolve_session(&ws, user, project)?;
            cmd_submit(&mut ws, &ws_path, &session, task, &file, notes)
        }

        Commands::Review { action } => {
            let session = resolve_session(&ws, user, project)?;
            match action {
                ReviewAction::List => cmd_review_list(&ws, &session),

                ReviewAction::Approve { submission } => {
                    cmd_review_decide(&mut ws, &ws_path, &session, submission, Verdict::Approve)
                }

                ReviewAction::Reject { submission } => {
                    cmd_review_decide(&mut ws, &ws_path, &session, submission, Verdict::Reject)
                }
            }
        }

        Commands::Inbox => {
            let session = resolve_session(&ws, user, project)?;
            cmd_inbox(&ws, &ws_path, &session)
        }
    }
}

/// Pick the workspace file: --db wins, then --team, then the team whose file
/// was touched most recently.
fn workspace_path(
    db: Option<PathBuf>,
    team: Option<&str>,
    data_dir: &Path,
) -> Result<PathBuf, Error> {
    if let Some(path) = db {
        return Ok(path);
    }
    if let Some(team) = team {
        let team = Team::new(team, data_dir);
        if !team.file_path.exists() {
            return Err(Error::NotFound(format!("team '{}'", team.display_name)));
        }
        return Ok(team.file_path);
    }
    match most_recent_team(data_dir)? {
        Some(team) => {
            info!(team = %team.display_name, "using most recent team");
            Ok(team.file_path)
        }
        None => Err(Error::Usage(
            "no teams yet; run 'tt init <name> --admin <you>'".into(),
        )),
    }
}
