//! Workspace file discovery and naming.
//!
//! Each team lives in its own JSON file named `<team>_team.json` under the
//! data directory. Commands that are not told which team to use fall back to
//! the most recently modified file.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, StoreError};
use crate::store::Workspace;

/// A team workspace file on disk.
#[derive(Debug, Clone)]
pub struct Team {
    pub name: String,
    pub display_name: String,
    pub file_path: PathBuf,
}

impl Team {
    pub fn new(display_name: &str, dir: &Path) -> Team {
        let name = sanitize_team_name(display_name);
        let file_path = dir.join(format!("{name}_team.json"));
        Team {
            name,
            display_name: display_name.to_string(),
            file_path,
        }
    }

    /// Recognize a workspace file by its `_team` stem suffix.
    pub fn from_file(file_path: PathBuf) -> Option<Team> {
        let stem = file_path.file_stem()?.to_str()?;
        let name = stem.strip_suffix("_team")?;
        if name.is_empty() {
            return None;
        }
        Some(Team {
            name: name.to_string(),
            display_name: name.replace('_', " "),
            file_path,
        })
    }
}

/// Side file holding a workspace's in-progress task plan.
pub fn plan_path(workspace: &Path) -> PathBuf {
    workspace.with_extension("plan.json")
}

/// Side file holding a workspace's urgency tier policy override.
pub fn policy_path(workspace: &Path) -> PathBuf {
    workspace.with_extension("policy.json")
}

/// Lowercase a display name and squash anything non-alphanumeric to `_`.
pub fn sanitize_team_name(display_name: &str) -> String {
    display_name
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect::<String>()
        .split('_')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

/// All workspace files under `dir`, sorted by display name.
pub fn discover_teams(dir: &Path) -> Result<Vec<Team>, StoreError> {
    let mut teams = Vec::new();
    if !dir.exists() {
        return Ok(teams);
    }
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() {
            if let Some(team) = Team::from_file(path) {
                teams.push(team);
            }
        }
    }
    teams.sort_by(|a, b| a.display_name.cmp(&b.display_name));
    Ok(teams)
}

/// Create a workspace file for a new team; the name must be unused.
pub fn create_team(display_name: &str, dir: &Path) -> Result<Team, Error> {
    if sanitize_team_name(display_name).is_empty() {
        return Err(Error::Usage("team name must not be empty".into()));
    }
    let team = Team::new(display_name, dir);
    if team.file_path.exists() {
        return Err(Error::Usage(format!(
            "team '{display_name}' already exists"
        )));
    }
    Workspace::default().save(&team.file_path)?;
    Ok(team)
}

/// The workspace file touched most recently, if any exist.
pub fn most_recent_team(dir: &Path) -> Result<Option<Team>, StoreError> {
    let mut latest: Option<(Team, std::time::SystemTime)> = None;
    for team in discover_teams(dir)? {
        let modified = match fs::metadata(&team.file_path).and_then(|m| m.modified()) {
            Ok(t) => t,
            Err(_) => continue,
        };
        let newer = match &latest {
            None => true,
            Some((_, current)) => modified > *current,
        };
        if newer {
            latest = Some((team, modified));
        }
    }
    Ok(latest.map(|(team, _)| team))
}
