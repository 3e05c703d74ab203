//! Assignment feed synthesis and deadline urgency tiers.
//!
//! Feed entries are projections computed on read from tasks plus identity
//! lookups; nothing here is ever written back. Tier boundaries are policy,
//! not contract, and come from an ordered rule list that can be overridden
//! from a config file.

use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use crossterm::style::Color;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, StoreError};
use crate::fields::TaskStatus;
use crate::store::IdentityStore;
use crate::task::{MemberId, PersistedTask, TaskId};

/// Name shown when a task's creator has no member row anymore.
pub const FALLBACK_ADMIN: &str = "An admin";
/// Name shown when a task's project row is gone.
pub const FALLBACK_PROJECT: &str = "A project";

/// Deadline severity buckets, least severe last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Tier {
    Overdue,
    DueToday,
    DueSoon,
    Upcoming,
}

/// One classification rule: matches when days left is at most `max_days_left`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PolicyRule {
    pub max_days_left: i64,
    pub tier: Tier,
}

/// Ordered tier rules; the first match wins, `Upcoming` when none do.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotifyPolicy {
    #[serde(default = "default_rules")]
    pub rules: Vec<PolicyRule>,
}

fn default_rules() -> Vec<PolicyRule> {
    vec![
        PolicyRule {
            max_days_left: -1,
            tier: Tier::Overdue,
        },
        PolicyRule {
            max_days_left: 0,
            tier: Tier::DueToday,
        },
        PolicyRule {
            max_days_left: 3,
            tier: Tier::DueSoon,
        },
    ]
}

impl Default for NotifyPolicy {
    fn default() -> NotifyPolicy {
        NotifyPolicy {
            rules: default_rules(),
        }
    }
}

impl NotifyPolicy {
    /// Read the policy file, falling back to the defaults when it is absent.
    pub fn load(path: &Path) -> Result<NotifyPolicy, StoreError> {
        if !path.exists() {
            return Ok(NotifyPolicy::default());
        }
        let raw = fs::read_to_string(path)?;
        let policy: NotifyPolicy = serde_json::from_str(&raw)?;
        debug!(path = %path.display(), rules = policy.rules.len(), "loaded notify policy");
        Ok(policy)
    }

    pub fn classify(&self, days_left: i64) -> Tier {
        for rule in &self.rules {
            if days_left <= rule.max_days_left {
                return rule.tier;
            }
        }
        Tier::Upcoming
    }
}

/// Severity of one deadline relative to a reference date.
#[derive(Debug, Clone, PartialEq)]
pub struct Urgency {
    pub tier: Tier,
    pub days_left: i64,
    pub countdown: String,
}

/// Classify a deadline against `today` at day granularity.
pub fn urgency(deadline: NaiveDate, today: NaiveDate, policy: &NotifyPolicy) -> Urgency {
    let days_left = (deadline - today).num_days();
    Urgency {
        tier: policy.classify(days_left),
        days_left,
        countdown: format_countdown(days_left),
    }
}

/// Human countdown for a day delta.
pub fn format_countdown(days_left: i64) -> String {
    match days_left {
        d if d < 0 => format!("{}d late", -d),
        0 => "today".to_string(),
        1 => "tomorrow".to_string(),
        d => format!("in {d}d"),
    }
}

/// Display label for a tier.
pub fn format_tier(tier: Tier) -> &'static str {
    match tier {
        Tier::Overdue => "overdue",
        Tier::DueToday => "due today",
        Tier::DueSoon => "due soon",
        Tier::Upcoming => "upcoming",
    }
}

/// Terminal color used when printing a tier.
pub fn tier_color(tier: Tier) -> Color {
    match tier {
        Tier::Overdue => Color::Red,
        Tier::DueToday => Color::Yellow,
        Tier::DueSoon => Color::Cyan,
        Tier::Upcoming => Color::Green,
    }
}

/// One feed entry, ready to print.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationView {
    pub id: TaskId,
    pub title: String,
    pub message: String,
    pub description: String,
    pub project_name: String,
    pub admin_name: String,
    pub deadline: Option<NaiveDate>,
    pub status: TaskStatus,
    pub submitted: bool,
    pub assigned_to: MemberId,
    pub urgency: Option<Urgency>,
}

/// Compose feed entries for the given assignment records.
///
/// Missing identity rows degrade to the generic labels; an identity store
/// that *fails* aborts the whole synthesis instead, so an outage is never
/// dressed up as a deleted admin.
pub fn synthesize(
    store: &impl IdentityStore,
    tasks: &[PersistedTask],
    policy: &NotifyPolicy,
    today: NaiveDate,
) -> Result<Vec<NotificationView>, Error> {
    let mut views = Vec::with_capacity(tasks.len());
    for task in tasks {
        let assigned_to = match task.assignee {
            Some(member) => member,
            None => continue,
        };
        let admin_name = store
            .member_name(task.created_by)?
            .unwrap_or_else(|| FALLBACK_ADMIN.to_string());
        let project_name = store
            .project_name(task.project)?
            .unwrap_or_else(|| FALLBACK_PROJECT.to_string());
        views.push(NotificationView {
            id: task.id,
            title: format!("{admin_name} has assigned you to a new task"),
            message: task.title.clone(),
            description: task.description.clone(),
            project_name,
            admin_name,
            deadline: task.deadline,
            status: task.status,
            submitted: task.submitted,
            assigned_to,
            urgency: task.deadline.map(|d| urgency(d, today, policy)),
        });
    }
    Ok(views)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::Role;
    use crate::store::Workspace;
    use crate::task::ProjectId;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    fn record(created_by: MemberId, project: ProjectId, deadline: Option<NaiveDate>) -> PersistedTask {
        PersistedTask {
            id: 7,
            title: "Ship the report".into(),
            description: "All four quarters".into(),
            deadline,
            assignee: Some(2),
            project,
            created_by,
            status: TaskStatus::InProgress,
            submitted: false,
            created_at_utc: 0,
            updated_at_utc: 0,
        }
    }

    fn seeded() -> Workspace {
        let mut ws = Workspace::default();
        let admin = ws.add_member("Ana".into(), 100);
        let member = ws.add_member("Ben".into(), 110);
        let project = ws.add_project("Orbit".into(), 120);
        ws.add_membership(admin, project, Role::Admin);
        ws.add_membership(member, project, Role::Member);
        ws
    }

    #[test]
    fn countdown_reads_like_a_person_wrote_it() {
        assert_eq!(format_countdown(-2), "2d late");
        assert_eq!(format_countdown(0), "today");
        assert_eq!(format_countdown(1), "tomorrow");
        assert_eq!(format_countdown(3), "in 3d");
    }

    #[test]
    fn default_policy_boundaries() {
        let p = NotifyPolicy::default();
        assert_eq!(p.classify(-1), Tier::Overdue);
        assert_eq!(p.classify(0), Tier::DueToday);
        assert_eq!(p.classify(1), Tier::DueSoon);
        assert_eq!(p.classify(3), Tier::DueSoon);
        assert_eq!(p.classify(4), Tier::Upcoming);
    }

    #[test]
    fn custom_rules_override_the_defaults() {
        let p: NotifyPolicy =
            serde_json::from_str(r#"{"rules":[{"max_days_left":7,"tier":"due-soon"}]}"#).unwrap();
        assert_eq!(p.classify(-5), Tier::DueSoon);
        assert_eq!(p.classify(7), Tier::DueSoon);
        assert_eq!(p.classify(8), Tier::Upcoming);
    }

    #[test]
    fn policy_file_without_rules_falls_back_to_defaults() {
        let p: NotifyPolicy = serde_json::from_str("{}").unwrap();
        assert_eq!(p, NotifyPolicy::default());
    }

    #[test]
    fn synthesize_joins_names_and_urgency() {
        let ws = seeded();
        let views = synthesize(
            &ws,
            &[record(1, 1, Some(day(11)))],
            &NotifyPolicy::default(),
            day(10),
        )
        .unwrap();
        assert_eq!(views.len(), 1);
        let v = &views[0];
        assert_eq!(v.title, "Ana has assigned you to a new task");
        assert_eq!(v.message, "Ship the report");
        assert_eq!(v.project_name, "Orbit");
        let u = v.urgency.as_ref().unwrap();
        assert_eq!(u.tier, Tier::DueSoon);
        assert_eq!(u.countdown, "tomorrow");
    }

    #[test]
    fn missing_admin_row_falls_back_to_generic_label() {
        let ws = seeded();
        let views = synthesize(&ws, &[record(99, 1, None)], &NotifyPolicy::default(), day(10))
            .unwrap();
        assert_eq!(views[0].admin_name, FALLBACK_ADMIN);
        assert_eq!(views[0].title, "An admin has assigned you to a new task");
        // The project lookup still resolved normally.
        assert_eq!(views[0].project_name, "Orbit");
        assert!(views[0].urgency.is_none());
    }

    #[test]
    fn missing_project_row_falls_back_independently() {
        let ws = seeded();
        let views = synthesize(&ws, &[record(1, 55, None)], &NotifyPolicy::default(), day(10))
            .unwrap();
        assert_eq!(views[0].project_name, FALLBACK_PROJECT);
        assert_eq!(views[0].admin_name, "Ana");
    }

    struct OfflineIdentity;

    impl IdentityStore for OfflineIdentity {
        fn member_name(&self, _id: MemberId) -> Result<Option<String>, StoreError> {
            Err(StoreError::Backend("identity service offline".into()))
        }

        fn project_name(&self, _id: ProjectId) -> Result<Option<String>, StoreError> {
            Err(StoreError::Backend("identity service offline".into()))
        }

        fn role_in(
            &self,
            _user: MemberId,
            _project: ProjectId,
        ) -> Result<Option<Role>, StoreError> {
            Ok(None)
        }

        fn members_of(&self, _project: ProjectId) -> Result<Vec<crate::member::Member>, StoreError> {
            Err(StoreError::Backend("identity service offline".into()))
        }
    }

    #[test]
    fn identity_failure_propagates_instead_of_degrading() {
        let err = synthesize(
            &OfflineIdentity,
            &[record(1, 1, None)],
            &NotifyPolicy::default(),
            day(10),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Collaborator(_)));
    }

    #[test]
    fn unassigned_tasks_produce_no_entry() {
        let ws = seeded();
        let mut orphan = record(1, 1, None);
        orphan.assignee = None;
        let views =
            synthesize(&ws, &[orphan], &NotifyPolicy::default(), day(10)).unwrap();
        assert!(views.is_empty());
    }
}
