use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{ParseValueError, StoreError};
use crate::filter::Filterable;
use crate::store::{Entity, EntityStore};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Completed,
    Canceled,
}

impl TaskStatus {
    /// Board column order.
    pub const ALL: [TaskStatus; 4] = [
        Self::Todo,
        Self::InProgress,
        Self::Completed,
        Self::Canceled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Canceled => "canceled",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Todo => "To Do",
            Self::InProgress => "In Progress",
            Self::Completed => "Completed",
            Self::Canceled => "Canceled",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Canceled)
    }

    /// Transition table: only open tasks move, and only into a terminal
    /// state. Staying put is always allowed.
    pub fn can_transition_to(self, to: TaskStatus) -> bool {
        if self == to {
            return true;
        }
        match self {
            Self::Todo | Self::InProgress => to.is_terminal(),
            Self::Completed | Self::Canceled => false,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "todo" | "to_do" => Ok(Self::Todo),
            "in_progress" | "inprogress" | "in-progress" => Ok(Self::InProgress),
            "completed" | "done" => Ok(Self::Completed),
            "canceled" | "cancelled" => Ok(Self::Canceled),
            _ => Err(ParseValueError::new("task status", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
}

impl TaskPriority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskPriority {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" | "l" => Ok(Self::Low),
            "medium" | "med" | "m" => Ok(Self::Medium),
            "high" | "h" => Ok(Self::High),
            _ => Err(ParseValueError::new("priority", s)),
        }
    }
}

/// Names a user without owning it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Assignee {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// Names a project without owning it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectRef {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,

    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub status: TaskStatus,

    pub priority: TaskPriority,

    pub due_date: NaiveDate,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<Assignee>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<ProjectRef>,

    #[serde(default)]
    pub tags: BTreeSet<String>,

    #[serde(default)]
    pub comments: u32,

    #[serde(default)]
    pub attachments: u32,

    pub created_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Open (non-terminal) and due before `today`.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        !self.status.is_terminal() && self.due_date < today
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskDraft {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub priority: TaskPriority,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub assignee: Option<Assignee>,
    #[serde(default)]
    pub project: Option<ProjectRef>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl TaskDraft {
    fn into_task(self, id: String, now: DateTime<Utc>) -> Task {
        Task {
            id,
            title: self.title,
            description: self.description,
            status: TaskStatus::Todo,
            priority: self.priority,
            due_date: self.due_date,
            assignee: self.assignee,
            project: self.project,
            tags: self.tags,
            comments: 0,
            attachments: 0,
            created_at: now,
            completed_at: None,
        }
    }
}

impl Entity for Task {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Filterable for Task {
    type Status = TaskStatus;
    type Category = TaskPriority;

    const CATEGORY_KEY: &'static str = "priority";

    fn search_fields(&self) -> Vec<&str> {
        vec![
            self.title.as_str(),
            self.description.as_deref().unwrap_or_default(),
        ]
    }

    fn status(&self) -> TaskStatus {
        self.status
    }

    fn category(&self) -> TaskPriority {
        self.priority
    }
}

/// How strictly `complete`/`cancel` honor terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransitionPolicy {
    /// Enforce [`TaskStatus::can_transition_to`].
    #[default]
    Guarded,
    /// Always apply, as the dashboard buttons did.
    Permissive,
}

impl FromStr for TransitionPolicy {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "guarded" | "strict" => Ok(Self::Guarded),
            "permissive" | "loose" => Ok(Self::Permissive),
            _ => Err(ParseValueError::new("transition policy", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Applied { from: TaskStatus },
    Unchanged,
}

impl EntityStore<Task> {
    /// Creates a `todo` task at the front of the list.
    #[tracing::instrument(skip(self, draft, now), fields(title = %draft.title))]
    pub fn add_task(&mut self, draft: TaskDraft, now: DateTime<Utc>) -> Result<&Task, StoreError> {
        let id = self.allocate_id();
        let task = draft.into_task(id, now);
        info!(id = %task.id, due = %task.due_date, "adding task");
        self.prepend(task)
    }

    pub fn complete(
        &mut self,
        id: &str,
        now: DateTime<Utc>,
        policy: TransitionPolicy,
    ) -> Result<Transition, StoreError> {
        self.transition(id, TaskStatus::Completed, now, policy)
    }

    pub fn cancel(
        &mut self,
        id: &str,
        now: DateTime<Utc>,
        policy: TransitionPolicy,
    ) -> Result<Transition, StoreError> {
        self.transition(id, TaskStatus::Canceled, now, policy)
    }

    /// Decides what moving `id` to `to` would do, without touching the
    /// store.
    pub fn check_transition(
        &self,
        id: &str,
        to: TaskStatus,
        policy: TransitionPolicy,
    ) -> Result<Transition, StoreError> {
        let from = self
            .get(id)
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })?
            .status;

        if policy == TransitionPolicy::Guarded {
            if from == to {
                return Ok(Transition::Unchanged);
            }
            if !from.can_transition_to(to) {
                return Err(StoreError::InvalidTransition {
                    id: id.to_string(),
                    from,
                    to,
                });
            }
        }
        Ok(Transition::Applied { from })
    }

    #[tracing::instrument(skip(self, now))]
    fn transition(
        &mut self,
        id: &str,
        to: TaskStatus,
        now: DateTime<Utc>,
        policy: TransitionPolicy,
    ) -> Result<Transition, StoreError> {
        let from = match self.check_transition(id, to, policy) {
            Ok(Transition::Applied { from }) => from,
            Ok(Transition::Unchanged) => {
                debug!(status = %to, "task already in target state");
                return Ok(Transition::Unchanged);
            }
            Err(err @ StoreError::InvalidTransition { .. }) => {
                warn!(%to, "rejected transition out of terminal state");
                return Err(err);
            }
            Err(err) => return Err(err),
        };

        let current = self.get(id).ok_or_else(|| StoreError::NotFound { id: id.to_string() })?;
        let mut next = current.clone();
        next.status = to;
        if to == TaskStatus::Completed {
            next.completed_at = Some(now);
        }
        self.replace(next)?;

        info!(%from, %to, "task transitioned");
        Ok(Transition::Applied { from })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};

    use super::{Task, TaskDraft, TaskPriority, TaskStatus, Transition, TransitionPolicy};
    use crate::error::StoreError;
    use crate::seed;
    use crate::store::EntityStore;

    fn store() -> EntityStore<Task> {
        EntityStore::seeded(seed::tasks()).expect("seed tasks")
    }

    fn now() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 6, 21, 9, 30, 0)
            .single()
            .expect("valid now")
    }

    #[test]
    fn complete_stamps_completed_at_and_is_idempotent() {
        let mut tasks = store();
        let outcome = tasks
            .complete("3", now(), TransitionPolicy::Guarded)
            .expect("complete todo task");
        assert_eq!(outcome, Transition::Applied { from: TaskStatus::Todo });

        let task = tasks.get("3").expect("task 3");
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.completed_at, Some(now()));

        let later = now() + chrono::Duration::hours(1);
        let again = tasks
            .complete("3", later, TransitionPolicy::Guarded)
            .expect("repeat complete");
        assert_eq!(again, Transition::Unchanged);
        let task = tasks.get("3").expect("task 3");
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.completed_at, Some(now()));
    }

    #[test]
    fn guarded_policy_rejects_leaving_terminal_states() {
        let mut tasks = store();
        let err = tasks
            .complete("7", now(), TransitionPolicy::Guarded)
            .expect_err("canceled task cannot complete");
        assert_eq!(
            err,
            StoreError::InvalidTransition {
                id: "7".to_string(),
                from: TaskStatus::Canceled,
                to: TaskStatus::Completed,
            }
        );
        assert_eq!(tasks.get("7").expect("task 7").status, TaskStatus::Canceled);

        let err = tasks
            .cancel("1", now(), TransitionPolicy::Guarded)
            .expect_err("completed task cannot cancel");
        assert!(matches!(err, StoreError::InvalidTransition { .. }));
    }

    #[test]
    fn permissive_policy_applies_unconditionally() {
        let mut tasks = store();
        tasks
            .complete("7", now(), TransitionPolicy::Permissive)
            .expect("permissive complete");
        let task = tasks.get("7").expect("task 7");
        assert_eq!(task.status, TaskStatus::Completed);
        assert!(task.completed_at.is_some());

        tasks
            .cancel("7", now(), TransitionPolicy::Permissive)
            .expect("permissive cancel");
        let task = tasks.get("7").expect("task 7");
        assert_eq!(task.status, TaskStatus::Canceled);
        assert_eq!(task.completed_at, Some(now()));
    }

    #[test]
    fn cancel_keeps_list_position() {
        let mut tasks = store();
        tasks
            .cancel("2", now(), TransitionPolicy::Guarded)
            .expect("cancel in-progress task");
        assert_eq!(tasks.snapshot()[1].id, "2");
        assert_eq!(tasks.snapshot()[1].status, TaskStatus::Canceled);
        assert_eq!(tasks.snapshot()[1].completed_at, None);
    }

    #[test]
    fn unknown_id_is_not_found() {
        let mut tasks = store();
        let err = tasks
            .complete("nope", now(), TransitionPolicy::Guarded)
            .expect_err("missing task");
        assert!(err.is_not_found());
    }

    #[test]
    fn check_transition_reports_without_mutating() {
        let tasks = store();
        let before = tasks.snapshot().to_vec();

        assert_eq!(
            tasks.check_transition("2", TaskStatus::Canceled, TransitionPolicy::Guarded),
            Ok(Transition::Applied {
                from: TaskStatus::InProgress
            })
        );
        assert_eq!(
            tasks.check_transition("1", TaskStatus::Completed, TransitionPolicy::Guarded),
            Ok(Transition::Unchanged)
        );
        assert!(matches!(
            tasks.check_transition("1", TaskStatus::Canceled, TransitionPolicy::Guarded),
            Err(StoreError::InvalidTransition { .. })
        ));
        assert_eq!(
            tasks.check_transition("1", TaskStatus::Canceled, TransitionPolicy::Permissive),
            Ok(Transition::Applied {
                from: TaskStatus::Completed
            })
        );
        assert_eq!(tasks.snapshot(), before.as_slice());
    }

    #[test]
    fn add_task_starts_in_todo_with_zero_counters() {
        let mut tasks = store();
        let draft = TaskDraft {
            title: "Prepare quarterly review".to_string(),
            description: None,
            priority: TaskPriority::Low,
            due_date: NaiveDate::from_ymd_opt(2023, 7, 1).expect("valid date"),
            assignee: None,
            project: None,
            tags: Default::default(),
        };
        let created = tasks.add_task(draft, now()).expect("add task").clone();
        assert_eq!(created.id, "8");
        assert_eq!(created.status, TaskStatus::Todo);
        assert_eq!(created.comments, 0);
        assert_eq!(created.attachments, 0);
        assert_eq!(created.created_at, now());
        assert_eq!(tasks.snapshot()[0].id, "8");
    }

    #[test]
    fn transition_table_only_moves_open_tasks() {
        for from in TaskStatus::ALL {
            for to in TaskStatus::ALL {
                let allowed = from.can_transition_to(to);
                let expected = from == to || (!from.is_terminal() && to.is_terminal());
                assert_eq!(allowed, expected, "{from} -> {to}");
            }
        }
    }

    #[test]
    fn status_parses_dashboard_values() {
        assert_eq!("in_progress".parse::<TaskStatus>(), Ok(TaskStatus::InProgress));
        assert_eq!("Cancelled".parse::<TaskStatus>(), Ok(TaskStatus::Canceled));
        assert!("blocked".parse::<TaskStatus>().is_err());
    }
}
