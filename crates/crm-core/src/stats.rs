use std::collections::BTreeMap;

use chrono::{
  Days,
  NaiveDate
};
use serde::Serialize;

use crate::client::{
  Client,
  ClientStatus
};
use crate::task::{
  Task,
  TaskStatus
};

pub const DEFAULT_UPCOMING_DAYS: u64 = 7;

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  Serialize,
)]
pub struct StatusCounts {
  pub total:       usize,
  pub todo:        usize,
  pub in_progress: usize,
  pub completed:   usize,
  pub canceled:    usize
}

impl StatusCounts {
  pub fn get(
    &self,
    status: TaskStatus
  ) -> usize {
    match status {
      | TaskStatus::Todo => self.todo,
      | TaskStatus::InProgress => {
        self.in_progress
      }
      | TaskStatus::Completed => {
        self.completed
      }
      | TaskStatus::Canceled => {
        self.canceled
      }
    }
  }
}

pub fn status_counts(
  tasks: &[Task]
) -> StatusCounts {
  let mut counts = StatusCounts {
    total: tasks.len(),
    ..StatusCounts::default()
  };
  for task in tasks {
    match task.status {
      | TaskStatus::Todo => {
        counts.todo += 1
      }
      | TaskStatus::InProgress => {
        counts.in_progress += 1
      }
      | TaskStatus::Completed => {
        counts.completed += 1
      }
      | TaskStatus::Canceled => {
        counts.canceled += 1
      }
    }
  }
  counts
}

/// Completed share as a whole
/// percentage, rounded half up. An
/// empty list is 0.
pub fn completion_rate(
  tasks: &[Task]
) -> u32 {
  let counts = status_counts(tasks);
  if counts.total == 0 {
    return 0;
  }
  let completed = counts.completed as u64;
  let total = counts.total as u64;
  ((completed * 200 + total)
    / (2 * total)) as u32
}

pub fn overdue_count(
  tasks: &[Task],
  today: NaiveDate
) -> usize {
  tasks
    .iter()
    .filter(|task| task.is_overdue(today))
    .count()
}

/// Open tasks due between `today` and
/// `today + window_days` inclusive,
/// earliest first. Equal dates keep
/// list order.
pub fn upcoming_deadlines(
  tasks: &[Task],
  today: NaiveDate,
  window_days: u64
) -> Vec<&Task> {
  let horizon = today
    .checked_add_days(Days::new(
      window_days
    ))
    .unwrap_or(NaiveDate::MAX);

  let mut out: Vec<&Task> = tasks
    .iter()
    .filter(|task| {
      !task.status.is_terminal()
        && task.due_date >= today
        && task.due_date <= horizon
    })
    .collect();
  out.sort_by_key(|task| task.due_date);
  out
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskStats {
  pub counts:          StatusCounts,
  pub completion_rate: u32,
  pub overdue:         usize,
  pub upcoming:        Vec<String>
}

#[tracing::instrument(skip(tasks), fields(total = tasks.len()))]
pub fn task_stats(
  tasks: &[Task],
  today: NaiveDate,
  window_days: u64
) -> TaskStats {
  TaskStats {
    counts:          status_counts(tasks),
    completion_rate: completion_rate(
      tasks
    ),
    overdue:         overdue_count(
      tasks, today
    ),
    upcoming:        upcoming_deadlines(
      tasks,
      today,
      window_days
    )
    .into_iter()
    .map(|task| task.id.clone())
    .collect()
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct ClientSummary {
  pub total:     usize,
  pub by_status: BTreeMap<String, usize>,
  pub revenue:   u64,
  pub projects:  u64
}

pub fn client_summary(
  clients: &[Client]
) -> ClientSummary {
  let mut by_status = BTreeMap::new();
  for status in ClientStatus::ALL {
    by_status
      .insert(status.to_string(), 0);
  }
  for client in clients {
    *by_status
      .entry(client.status.to_string())
      .or_insert(0) += 1;
  }

  ClientSummary {
    total: clients.len(),
    by_status,
    revenue: clients
      .iter()
      .map(|c| c.revenue)
      .sum(),
    projects: clients
      .iter()
      .map(|c| u64::from(c.projects))
      .sum()
  }
}

#[cfg(test)]
mod tests {
  use chrono::{
    Days,
    NaiveDate,
    TimeZone,
    Utc
  };

  use super::{
    DEFAULT_UPCOMING_DAYS,
    client_summary,
    completion_rate,
    overdue_count,
    status_counts,
    task_stats,
    upcoming_deadlines
  };
  use crate::seed;
  use crate::task::{
    Task,
    TaskStatus
  };

  fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 6, 21)
      .expect("valid date")
  }

  fn task_due(
    id: &str,
    due: NaiveDate,
    status: TaskStatus
  ) -> Task {
    let mut task = seed::tasks().remove(0);
    task.id = id.to_string();
    task.due_date = due;
    task.status = status;
    task.completed_at = None;
    task
  }

  #[test]
  fn completion_rate_of_empty_list_is_zero()
  {
    assert_eq!(completion_rate(&[]), 0);
  }

  #[test]
  fn completion_rate_rounds_like_the_dashboard()
  {
    // 1 of 7 -> 14.28 -> 14
    assert_eq!(
      completion_rate(&seed::tasks()),
      14
    );

    let mut tasks = seed::tasks();
    tasks.truncate(2);
    // 1 of 2 -> 50
    assert_eq!(completion_rate(&tasks), 50);

    let mut eight = seed::tasks();
    eight.push(task_due(
      "8",
      today(),
      TaskStatus::Todo
    ));
    // 1 of 8 -> 12.5 -> 13
    assert_eq!(completion_rate(&eight), 13);
  }

  #[test]
  fn counts_cover_every_status() {
    let counts =
      status_counts(&seed::tasks());
    assert_eq!(counts.total, 7);
    assert_eq!(counts.todo, 3);
    assert_eq!(counts.in_progress, 2);
    assert_eq!(counts.completed, 1);
    assert_eq!(counts.canceled, 1);
    assert_eq!(
      counts.get(TaskStatus::Todo),
      3
    );
  }

  #[test]
  fn overdue_and_upcoming_scenario() {
    let now = Utc
      .with_ymd_and_hms(
        2023, 6, 21, 15, 0, 0
      )
      .single()
      .expect("valid now");
    let today = now.date_naive();
    let tasks = vec![
      task_due(
        "1",
        today - Days::new(1),
        TaskStatus::Todo
      ),
      task_due(
        "2",
        today + Days::new(2),
        TaskStatus::Todo
      ),
    ];

    assert_eq!(overdue_count(&tasks, today), 1);
    let upcoming: Vec<&str> =
      upcoming_deadlines(
        &tasks,
        today,
        DEFAULT_UPCOMING_DAYS
      )
      .into_iter()
      .map(|t| t.id.as_str())
      .collect();
    assert_eq!(upcoming, vec!["2"]);
  }

  #[test]
  fn terminal_tasks_are_never_overdue_or_upcoming()
  {
    let tasks = vec![
      task_due(
        "a",
        today() - Days::new(3),
        TaskStatus::Completed
      ),
      task_due(
        "b",
        today() - Days::new(3),
        TaskStatus::Canceled
      ),
      task_due(
        "c",
        today(),
        TaskStatus::Canceled
      ),
    ];
    assert_eq!(overdue_count(&tasks, today()), 0);
    assert!(
      upcoming_deadlines(&tasks, today(), 7)
        .is_empty()
    );
  }

  #[test]
  fn upcoming_window_is_inclusive_and_sorted()
  {
    let tasks = vec![
      task_due(
        "late",
        today() + Days::new(8),
        TaskStatus::Todo
      ),
      task_due(
        "edge",
        today() + Days::new(7),
        TaskStatus::InProgress
      ),
      task_due(
        "now-a",
        today(),
        TaskStatus::Todo
      ),
      task_due(
        "now-b",
        today(),
        TaskStatus::Todo
      ),
    ];
    let ids: Vec<&str> =
      upcoming_deadlines(&tasks, today(), 7)
        .into_iter()
        .map(|t| t.id.as_str())
        .collect();
    assert_eq!(
      ids,
      vec!["now-a", "now-b", "edge"]
    );
    assert_eq!(overdue_count(&tasks, today()), 0);
  }

  #[test]
  fn seed_stats_on_a_june_day() {
    let stats = task_stats(
      &seed::tasks(),
      today(),
      DEFAULT_UPCOMING_DAYS
    );
    // 4 (due 23rd) is open and ahead;
    // 7 (due 22nd) is canceled.
    assert_eq!(stats.overdue, 0);
    assert_eq!(
      stats.upcoming,
      vec!["4", "2", "5"]
    );
  }

  #[test]
  fn client_summary_totals() {
    let summary =
      client_summary(&seed::clients());
    assert_eq!(summary.total, 6);
    assert_eq!(summary.by_status["active"], 3);
    assert_eq!(summary.by_status["new"], 1);
    assert_eq!(summary.revenue, 410_000);
    assert_eq!(summary.projects, 10);
  }
}
