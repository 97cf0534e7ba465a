use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;

use crate::error::ParseValueError;
use crate::task::{
  Task,
  TaskPriority,
  TaskStatus
};

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
)]
pub enum ClientView {
  #[default]
  List,
  Grid
}

impl ClientView {
  pub fn as_str(self) -> &'static str {
    match self {
      | Self::List => "list",
      | Self::Grid => "grid"
    }
  }
}

impl fmt::Display for ClientView {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for ClientView {
  type Err = ParseValueError;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    match s
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "list" => Ok(Self::List),
      | "grid" => Ok(Self::Grid),
      | _ => Err(ParseValueError::new(
        "client view",
        s
      ))
    }
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
)]
pub enum TaskView {
  #[default]
  List,
  Board,
  Calendar
}

impl TaskView {
  pub fn as_str(self) -> &'static str {
    match self {
      | Self::List => "list",
      | Self::Board => "board",
      | Self::Calendar => "calendar"
    }
  }
}

impl fmt::Display for TaskView {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for TaskView {
  type Err = ParseValueError;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    match s
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "list" => Ok(Self::List),
      | "board" | "kanban" => {
        Ok(Self::Board)
      }
      | "calendar" | "cal" => {
        Ok(Self::Calendar)
      }
      | _ => Err(ParseValueError::new(
        "task view",
        s
      ))
    }
  }
}

#[derive(Debug, Clone)]
pub struct BoardColumn<'a> {
  pub status: TaskStatus,
  pub tasks:  Vec<&'a Task>
}

impl BoardColumn<'_> {
  pub fn title(&self) -> &'static str {
    self.status.label()
  }
}

/// One column per status in fixed
/// order; each column keeps the input
/// order.
pub fn board_columns<'a>(
  tasks: &[&'a Task]
) -> Vec<BoardColumn<'a>> {
  TaskStatus::ALL
    .into_iter()
    .map(|status| BoardColumn {
      status,
      tasks: tasks
        .iter()
        .copied()
        .filter(|t| t.status == status)
        .collect()
    })
    .collect()
}

pub fn tasks_by_day<'a>(
  tasks: &[&'a Task]
) -> BTreeMap<NaiveDate, Vec<&'a Task>>
{
  let mut days: BTreeMap<
    NaiveDate,
    Vec<&'a Task>
  > = BTreeMap::new();
  for task in tasks {
    days
      .entry(task.due_date)
      .or_default()
      .push(*task);
  }
  days
}

pub fn tasks_on<'a>(
  tasks: &[&'a Task],
  day: NaiveDate
) -> Vec<&'a Task> {
  tasks
    .iter()
    .copied()
    .filter(|t| t.due_date == day)
    .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DayMarker {
  /// More than two tasks that day.
  Busy,
  Priorities(Vec<TaskPriority>)
}

pub fn day_marker(
  day_tasks: &[&Task]
) -> Option<DayMarker> {
  match day_tasks.len() {
    | 0 => None,
    | 1 | 2 => Some(
      DayMarker::Priorities(
        day_tasks
          .iter()
          .map(|t| t.priority)
          .collect()
      )
    ),
    | _ => Some(DayMarker::Busy)
  }
}
