use std::io::{self, IsTerminal, Write};

use chrono::NaiveDate;
use unicode_width::UnicodeWidthStr;

use crate::client::{Client, ClientStatus};
use crate::config::Config;
use crate::datetime::{format_long_date, format_short_date, relative_phrase};
use crate::stats::{ClientSummary, TaskStats};
use crate::task::{Task, TaskPriority, TaskStatus};
use crate::view::{DayMarker, board_columns, day_marker, tasks_by_day, tasks_on};

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> Self {
        Self {
            color: color_setting(cfg) && io::stdout().is_terminal(),
        }
    }

    pub fn plain() -> Self {
        Self { color: false }
    }

    #[tracing::instrument(skip_all, fields(count = clients.len()))]
    pub fn client_list<W: Write>(
        &self,
        out: &mut W,
        clients: &[&Client],
        today: NaiveDate,
    ) -> anyhow::Result<()> {
        if clients.is_empty() {
            writeln!(out, "No clients found")?;
            return Ok(());
        }

        let headers = [
            "ID", "Name", "Company", "Email", "Phone", "Status", "Industry", "Projects", "Revenue",
            "Last contact",
        ]
        .map(String::from)
        .to_vec();

        let rows = clients
            .iter()
            .map(|client| {
                vec![
                    self.paint(&client.id, "33"),
                    client.name.clone(),
                    client.company.clone(),
                    client.email.clone(),
                    client.phone.clone(),
                    self.client_status(client.status),
                    client.industry.label().to_string(),
                    client.projects.to_string(),
                    format_money(client.revenue),
                    relative_phrase(client.last_contact, today),
                ]
            })
            .collect();

        write_table(out, headers, rows)
    }

    #[tracing::instrument(skip_all, fields(count = clients.len()))]
    pub fn client_grid<W: Write>(
        &self,
        out: &mut W,
        clients: &[&Client],
        today: NaiveDate,
    ) -> anyhow::Result<()> {
        if clients.is_empty() {
            writeln!(out, "No clients found")?;
            return Ok(());
        }

        for client in clients {
            writeln!(
                out,
                "[{}] {}  ({})  {}",
                initials(&client.name),
                client.name,
                client.id,
                self.client_status(client.status)
            )?;
            writeln!(out, "     {} · {}", client.company, client.industry.label())?;
            writeln!(out, "     {} · {}", client.email, client.phone)?;
            writeln!(
                out,
                "     Projects: {}   Revenue: {}",
                client.projects,
                format_money(client.revenue)
            )?;
            writeln!(
                out,
                "     Last contact: {}",
                relative_phrase(client.last_contact, today)
            )?;
            writeln!(out)?;
        }
        Ok(())
    }

    #[tracing::instrument(skip_all, fields(count = tasks.len()))]
    pub fn task_list<W: Write>(
        &self,
        out: &mut W,
        tasks: &[&Task],
        today: NaiveDate,
    ) -> anyhow::Result<()> {
        if tasks.is_empty() {
            writeln!(out, "No tasks found")?;
            return Ok(());
        }

        let headers = ["ID", "Task", "Priority", "Status", "Due", "Assignee", "Actions"]
            .map(String::from)
            .to_vec();

        let rows = tasks
            .iter()
            .map(|task| {
                vec![
                    self.paint(&task.id, "33"),
                    task.title.clone(),
                    self.priority(task.priority),
                    self.task_status(task.status),
                    self.due(task, today, format_long_date(task.due_date)),
                    task.assignee
                        .as_ref()
                        .map(|a| a.name.clone())
                        .unwrap_or_default(),
                    available_actions(task.status).join(" "),
                ]
            })
            .collect();

        write_table(out, headers, rows)
    }

    #[tracing::instrument(skip_all, fields(count = tasks.len()))]
    pub fn task_board<W: Write>(
        &self,
        out: &mut W,
        tasks: &[&Task],
        today: NaiveDate,
    ) -> anyhow::Result<()> {
        for column in board_columns(tasks) {
            writeln!(out, "== {} ({})", column.title(), column.tasks.len())?;
            if column.tasks.is_empty() {
                writeln!(out, "   No tasks")?;
            }
            for task in &column.tasks {
                writeln!(
                    out,
                    "   {} {}  [{}]",
                    self.paint(&task.id, "33"),
                    task.title,
                    self.priority(task.priority)
                )?;

                let mut meta = vec![self.due(task, today, format_short_date(task.due_date))];
                if let Some(assignee) = &task.assignee {
                    meta.push(initials(&assignee.name));
                }
                if task.comments > 0 {
                    meta.push(format!("{} comments", task.comments));
                }
                if task.attachments > 0 {
                    meta.push(format!("{} files", task.attachments));
                }
                if !task.tags.is_empty() {
                    meta.push(
                        task.tags
                            .iter()
                            .map(|tag| format!("#{tag}"))
                            .collect::<Vec<_>>()
                            .join(" "),
                    );
                }
                writeln!(out, "      {}", meta.join(" · "))?;
            }
            writeln!(out)?;
        }
        Ok(())
    }

    #[tracing::instrument(skip_all, fields(count = tasks.len(), day = %selected))]
    pub fn task_calendar<W: Write>(
        &self,
        out: &mut W,
        tasks: &[&Task],
        selected: NaiveDate,
        today: NaiveDate,
    ) -> anyhow::Result<()> {
        let days = tasks_by_day(tasks);
        if days.is_empty() {
            writeln!(out, "No scheduled tasks")?;
        }
        for (day, day_tasks) in &days {
            let marker = match day_marker(day_tasks) {
                Some(DayMarker::Busy) => self.paint("●", "35"),
                Some(DayMarker::Priorities(priorities)) => priorities
                    .iter()
                    .map(|p| self.paint("•", priority_code(*p)))
                    .collect::<Vec<_>>()
                    .join(""),
                None => String::new(),
            };
            let cursor = if *day == selected { ">" } else { " " };
            writeln!(
                out,
                "{cursor} {}  {marker} {}",
                format_long_date(*day),
                day_tasks.len()
            )?;
        }

        writeln!(out)?;
        writeln!(out, "Tasks for {}", format_long_date(selected))?;
        let chosen = tasks_on(tasks, selected);
        if chosen.is_empty() {
            writeln!(out, "   No tasks scheduled for this day")?;
        }
        for task in chosen {
            writeln!(
                out,
                "   {} {}  [{}] [{}]{}",
                self.paint(&task.id, "33"),
                task.title,
                self.priority(task.priority),
                self.task_status(task.status),
                if task.is_overdue(today) { "  overdue" } else { "" }
            )?;
        }
        Ok(())
    }

    #[tracing::instrument(skip_all)]
    pub fn dashboard<W: Write>(
        &self,
        out: &mut W,
        stats: &TaskStats,
        upcoming: &[&Task],
        clients: &ClientSummary,
    ) -> anyhow::Result<()> {
        writeln!(out, "Task Overview")?;
        writeln!(out, "  Total tasks      {}", stats.counts.total)?;
        writeln!(
            out,
            "  Completion rate  {}% {}",
            stats.completion_rate,
            progress_bar(stats.completion_rate, 20)
        )?;
        for status in TaskStatus::ALL {
            writeln!(
                out,
                "  {:<16} {}",
                status.label(),
                stats.counts.get(status)
            )?;
        }

        writeln!(out)?;
        let overdue = stats.overdue.to_string();
        writeln!(
            out,
            "Overdue Tasks      {}",
            if stats.overdue > 0 { self.paint(&overdue, "31") } else { overdue }
        )?;

        writeln!(out)?;
        writeln!(out, "Upcoming Deadlines")?;
        if upcoming.is_empty() {
            writeln!(out, "  No upcoming deadlines")?;
        }
        for task in upcoming {
            let who = task
                .assignee
                .as_ref()
                .map(|a| format!(" ({})", initials(&a.name)))
                .unwrap_or_default();
            writeln!(
                out,
                "  {} {}  Due: {}{who}",
                self.paint(&task.id, "33"),
                task.title,
                format_long_date(task.due_date)
            )?;
        }

        writeln!(out)?;
        writeln!(out, "Clients")?;
        writeln!(out, "  Total            {}", clients.total)?;
        for status in ClientStatus::ALL {
            let count = clients.by_status.get(status.as_str()).copied().unwrap_or(0);
            writeln!(out, "  {:<16} {}", status.label(), count)?;
        }
        writeln!(out, "  Projects         {}", clients.projects)?;
        writeln!(out, "  Revenue          {}", format_money(clients.revenue))?;
        Ok(())
    }

    pub fn showing<W: Write>(
        &self,
        out: &mut W,
        shown: usize,
        total: usize,
        noun: &str,
    ) -> anyhow::Result<()> {
        writeln!(out, "Showing {shown} of {total} {noun}")?;
        Ok(())
    }

    fn due(&self, task: &Task, today: NaiveDate, text: String) -> String {
        if task.is_overdue(today) {
            self.paint(&text, "31")
        } else {
            text
        }
    }

    fn priority(&self, priority: TaskPriority) -> String {
        self.paint(priority.label(), priority_code(priority))
    }

    fn task_status(&self, status: TaskStatus) -> String {
        let code = match status {
            TaskStatus::Todo => "33",
            TaskStatus::InProgress => "34",
            TaskStatus::Completed => "32",
            TaskStatus::Canceled => "31",
        };
        self.paint(status.label(), code)
    }

    fn client_status(&self, status: ClientStatus) -> String {
        let code = match status {
            ClientStatus::Active => "32",
            ClientStatus::Inactive => "90",
            ClientStatus::New => "34",
        };
        self.paint(status.label(), code)
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

/// `color` as configured; missing means on.
fn color_setting(cfg: &Config) -> bool {
    cfg.get_bool("color").unwrap_or(true)
}

fn priority_code(priority: TaskPriority) -> &'static str {
    match priority {
        TaskPriority::High => "31",
        TaskPriority::Medium => "33",
        TaskPriority::Low => "32",
    }
}

/// Transitions the transition table still allows from `status`.
pub fn available_actions(status: TaskStatus) -> Vec<&'static str> {
    let mut actions = Vec::new();
    if status != TaskStatus::Completed && status.can_transition_to(TaskStatus::Completed) {
        actions.push("complete");
    }
    if status != TaskStatus::Canceled && status.can_transition_to(TaskStatus::Canceled) {
        actions.push("cancel");
    }
    actions
}

/// First character of each space-separated part, uppercased.
pub fn initials(name: &str) -> String {
    name.split(' ')
        .filter_map(|part| part.chars().next())
        .flat_map(char::to_uppercase)
        .collect()
}

/// `$125,000`
pub fn format_money(amount: u64) -> String {
    let digits = amount.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("${grouped}")
}

fn progress_bar(percent: u32, width: usize) -> String {
    let filled = (percent.min(100) as usize * width + 50) / 100;
    format!("[{}{}]", "#".repeat(filled), ".".repeat(width - filled))
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for idx in 0..column_count {
        write!(writer, "{:-<width$} ", "", width = widths[idx])?;
    }
    writeln!(writer)?;

    for row in rows {
        for idx in 0..column_count {
            let cell = &row[idx];
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}
