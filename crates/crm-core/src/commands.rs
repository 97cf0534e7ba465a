use std::collections::BTreeMap;
use std::io::{self, BufRead, IsTerminal, Write};

use anyhow::{Context, anyhow};
use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info, instrument, warn};

use crate::cli::{Invocation, split_line};
use crate::client::{Client, ClientDraft, ClientStatus, Industry};
use crate::config::Config;
use crate::datetime::{parse_date_expr, project_today};
use crate::error::StoreError;
use crate::filter::{Filterable, FilterFor, parse_terms};
use crate::render::Renderer;
use crate::session::Session;
use crate::stats::{client_summary, task_stats, upcoming_deadlines};
use crate::task::{Assignee, ProjectRef, Task, TaskDraft, TaskPriority, TaskStatus, Transition};
use crate::view::{ClientView, TaskView};

const SHELL_PROMPT: &str = "crm> ";

pub fn known_command_names() -> Vec<&'static str> {
    vec![
        "clients",
        "tasks",
        "reset",
        "add-client",
        "add-task",
        "complete",
        "cancel",
        "dashboard",
        "export",
        "shell",
        "help",
        "version",
        "_commands",
        "_show",
    ]
}

pub fn expand_command_abbrev<'a>(token: &'a str, known: &[&'a str]) -> Option<&'a str> {
    if known.contains(&token) {
        return Some(token);
    }

    let mut matches = known.iter().copied().filter(|name| name.starts_with(token));
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(first)
    }
}

#[instrument(skip(session, cfg, renderer, inv, now, out))]
pub fn dispatch<W: Write>(
    session: &mut Session,
    cfg: &Config,
    renderer: &Renderer,
    inv: Invocation,
    now: DateTime<Utc>,
    out: &mut W,
) -> anyhow::Result<()> {
    let command = inv.command.as_str();
    debug!(command, args = ?inv.args, "dispatching command");

    match command {
        "shell" => {
            let stdin = io::stdin();
            let prompt = stdin.is_terminal().then_some(SHELL_PROMPT);
            run_shell(session, cfg, renderer, stdin.lock(), out, now, prompt)
        }
        other => execute(session, cfg, renderer, other, &inv.args, now, out),
    }
}

/// Runs one command against the session. `shell` is not accepted here.
fn execute<W: Write>(
    session: &mut Session,
    cfg: &Config,
    renderer: &Renderer,
    command: &str,
    args: &[String],
    now: DateTime<Utc>,
    out: &mut W,
) -> anyhow::Result<()> {
    let today = project_today(now);

    match command {
        "clients" => cmd_clients(session, renderer, args, today, out),
        "tasks" => cmd_tasks(session, renderer, args, now, out),
        "reset" => cmd_reset(session, out),
        "add-client" => cmd_add_client(session, args, now, out),
        "add-task" => cmd_add_task(session, args, now, out),
        "complete" => cmd_complete(session, args, now, out),
        "cancel" => cmd_cancel(session, args, now, out),
        "dashboard" => cmd_dashboard(session, renderer, today, out),
        "export" => cmd_export(session, args, out),
        "_commands" => cmd_commands(out),
        "_show" => cmd_show(cfg, out),
        "help" => cmd_help(out),
        "version" => {
            writeln!(out, "{}", env!("CARGO_PKG_VERSION"))?;
            Ok(())
        }
        "shell" => Err(anyhow!("already in a shell")),
        other => Err(anyhow!("unknown command: {other}")),
    }
}

/// Reads commands line by line until EOF, `quit` or `exit`. A failing
/// command is reported and the loop keeps going.
#[instrument(skip_all)]
pub fn run_shell<R: BufRead, W: Write>(
    session: &mut Session,
    cfg: &Config,
    renderer: &Renderer,
    mut input: R,
    out: &mut W,
    now: DateTime<Utc>,
    prompt: Option<&str>,
) -> anyhow::Result<()> {
    info!("shell started");
    let known = known_command_names();
    let mut line = String::new();

    loop {
        if let Some(prompt) = prompt {
            write!(out, "{prompt}")?;
            out.flush()?;
        }

        line.clear();
        if input.read_line(&mut line).context("failed to read shell input")? == 0 {
            break;
        }

        let tokens = match split_line(&line) {
            Ok(tokens) => tokens,
            Err(err) => {
                writeln!(out, "error: {err:#}")?;
                continue;
            }
        };
        let Some((first, rest)) = tokens.split_first() else {
            continue;
        };
        if first == "quit" || first == "exit" {
            break;
        }

        let result = expand_command_abbrev(first, &known)
            .ok_or_else(|| anyhow!("unknown or ambiguous command: {first}"))
            .and_then(|command| execute(session, cfg, renderer, command, rest, now, out));
        if let Err(err) = result {
            warn!(error = %err, "shell command failed");
            writeln!(out, "error: {err:#}")?;
        }
    }

    info!("shell finished");
    Ok(())
}

/// Pulls `view:<mode>` (and `day:<date>` for tasks) out of the term list.
/// Returns the remaining filter terms.
fn split_view_terms(
    args: &[String],
    mut on_view: impl FnMut(&str) -> anyhow::Result<()>,
    mut on_day: impl FnMut(&str) -> anyhow::Result<()>,
) -> anyhow::Result<Vec<String>> {
    let mut rest = Vec::new();
    for arg in args {
        match arg.split_once(':') {
            Some((key, value)) if key.eq_ignore_ascii_case("view") => on_view(value)?,
            Some((key, value)) if key.eq_ignore_ascii_case("day") => on_day(value)?,
            _ => rest.push(arg.clone()),
        }
    }
    Ok(rest)
}

#[instrument(skip(session, renderer, args, out))]
fn cmd_clients<W: Write>(
    session: &mut Session,
    renderer: &Renderer,
    args: &[String],
    today: NaiveDate,
    out: &mut W,
) -> anyhow::Result<()> {
    let mut view = session.client_view;
    let terms = split_view_terms(
        args,
        |value| {
            view = value.parse::<ClientView>()?;
            Ok(())
        },
        |_| Err(anyhow!("day: only applies to tasks")),
    )?;
    let filter = if terms.is_empty() {
        None
    } else {
        Some(parse_terms::<Client>(&terms)?)
    };

    session.client_view = view;
    if let Some(filter) = filter {
        session.client_filter = filter;
    }

    let visible = session.visible_clients();
    info!(view = %session.client_view, shown = visible.len(), "command clients");
    match session.client_view {
        ClientView::List => renderer.client_list(out, &visible, today)?,
        ClientView::Grid => renderer.client_grid(out, &visible, today)?,
    }
    renderer.showing(out, visible.len(), session.clients.len(), "clients")
}

#[instrument(skip(session, renderer, args, now, out))]
fn cmd_tasks<W: Write>(
    session: &mut Session,
    renderer: &Renderer,
    args: &[String],
    now: DateTime<Utc>,
    out: &mut W,
) -> anyhow::Result<()> {
    let today = project_today(now);
    let mut view = session.task_view;
    let mut day = session.selected_day;
    let terms = split_view_terms(
        args,
        |value| {
            view = value.parse::<TaskView>()?;
            Ok(())
        },
        |value| {
            day = Some(parse_date_expr(value, now)?);
            Ok(())
        },
    )?;
    let filter = if terms.is_empty() {
        None
    } else {
        Some(parse_terms::<Task>(&terms)?)
    };

    session.task_view = view;
    session.selected_day = day;
    if let Some(filter) = filter {
        session.task_filter = filter;
    }

    let visible = session.visible_tasks();
    info!(view = %session.task_view, shown = visible.len(), "command tasks");
    match session.task_view {
        TaskView::List => renderer.task_list(out, &visible, today)?,
        TaskView::Board => renderer.task_board(out, &visible, today)?,
        TaskView::Calendar => {
            renderer.task_calendar(out, &visible, session.calendar_day(today), today)?
        }
    }
    renderer.showing(out, visible.len(), session.tasks.len(), "tasks")
}

fn cmd_reset<W: Write>(session: &mut Session, out: &mut W) -> anyhow::Result<()> {
    session.reset_filters();
    writeln!(out, "Filters cleared.")?;
    Ok(())
}

#[instrument(skip(session, args, now, out))]
fn cmd_add_client<W: Write>(
    session: &mut Session,
    args: &[String],
    now: DateTime<Utc>,
    out: &mut W,
) -> anyhow::Result<()> {
    const FIELDS: [&str; 7] = [
        "name", "company", "email", "phone", "status", "industry", "contact",
    ];
    let mut fields = parse_fields(args, &FIELDS)?;

    let draft = ClientDraft {
        name: take_required(&mut fields, "name")?,
        company: take_required(&mut fields, "company")?,
        email: take_required(&mut fields, "email")?,
        phone: take_required(&mut fields, "phone")?,
        status: match fields.remove("status") {
            Some(raw) => raw.parse()?,
            None => ClientStatus::New,
        },
        industry: match fields.remove("industry") {
            Some(raw) => raw.parse()?,
            None => Industry::Technology,
        },
        last_contact: match fields.remove("contact") {
            Some(raw) => parse_date_expr(&raw, now)?,
            None => project_today(now),
        },
        avatar: None,
    };

    let client = session.clients.add_client(draft)?;
    writeln!(out, "Created client {} ({}).", client.id, client.name)?;
    Ok(())
}

#[instrument(skip(session, args, now, out))]
fn cmd_add_task<W: Write>(
    session: &mut Session,
    args: &[String],
    now: DateTime<Utc>,
    out: &mut W,
) -> anyhow::Result<()> {
    const FIELDS: [&str; 7] = [
        "title",
        "description",
        "priority",
        "due",
        "project",
        "assignee",
        "tags",
    ];
    let mut fields = parse_fields(args, &FIELDS)?;

    let draft = TaskDraft {
        title: take_required(&mut fields, "title")?,
        description: fields.remove("description"),
        priority: match fields.remove("priority") {
            Some(raw) => raw.parse()?,
            None => TaskPriority::Medium,
        },
        due_date: match fields.remove("due") {
            Some(raw) => parse_date_expr(&raw, now)?,
            None => project_today(now),
        },
        assignee: fields.remove("assignee").map(|name| Assignee {
            id: slug(&name),
            name,
            avatar: None,
        }),
        project: fields.remove("project").map(|name| ProjectRef {
            id: slug(&name),
            name,
        }),
        tags: fields
            .remove("tags")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|tag| !tag.is_empty())
                    .map(ToString::to_string)
                    .collect()
            })
            .unwrap_or_default(),
    };

    let task = session.tasks.add_task(draft, now)?;
    writeln!(out, "Created task {}.", task.id)?;
    Ok(())
}

fn cmd_complete<W: Write>(
    session: &mut Session,
    ids: &[String],
    now: DateTime<Utc>,
    out: &mut W,
) -> anyhow::Result<()> {
    info!("command complete");
    move_tasks(session, ids, TaskStatus::Completed, out, |session, id| {
        session.complete_task(id, now)
    })
}

fn cmd_cancel<W: Write>(
    session: &mut Session,
    ids: &[String],
    now: DateTime<Utc>,
    out: &mut W,
) -> anyhow::Result<()> {
    info!("command cancel");
    move_tasks(session, ids, TaskStatus::Canceled, out, |session, id| {
        session.cancel_task(id, now)
    })
}

/// Applies one transition to a batch of ids. Every id is checked first;
/// a single rejected move leaves the whole batch unapplied.
fn move_tasks<W, F>(
    session: &mut Session,
    ids: &[String],
    target: TaskStatus,
    out: &mut W,
    mut apply: F,
) -> anyhow::Result<()>
where
    W: Write,
    F: FnMut(&mut Session, &str) -> Result<Option<Transition>, StoreError>,
{
    if ids.is_empty() {
        return Err(anyhow!("moving tasks to {target} requires at least one id"));
    }

    let rejected: Vec<String> = ids
        .iter()
        .filter_map(|id| match session.tasks.check_transition(id, target, session.policy) {
            Err(err @ StoreError::InvalidTransition { .. }) => Some(err.to_string()),
            _ => None,
        })
        .collect();
    if !rejected.is_empty() {
        warn!(count = rejected.len(), %target, "batch rejected; no task changed");
        return Err(anyhow!(
            "cannot move tasks to {target}, nothing changed: {}",
            rejected.join("; ")
        ));
    }

    for id in ids {
        match apply(session, id).with_context(|| format!("cannot move task {id} to {target}"))? {
            Some(Transition::Applied { from }) => {
                writeln!(out, "Task {id}: {from} -> {target}.")?;
            }
            Some(Transition::Unchanged) => {
                writeln!(out, "Task {id} is already {target}.")?;
            }
            None => {}
        }
    }
    Ok(())
}

#[instrument(skip(session, renderer, out))]
fn cmd_dashboard<W: Write>(
    session: &Session,
    renderer: &Renderer,
    today: NaiveDate,
    out: &mut W,
) -> anyhow::Result<()> {
    let tasks = session.tasks.snapshot();
    let stats = task_stats(tasks, today, session.upcoming_days);
    let upcoming: Vec<&Task> = upcoming_deadlines(tasks, today, session.upcoming_days)
        .into_iter()
        .take(session.upcoming_limit)
        .collect();
    let clients = client_summary(session.clients.snapshot());

    renderer.dashboard(out, &stats, &upcoming, &clients)
}

#[instrument(skip(session, args, out))]
fn cmd_export<W: Write>(session: &Session, args: &[String], out: &mut W) -> anyhow::Result<()> {
    let Some((kind, terms)) = args.split_first() else {
        return Err(anyhow!("export requires `clients` or `tasks`"));
    };

    let json = match kind.as_str() {
        "clients" => export_json(session.clients.snapshot(), &session.client_filter, terms)?,
        "tasks" => export_json(session.tasks.snapshot(), &session.task_filter, terms)?,
        other => return Err(anyhow!("cannot export {other}; expected clients or tasks")),
    };

    writeln!(out, "{json}")?;
    Ok(())
}

fn export_json<T>(records: &[T], current: &FilterFor<T>, terms: &[String]) -> anyhow::Result<String>
where
    T: Filterable + serde::Serialize,
{
    let rows = if terms.is_empty() {
        current.apply(records)
    } else {
        parse_terms::<T>(terms)?.apply(records)
    };
    info!(rows = rows.len(), "exporting");
    Ok(serde_json::to_string(&rows)?)
}

fn cmd_commands<W: Write>(out: &mut W) -> anyhow::Result<()> {
    for command in known_command_names() {
        writeln!(out, "{command}")?;
    }
    Ok(())
}

fn cmd_show<W: Write>(cfg: &Config, out: &mut W) -> anyhow::Result<()> {
    for (k, v) in cfg.iter() {
        writeln!(out, "{k}={v}")?;
    }
    Ok(())
}

fn cmd_help<W: Write>(out: &mut W) -> anyhow::Result<()> {
    writeln!(
        out,
        "Commands: clients, tasks, reset, add-client, add-task, complete, cancel, dashboard, export, shell, help, version"
    )?;
    writeln!(
        out,
        "Filter terms: status:<v>[,<v>] industry:<v> priority:<v> view:<mode> day:<date> <search words>"
    )?;
    Ok(())
}

/// Parses `key:value` assignments. A token without a recognised key
/// continues the previous value, so `title:Call Acme` works unquoted.
fn parse_fields(args: &[String], allowed: &[&str]) -> anyhow::Result<BTreeMap<String, String>> {
    let mut fields: BTreeMap<String, String> = BTreeMap::new();
    let mut last: Option<String> = None;

    for arg in args {
        if let Some((key, value)) = arg.split_once(':') {
            let key = key.to_ascii_lowercase();
            if allowed.contains(&key.as_str()) {
                if fields.insert(key.clone(), value.trim().to_string()).is_some() {
                    return Err(anyhow!("field {key} given more than once"));
                }
                last = Some(key);
                continue;
            }
        }

        let Some(key) = &last else {
            return Err(anyhow!(
                "unexpected argument {arg}; expected one of {}",
                allowed.join(", ")
            ));
        };
        if let Some(value) = fields.get_mut(key) {
            if !value.is_empty() {
                value.push(' ');
            }
            value.push_str(arg);
        }
    }

    Ok(fields)
}

fn take_required(fields: &mut BTreeMap<String, String>, key: &str) -> anyhow::Result<String> {
    match fields.remove(key) {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(anyhow!("{key} is required")),
    }
}

fn slug(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}
