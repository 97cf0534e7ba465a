use std::collections::BTreeSet;

use chrono::{DateTime, Days, TimeZone, Utc};
use crm_core::client::{ClientDraft, ClientStatus, Industry};
use crm_core::filter::filter_entities;
use crm_core::session::Session;
use crm_core::stats::{completion_rate, overdue_count, task_stats, upcoming_deadlines};
use crm_core::store::EntityStore;
use crm_core::task::{Task, TaskDraft, TaskPriority, TaskStatus, TransitionPolicy};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 6, 21, 9, 30, 0)
        .single()
        .expect("valid now")
}

fn draft(title: &str, due_offset: i64) -> TaskDraft {
    let today = now().date_naive();
    let due_date = if due_offset < 0 {
        today - Days::new(due_offset.unsigned_abs())
    } else {
        today + Days::new(due_offset.unsigned_abs())
    };
    TaskDraft {
        title: title.to_string(),
        description: None,
        priority: TaskPriority::Medium,
        due_date,
        assignee: None,
        project: None,
        tags: BTreeSet::new(),
    }
}

#[test]
fn overdue_and_upcoming_follow_today() {
    let mut store: EntityStore<Task> = EntityStore::new();
    store.add_task(draft("late", -1), now()).expect("add late");
    store.add_task(draft("soon", 2), now()).expect("add soon");

    let tasks = store.snapshot();
    let today = now().date_naive();
    assert_eq!(overdue_count(tasks, today), 1);

    let upcoming: Vec<&str> = upcoming_deadlines(tasks, today, 7)
        .into_iter()
        .map(|t| t.title.as_str())
        .collect();
    assert_eq!(upcoming, vec!["soon"]);
    assert_eq!(completion_rate(&[]), 0);
}

#[test]
fn seeded_session_flow() {
    let mut session = Session::with_records(
        crm_core::seed::clients(),
        crm_core::seed::tasks(),
    )
    .expect("session");

    let before = session.clients.len();
    session
        .clients
        .add_client(ClientDraft {
            name: "Grace Hopper".to_string(),
            company: "Compiler Works".to_string(),
            email: "grace@compiler.works".to_string(),
            phone: "(555) 000-1952".to_string(),
            status: ClientStatus::New,
            industry: Industry::Technology,
            last_contact: now().date_naive(),
            avatar: None,
        })
        .expect("add client");
    assert_eq!(session.clients.len(), before + 1);
    let first = &session.clients.snapshot()[0];
    assert_eq!(first.name, "Grace Hopper");
    assert_eq!((first.projects, first.revenue), (0, 0));

    session.client_filter.set_search("COMPILER");
    session.client_filter.toggle_category(Industry::Technology, true);
    let visible: Vec<&str> = session
        .visible_clients()
        .into_iter()
        .map(|c| c.id.as_str())
        .collect();
    assert_eq!(visible, vec![first.id.as_str()]);

    session.task_filter.toggle_status(TaskStatus::Todo, true);
    let todo = filter_entities(session.tasks.snapshot(), &session.task_filter);
    assert_eq!(filter_entities(&todo, &session.task_filter), todo);
    assert_eq!(todo.len(), 3);

    session.complete_task("3", now()).expect("complete");
    session.complete_task("3", now()).expect("repeat complete");
    let task = session.tasks.get("3").expect("task 3");
    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(task.completed_at, Some(now()));
    assert_eq!(session.visible_tasks().len(), 2);

    let stats = task_stats(session.tasks.snapshot(), now().date_naive(), 7);
    assert_eq!(stats.counts.completed, 2);
    assert_eq!(stats.completion_rate, 29);
    assert_eq!(stats.upcoming, vec!["4", "2", "5"]);

    session.reset_filters();
    assert_eq!(session.visible_tasks().len(), 7);
}

#[test]
fn permissive_policy_restamps_and_leaves_terminal_states() {
    let mut session = Session::with_records(vec![], crm_core::seed::tasks()).expect("session");
    session.policy = TransitionPolicy::Permissive;

    let later = now() + chrono::Duration::hours(1);
    session.cancel_task("1", now()).expect("cancel completed");
    let task = session.tasks.get("1").expect("task 1");
    assert_eq!(task.status, TaskStatus::Canceled);
    assert!(task.completed_at.is_some());

    session.complete_task("1", later).expect("complete again");
    assert_eq!(
        session.tasks.get("1").and_then(|t| t.completed_at),
        Some(later)
    );
}
