use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info, warn};

use crate::client::Client;
use crate::config::Config;
use crate::error::StoreError;
use crate::filter::FilterFor;
use crate::seed;
use crate::stats::DEFAULT_UPCOMING_DAYS;
use crate::store::EntityStore;
use crate::task::{Task, Transition, TransitionPolicy};
use crate::view::{ClientView, TaskView};

const DEFAULT_UPCOMING_LIMIT: usize = 3;

/// Everything one dashboard run works against: the two record lists plus
/// the filter and view selections for each page.
#[derive(Debug, Default)]
pub struct Session {
    pub clients: EntityStore<Client>,
    pub tasks: EntityStore<Task>,
    pub client_filter: FilterFor<Client>,
    pub task_filter: FilterFor<Task>,
    pub client_view: ClientView,
    pub task_view: TaskView,
    pub selected_day: Option<NaiveDate>,
    pub policy: TransitionPolicy,
    pub upcoming_days: u64,
    pub upcoming_limit: usize,
}

impl Session {
    #[tracing::instrument(skip(cfg))]
    pub fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        let seeded = cfg.get_bool("seed").unwrap_or(true);
        let mut session = if seeded {
            Self::with_records(seed::clients(), seed::tasks())?
        } else {
            debug!("seed disabled; starting empty");
            Self::with_records(vec![], vec![])?
        };

        session.client_view = cfg.get_parsed("view.clients")?.unwrap_or_default();
        session.task_view = cfg.get_parsed("view.tasks")?.unwrap_or_default();
        session.policy = cfg.get_parsed("tasks.transitions")?.unwrap_or_default();
        session.upcoming_days = cfg
            .get_parsed("upcoming.days")?
            .unwrap_or(DEFAULT_UPCOMING_DAYS);
        session.upcoming_limit = cfg
            .get_parsed("upcoming.limit")?
            .unwrap_or(DEFAULT_UPCOMING_LIMIT);

        info!(
            clients = session.clients.len(),
            tasks = session.tasks.len(),
            policy = ?session.policy,
            "session ready"
        );
        Ok(session)
    }

    pub fn with_records(clients: Vec<Client>, tasks: Vec<Task>) -> Result<Self, StoreError> {
        Ok(Self {
            clients: EntityStore::seeded(clients)?,
            tasks: EntityStore::seeded(tasks)?,
            upcoming_days: DEFAULT_UPCOMING_DAYS,
            upcoming_limit: DEFAULT_UPCOMING_LIMIT,
            ..Self::default()
        })
    }

    pub fn visible_clients(&self) -> Vec<&Client> {
        self.client_filter.apply(self.clients.snapshot())
    }

    pub fn visible_tasks(&self) -> Vec<&Task> {
        self.task_filter.apply(self.tasks.snapshot())
    }

    /// Day the calendar view lists tasks for; defaults to `today`.
    pub fn calendar_day(&self, today: NaiveDate) -> NaiveDate {
        self.selected_day.unwrap_or(today)
    }

    pub fn reset_filters(&mut self) {
        self.client_filter.clear();
        self.task_filter.clear();
        self.selected_day = None;
    }

    /// `Ok(None)` when no task has `id`; the caller treats that as a no-op.
    pub fn complete_task(
        &mut self,
        id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Transition>, StoreError> {
        absent_as_none(id, self.tasks.complete(id, now, self.policy))
    }

    pub fn cancel_task(
        &mut self,
        id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Transition>, StoreError> {
        absent_as_none(id, self.tasks.cancel(id, now, self.policy))
    }
}

fn absent_as_none(
    id: &str,
    result: Result<Transition, StoreError>,
) -> Result<Option<Transition>, StoreError> {
    match result {
        Ok(transition) => Ok(Some(transition)),
        Err(err) if err.is_not_found() => {
            warn!(id = %id, "no task with that id; nothing changed");
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::Session;
    use crate::config::Config;
    use crate::error::StoreError;
    use crate::task::{TaskStatus, Transition, TransitionPolicy};
    use crate::view::{ClientView, TaskView};

    #[test]
    fn builds_from_config_defaults() {
        let session = Session::from_config(&Config::default()).expect("session");
        assert_eq!(session.clients.len(), 6);
        assert_eq!(session.tasks.len(), 7);
        assert_eq!(session.client_view, ClientView::List);
        assert_eq!(session.task_view, TaskView::List);
        assert_eq!(session.policy, TransitionPolicy::Guarded);
        assert_eq!(session.upcoming_days, 7);
        assert_eq!(session.upcoming_limit, 3);
    }

    #[test]
    fn seed_off_starts_empty() {
        let mut cfg = Config::default();
        cfg.apply_overrides(vec![
            ("seed".to_string(), "off".to_string()),
            ("view.tasks".to_string(), "calendar".to_string()),
        ]);
        let session = Session::from_config(&cfg).expect("session");
        assert!(session.clients.is_empty());
        assert!(session.tasks.is_empty());
        assert_eq!(session.task_view, TaskView::Calendar);
    }

    #[test]
    fn bad_view_setting_is_an_error() {
        let mut cfg = Config::default();
        cfg.apply_overrides(vec![("view.clients".to_string(), "board".to_string())]);
        assert!(Session::from_config(&cfg).is_err());
    }

    #[test]
    fn unknown_id_is_a_no_op() {
        let mut session = Session::from_config(&Config::default()).expect("session");
        let now = Utc
            .with_ymd_and_hms(2023, 6, 21, 9, 30, 0)
            .single()
            .expect("valid timestamp");
        let before = session.tasks.snapshot().to_vec();
        assert_eq!(session.complete_task("999", now).expect("no-op"), None);
        assert_eq!(session.tasks.snapshot(), before.as_slice());
    }

    #[test]
    fn guarded_policy_surfaces_invalid_transitions() {
        let mut session = Session::from_config(&Config::default()).expect("session");
        let now = Utc
            .with_ymd_and_hms(2023, 6, 21, 9, 30, 0)
            .single()
            .expect("valid timestamp");
        assert_eq!(
            session.cancel_task("2", now).expect("cancel"),
            Some(Transition::Applied {
                from: TaskStatus::InProgress
            })
        );
        let err = session.complete_task("7", now).expect_err("terminal");
        assert!(matches!(err, StoreError::InvalidTransition { .. }));
    }
}
