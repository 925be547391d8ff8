//! Session API used by front ends: a [`Planner`] bound to a [`TaskStore`].
//!
//! The session loads once at open and saves after every committed mutation.
//! A failed save is logged and kept for the caller to inspect; the in-memory
//! state is never rolled back.

use crate::config::{self, Config, ConfigOverrides};
use crate::coordinator::{AddRequest, Outcome, Planner, Resolution};
use crate::error::AppError;
use crate::model::{Category, Task, TaskPatch};
use crate::recurrence::RecurrenceRule;
use crate::scope::Scope;
use crate::storage::json_store;
use crate::storage::{JsonStore, TaskStore};
use crate::view::{self, DayMarker, DaySummary};
use time::{Date, Month, OffsetDateTime, UtcOffset};
use tracing::{debug, warn};

pub struct Session<S: TaskStore> {
    store: S,
    planner: Planner,
    config: Config,
    saved_revision: u64,
    save_error: Option<AppError>,
}

impl<S: TaskStore> Session<S> {
    /// Loads the collection and repairs records whose date disagrees with
    /// their category. Repairs are saved with the next committed change.
    pub fn open(store: S, config: Config, today: Date) -> Result<Self, AppError> {
        let mut tasks = store.load()?;
        let repaired = tasks
            .iter_mut()
            .map(|task| task.normalize(today))
            .filter(|changed| *changed)
            .count();
        if repaired > 0 {
            debug!(repaired, "normalized stored task dates");
        }

        Ok(Self {
            store,
            planner: Planner::new(tasks, today),
            config,
            saved_revision: 0,
            save_error: None,
        })
    }

    pub fn planner(&self) -> &Planner {
        &self.planner
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn tasks(&self) -> &[Task] {
        self.planner.tasks()
    }

    pub fn current_date(&self) -> Date {
        self.planner.current_date()
    }

    pub fn set_current_date(&mut self, date: Date) {
        self.planner.set_current_date(date);
    }

    /// Error from the most recent failed save, if any. Clears it.
    pub fn take_save_error(&mut self) -> Option<AppError> {
        self.save_error.take()
    }

    pub fn add(&mut self, mut request: AddRequest) -> Result<Vec<Task>, AppError> {
        request.text = required_text(&request.text)?;
        // A rule with no weekdays adds one plain task, whatever its range.
        if let Some(rule) = request.recurring.as_ref().filter(|rule| !rule.has_no_days()) {
            self.check_series_span(rule)?;
        }

        let added = self.planner.add(request)?;
        self.persist();
        Ok(added)
    }

    /// Rule starting at `start` that runs for the configured default span.
    pub fn default_rule(
        &self,
        start: Date,
        days_of_week: impl IntoIterator<Item = u8>,
    ) -> Result<RecurrenceRule, AppError> {
        RecurrenceRule::with_default_end(start, self.config.recurrence_span_days, days_of_week)
    }

    pub fn toggle(&mut self, id: &str) -> Result<Outcome, AppError> {
        let outcome = self.planner.toggle(required_id(id)?)?;
        self.persist();
        Ok(outcome)
    }

    pub fn edit(&mut self, id: &str, mut patch: TaskPatch) -> Result<Outcome, AppError> {
        patch.text = required_text(&patch.text)?;
        let outcome = self.planner.edit(required_id(id)?, patch)?;
        self.persist();
        Ok(outcome)
    }

    pub fn delete(&mut self, id: &str) -> Result<Outcome, AppError> {
        let outcome = self.planner.delete(required_id(id)?)?;
        self.persist();
        Ok(outcome)
    }

    pub fn resolve(&mut self, scope: Scope) -> Resolution {
        let resolution = self.planner.resolve(scope);
        self.persist();
        resolution
    }

    pub fn resolve_named(&mut self, raw: &str) -> Resolution {
        let resolution = self.planner.resolve_named(raw);
        self.persist();
        resolution
    }

    pub fn cancel(&mut self) -> bool {
        self.planner.cancel()
    }

    /// Tasks to show for `category` on `date` (the current date when absent).
    ///
    /// `LONG_TERM` ignores the date.
    pub fn view(&self, category: Category, date: Option<Date>) -> Vec<Task> {
        match category {
            Category::LongTerm => view::long_term_view(self.planner.tasks()),
            dated => view::day_view(
                self.planner.tasks(),
                dated,
                date.unwrap_or_else(|| self.current_date()),
            ),
        }
    }

    pub fn upcoming(&self) -> Vec<DaySummary> {
        view::upcoming(
            self.planner.tasks(),
            self.current_date(),
            self.config.upcoming_days,
        )
    }

    pub fn month_markers(&self, year: i32, month: Month) -> Vec<DayMarker> {
        view::month_markers(self.planner.tasks(), year, month)
    }

    fn check_series_span(&self, rule: &RecurrenceRule) -> Result<(), AppError> {
        let limit = i64::from(self.config.max_series_days);
        if rule.span_days() > limit {
            return Err(AppError::invalid_input(format!(
                "recurrence spans {} days, more than the limit of {limit}",
                rule.span_days()
            )));
        }
        Ok(())
    }

    fn persist(&mut self) {
        let revision = self.planner.revision();
        if revision == self.saved_revision {
            return;
        }

        match self.store.save(self.planner.tasks()) {
            Ok(()) => {
                self.saved_revision = revision;
                self.save_error = None;
            }
            Err(err) => {
                warn!(error = %err, revision, "failed to save tasks");
                self.save_error = Some(err);
            }
        }
    }
}

/// Opens the JSON-backed session for the configured store location.
pub fn open_default_session(
    overrides: &ConfigOverrides,
    today: Date,
) -> Result<Session<JsonStore>, AppError> {
    let loaded = config::load_config_with_fallback();
    let config = config::merge_overrides(&loaded.config, overrides);
    let path = json_store::store_path(config.store_path.as_deref())?;
    Session::open(JsonStore::new(path), config, today)
}

pub fn local_today() -> Date {
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    OffsetDateTime::now_utc().to_offset(offset).date()
}

fn required_text(text: &str) -> Result<String, AppError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(AppError::invalid_input("text is required"));
    }
    Ok(trimmed.to_string())
}

fn required_id(id: &str) -> Result<&str, AppError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        return Err(AppError::invalid_input("id is required"));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::Session;
    use crate::config::Config;
    use crate::coordinator::{AddRequest, Outcome, Resolution};
    use crate::error::AppError;
    use crate::model::{Category, Task, TaskPatch};
    use crate::recurrence::RecurrenceRule;
    use crate::scope::Scope;
    use crate::storage::{JsonStore, MemoryStore, TaskStore, json_store};
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};
    use time::{Date, Month};

    fn temp_path(file_name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("planner-{nanos}-{file_name}"))
    }

    fn day(d: u8) -> Date {
        Date::from_calendar_date(2024, Month::April, d).unwrap()
    }

    fn session() -> Session<MemoryStore> {
        Session::open(MemoryStore::default(), Config::default(), day(1)).unwrap()
    }

    struct FailingStore;

    impl TaskStore for FailingStore {
        fn load(&self) -> Result<Vec<Task>, AppError> {
            Ok(Vec::new())
        }

        fn save(&self, _tasks: &[Task]) -> Result<(), AppError> {
            Err(AppError::io("read-only"))
        }
    }

    #[test]
    fn add_rejects_blank_text() {
        let mut session = session();
        let err = session
            .add(AddRequest::new("   ", Category::Work))
            .unwrap_err();
        assert_eq!(err.code(), "invalid_input");
        assert_eq!(session.store().save_count(), 0);
    }

    #[test]
    fn add_trims_text_and_saves() {
        let mut session = session();
        let added = session
            .add(AddRequest::new("  water plants ", Category::Family))
            .unwrap();

        assert_eq!(added[0].text, "water plants");
        assert_eq!(session.store().snapshot(), added);
        assert_eq!(session.store().save_count(), 1);
    }

    #[test]
    fn add_rejects_series_longer_than_limit() {
        let mut session = Session::open(
            MemoryStore::default(),
            Config {
                max_series_days: 10,
                ..Config::default()
            },
            day(1),
        )
        .unwrap();
        let rule = RecurrenceRule::new(day(1), day(20), [1]).unwrap();

        let err = session
            .add(AddRequest::new("report", Category::Work).with_recurrence(Some(rule)))
            .unwrap_err();
        assert_eq!(err.code(), "invalid_input");
        assert!(session.tasks().is_empty());
    }

    #[test]
    fn add_with_no_weekdays_ignores_span_limit() {
        let mut session = session();
        let end = Date::from_calendar_date(2026, Month::April, 1).unwrap();
        let rule = RecurrenceRule::new(day(1), end, std::iter::empty::<u8>()).unwrap();

        let added = session
            .add(AddRequest::new("dentist", Category::Work).with_recurrence(Some(rule)))
            .unwrap();
        assert_eq!(added.len(), 1);
        assert_eq!(added[0].series_id, None);
        assert_eq!(added[0].date, Some(day(1)));
    }

    #[test]
    fn open_normalizes_stored_dates() {
        let stored: Vec<Task> = serde_json::from_str(
            r#"[
                {"id": "w", "text": "report", "category": "WORK"},
                {"id": "l", "text": "sail", "category": "LONG_TERM", "date": "2024-04-09"}
            ]"#,
        )
        .unwrap();
        let session =
            Session::open(MemoryStore::with_tasks(stored), Config::default(), day(1)).unwrap();

        assert_eq!(session.tasks()[0].date, Some(day(1)));
        assert_eq!(session.tasks()[1].date, None);
        assert_eq!(session.view(Category::Work, None).len(), 1);
        assert_eq!(session.store().save_count(), 0);
    }

    #[test]
    fn default_rule_uses_configured_span() {
        let session = session();
        let rule = session.default_rule(day(1), [1]).unwrap();
        assert_eq!(rule.end_date, day(1) + time::Duration::days(30));
    }

    #[test]
    fn pending_scope_is_not_saved_until_resolved() {
        let mut session = session();
        // 2024-04-01 is a Monday: Mondays through the 29th give five instances.
        let rule = RecurrenceRule::new(day(1), day(29), [1]).unwrap();
        let added = session
            .add(AddRequest::new("1:1", Category::Work).with_recurrence(Some(rule)))
            .unwrap();
        assert_eq!(added.len(), 5);
        assert_eq!(session.store().save_count(), 1);

        let outcome = session.delete(&added[1].id).unwrap();
        assert!(matches!(outcome, Outcome::AwaitingScope(_)));
        assert_eq!(session.store().save_count(), 1);

        assert!(session.cancel());
        assert_eq!(session.store().save_count(), 1);

        session.delete(&added[1].id).unwrap();
        let resolution = session.resolve(Scope::Single);
        assert!(matches!(resolution, Resolution::Resolved { affected: 1, .. }));
        assert_eq!(session.store().save_count(), 2);
        assert_eq!(session.store().snapshot().len(), 4);
    }

    #[test]
    fn edit_rejects_blank_text_and_id() {
        let mut session = session();
        let added = session.add(AddRequest::new("a", Category::Work)).unwrap();

        let patch = TaskPatch::new(" ", Category::Work, None, None, day(1));
        assert_eq!(
            session.edit(&added[0].id, patch).unwrap_err().code(),
            "invalid_input"
        );

        let patch = TaskPatch::new("b", Category::Work, None, None, day(1));
        assert_eq!(session.edit("  ", patch).unwrap_err().code(), "invalid_input");
    }

    #[test]
    fn no_op_toggle_does_not_save() {
        let mut session = session();
        assert_eq!(session.toggle("missing").unwrap(), Outcome::NotFound);
        assert_eq!(session.store().save_count(), 0);
    }

    #[test]
    fn failed_save_keeps_memory_state_and_reports() {
        let mut session = Session::open(FailingStore, Config::default(), day(1)).unwrap();
        let added = session.add(AddRequest::new("x", Category::Work)).unwrap();

        assert_eq!(session.tasks(), added.as_slice());
        let err = session.take_save_error().expect("save error kept");
        assert_eq!(err.code(), "io_error");
        assert!(session.take_save_error().is_none());
    }

    #[test]
    fn view_routes_long_term_and_dated_categories() {
        let mut session = session();
        session.add(AddRequest::new("work", Category::Work)).unwrap();
        session
            .add(AddRequest::new("later", Category::Work).with_date(Some(day(2))))
            .unwrap();
        session.add(AddRequest::new("dream", Category::LongTerm)).unwrap();

        assert_eq!(session.view(Category::Work, None).len(), 1);
        assert_eq!(session.view(Category::Work, Some(day(2))).len(), 1);
        assert_eq!(session.view(Category::LongTerm, Some(day(2))).len(), 1);

        let upcoming = session.upcoming();
        assert_eq!(upcoming.len(), 3);
        assert_eq!(upcoming[0].work, 1);
    }

    #[test]
    fn json_session_persists_between_opens() {
        let path = temp_path("session.json");
        let mut session = Session::open(JsonStore::new(&path), Config::default(), day(1)).unwrap();
        let added = session.add(AddRequest::new("persist me", Category::Family)).unwrap();
        session.toggle(&added[0].id).unwrap();

        let reopened = Session::open(JsonStore::new(&path), Config::default(), day(1)).unwrap();
        let on_disk = json_store::load_tasks(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(reopened.tasks().len(), 1);
        assert!(reopened.tasks()[0].completed);
        assert_eq!(on_disk, reopened.tasks());
    }
}
