//! In-memory planner state and the add/edit/delete/toggle entry points.
//!
//! Edits and deletes on series members do not mutate right away: the planner
//! moves to [`PlannerState::AwaitingScope`] and waits for [`Planner::resolve`]
//! or [`Planner::cancel`]. Every committed mutation swaps in a complete new
//! collection and bumps [`Planner::revision`].

use crate::error::AppError;
use crate::model::{Category, Task, TaskPatch, now_millis};
use crate::recurrence::{self, RecurrenceRule, SeriesTemplate};
use crate::scope::{self, PendingAction, Scope};
use crate::view;
use time::{Date, Time};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddRequest {
    pub text: String,
    pub category: Category,
    pub time: Option<Time>,
    pub recurring: Option<RecurrenceRule>,
    pub date: Option<Date>,
}

impl AddRequest {
    pub fn new(text: impl Into<String>, category: Category) -> Self {
        Self {
            text: text.into(),
            category,
            time: None,
            recurring: None,
            date: None,
        }
    }

    pub fn with_time(mut self, time: Option<Time>) -> Self {
        self.time = time;
        self
    }

    pub fn with_date(mut self, date: Option<Date>) -> Self {
        self.date = date;
        self
    }

    pub fn with_recurrence(mut self, rule: Option<RecurrenceRule>) -> Self {
        self.recurring = rule;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PlannerState {
    #[default]
    Idle,
    AwaitingScope(PendingAction),
}

/// Result of `toggle`, `edit` and `delete`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The collection changed; carries the task as it now is (or was, for deletes).
    Applied(Task),
    /// The task belongs to a series; a scope decision is now pending.
    AwaitingScope(Task),
    /// No task has that id. Nothing changed.
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved { scope: Scope, affected: usize },
    UnknownScope,
    NothingPending,
}

#[derive(Debug, Clone)]
pub struct Planner {
    tasks: Vec<Task>,
    state: PlannerState,
    current_date: Date,
    revision: u64,
}

impl Planner {
    pub fn new(tasks: Vec<Task>, current_date: Date) -> Self {
        Self {
            tasks,
            state: PlannerState::Idle,
            current_date,
            revision: 0,
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn state(&self) -> &PlannerState {
        &self.state
    }

    pub fn pending(&self) -> Option<&PendingAction> {
        match &self.state {
            PlannerState::AwaitingScope(action) => Some(action),
            PlannerState::Idle => None,
        }
    }

    /// Counter of committed mutations since construction.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn current_date(&self) -> Date {
        self.current_date
    }

    pub fn set_current_date(&mut self, date: Date) {
        self.current_date = date;
    }

    pub fn find(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn day_view(&self, category: Category) -> Vec<Task> {
        view::day_view(&self.tasks, category, self.current_date())
    }

    pub fn long_term_view(&self) -> Vec<Task> {
        view::long_term_view(&self.tasks)
    }

    /// Adds one task, or a whole series when a non-empty rule is given.
    ///
    /// A rule with no weekdays, or one that produces no dates, falls back to
    /// a single task so the request never silently vanishes.
    pub fn add(&mut self, request: AddRequest) -> Result<Vec<Task>, AppError> {
        self.ensure_idle()?;
        let created_at = now_millis();
        let today = self.current_date();

        let added = if request.category == Category::LongTerm {
            vec![Task::new(
                request.text,
                Category::LongTerm,
                None,
                None,
                today,
                created_at,
            )]
        } else {
            let rule = request.recurring.filter(|rule| !rule.has_no_days());
            let series = match &rule {
                Some(rule) => recurrence::expand(
                    &SeriesTemplate {
                        text: request.text.clone(),
                        category: request.category,
                        time: request.time,
                    },
                    rule,
                    created_at,
                ),
                None => Vec::new(),
            };

            if series.is_empty() {
                if rule.is_some() {
                    debug!("recurrence produced no dates, adding a single task");
                }
                let fallback_date = request
                    .date
                    .or_else(|| rule.as_ref().map(|rule| rule.start_date));
                vec![Task::new(
                    request.text,
                    request.category,
                    fallback_date,
                    request.time,
                    today,
                    created_at,
                )]
            } else {
                series
            }
        };

        let mut next = self.tasks.clone();
        next.extend(added.iter().cloned());
        self.commit(next);
        info!(count = added.len(), "added tasks");

        Ok(added)
    }

    /// Flips completion on one task. Series membership is irrelevant here.
    pub fn toggle(&mut self, id: &str) -> Result<Outcome, AppError> {
        self.ensure_idle()?;
        let Some(index) = self.index_of(id) else {
            return Ok(Outcome::NotFound);
        };

        let mut next = self.tasks.clone();
        next[index].completed = !next[index].completed;
        let toggled = next[index].clone();
        self.commit(next);
        info!(id = %toggled.id, completed = toggled.completed, "toggled task");

        Ok(Outcome::Applied(toggled))
    }

    pub fn edit(&mut self, id: &str, patch: TaskPatch) -> Result<Outcome, AppError> {
        self.ensure_idle()?;
        let Some(index) = self.index_of(id) else {
            return Ok(Outcome::NotFound);
        };

        let patch = patch.normalized(self.current_date);
        let target = self.tasks[index].clone();
        if let Some(action) = PendingAction::edit(target.clone(), patch.clone()) {
            debug!(id = %target.id, "edit on series member awaits scope");
            self.state = PlannerState::AwaitingScope(action);
            return Ok(Outcome::AwaitingScope(target));
        }

        let mut next = self.tasks.clone();
        next[index].apply(&patch);
        let edited = next[index].clone();
        self.commit(next);
        info!(id = %edited.id, "edited task");

        Ok(Outcome::Applied(edited))
    }

    pub fn delete(&mut self, id: &str) -> Result<Outcome, AppError> {
        self.ensure_idle()?;
        let Some(index) = self.index_of(id) else {
            return Ok(Outcome::NotFound);
        };

        let target = self.tasks[index].clone();
        if let Some(action) = PendingAction::delete(target.clone()) {
            debug!(id = %target.id, "delete on series member awaits scope");
            self.state = PlannerState::AwaitingScope(action);
            return Ok(Outcome::AwaitingScope(target));
        }

        let mut next = self.tasks.clone();
        let removed = next.remove(index);
        self.commit(next);
        info!(id = %removed.id, "deleted task");

        Ok(Outcome::Applied(removed))
    }

    /// Applies the pending action under `scope` and returns to idle.
    pub fn resolve(&mut self, scope: Scope) -> Resolution {
        let PlannerState::AwaitingScope(action) = std::mem::take(&mut self.state) else {
            return Resolution::NothingPending;
        };

        let next = scope::resolve(&self.tasks, &action, scope);
        let affected = count_affected(&self.tasks, &next);
        self.commit(next);
        info!(scope = %scope, affected, "resolved pending series action");

        Resolution::Resolved { scope, affected }
    }

    /// Like [`Planner::resolve`] but takes a scope name.
    ///
    /// An unrecognised name drops the pending action without touching tasks.
    pub fn resolve_named(&mut self, raw: &str) -> Resolution {
        match Scope::parse(raw) {
            Some(scope) => self.resolve(scope),
            None => match std::mem::take(&mut self.state) {
                PlannerState::Idle => Resolution::NothingPending,
                PlannerState::AwaitingScope(_) => {
                    debug!(scope = raw, "unknown scope, pending action dropped");
                    Resolution::UnknownScope
                }
            },
        }
    }

    /// Discards the pending action. Returns whether one was pending.
    pub fn cancel(&mut self) -> bool {
        let was_pending = matches!(self.state, PlannerState::AwaitingScope(_));
        self.state = PlannerState::Idle;
        was_pending
    }

    fn ensure_idle(&self) -> Result<(), AppError> {
        match &self.state {
            PlannerState::Idle => Ok(()),
            PlannerState::AwaitingScope(action) => Err(AppError::invalid_state(format!(
                "a scope decision is pending for task {}",
                action.target().id
            ))),
        }
    }

    fn index_of(&self, id: &str) -> Option<usize> {
        let id = id.trim();
        self.tasks.iter().position(|task| task.id == id)
    }

    fn commit(&mut self, next: Vec<Task>) {
        self.tasks = next;
        self.revision += 1;
    }
}

/// Tasks removed plus tasks whose contents changed.
fn count_affected(before: &[Task], after: &[Task]) -> usize {
    before
        .iter()
        .filter(|old| match after.iter().find(|new| new.same_record(old)) {
            Some(new) => new != *old,
            None => true,
        })
        .count()
}
