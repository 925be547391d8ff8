//! Resolution of edit and delete actions against a whole series.
//!
//! A series has no record of its own: it is every task sharing a series id.
//! An action on one instance is widened to its siblings according to a
//! [`Scope`], and the result is a complete replacement collection.

use crate::model::{Task, TaskPatch};
use std::fmt;
use std::str::FromStr;
use time::Date;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Only the instance acted on.
    Single,
    /// The instance acted on and every sibling dated on or after it.
    Future,
    /// Every instance of the series.
    All,
}

impl Scope {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Single => "SINGLE",
            Self::Future => "FUTURE",
            Self::All => "ALL",
        }
    }

    /// Case-insensitive lookup; `None` for anything outside the three scopes.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "SINGLE" => Some(Self::Single),
            "FUTURE" => Some(Self::Future),
            "ALL" => Some(Self::All),
            _ => None,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = crate::error::AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::parse(raw).ok_or_else(|| {
            crate::error::AppError::invalid_input(format!(
                "scope must be SINGLE, FUTURE or ALL: {}",
                raw.trim()
            ))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionKind {
    Edit(TaskPatch),
    Delete,
}

/// An edit or delete on a series member, waiting for a scope.
///
/// Only constructible from a task that belongs to a series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAction {
    kind: ActionKind,
    target: Task,
    series_id: String,
}

impl PendingAction {
    pub fn edit(target: Task, patch: TaskPatch) -> Option<Self> {
        Self::for_series_member(ActionKind::Edit(patch), target)
    }

    pub fn delete(target: Task) -> Option<Self> {
        Self::for_series_member(ActionKind::Delete, target)
    }

    fn for_series_member(kind: ActionKind, target: Task) -> Option<Self> {
        let series_id = target.series_id.clone()?;
        Some(Self {
            kind,
            target,
            series_id,
        })
    }

    pub fn target(&self) -> &Task {
        &self.target
    }

    pub fn is_delete(&self) -> bool {
        matches!(self.kind, ActionKind::Delete)
    }

    /// Boundary for `Scope::Future`. An absent date sorts before every date.
    pub fn cutoff(&self) -> Option<Date> {
        self.target.date
    }
}

/// Applies `action` under `scope` and returns the new collection.
pub fn resolve(tasks: &[Task], action: &PendingAction, scope: Scope) -> Vec<Task> {
    let resolved = match &action.kind {
        ActionKind::Delete => resolve_delete(tasks, action, scope),
        ActionKind::Edit(patch) => resolve_edit(tasks, action, patch, scope),
    };

    debug!(
        series_id = %action.series_id,
        target = %action.target.id,
        scope = %scope,
        delete = action.is_delete(),
        before = tasks.len(),
        after = resolved.len(),
        "resolved series action"
    );

    resolved
}

fn resolve_delete(tasks: &[Task], action: &PendingAction, scope: Scope) -> Vec<Task> {
    let target_id = action.target.id.as_str();
    let series_id = action.series_id.as_str();
    let cutoff = action.cutoff();

    tasks
        .iter()
        .filter(|task| {
            let removed = match scope {
                Scope::Single => task.id == target_id,
                Scope::All => task.in_series(series_id),
                Scope::Future => {
                    task.id == target_id
                        || (task.in_series(series_id)
                            && match task.date {
                                // Dateless members are always treated as upcoming.
                                None => true,
                                Some(date) => Some(date) >= cutoff,
                            })
                }
            };
            !removed
        })
        .cloned()
        .collect()
}

fn resolve_edit(tasks: &[Task], action: &PendingAction, patch: &TaskPatch, scope: Scope) -> Vec<Task> {
    let target_id = action.target.id.as_str();
    let series_id = action.series_id.as_str();
    let cutoff = action.cutoff();

    tasks
        .iter()
        .map(|task| {
            let mut task = task.clone();
            if task.id == target_id {
                task.apply(patch);
                return task;
            }
            if scope == Scope::Single || !task.in_series(series_id) {
                return task;
            }
            if scope == Scope::Future && task.date.is_some() && task.date < cutoff {
                return task;
            }

            task.apply_keeping_date(patch);
            task
        })
        .collect()
}
