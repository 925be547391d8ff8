use super::schedule::{opt_date, opt_time};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use time::{Date, OffsetDateTime, Time};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Work,
    Family,
    LongTerm,
}

impl Category {

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Work => "WORK",
            Self::Family => "FAMILY",
            Self::LongTerm => "LONG_TERM",
        }
    }

    /// Whether tasks in this category carry a calendar date.
    pub fn is_dated(self) -> bool {
        !matches!(self, Self::LongTerm)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = crate::error::AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let cleaned = raw.trim().to_ascii_uppercase().replace('-', "_");
        match cleaned.as_str() {
            "WORK" => Ok(Self::Work),
            "FAMILY" => Ok(Self::Family),
            "LONG_TERM" | "LONGTERM" => Ok(Self::LongTerm),
            _ => Err(crate::error::AppError::invalid_input(format!(
                "category must be WORK, FAMILY or LONG_TERM: {}",
                raw.trim()
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    #[serde(default, alias = "seriesId", alias = "recurringId")]
    pub series_id: Option<String>,
    pub text: String,
    pub category: Category,
    #[serde(default, with = "opt_date")]
    pub date: Option<Date>,
    #[serde(default, with = "opt_time")]
    pub time: Option<Time>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, alias = "createdAt")]
    pub created_at: i64,
}

impl Task {
    /// Builds a standalone task, enforcing the category/date invariant.
    ///
    /// `LONG_TERM` tasks never carry a date; dated categories fall back to
    /// `today` when `date` is absent.
    pub fn new(
        text: impl Into<String>,
        category: Category,
        date: Option<Date>,
        time: Option<Time>,
        today: Date,
        created_at: i64,
    ) -> Self {
        Self {
            id: new_id(),
            series_id: None,
            text: text.into(),
            category,
            date: normalize_date(category, date, today),
            time,
            completed: false,
            created_at,
        }
    }

    /// Brings a stored record back in line with its category.
    ///
    /// Returns whether the date changed.
    pub fn normalize(&mut self, today: Date) -> bool {
        let date = normalize_date(self.category, self.date, today);
        let changed = date != self.date;
        self.date = date;
        changed
    }

    pub fn in_series(&self, series_id: &str) -> bool {
        self.series_id.as_deref() == Some(series_id)
    }

    pub fn same_record(&self, other: &Task) -> bool {
        self.id == other.id
    }

    /// Applies every field of `patch`, including its date.
    pub fn apply(&mut self, patch: &TaskPatch) {
        self.text = patch.text.clone();
        self.category = patch.category;
        self.time = patch.time;
        self.date = patch.date;
    }

    /// Applies text, category and time but keeps this task's own date.
    ///
    /// Moving into `LONG_TERM` still clears the date.
    pub fn apply_keeping_date(&mut self, patch: &TaskPatch) {
        self.text = patch.text.clone();
        self.category = patch.category;
        self.time = patch.time;
        if !patch.category.is_dated() {
            self.date = None;
        }
    }
}

/// Replacement values for an edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskPatch {
    pub text: String,
    pub category: Category,
    pub time: Option<Time>,
    pub date: Option<Date>,
}

impl TaskPatch {
    pub fn new(
        text: impl Into<String>,
        category: Category,
        time: Option<Time>,
        date: Option<Date>,
        today: Date,
    ) -> Self {
        Self {
            text: text.into(),
            category,
            time,
            date: normalize_date(category, date, today),
        }
    }

    /// Re-applies the category/date rule to a patch built field by field.
    pub fn normalized(mut self, today: Date) -> Self {
        self.date = normalize_date(self.category, self.date, today);
        self
    }

    /// Patch that leaves every field of `task` as it is.
    pub fn from_task(task: &Task) -> Self {
        Self {
            text: task.text.clone(),
            category: task.category,
            time: task.time,
            date: task.date,
        }
    }
}

fn normalize_date(category: Category, date: Option<Date>, today: Date) -> Option<Date> {
    if category.is_dated() {
        Some(date.unwrap_or(today))
    } else {
        None
    }
}

pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Milliseconds since the Unix epoch, the unit of `Task::created_at`.
pub fn now_millis() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}
