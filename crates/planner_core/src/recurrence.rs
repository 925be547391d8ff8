//! Expansion of a weekday recurrence rule into concrete task instances.
//!
//! A rule is a date range plus a set of weekday indices (0 = Sunday through
//! 6 = Saturday). Every date in the inclusive range whose weekday is in the
//! set becomes one task. All instances of one expansion share a freshly
//! generated series id and one `created_at`.
//!
//! The expander itself puts no bound on the range length; callers that take
//! user input are expected to cap it (see `Config::max_series_days`).

use crate::error::AppError;
use crate::model::{Category, Task, new_id};
use std::collections::BTreeSet;
use time::{Date, Duration, Time};
use tracing::debug;

const WEEKDAY_NAMES: [&str; 7] = ["sun", "mon", "tue", "wed", "thu", "fri", "sat"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurrenceRule {
    pub start_date: Date,
    pub end_date: Date,
    pub days_of_week: BTreeSet<u8>,
}

impl RecurrenceRule {
    pub fn new(
        start_date: Date,
        end_date: Date,
        days_of_week: impl IntoIterator<Item = u8>,
    ) -> Result<Self, AppError> {
        let days_of_week: BTreeSet<u8> = days_of_week.into_iter().collect();
        if let Some(bad) = days_of_week.iter().find(|day| **day > 6) {
            return Err(AppError::invalid_input(format!(
                "weekday index must be 0-6: {bad}"
            )));
        }

        Ok(Self {
            start_date,
            end_date,
            days_of_week,
        })
    }

    /// Rule ending `span_days` after `start_date`.
    pub fn with_default_end(
        start_date: Date,
        span_days: u32,
        days_of_week: impl IntoIterator<Item = u8>,
    ) -> Result<Self, AppError> {
        let end_date = start_date
            .checked_add(Duration::days(i64::from(span_days)))
            .unwrap_or(Date::MAX);
        Self::new(start_date, end_date, days_of_week)
    }

    /// True when no weekday is selected; such a rule means "not recurring".
    pub fn has_no_days(&self) -> bool {
        self.days_of_week.is_empty()
    }

    /// Number of calendar days in the inclusive range, zero when inverted.
    pub fn span_days(&self) -> i64 {
        if self.start_date > self.end_date {
            0
        } else {
            (self.end_date - self.start_date).whole_days() + 1
        }
    }

    pub fn matches(&self, date: Date) -> bool {
        self.days_of_week
            .contains(&date.weekday().number_days_from_sunday())
    }

    pub fn occurrence_dates(&self) -> Vec<Date> {
        let mut dates = Vec::new();
        if self.has_no_days() || self.start_date > self.end_date {
            return dates;
        }

        let mut current = self.start_date;
        loop {
            if self.matches(current) {
                dates.push(current);
            }
            if current >= self.end_date {
                break;
            }
            match current.next_day() {
                Some(next) => current = next,
                None => break,
            }
        }

        dates
    }
}

/// Fields shared by every instance of a series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesTemplate {
    pub text: String,
    pub category: Category,
    pub time: Option<Time>,
}

/// Expands `rule` into dated instances of `template`.
///
/// Returns an empty vector for an empty weekday set or an inverted range.
pub fn expand(template: &SeriesTemplate, rule: &RecurrenceRule, created_at: i64) -> Vec<Task> {
    let series_id = new_id();
    let instances: Vec<Task> = rule
        .occurrence_dates()
        .into_iter()
        .map(|date| Task {
            id: new_id(),
            series_id: Some(series_id.clone()),
            text: template.text.clone(),
            category: template.category,
            date: Some(date),
            time: template.time,
            completed: false,
            created_at,
        })
        .collect();

    debug!(
        series_id = %series_id,
        span_days = rule.span_days(),
        instances = instances.len(),
        "expanded recurrence rule"
    );

    instances
}

/// Parses a weekday given as an index (`0`-`6`) or an English name/prefix.
pub fn parse_weekday(raw: &str) -> Result<u8, AppError> {
    let cleaned = raw.trim().to_ascii_lowercase();
    if let Ok(index) = cleaned.parse::<u8>() {
        if index <= 6 {
            return Ok(index);
        }
    } else if cleaned.len() >= 3 {
        if let Some(index) = WEEKDAY_NAMES
            .iter()
            .position(|name| cleaned.starts_with(name))
        {
            return Ok(index as u8);
        }
    }

    Err(AppError::invalid_input(format!(
        "weekday must be 0-6 or a day name: {}",
        raw.trim()
    )))
}

/// Parses a comma separated weekday list such as `mon,wed,fri` or `1,3,5`.
pub fn parse_weekdays(raw: &str) -> Result<BTreeSet<u8>, AppError> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(parse_weekday)
        .collect()
}
