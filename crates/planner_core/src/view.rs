//! Display slices derived from the flat task collection.
//!
//! Every function here recomputes from the full collection; nothing is cached.

use crate::model::{Category, Task};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use time::{Date, Duration, Month};

/// Display order: timed before untimed (earlier first), incomplete before
/// completed, older `created_at` first, then id.
pub fn compare_for_display(a: &Task, b: &Task) -> Ordering {
    let by_time = match (a.time, b.time) {
        (Some(left), Some(right)) => left.cmp(&right),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };

    by_time
        .then_with(|| a.completed.cmp(&b.completed))
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

pub fn sort_for_display(tasks: &mut [Task]) {
    tasks.sort_unstable_by(compare_for_display);
}

/// Tasks of a dated category scheduled on `date`.
pub fn day_view(tasks: &[Task], category: Category, date: Date) -> Vec<Task> {
    let mut selected: Vec<Task> = tasks
        .iter()
        .filter(|task| task.category == category && task.date == Some(date))
        .cloned()
        .collect();
    sort_for_display(&mut selected);
    selected
}

pub fn long_term_view(tasks: &[Task]) -> Vec<Task> {
    let mut selected: Vec<Task> = tasks
        .iter()
        .filter(|task| task.category == Category::LongTerm)
        .cloned()
        .collect();
    sort_for_display(&mut selected);
    selected
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaySummary {
    pub date: Date,
    pub work: usize,
    pub family: usize,
}

/// Per-day work/family counts for the `days` dates following `from`.
pub fn upcoming(tasks: &[Task], from: Date, days: u32) -> Vec<DaySummary> {
    (1..=i64::from(days))
        .filter_map(|offset| from.checked_add(Duration::days(offset)))
        .map(|date| {
            let count = |category: Category| {
                tasks
                    .iter()
                    .filter(|task| task.date == Some(date) && task.category == category)
                    .count()
            };
            DaySummary {
                date,
                work: count(Category::Work),
                family: count(Category::Family),
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayMarker {
    pub date: Date,
    pub categories: BTreeSet<Category>,
}

/// Days of the given month that have dated tasks, with the categories present.
pub fn month_markers(tasks: &[Task], year: i32, month: Month) -> Vec<DayMarker> {
    let Ok(first) = Date::from_calendar_date(year, month, 1) else {
        return Vec::new();
    };

    let mut markers = Vec::new();
    let mut current = first;
    while current.month() == month && current.year() == year {
        let categories: BTreeSet<Category> = tasks
            .iter()
            .filter(|task| task.date == Some(current))
            .map(|task| task.category)
            .collect();
        if !categories.is_empty() {
            markers.push(DayMarker {
                date: current,
                categories,
            });
        }

        match current.next_day() {
            Some(next) => current = next,
            None => break,
        }
    }

    markers
}
