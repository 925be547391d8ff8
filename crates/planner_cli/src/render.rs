//! Plain-text and JSON renderings of tasks and views.

use planner_core::model::schedule::{format_date, format_time};
use planner_core::model::{Category, Task};
use planner_core::view::{DayMarker, DaySummary};
use tabled::{Table, Tabled};

#[derive(Tabled)]
struct TaskRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Task")]
    text: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Done")]
    done: String,
    #[tabled(rename = "Series")]
    series: String,
}

impl From<&Task> for TaskRow {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id.clone(),
            time: task.time.map(format_time).unwrap_or_else(|| "-".to_string()),
            text: task.text.clone(),
            category: task.category.to_string(),
            date: task.date.map(format_date).unwrap_or_else(|| "-".to_string()),
            done: if task.completed { "x" } else { "" }.to_string(),
            series: if task.series_id.is_some() { "yes" } else { "" }.to_string(),
        }
    }
}

#[derive(Tabled)]
struct SummaryRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Work")]
    work: usize,
    #[tabled(rename = "Family")]
    family: usize,
}

pub fn tasks_table(tasks: &[Task]) -> String {
    Table::new(tasks.iter().map(TaskRow::from)).to_string()
}

pub fn task_line(task: &Task) -> String {
    let when = match (task.date, task.time) {
        (Some(date), Some(time)) => format!(" on {} at {}", format_date(date), format_time(time)),
        (Some(date), None) => format!(" on {}", format_date(date)),
        (None, _) => String::new(),
    };
    format!("{} [{}]{} ({})", task.text, task.category, when, task.id)
}

pub fn section(category: Category, tasks: &[Task]) -> String {
    if tasks.is_empty() {
        return format!("{category}: nothing scheduled");
    }
    format!("{category} ({})\n{}", tasks.len(), tasks_table(tasks))
}

pub fn summary_table(summary: &[DaySummary]) -> String {
    let rows = summary.iter().map(|day| SummaryRow {
        date: format_date(day.date),
        work: day.work,
        family: day.family,
    });
    Table::new(rows).to_string()
}

pub fn marker_line(marker: &DayMarker) -> String {
    let categories: Vec<&str> = marker.categories.iter().map(|c| c.as_str()).collect();
    format!("{} {}", format_date(marker.date), categories.join(","))
}

pub fn tasks_json(tasks: &[Task]) -> serde_json::Value {
    serde_json::Value::Array(tasks.iter().map(task_json).collect())
}

pub fn task_json(task: &Task) -> serde_json::Value {
    serde_json::to_value(task).unwrap_or(serde_json::Value::Null)
}

pub fn summary_json(summary: &[DaySummary]) -> serde_json::Value {
    serde_json::Value::Array(
        summary
            .iter()
            .map(|day| {
                serde_json::json!({
                    "date": format_date(day.date),
                    "work": day.work,
                    "family": day.family,
                })
            })
            .collect(),
    )
}

pub fn markers_json(markers: &[DayMarker]) -> serde_json::Value {
    serde_json::Value::Array(
        markers
            .iter()
            .map(|marker| {
                serde_json::json!({
                    "date": format_date(marker.date),
                    "categories": marker.categories.iter().map(|c| c.as_str()).collect::<Vec<_>>(),
                })
            })
            .collect(),
    )
}
