use std::path::PathBuf;
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_path(file_name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("planner-{nanos}-{file_name}"))
}

fn write_store(path: &PathBuf, tasks: serde_json::Value) {
    let content = serde_json::json!({
        "schema_version": 1,
        "tasks": tasks
    });
    std::fs::write(path, serde_json::to_string_pretty(&content).unwrap()).unwrap();
}

fn mixed_store(path: &PathBuf) {
    write_store(
        path,
        serde_json::json!([
            { "id": "late", "text": "Review", "category": "WORK", "date": "2024-01-03", "time": "14:00", "created_at": 1 },
            { "id": "loose", "text": "Inbox", "category": "WORK", "date": "2024-01-03", "created_at": 2 },
            { "id": "early", "text": "Standup", "category": "WORK", "date": "2024-01-03", "time": "09:00", "created_at": 3 },
            { "id": "done", "text": "Email", "category": "WORK", "date": "2024-01-03", "completed": true, "created_at": 0 },
            { "id": "home", "text": "Groceries", "category": "FAMILY", "date": "2024-01-03", "created_at": 4 },
            { "id": "next", "text": "Plan", "category": "WORK", "date": "2024-01-04", "created_at": 5 },
            { "id": "trip", "text": "Trip", "category": "FAMILY", "date": "2024-01-20", "created_at": 6 },
            { "id": "dream", "text": "Write a book", "category": "LONG_TERM", "created_at": 7 }
        ]),
    );
}

fn run(store_path: &PathBuf, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_planner"))
        .args(args)
        .env("PLANNER_STORE_PATH", store_path)
        .env("PLANNER_CONFIG_PATH", temp_path("missing-config.json"))
        .output()
        .expect("failed to run planner")
}

fn json_ids(output: &Output) -> Vec<String> {
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    value
        .as_array()
        .expect("json array")
        .iter()
        .map(|task| task["id"].as_str().unwrap().to_string())
        .collect()
}

#[test]
fn day_view_sorts_timed_then_open_then_created() {
    let store_path = temp_path("list-day.json");
    mixed_store(&store_path);

    let output = run(
        &store_path,
        &["--json", "--today", "2024-01-03", "list", "day", "-c", "work"],
    );
    std::fs::remove_file(&store_path).ok();

    assert!(output.status.success());
    assert_eq!(json_ids(&output), ["early", "late", "loose", "done"]);
}

#[test]
fn day_view_accepts_explicit_date() {
    let store_path = temp_path("list-date.json");
    mixed_store(&store_path);

    let output = run(
        &store_path,
        &["--json", "list", "day", "-c", "work", "--date", "2024-01-04"],
    );
    std::fs::remove_file(&store_path).ok();

    assert!(output.status.success());
    assert_eq!(json_ids(&output), ["next"]);
}

#[test]
fn day_view_without_category_shows_both_sections() {
    let store_path = temp_path("list-sections.json");
    mixed_store(&store_path);

    let output = run(&store_path, &["list", "day", "--today", "2024-01-04"]);
    std::fs::remove_file(&store_path).ok();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("WORK (1)"));
    assert!(stdout.contains("Plan"));
    assert!(stdout.contains("FAMILY: nothing scheduled"));
}

#[test]
fn long_term_view_ignores_dates() {
    let store_path = temp_path("list-long-term.json");
    mixed_store(&store_path);

    let output = run(&store_path, &["--json", "list", "long-term"]);
    std::fs::remove_file(&store_path).ok();

    assert!(output.status.success());
    assert_eq!(json_ids(&output), ["dream"]);
}

#[test]
fn upcoming_counts_following_days() {
    let store_path = temp_path("upcoming.json");
    mixed_store(&store_path);

    let output = run(&store_path, &["--json", "--today", "2024-01-02", "upcoming"]);
    std::fs::remove_file(&store_path).ok();

    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let days = value.as_array().unwrap();
    assert_eq!(days.len(), 3);
    assert_eq!(days[0]["date"], "2024-01-03");
    assert_eq!(days[0]["work"], 4);
    assert_eq!(days[0]["family"], 1);
    assert_eq!(days[1]["date"], "2024-01-04");
    assert_eq!(days[1]["work"], 1);
    assert_eq!(days[2]["work"], 0);
}

#[test]
fn upcoming_honours_configured_days() {
    let store_path = temp_path("upcoming-config.json");
    mixed_store(&store_path);

    let output = run(
        &store_path,
        &[
            "--json",
            "--config-override",
            "upcoming_days=7",
            "--today",
            "2024-01-02",
            "upcoming",
        ],
    );
    std::fs::remove_file(&store_path).ok();

    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value.as_array().unwrap().len(), 7);
}

#[test]
fn calendar_marks_days_with_tasks() {
    let store_path = temp_path("calendar.json");
    mixed_store(&store_path);

    let output = run(&store_path, &["--json", "calendar", "2024-01"]);
    std::fs::remove_file(&store_path).ok();

    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let markers = value.as_array().unwrap();
    let dates: Vec<&str> = markers.iter().map(|m| m["date"].as_str().unwrap()).collect();
    assert_eq!(dates, ["2024-01-03", "2024-01-04", "2024-01-20"]);
    assert_eq!(markers[0]["categories"], serde_json::json!(["WORK", "FAMILY"]));
}

#[test]
fn calendar_rejects_malformed_month() {
    let store_path = temp_path("calendar-bad.json");
    let output = run(&store_path, &["calendar", "2024-13"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ERROR: invalid_input"));
}
