use clap::{CommandFactory, Parser};
use planner_cli::cli::{Cli, Command, ListCommand, collect_overrides};
use planner_cli::render;
use planner_core::config::ConfigOverrides;
use planner_core::coordinator::{AddRequest, Outcome, Resolution};
use planner_core::error::AppError;
use planner_core::model::schedule::{parse_date, parse_time};
use planner_core::model::{Category, Task, TaskPatch};
use planner_core::recurrence::{RecurrenceRule, parse_weekdays};
use planner_core::scope::Scope;
use planner_core::storage::JsonStore;
use planner_core::task_api::{self, Session};
use std::io::{self, BufRead};
use time::{Date, Month};
use tracing_subscriber::EnvFilter;

type PlannerSession = Session<JsonStore>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    OneShot,
    Interactive,
}

fn print_tasks(tasks: &[Task], json: bool) {
    if json {
        println!("{}", render::tasks_json(tasks));
    } else if tasks.is_empty() {
        println!("No tasks.");
    } else {
        println!("{}", render::tasks_table(tasks));
    }
}

fn print_added(tasks: &[Task], json: bool) {
    if json {
        println!("{}", render::tasks_json(tasks));
        return;
    }

    match tasks {
        [single] => println!("Added task: {}", render::task_line(single)),
        [first, ..] => println!(
            "Added series of {} tasks: {} [{}] ({})",
            tasks.len(),
            first.text,
            first.category,
            first.series_id.as_deref().unwrap_or("-")
        ),
        [] => println!("Nothing added."),
    }
}

fn print_not_found(id: &str, json: bool) {
    if json {
        println!("{}", serde_json::json!({ "status": "not_found", "id": id.trim() }));
    } else {
        println!("No task with id {}", id.trim());
    }
}

fn print_resolution(resolution: &Resolution, json: bool) {
    if json {
        let payload = match resolution {
            Resolution::Resolved { scope, affected } => serde_json::json!({
                "status": "resolved",
                "scope": scope.as_str(),
                "affected": affected,
            }),
            Resolution::UnknownScope => serde_json::json!({ "status": "unknown_scope" }),
            Resolution::NothingPending => serde_json::json!({ "status": "nothing_pending" }),
        };
        println!("{payload}");
        return;
    }

    match resolution {
        Resolution::Resolved { scope, affected } => {
            println!("Applied to {scope}: {affected} task(s) affected")
        }
        Resolution::UnknownScope => println!("Unknown scope; the pending change was dropped"),
        Resolution::NothingPending => println!("Nothing is waiting for a scope decision"),
    }
}

fn prompt_for_scope(task: &Task, action: &str, json: bool) {
    if json {
        println!(
            "{}",
            serde_json::json!({
                "status": "awaiting_scope",
                "action": action,
                "task": render::task_json(task),
            })
        );
    } else {
        println!(
            "{} belongs to a series. Apply the {action} with: scope single | scope future | scope all (or cancel)",
            render::task_line(task)
        );
    }
}

/// First line of a clap error as an `invalid_input` message.
fn normalize_parse_error(err: clap::Error) -> AppError {
    let rendered = err.to_string();
    let first_line = rendered.lines().next().unwrap_or("invalid command").trim();
    let message = first_line.strip_prefix("error: ").unwrap_or(first_line);
    AppError::invalid_input(message.to_string())
}

/// Splits a REPL line into arguments. Single or double quotes group words;
/// inside quotes a backslash escapes the open quote or another backslash.
fn split_command_line(line: &str) -> Result<Vec<String>, AppError> {
    let mut args = Vec::new();
    let mut current: Option<String> = None;
    let mut quote: Option<char> = None;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match quote {
            Some(open) if ch == '\\' => match chars.peek() {
                Some(&next) if next == open || next == '\\' => {
                    current.get_or_insert_with(String::new).push(next);
                    chars.next();
                }
                _ => current.get_or_insert_with(String::new).push(ch),
            },
            Some(open) if ch == open => quote = None,
            Some(_) => current.get_or_insert_with(String::new).push(ch),
            None if ch == '"' || ch == '\'' => {
                quote = Some(ch);
                current.get_or_insert_with(String::new);
            }
            None if ch.is_whitespace() => args.extend(current.take()),
            None => current.get_or_insert_with(String::new).push(ch),
        }
    }

    if quote.is_some() {
        return Err(AppError::invalid_input("unterminated quote in command"));
    }
    args.extend(current);
    Ok(args)
}

/// What one REPL line asks for.
#[derive(Debug)]
enum LineAction {
    Skip,
    Quit,
    Help,
    Run(Box<Cli>),
}

fn parse_line(line: &str) -> Result<LineAction, AppError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(LineAction::Skip);
    }
    if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
        return Ok(LineAction::Quit);
    }
    if line == "help" || line == "?" {
        return Ok(LineAction::Help);
    }

    let args = split_command_line(line)?;
    if args.is_empty() {
        return Ok(LineAction::Skip);
    }

    let argv = std::iter::once("planner".to_string()).chain(args);
    let cli = Cli::try_parse_from(argv).map_err(normalize_parse_error)?;
    Ok(LineAction::Run(Box::new(cli)))
}

fn print_help() {
    let mut cmd = Cli::command();
    let help = cmd.render_help();
    println!("{help}");
}

fn parse_optional_date(raw: Option<&str>) -> Result<Option<Date>, AppError> {
    raw.map(parse_date).transpose()
}

fn parse_month(raw: &str) -> Result<(i32, Month), AppError> {
    let invalid = || AppError::invalid_input(format!("month must be YYYY-MM: {}", raw.trim()));
    let (year, month) = raw.trim().split_once('-').ok_or_else(invalid)?;
    let year: i32 = year.parse().map_err(|_| invalid())?;
    let month: u8 = month.parse().map_err(|_| invalid())?;
    let month = Month::try_from(month).map_err(|_| invalid())?;
    Ok((year, month))
}

fn build_rule(
    session: &PlannerSession,
    repeat: Option<&str>,
    from: Option<&str>,
    until: Option<&str>,
) -> Result<Option<RecurrenceRule>, AppError> {
    let Some(repeat) = repeat else {
        if from.is_some() || until.is_some() {
            return Err(AppError::invalid_input("--from/--until need --repeat"));
        }
        return Ok(None);
    };

    let days = parse_weekdays(repeat)?;
    let start = parse_optional_date(from)?.unwrap_or_else(|| session.current_date());
    let rule = match parse_optional_date(until)? {
        Some(end) => RecurrenceRule::new(start, end, days)?,
        None => session.default_rule(start, days)?,
    };
    Ok(Some(rule))
}

fn build_patch(
    existing: &Task,
    today: Date,
    text: Option<String>,
    category: Option<&str>,
    time: Option<&str>,
    clear_time: bool,
    date: Option<&str>,
) -> Result<TaskPatch, AppError> {
    let mut patch = TaskPatch::from_task(existing);
    if let Some(text) = text {
        patch.text = text;
    }
    if let Some(category) = category {
        patch.category = category.parse()?;
    }
    if clear_time {
        patch.time = None;
    } else if let Some(time) = time {
        patch.time = Some(parse_time(time)?);
    }
    if let Some(date) = date {
        patch.date = Some(parse_date(date)?);
    }

    Ok(TaskPatch::new(
        patch.text,
        patch.category,
        patch.time,
        patch.date,
        today,
    ))
}

/// Handles an outcome that may have left a scope decision pending.
fn settle_series_action(
    session: &mut PlannerSession,
    outcome: Outcome,
    id: &str,
    scope: Option<&str>,
    action: &str,
    mode: Mode,
    json: bool,
) -> Result<(), AppError> {
    match outcome {
        Outcome::NotFound => print_not_found(id, json),
        Outcome::Applied(task) => {
            if json {
                println!("{}", render::task_json(&task));
            } else if action == "delete" {
                println!("Deleted task: {}", render::task_line(&task));
            } else {
                println!("Updated task: {}", render::task_line(&task));
            }
        }
        Outcome::AwaitingScope(task) => match scope {
            Some(raw) => {
                let scope = match raw.parse::<Scope>() {
                    Ok(scope) => scope,
                    Err(err) => {
                        session.cancel();
                        return Err(err);
                    }
                };
                let resolution = session.resolve(scope);
                print_resolution(&resolution, json);
            }
            None if mode == Mode::Interactive => prompt_for_scope(&task, action, json),
            None => {
                session.cancel();
                return Err(AppError::invalid_input(format!(
                    "task {} belongs to a series; pass --scope single|future|all",
                    task.id
                )));
            }
        },
    }

    Ok(())
}

fn run_command(cli: Cli, session: &mut PlannerSession, mode: Mode) -> Result<(), AppError> {
    if let Some(today) = cli.today.as_deref() {
        session.set_current_date(parse_date(today)?);
    }
    let json = cli.json;

    match cli.command {
        Command::Add {
            text,
            category,
            time,
            date,
            repeat,
            from,
            until,
        } => {
            let text = match text {
                Some(value) if !value.trim().is_empty() => value,
                _ => return Err(AppError::invalid_input("text is required")),
            };
            let category: Category = category.parse()?;
            let rule = build_rule(session, repeat.as_deref(), from.as_deref(), until.as_deref())?;
            let request = AddRequest::new(text, category)
                .with_time(time.as_deref().map(parse_time).transpose()?)
                .with_date(parse_optional_date(date.as_deref())?)
                .with_recurrence(rule);

            let added = session.add(request)?;
            print_added(&added, json);
        }
        Command::Done { id } => match session.toggle(&id)? {
            Outcome::Applied(task) => {
                if json {
                    println!("{}", render::task_json(&task));
                } else if task.completed {
                    println!("Completed task: {}", render::task_line(&task));
                } else {
                    println!("Reopened task: {}", render::task_line(&task));
                }
            }
            _ => print_not_found(&id, json),
        },
        Command::Edit {
            id,
            text,
            category,
            time,
            clear_time,
            date,
            scope,
        } => {
            let Some(existing) = session.planner().find(id.trim()).cloned() else {
                print_not_found(&id, json);
                return Ok(());
            };
            let patch = build_patch(
                &existing,
                session.current_date(),
                text,
                category.as_deref(),
                time.as_deref(),
                clear_time,
                date.as_deref(),
            )?;
            let outcome = session.edit(&id, patch)?;
            settle_series_action(session, outcome, &id, scope.as_deref(), "edit", mode, json)?;
        }
        Command::Delete { id, scope } => {
            let outcome = session.delete(&id)?;
            settle_series_action(session, outcome, &id, scope.as_deref(), "delete", mode, json)?;
        }
        Command::Scope { scope } => {
            let resolution = session.resolve_named(&scope);
            print_resolution(&resolution, json);
        }
        Command::Cancel => {
            let cancelled = session.cancel();
            if json {
                println!("{}", serde_json::json!({ "cancelled": cancelled }));
            } else if cancelled {
                println!("Pending change cancelled");
            } else {
                println!("Nothing to cancel");
            }
        }
        Command::List { list } => match list {
            ListCommand::Day { category, date } => {
                let date = parse_optional_date(date.as_deref())?;
                match category {
                    Some(raw) => {
                        let category: Category = raw.parse()?;
                        print_tasks(&session.view(category, date), json);
                    }
                    None if json => {
                        let mut tasks = session.view(Category::Work, date);
                        tasks.extend(session.view(Category::Family, date));
                        print_tasks(&tasks, json);
                    }
                    None => {
                        for category in [Category::Work, Category::Family] {
                            println!("{}", render::section(category, &session.view(category, date)));
                        }
                    }
                }
            }
            ListCommand::LongTerm => print_tasks(&session.view(Category::LongTerm, None), json),
        },
        Command::Upcoming => {
            let summary = session.upcoming();
            if json {
                println!("{}", render::summary_json(&summary));
            } else {
                println!("{}", render::summary_table(&summary));
            }
        }
        Command::Calendar { month } => {
            let (year, month) = match month.as_deref() {
                Some(raw) => parse_month(raw)?,
                None => {
                    let today = session.current_date();
                    (today.year(), today.month())
                }
            };
            let markers = session.month_markers(year, month);
            if json {
                println!("{}", render::markers_json(&markers));
            } else if markers.is_empty() {
                println!("No dated tasks in {year}-{:02}", u8::from(month));
            } else {
                for marker in &markers {
                    println!("{}", render::marker_line(marker));
                }
            }
        }
    }

    match session.take_save_error() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn open_session(overrides: &ConfigOverrides) -> Result<PlannerSession, AppError> {
    task_api::open_default_session(overrides, task_api::local_today())
}

fn run_interactive() -> Result<(), AppError> {
    let mut session = open_session(&ConfigOverrides::default())?;
    let mut input = String::new();
    let mut stdin = io::stdin().lock();

    loop {
        input.clear();
        if stdin.read_line(&mut input)? == 0 {
            break;
        }

        let cli = match parse_line(&input) {
            Ok(LineAction::Run(cli)) => *cli,
            Ok(LineAction::Skip) => continue,
            Ok(LineAction::Quit) => break,
            Ok(LineAction::Help) => {
                print_help();
                continue;
            }
            Err(err) => {
                eprintln!("ERROR: {}", err);
                continue;
            }
        };

        if !cli.config_override.is_empty() {
            tracing::warn!("config overrides only apply when starting the planner");
        }
        if let Err(err) = run_command(cli, &mut session, Mode::Interactive) {
            eprintln!("ERROR: {}", err);
        }
    }

    if session.cancel() {
        tracing::info!("pending series change dropped on exit");
    }

    Ok(())
}

fn run_once(cli: Cli) -> Result<(), AppError> {
    let overrides = collect_overrides(&cli.config_override).map_err(AppError::invalid_input)?;
    let mut session = open_session(&overrides)?;
    run_command(cli, &mut session, Mode::OneShot)
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_env("PLANNER_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();
}

fn main() {
    init_logging();

    let mut args = std::env::args_os();
    args.next();
    if args.next().is_none() {
        if let Err(err) = run_interactive() {
            eprintln!("ERROR: {}", err);
            std::process::exit(1);
        }
        return;
    }

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            if matches!(
                err.kind(),
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion
            ) {
                let _ = err.print();
                return;
            }
            eprintln!("ERROR: {}", normalize_parse_error(err));
            std::process::exit(1);
        }
    };

    if let Err(err) = run_once(cli) {
        eprintln!("ERROR: {}", err);
        std::process::exit(1);
    }
}
