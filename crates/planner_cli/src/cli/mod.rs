use clap::{Parser, Subcommand};
use planner_core::config::ConfigOverrides;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Treat this date as today (format YYYY-MM-DD)
    #[arg(long, value_name = "YYYY-MM-DD", global = true)]
    pub today: Option<String>,

    /// Override configuration values (format KEY=VALUE)
    #[arg(long = "config-override", value_name = "KEY=VALUE", global = true)]
    pub config_override: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Add a task, or a recurring series of tasks
    ///
    /// Example: planner add "Standup" --category work --time 09:30
    /// Example: planner add "Gym" --category family --repeat mon,wed,fri --until 2024-03-31
    /// Example: planner add "Learn piano" --category long-term
    Add {
        text: Option<String>,
        #[arg(short, long, default_value = "work")]
        category: String,
        #[arg(long, value_name = "HH:MM")]
        time: Option<String>,
        #[arg(long, value_name = "YYYY-MM-DD")]
        date: Option<String>,
        /// Weekdays to repeat on, e.g. mon,wed,fri or 1,3,5 (0 = Sunday)
        #[arg(long, value_name = "DAYS")]
        repeat: Option<String>,
        /// First day of the recurrence range (defaults to today)
        #[arg(long, value_name = "YYYY-MM-DD")]
        from: Option<String>,
        /// Last day of the recurrence range (defaults to the configured span)
        #[arg(long, value_name = "YYYY-MM-DD")]
        until: Option<String>,
    },
    /// Toggle a task between open and completed
    ///
    /// Example: planner done 3f2a...
    #[command(alias = "toggle")]
    Done { id: String },
    /// Edit a task
    ///
    /// Example: planner edit 3f2a... --text "Standup (remote)" --scope future
    Edit {
        id: String,
        #[arg(long)]
        text: Option<String>,
        #[arg(short, long)]
        category: Option<String>,
        #[arg(long, value_name = "HH:MM", conflicts_with = "clear_time")]
        time: Option<String>,
        #[arg(long)]
        clear_time: bool,
        #[arg(long, value_name = "YYYY-MM-DD")]
        date: Option<String>,
        /// single, future or all; required for series members outside interactive mode
        #[arg(long)]
        scope: Option<String>,
    },
    /// Delete a task
    ///
    /// Example: planner delete 3f2a... --scope all
    Delete {
        id: String,
        /// single, future or all; required for series members outside interactive mode
        #[arg(long)]
        scope: Option<String>,
    },
    /// Answer a pending series question (interactive mode)
    ///
    /// Example: scope future
    Scope { scope: String },
    /// Drop a pending series question (interactive mode)
    Cancel,
    /// List tasks
    ///
    /// Example: planner list day
    /// Example: planner list day --category family --date 2024-01-08
    /// Example: planner list long-term
    List {
        #[command(subcommand)]
        list: ListCommand,
    },
    /// Show task counts for the next few days
    Upcoming,
    /// Show which days of a month have tasks
    ///
    /// Example: planner calendar 2024-02
    Calendar {
        #[arg(value_name = "YYYY-MM")]
        month: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ListCommand {
    /// Work and family tasks for one day
    Day {
        #[arg(short, long)]
        category: Option<String>,
        #[arg(long, value_name = "YYYY-MM-DD")]
        date: Option<String>,
    },
    /// Long-term tasks
    LongTerm,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOverrideTarget {
    StorePath,
    RecurrenceSpanDays,
    MaxSeriesDays,
    UpcomingDays,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedConfigOverride {
    pub target: ConfigOverrideTarget,
    pub value: String,
}

/// Parse a raw `KEY=VALUE` override string into a structured target.
pub fn parse_config_override(raw: &str) -> Result<ParsedConfigOverride, String> {
    let trimmed = raw.trim();
    let (key_raw, value_raw) = trimmed
        .split_once('=')
        .ok_or_else(|| "override must be in KEY=VALUE format".to_string())?;

    let value = value_raw.trim().to_string();
    let canonical_field = canonicalize_flag_name(key_raw)
        .ok_or_else(|| "override key cannot be empty".to_string())?;

    let target = match canonical_field.as_str() {
        "store_path" | "store" => ConfigOverrideTarget::StorePath,
        "recurrence_span_days" | "recurrence_span" => ConfigOverrideTarget::RecurrenceSpanDays,
        "max_series_days" => ConfigOverrideTarget::MaxSeriesDays,
        "upcoming_days" => ConfigOverrideTarget::UpcomingDays,
        other => return Err(format!("unknown config field '{other}'")),
    };

    if value.is_empty() {
        return Err(format!("override for '{canonical_field}' needs a value"));
    }

    Ok(ParsedConfigOverride { target, value })
}

/// Fold parsed overrides into the structure the core config merges.
pub fn collect_overrides(raw: &[String]) -> Result<ConfigOverrides, String> {
    let mut overrides = ConfigOverrides::default();
    for entry in raw {
        let parsed = parse_config_override(entry)?;
        match parsed.target {
            ConfigOverrideTarget::StorePath => {
                overrides.store_path = Some(PathBuf::from(parsed.value));
            }
            ConfigOverrideTarget::RecurrenceSpanDays => {
                overrides.recurrence_span_days = Some(parse_days(&parsed.value)?);
            }
            ConfigOverrideTarget::MaxSeriesDays => {
                overrides.max_series_days = Some(parse_days(&parsed.value)?);
            }
            ConfigOverrideTarget::UpcomingDays => {
                overrides.upcoming_days = Some(parse_days(&parsed.value)?);
            }
        }
    }
    Ok(overrides)
}

fn parse_days(value: &str) -> Result<u32, String> {
    value
        .parse::<u32>()
        .map_err(|_| format!("expected a number of days, got '{value}'"))
}

fn canonicalize_flag_name(name: &str) -> Option<String> {
    let mut cleaned = String::new();
    let mut previous_underscore = false;

    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            cleaned.push(ch.to_ascii_lowercase());
            previous_underscore = false;
        } else if !previous_underscore && !cleaned.is_empty() {
            cleaned.push('_');
            previous_underscore = true;
        }
    }

    let trimmed = cleaned.trim_matches('_');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
