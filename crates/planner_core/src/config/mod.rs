use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

const CONFIG_FILE_NAME: &str = "config.json";
const CONFIG_ENV_VAR: &str = "PLANNER_CONFIG_PATH";

pub const DEFAULT_RECURRENCE_SPAN_DAYS: u32 = 30;
pub const DEFAULT_MAX_SERIES_DAYS: u32 = 366;
pub const DEFAULT_UPCOMING_DAYS: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store_path: Option<PathBuf>,
    /// Length of a recurrence range when only a start date is given.
    #[serde(default = "default_recurrence_span_days")]
    pub recurrence_span_days: u32,
    /// Longest date range a single recurrence may cover.
    #[serde(default = "default_max_series_days")]
    pub max_series_days: u32,
    #[serde(default = "default_upcoming_days")]
    pub upcoming_days: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: None,
            recurrence_span_days: DEFAULT_RECURRENCE_SPAN_DAYS,
            max_series_days: DEFAULT_MAX_SERIES_DAYS,
            upcoming_days: DEFAULT_UPCOMING_DAYS,
        }
    }
}

fn default_recurrence_span_days() -> u32 {
    DEFAULT_RECURRENCE_SPAN_DAYS
}

fn default_max_series_days() -> u32 {
    DEFAULT_MAX_SERIES_DAYS
}

fn default_upcoming_days() -> u32 {
    DEFAULT_UPCOMING_DAYS
}

#[derive(Debug, Clone)]
pub struct ConfigLoad {
    pub config: Config,
    pub error: Option<AppError>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub store_path: Option<PathBuf>,
    pub recurrence_span_days: Option<u32>,
    pub max_series_days: Option<u32>,
    pub upcoming_days: Option<u32>,
}

pub fn config_path() -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR)
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    if cfg!(windows) {
        let appdata =
            std::env::var("APPDATA").map_err(|_| AppError::invalid_data("APPDATA is not set"))?;
        Ok(PathBuf::from(appdata)
            .join("planner")
            .join(CONFIG_FILE_NAME))
    } else {
        let home = std::env::var("HOME").map_err(|_| AppError::invalid_data("HOME is not set"))?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("planner")
            .join(CONFIG_FILE_NAME))
    }
}

/// Loads the config, falling back to defaults when it is missing or broken.
pub fn load_config_with_fallback() -> ConfigLoad {
    let load = match config_path() {
        Ok(path) => load_config_with_fallback_from_path(&path),
        Err(err) => ConfigLoad {
            config: Config::default(),
            error: Some(err),
        },
    };

    if let Some(err) = load.error.as_ref() {
        warn!(error = %err, "using default configuration");
    }

    load
}

fn load_config_with_fallback_from_path(path: &Path) -> ConfigLoad {
    if !path.exists() {
        return ConfigLoad {
            config: Config::default(),
            error: None,
        };
    }

    match load_config_from_path(path) {
        Ok(config) => ConfigLoad {
            config,
            error: None,
        },
        Err(err) => ConfigLoad {
            config: Config::default(),
            error: Some(err),
        },
    }
}

fn load_config_from_path(path: &Path) -> Result<Config, AppError> {
    let content = std::fs::read_to_string(path)
        .map_err(|err| AppError::io(format!("{}: {}", path.display(), err)))?;
    let config: Config = serde_json::from_str(&content).map_err(|err| {
        AppError::invalid_data(format!("invalid JSON in {}: {}", path.display(), err))
    })?;
    validate(config)
}

fn validate(config: Config) -> Result<Config, AppError> {
    if config.max_series_days == 0 {
        return Err(AppError::invalid_data("max_series_days must be positive"));
    }
    Ok(config)
}

pub fn merge_overrides(base: &Config, overrides: &ConfigOverrides) -> Config {
    let mut merged = base.clone();
    if let Some(path) = overrides.store_path.as_ref() {
        merged.store_path = Some(path.clone());
    }
    if let Some(days) = overrides.recurrence_span_days {
        merged.recurrence_span_days = days;
    }
    if let Some(days) = overrides.max_series_days
        && days > 0
    {
        merged.max_series_days = days;
    }
    if let Some(days) = overrides.upcoming_days {
        merged.upcoming_days = days;
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::{
        Config, ConfigOverrides, DEFAULT_MAX_SERIES_DAYS, load_config_from_path,
        load_config_with_fallback_from_path, merge_overrides,
    };
    use std::fs;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_path(file_name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("planner-{nanos}-{file_name}"))
    }

    #[test]
    fn load_config_missing_returns_defaults_without_error() {
        let path = temp_path("missing-config.json");
        let result = load_config_with_fallback_from_path(&path);

        assert_eq!(result.config, Config::default());
        assert!(result.error.is_none());
    }

    #[test]
    fn load_config_invalid_returns_defaults_and_error() {
        let path = temp_path("invalid-config.json");
        fs::write(&path, "{ invalid json ").unwrap();

        let result = load_config_with_fallback_from_path(&path);
        fs::remove_file(&path).ok();

        assert_eq!(result.config, Config::default());
        assert_eq!(result.error.map(|err| err.code()), Some("invalid_data"));
    }

    #[test]
    fn load_config_reads_partial_file() {
        let path = temp_path("valid-config.json");
        let content = serde_json::json!({
            "store_path": "/tmp/planner/tasks.json",
            "upcoming_days": 5
        });
        fs::write(&path, serde_json::to_string(&content).unwrap()).unwrap();

        let loaded = load_config_from_path(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(
            loaded.store_path,
            Some(PathBuf::from("/tmp/planner/tasks.json"))
        );
        assert_eq!(loaded.upcoming_days, 5);
        assert_eq!(loaded.max_series_days, DEFAULT_MAX_SERIES_DAYS);
    }

    #[test]
    fn load_config_rejects_zero_series_bound() {
        let path = temp_path("zero-bound.json");
        fs::write(&path, "{\"max_series_days\": 0}").unwrap();

        let err = load_config_from_path(&path).unwrap_err();
        fs::remove_file(&path).ok();

        assert_eq!(err.code(), "invalid_data");
    }

    #[test]
    fn merge_overrides_replaces_only_given_fields() {
        let base = Config {
            upcoming_days: 7,
            ..Config::default()
        };
        let overrides = ConfigOverrides {
            max_series_days: Some(90),
            recurrence_span_days: Some(14),
            ..ConfigOverrides::default()
        };

        let merged = merge_overrides(&base, &overrides);
        assert_eq!(merged.max_series_days, 90);
        assert_eq!(merged.recurrence_span_days, 14);
        assert_eq!(merged.upcoming_days, 7);
        assert_eq!(base.max_series_days, DEFAULT_MAX_SERIES_DAYS);
    }

    #[test]
    fn merge_overrides_ignores_zero_series_bound() {
        let overrides = ConfigOverrides {
            max_series_days: Some(0),
            ..ConfigOverrides::default()
        };
        let merged = merge_overrides(&Config::default(), &overrides);
        assert_eq!(merged.max_series_days, DEFAULT_MAX_SERIES_DAYS);
    }

    #[test]
    fn merge_overrides_with_empty_overrides_returns_clone() {
        let base = Config::default();
        let merged = merge_overrides(&base, &ConfigOverrides::default());
        assert_eq!(merged, base);
    }
}
