//! Calendar-date and time-of-day text forms used by the store and the CLI.
//!
//! Dates are `YYYY-MM-DD` and times are `HH:MM`. Both have no timezone.

use crate::error::AppError;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, Time};

const DATE_FORMAT: &[BorrowedFormatItem<'_>] = format_description!("[year]-[month]-[day]");

pub fn parse_date(raw: &str) -> Result<Date, AppError> {
    let trimmed = raw.trim();
    Date::parse(trimmed, DATE_FORMAT)
        .map_err(|_| AppError::invalid_input(format!("date must be YYYY-MM-DD: {trimmed}")))
}

pub fn format_date(date: Date) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

pub fn parse_time(raw: &str) -> Result<Time, AppError> {
    let trimmed = raw.trim();
    let invalid = || AppError::invalid_input(format!("time must be HH:MM: {trimmed}"));

    let (hour, minute) = trimmed.split_once(':').ok_or_else(invalid)?;
    if hour.len() != 2 || minute.len() != 2 {
        return Err(invalid());
    }
    let hour: u8 = hour.parse().map_err(|_| invalid())?;
    let minute: u8 = minute.parse().map_err(|_| invalid())?;

    Time::from_hms(hour, minute, 0).map_err(|_| invalid())
}

pub fn format_time(time: Time) -> String {
    format!("{:02}:{:02}", time.hour(), time.minute())
}

/// Serde adapter for `Option<Date>` stored as `"YYYY-MM-DD"` or `null`.
pub mod opt_date {
    use serde::{Deserialize, Deserializer, Serializer};
    use time::Date;

    pub fn serialize<S: Serializer>(value: &Option<Date>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(date) => serializer.serialize_str(&super::format_date(*date)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Date>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(value) => super::parse_date(value)
                .map(Some)
                .map_err(|err| serde::de::Error::custom(err.message())),
        }
    }
}

/// Serde adapter for `Option<Time>` stored as `"HH:MM"` or `null`.
pub mod opt_time {
    use serde::{Deserialize, Deserializer, Serializer};
    use time::Time;

    pub fn serialize<S: Serializer>(value: &Option<Time>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(time) => serializer.serialize_str(&super::format_time(*time)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Time>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(value) => super::parse_time(value)
                .map(Some)
                .map_err(|err| serde::de::Error::custom(err.message())),
        }
    }
}
