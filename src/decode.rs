//! Tolerant decoding of persisted documents.
//!
//! Older app versions wrote booleans and numbers as strings and occasionally left
//! fields out. Every raw field is read untyped and coerced into the strict model;
//! nothing here fails, unreadable values fall back to defaults.
//!
//! Timestamps are parsed as RFC 3339 and written back in chrono's form, so a
//! `...T07:00:00.000Z` value is saved as `...T07:00:00Z`. The instant is unchanged;
//! documents become byte-stable after their first save.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::dates::parse_date;
use crate::models::{AppState, Priority, Task, TaskType, Timestamp};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAppState {
    #[serde(default)]
    pub last_opened_date: Value,
    #[serde(default)]
    pub tasks: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTask {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub title: Value,
    #[serde(default)]
    pub description: Value,
    #[serde(rename = "type", default)]
    pub task_type: Value,
    #[serde(default)]
    pub priority: Value,
    #[serde(default)]
    pub scheduled_date: Value,
    #[serde(default)]
    pub completed: Value,
    #[serde(default)]
    pub completed_at: Value,
    #[serde(default)]
    pub carried_over: Value,
    #[serde(default)]
    pub original_date: Value,
    #[serde(default)]
    pub created_at: Value,
    #[serde(default)]
    pub reminder_interval: Value,
}

/// Context the decoder needs to fill in missing values.
#[derive(Debug, Clone, Copy)]
pub struct DecodeContext {
    pub today: NaiveDate,
    pub now: Timestamp,
}

impl RawAppState {
    pub fn decode(self, ctx: DecodeContext) -> AppState {
        let last_opened_date = as_date(&self.last_opened_date).unwrap_or(ctx.today);
        let entries = match self.tasks {
            Value::Array(entries) => entries,
            Value::Null => Vec::new(),
            other => {
                log::warn!("decode: tasks is not an array, ignoring value={other}");
                Vec::new()
            }
        };
        let tasks = entries
            .into_iter()
            .filter_map(|entry| match serde_json::from_value::<RawTask>(entry) {
                Ok(raw) => Some(raw.decode(ctx)),
                Err(err) => {
                    log::warn!("decode: dropping unreadable task entry: {err}");
                    None
                }
            })
            .collect();
        AppState {
            last_opened_date,
            tasks,
        }
    }
}

impl RawTask {
    pub fn decode(self, ctx: DecodeContext) -> Task {
        let created_at = as_timestamp(&self.created_at);
        let scheduled_date = as_date(&self.scheduled_date)
            .or_else(|| created_at.map(|ts| ts.date_naive()))
            .unwrap_or(ctx.today);
        let id = as_string(&self.id)
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| {
                let id = new_task_id();
                log::warn!("decode: task without id, assigned id={id}");
                id
            });

        Task {
            id,
            title: as_string(&self.title).unwrap_or_default(),
            description: as_string(&self.description),
            task_type: as_string(&self.task_type)
                .and_then(|value| TaskType::parse(&value))
                .unwrap_or_default(),
            priority: as_string(&self.priority)
                .and_then(|value| Priority::parse(&value))
                .unwrap_or_default(),
            scheduled_date,
            completed: coerce_bool(&self.completed),
            completed_at: as_timestamp(&self.completed_at),
            carried_over: coerce_bool(&self.carried_over),
            original_date: as_date(&self.original_date),
            created_at: created_at.unwrap_or(ctx.now),
            reminder_interval: coerce_minutes(&self.reminder_interval),
        }
    }
}

pub fn new_task_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// `true` and `"true"` are true, everything else is false.
pub fn coerce_bool(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::String(text) => text == "true",
        _ => false,
    }
}

/// Numbers are truncated to whole minutes; strings are read like `parseInt`
/// (optional sign followed by leading digits). Anything else is `0`.
pub fn coerce_minutes(value: &Value) -> i64 {
    match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
            .unwrap_or(0),
        Value::String(text) => parse_leading_int(text).unwrap_or(0),
        _ => 0,
    }
}

fn parse_leading_int(text: &str) -> Option<i64> {
    let trimmed = text.trim_start();
    let (sign, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (-1, &trimmed[1..]),
        Some(b'+') => (1, &trimmed[1..]),
        _ => (1, trimmed),
    };
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse::<i64>().ok().map(|n| n * sign)
}

fn as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn as_date(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::String(text) => parse_date(text),
        _ => None,
    }
}

fn as_timestamp(value: &Value) -> Option<Timestamp> {
    match value {
        Value::String(text) => DateTime::parse_from_rfc3339(text.trim())
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        _ => None,
    }
}
