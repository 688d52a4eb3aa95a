use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub type Timestamp = DateTime<Utc>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    /// Belongs to one calendar date; rolled forward while incomplete.
    #[default]
    Daily,
    /// No fixed date; visible every day until completed.
    Lifetime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub const ALL: [Priority; 4] = [
        Priority::Low,
        Priority::Medium,
        Priority::High,
        Priority::Urgent,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "low" => Some(Priority::Low),
            "medium" => Some(Priority::Medium),
            "high" => Some(Priority::High),
            "urgent" => Some(Priority::Urgent),
            _ => None,
        }
    }
}

impl TaskType {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskType::Daily => "daily",
            TaskType::Lifetime => "lifetime",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "daily" => Some(TaskType::Daily),
            "lifetime" => Some(TaskType::Lifetime),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    pub priority: Priority,
    pub scheduled_date: NaiveDate,
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<Timestamp>,
    pub carried_over: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_date: Option<NaiveDate>,
    pub created_at: Timestamp,
    /// Minutes between repeating reminders; `<= 0` disables the reminder.
    pub reminder_interval: i64,
}

impl Task {
    pub fn is_lifetime(&self) -> bool {
        self.task_type == TaskType::Lifetime
    }

    pub fn has_reminder(&self) -> bool {
        self.reminder_interval > 0
    }
}

/// Caller-supplied fields for a new task. Identity, timestamps and state flags are
/// assigned by the engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type", default)]
    pub task_type: TaskType,
    #[serde(default)]
    pub priority: Priority,
    pub scheduled_date: NaiveDate,
    #[serde(default)]
    pub reminder_interval: i64,
}

/// Partial update merged into an existing task. `None` leaves a field untouched;
/// the nested options of `description`/`completed_at`/`original_date` allow clearing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub task_type: Option<TaskType>,
    pub priority: Option<Priority>,
    pub scheduled_date: Option<NaiveDate>,
    pub completed: Option<bool>,
    pub completed_at: Option<Option<Timestamp>>,
    pub carried_over: Option<bool>,
    pub original_date: Option<Option<NaiveDate>>,
    pub reminder_interval: Option<i64>,
}

impl TaskPatch {
    pub fn apply(self, task: &mut Task) {
        if let Some(title) = self.title {
            task.title = title;
        }
        if let Some(description) = self.description {
            task.description = description;
        }
        if let Some(task_type) = self.task_type {
            task.task_type = task_type;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(date) = self.scheduled_date {
            task.scheduled_date = date;
        }
        if let Some(completed) = self.completed {
            task.completed = completed;
        }
        if let Some(completed_at) = self.completed_at {
            task.completed_at = completed_at;
        }
        if let Some(carried_over) = self.carried_over {
            task.carried_over = carried_over;
        }
        if let Some(original_date) = self.original_date {
            task.original_date = original_date;
        }
        if let Some(minutes) = self.reminder_interval {
            task.reminder_interval = minutes;
        }
    }

    /// A patch that rewrites every user-editable field from a form submission.
    pub fn from_new(fields: NewTask) -> Self {
        Self {
            title: Some(fields.title),
            description: Some(fields.description),
            task_type: Some(fields.task_type),
            priority: Some(fields.priority),
            scheduled_date: Some(fields.scheduled_date),
            reminder_interval: Some(fields.reminder_interval),
            ..Self::default()
        }
    }
}

/// The persisted document: every task plus the date carry-over last ran.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    pub last_opened_date: NaiveDate,
    pub tasks: Vec<Task>,
}

impl AppState {
    pub fn empty(today: NaiveDate) -> Self {
        Self {
            last_opened_date: today,
            tasks: Vec::new(),
        }
    }

    pub fn find_mut(&mut self, task_id: &str) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|task| task.id == task_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DayStats {
    pub date: NaiveDate,
    pub total: usize,
    pub completed: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct PriorityCounts {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
    pub urgent: usize,
}

impl PriorityCounts {
    pub fn get(&self, priority: Priority) -> usize {
        match priority {
            Priority::Low => self.low,
            Priority::Medium => self.medium,
            Priority::High => self.high,
            Priority::Urgent => self.urgent,
        }
    }

    pub fn increment(&mut self, priority: Priority) {
        match priority {
            Priority::Low => self.low += 1,
            Priority::Medium => self.medium += 1,
            Priority::High => self.high += 1,
            Priority::Urgent => self.urgent += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.low + self.medium + self.high + self.urgent
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Analytics {
    pub completion_rate: f64,
    pub carry_over_rate: f64,
    pub streak_days: usize,
    pub tasks_by_priority: PriorityCounts,
    pub daily_stats: Vec<DayStats>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct Settings {
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_persistent_notification")]
    pub persistent_notification: bool,
    #[serde(default = "default_summary_preview_limit")]
    pub summary_preview_limit: usize,
    #[serde(default = "default_tick_interval_secs")]
    pub tick_interval_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            language: default_language(),
            persistent_notification: default_persistent_notification(),
            summary_preview_limit: default_summary_preview_limit(),
            tick_interval_secs: default_tick_interval_secs(),
        }
    }
}

fn default_language() -> String {
    "auto".to_string()
}

fn default_persistent_notification() -> bool {
    true
}

fn default_summary_preview_limit() -> usize {
    3
}

fn default_tick_interval_secs() -> u64 {
    30
}
