use chrono::NaiveDate;
use serde::Serialize;

use crate::analytics::completion_rate_for_week;
use crate::clock::Clock;
use crate::lifecycle::{sort_for_display, MonthOverview, Progress, TaskEngine};
use crate::models::{Analytics, NewTask, Settings, Task, TaskPatch};
use crate::notification::{NotificationService, NotificationSync};
use crate::storage::{KeyValueStore, StorageError};

#[derive(Debug, Serialize)]
pub struct CommandResult<T> {
    pub ok: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

pub fn ok<T>(data: T) -> CommandResult<T> {
    CommandResult {
        ok: true,
        data: Some(data),
        error: None,
    }
}

pub fn err<T>(message: &str) -> CommandResult<T> {
    CommandResult {
        ok: false,
        data: None,
        error: Some(message.to_string()),
    }
}

fn storage_err<T>(error: StorageError) -> CommandResult<T> {
    log::error!("command failed: {error}");
    err(&format!("storage error: {error}"))
}

#[derive(Debug, Clone, Serialize)]
pub struct TodayPayload {
    /// Tasks moved onto today by this call's carry-over, for the one-time banner.
    pub carried: usize,
    pub tasks: Vec<Task>,
    pub progress: Progress,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsPayload {
    pub analytics: Analytics,
    pub week_completion_rate: f64,
}

/// What the screens call. Each mutation goes through the lifecycle engine and then
/// brings reminders and the summary notification in line with the stored tasks.
pub struct Commands<S, C, N> {
    engine: TaskEngine<S, C>,
    notifications: NotificationSync<N>,
}

impl<S, C, N> Commands<S, C, N>
where
    S: KeyValueStore,
    C: Clock,
    N: NotificationService,
{
    /// Settings are read once here; a missing or unreadable settings document
    /// falls back to defaults.
    pub fn new(engine: TaskEngine<S, C>, service: N) -> Self {
        let settings = engine.settings().unwrap_or_else(|error| {
            log::warn!("settings unreadable, using defaults: {error}");
            Settings::default()
        });
        let notifications = NotificationSync::new(service, &settings);
        Self {
            engine,
            notifications,
        }
    }

    pub fn engine(&self) -> &TaskEngine<S, C> {
        &self.engine
    }

    pub fn notifications(&self) -> &NotificationSync<N> {
        &self.notifications
    }

    /// Runs the daily carry-over if due and returns today's list.
    pub fn open_app(&self) -> CommandResult<TodayPayload> {
        let carried = match self.engine.process_carry_over() {
            Ok(count) => count,
            Err(error) => return storage_err(error),
        };
        match self.today_payload(carried) {
            Ok(payload) => {
                self.refresh_summary();
                ok(payload)
            }
            Err(error) => storage_err(error),
        }
    }

    pub fn today(&self) -> CommandResult<TodayPayload> {
        match self.today_payload(0) {
            Ok(payload) => ok(payload),
            Err(error) => storage_err(error),
        }
    }

    pub fn tasks_for_date(&self, date: NaiveDate) -> CommandResult<Vec<Task>> {
        match self.engine.get_tasks_for_date(date) {
            Ok(mut tasks) => {
                sort_for_display(&mut tasks);
                ok(tasks)
            }
            Err(error) => storage_err(error),
        }
    }

    pub fn create_task(&self, fields: NewTask) -> CommandResult<Task> {
        if fields.title.trim().is_empty() {
            return err("title is required");
        }
        let task = match self.engine.add_task(fields) {
            Ok(task) => task,
            Err(error) => return storage_err(error),
        };
        self.schedule_reminder(&task);
        self.refresh_summary();
        ok(task)
    }

    /// Unknown ids succeed with `None`.
    pub fn update_task(&self, task_id: &str, patch: TaskPatch) -> CommandResult<Option<Task>> {
        if matches!(&patch.title, Some(title) if title.trim().is_empty()) {
            return err("title is required");
        }
        let updated = match self.engine.update_task(task_id, patch) {
            Ok(updated) => updated,
            Err(error) => return storage_err(error),
        };
        if let Some(task) = &updated {
            // The interval may have changed, so reminders are rebuilt from scratch.
            self.cancel_reminder(task_id);
            if !task.completed {
                self.schedule_reminder(task);
            }
            self.refresh_summary();
        }
        ok(updated)
    }

    pub fn toggle_task(&self, task_id: &str) -> CommandResult<Option<Task>> {
        let toggled = match self.engine.toggle_task_complete(task_id) {
            Ok(toggled) => toggled,
            Err(error) => return storage_err(error),
        };
        if let Some(task) = &toggled {
            if task.completed {
                self.cancel_reminder(task_id);
            } else {
                self.schedule_reminder(task);
            }
            self.refresh_summary();
        }
        ok(toggled)
    }

    pub fn delete_task(&self, task_id: &str) -> CommandResult<bool> {
        self.cancel_reminder(task_id);
        let removed = match self.engine.delete_task(task_id) {
            Ok(removed) => removed,
            Err(error) => return storage_err(error),
        };
        self.refresh_summary();
        ok(removed)
    }

    pub fn analytics(&self) -> CommandResult<AnalyticsPayload> {
        match self.engine.calculate_analytics() {
            Ok(analytics) => {
                let week_completion_rate = completion_rate_for_week(&analytics);
                ok(AnalyticsPayload {
                    analytics,
                    week_completion_rate,
                })
            }
            Err(error) => storage_err(error),
        }
    }

    pub fn month_overview(&self, year: i32, month: u32) -> CommandResult<MonthOverview> {
        if !(1..=12).contains(&month) {
            return err("month must be between 1 and 12");
        }
        match self.engine.month_overview(year, month) {
            Ok(overview) => ok(overview),
            Err(error) => storage_err(error),
        }
    }

    pub fn settings(&self) -> CommandResult<Settings> {
        match self.engine.settings() {
            Ok(settings) => ok(settings),
            Err(error) => storage_err(error),
        }
    }

    pub fn update_settings(&mut self, mut settings: Settings) -> CommandResult<Settings> {
        let language = settings.language.trim().to_lowercase();
        settings.language = match language.as_str() {
            "auto" | "en" | "id" => language,
            _ => Settings::default().language,
        };
        if let Err(error) = self.engine.save_settings(&settings) {
            return storage_err(error);
        }
        self.notifications.apply_settings(&settings);
        self.refresh_summary();
        ok(settings)
    }

    /// Drops every reminder and the summary, then reschedules from the stored tasks.
    pub fn resync_notifications(&self) -> CommandResult<usize> {
        let tasks = match self.engine.get_tasks() {
            Ok(tasks) => tasks,
            Err(error) => return storage_err(error),
        };
        if let Err(error) = self.notifications.cancel_all_notifications() {
            return err(&error.to_string());
        }
        let mut scheduled = 0;
        for task in tasks.iter().filter(|task| !task.completed) {
            if self.schedule_reminder(task) {
                scheduled += 1;
            }
        }
        self.refresh_summary();
        ok(scheduled)
    }

    fn today_payload(&self, carried: usize) -> Result<TodayPayload, StorageError> {
        let mut tasks = self.engine.get_today_tasks()?;
        sort_for_display(&mut tasks);
        let progress = crate::lifecycle::progress(&tasks);
        Ok(TodayPayload {
            carried,
            tasks,
            progress,
        })
    }

    // Notification failures never undo a saved mutation; they are logged and the
    // next refresh gets another chance.
    fn schedule_reminder(&self, task: &Task) -> bool {
        match self.notifications.schedule_task_reminder(task) {
            Ok(id) => id.is_some(),
            Err(error) => {
                log::warn!("failed to schedule reminder task={}: {error}", task.id);
                false
            }
        }
    }

    fn cancel_reminder(&self, task_id: &str) {
        if let Err(error) = self.notifications.cancel_task_reminder(task_id) {
            log::warn!("failed to cancel reminder task={task_id}: {error}");
        }
    }

    fn refresh_summary(&self) {
        let incomplete = match self.engine.get_incomplete_tasks() {
            Ok(tasks) => tasks,
            Err(error) => {
                log::warn!("summary refresh skipped: {error}");
                return;
            }
        };
        if let Err(error) = self.notifications.update_persistent_notification(&incomplete) {
            log::warn!("summary refresh failed: {error}");
        }
    }
}
