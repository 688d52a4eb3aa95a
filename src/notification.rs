//! Keeps local notifications consistent with task state.
//!
//! The platform service is behind [`NotificationService`]. On top of it,
//! [`NotificationSync`] schedules per-task repeating reminders and maintains the
//! single sticky summary of outstanding work.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::labels::{notification_labels, reminder_title, resolve_language, NotificationLabels};
use crate::models::{Priority, Settings, Task};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct NotificationContent {
    pub title: String,
    pub body: String,
    /// Task this notification belongs to, used to find it again for cancellation.
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub sticky: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Trigger {
    TimeInterval { seconds: u64, repeats: bool },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ScheduledNotification {
    pub id: String,
    pub content: NotificationContent,
    pub trigger: Trigger,
}

#[derive(Debug)]
pub struct NotificationError(pub String);

impl std::fmt::Display for NotificationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "notification error: {}", self.0)
    }
}

impl std::error::Error for NotificationError {}

/// Platform local-notification primitives.
pub trait NotificationService {
    fn schedule(
        &self,
        content: NotificationContent,
        trigger: Trigger,
    ) -> Result<String, NotificationError>;
    fn scheduled(&self) -> Result<Vec<ScheduledNotification>, NotificationError>;
    fn cancel(&self, id: &str) -> Result<(), NotificationError>;
    fn cancel_all(&self) -> Result<(), NotificationError>;
    /// Shows a notification immediately.
    fn present(&self, content: NotificationContent) -> Result<String, NotificationError>;
    /// Removes every notification currently shown.
    fn dismiss_all(&self) -> Result<(), NotificationError>;
}

impl<N: NotificationService + ?Sized> NotificationService for &N {
    fn schedule(
        &self,
        content: NotificationContent,
        trigger: Trigger,
    ) -> Result<String, NotificationError> {
        (**self).schedule(content, trigger)
    }

    fn scheduled(&self) -> Result<Vec<ScheduledNotification>, NotificationError> {
        (**self).scheduled()
    }

    fn cancel(&self, id: &str) -> Result<(), NotificationError> {
        (**self).cancel(id)
    }

    fn cancel_all(&self) -> Result<(), NotificationError> {
        (**self).cancel_all()
    }

    fn present(&self, content: NotificationContent) -> Result<String, NotificationError> {
        (**self).present(content)
    }

    fn dismiss_all(&self) -> Result<(), NotificationError> {
        (**self).dismiss_all()
    }
}

pub struct NotificationSync<N> {
    service: N,
    labels: NotificationLabels,
    summary_enabled: bool,
    preview_limit: usize,
}

impl<N: NotificationService> NotificationSync<N> {
    pub fn new(service: N, settings: &Settings) -> Self {
        Self {
            service,
            labels: notification_labels(resolve_language(&settings.language)),
            summary_enabled: settings.persistent_notification,
            preview_limit: settings.summary_preview_limit,
        }
    }

    pub fn service(&self) -> &N {
        &self.service
    }

    pub fn apply_settings(&mut self, settings: &Settings) {
        self.labels = notification_labels(resolve_language(&settings.language));
        self.summary_enabled = settings.persistent_notification;
        self.preview_limit = settings.summary_preview_limit;
    }

    /// Schedules a repeating reminder every `reminder_interval` minutes. Returns
    /// `None` when the task has no reminder.
    pub fn schedule_task_reminder(&self, task: &Task) -> Result<Option<String>, NotificationError> {
        if task.reminder_interval <= 0 {
            return Ok(None);
        }
        let content = NotificationContent {
            title: reminder_title(task),
            body: task
                .description
                .clone()
                .filter(|body| !body.is_empty())
                .unwrap_or_else(|| self.labels.reminder_fallback_body.to_string()),
            task_id: Some(task.id.clone()),
            sticky: false,
        };
        let seconds = u64::try_from(task.reminder_interval)
            .unwrap_or(0)
            .saturating_mul(60);
        let id = self.service.schedule(
            content,
            Trigger::TimeInterval {
                seconds,
                repeats: true,
            },
        )?;
        log::info!(
            "notification: scheduled reminder id={id} task={} every={}m",
            task.id,
            task.reminder_interval
        );
        Ok(Some(id))
    }

    /// Cancels every scheduled reminder tagged with `task_id`, duplicates included.
    pub fn cancel_task_reminder(&self, task_id: &str) -> Result<usize, NotificationError> {
        let mut cancelled = 0;
        for scheduled in self.service.scheduled()? {
            if scheduled.content.task_id.as_deref() == Some(task_id) {
                self.service.cancel(&scheduled.id)?;
                cancelled += 1;
            }
        }
        if cancelled > 0 {
            log::info!("notification: cancelled {cancelled} reminder(s) task={task_id}");
        }
        Ok(cancelled)
    }

    /// Replaces whatever is shown with one sticky summary of `incomplete`.
    /// Nothing is posted when the list is empty or the summary is disabled.
    pub fn update_persistent_notification(
        &self,
        incomplete: &[Task],
    ) -> Result<Option<String>, NotificationError> {
        self.service.dismiss_all()?;
        if !self.summary_enabled {
            return Ok(None);
        }
        let Some(content) = summary_content(incomplete, &self.labels, self.preview_limit) else {
            log::debug!("notification: no outstanding tasks, summary cleared");
            return Ok(None);
        };
        let id = self.service.present(content)?;
        log::debug!(
            "notification: summary posted id={id} outstanding={}",
            incomplete.len()
        );
        Ok(Some(id))
    }

    pub fn cancel_all_notifications(&self) -> Result<(), NotificationError> {
        self.service.cancel_all()?;
        self.service.dismiss_all()?;
        log::info!("notification: cancelled and dismissed everything");
        Ok(())
    }
}

/// The summary headline follows the most severe bucket present: urgent, then high,
/// then a plain count. The body lists the first `preview_limit` titles.
pub fn summary_content(
    incomplete: &[Task],
    labels: &NotificationLabels,
    preview_limit: usize,
) -> Option<NotificationContent> {
    if incomplete.is_empty() {
        return None;
    }
    let total = incomplete.len();
    let count = |priority: Priority| incomplete.iter().filter(|t| t.priority == priority).count();
    let urgent = count(Priority::Urgent);
    let high = count(Priority::High);

    let title = if urgent > 0 {
        (labels.summary_urgent)(urgent, total - urgent)
    } else if high > 0 {
        (labels.summary_high)(high, total - high)
    } else {
        (labels.summary_plain)(total)
    };
    let body = incomplete
        .iter()
        .take(preview_limit)
        .map(|task| format!("• {}", task.title))
        .collect::<Vec<_>>()
        .join("\n");

    Some(NotificationContent {
        title,
        body,
        task_id: None,
        sticky: true,
    })
}

#[derive(Debug, Default)]
struct MemoryInner {
    next_id: u64,
    scheduled: Vec<ScheduledNotification>,
    presented: Vec<(String, NotificationContent)>,
}

/// In-process notification service.
#[derive(Debug, Default)]
pub struct MemoryNotifications {
    inner: Mutex<MemoryInner>,
}

impl MemoryNotifications {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn presented(&self) -> Vec<NotificationContent> {
        let guard = self.inner.lock().expect("notifications poisoned");
        guard.presented.iter().map(|(_, content)| content.clone()).collect()
    }
}

impl MemoryInner {
    fn allocate_id(&mut self) -> String {
        self.next_id += 1;
        format!("n-{}", self.next_id)
    }
}

impl NotificationService for MemoryNotifications {
    fn schedule(
        &self,
        content: NotificationContent,
        trigger: Trigger,
    ) -> Result<String, NotificationError> {
        let mut guard = self.inner.lock().expect("notifications poisoned");
        let id = guard.allocate_id();
        guard.scheduled.push(ScheduledNotification {
            id: id.clone(),
            content,
            trigger,
        });
        Ok(id)
    }

    fn scheduled(&self) -> Result<Vec<ScheduledNotification>, NotificationError> {
        let guard = self.inner.lock().expect("notifications poisoned");
        Ok(guard.scheduled.clone())
    }

    fn cancel(&self, id: &str) -> Result<(), NotificationError> {
        let mut guard = self.inner.lock().expect("notifications poisoned");
        guard.scheduled.retain(|scheduled| scheduled.id != id);
        Ok(())
    }

    fn cancel_all(&self) -> Result<(), NotificationError> {
        let mut guard = self.inner.lock().expect("notifications poisoned");
        guard.scheduled.clear();
        Ok(())
    }

    fn present(&self, content: NotificationContent) -> Result<String, NotificationError> {
        let mut guard = self.inner.lock().expect("notifications poisoned");
        let id = guard.allocate_id();
        guard.presented.push((id.clone(), content));
        Ok(id)
    }

    fn dismiss_all(&self) -> Result<(), NotificationError> {
        let mut guard = self.inner.lock().expect("notifications poisoned");
        guard.presented.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TaskType;
    use chrono::NaiveDate;

    fn make_task(id: &str, priority: Priority, reminder_interval: i64) -> Task {
        Task {
            id: id.to_string(),
            title: format!("task-{id}"),
            description: None,
            task_type: TaskType::Daily,
            priority,
            scheduled_date: NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
            completed: false,
            completed_at: None,
            carried_over: false,
            original_date: None,
            created_at: "2024-01-03T08:00:00Z".parse().unwrap(),
            reminder_interval,
        }
    }

    fn english() -> Settings {
        Settings {
            language: "en".to_string(),
            ..Settings::default()
        }
    }

    #[test]
    fn reminder_without_interval_is_not_scheduled() {
        let service = MemoryNotifications::new();
        let sync = NotificationSync::new(&service, &english());
        assert_eq!(
            sync.schedule_task_reminder(&make_task("a", Priority::Low, 0)).unwrap(),
            None
        );
        assert_eq!(
            sync.schedule_task_reminder(&make_task("b", Priority::Low, -5)).unwrap(),
            None
        );
        assert!(service.scheduled().unwrap().is_empty());
    }

    #[test]
    fn reminder_repeats_every_interval_and_is_tagged() {
        let service = MemoryNotifications::new();
        let sync = NotificationSync::new(&service, &english());
        let mut task = make_task("a", Priority::High, 15);
        task.description = Some("call the bank".to_string());

        let id = sync.schedule_task_reminder(&task).unwrap().expect("scheduled");
        let scheduled = service.scheduled().unwrap();
        assert_eq!(scheduled.len(), 1);
        assert_eq!(scheduled[0].id, id);
        assert_eq!(scheduled[0].content.title, "⏰ task-a");
        assert_eq!(scheduled[0].content.body, "call the bank");
        assert_eq!(scheduled[0].content.task_id.as_deref(), Some("a"));
        assert_eq!(
            scheduled[0].trigger,
            Trigger::TimeInterval {
                seconds: 900,
                repeats: true
            }
        );

        task.description = None;
        sync.schedule_task_reminder(&task).unwrap();
        assert_eq!(
            service.scheduled().unwrap()[1].content.body,
            "Task not finished yet!"
        );
    }

    #[test]
    fn cancel_removes_every_duplicate_for_the_task() {
        let service = MemoryNotifications::new();
        let sync = NotificationSync::new(&service, &english());
        let a = make_task("a", Priority::Low, 10);
        let b = make_task("b", Priority::Low, 10);
        sync.schedule_task_reminder(&a).unwrap();
        sync.schedule_task_reminder(&a).unwrap();
        sync.schedule_task_reminder(&b).unwrap();

        assert_eq!(sync.cancel_task_reminder("a").unwrap(), 2);
        let remaining = service.scheduled().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].content.task_id.as_deref(), Some("b"));
        assert_eq!(sync.cancel_task_reminder("missing").unwrap(), 0);
    }

    #[test]
    fn summary_title_follows_most_severe_bucket() {
        let labels = notification_labels(crate::labels::Language::En);
        let plain = vec![make_task("a", Priority::Low, 0), make_task("b", Priority::Medium, 0)];
        let content = summary_content(&plain, &labels, 3).unwrap();
        assert_eq!(content.title, "📋 2 active task(s)");
        assert!(content.sticky);

        let high = vec![make_task("a", Priority::High, 0), make_task("b", Priority::Low, 0)];
        assert_eq!(
            summary_content(&high, &labels, 3).unwrap().title,
            "🟠 1 high priority, 1 other(s)"
        );

        let urgent = vec![
            make_task("a", Priority::High, 0),
            make_task("b", Priority::Urgent, 0),
            make_task("c", Priority::Urgent, 0),
        ];
        assert_eq!(
            summary_content(&urgent, &labels, 3).unwrap().title,
            "🔴 2 urgent, 1 other(s)"
        );
        assert!(summary_content(&[], &labels, 3).is_none());
    }

    #[test]
    fn summary_body_lists_at_most_three_titles() {
        let labels = notification_labels(crate::labels::Language::En);
        let tasks: Vec<Task> = ["a", "b", "c", "d"]
            .iter()
            .map(|id| make_task(id, Priority::Low, 0))
            .collect();
        let content = summary_content(&tasks, &labels, 3).unwrap();
        assert_eq!(content.body, "• task-a\n• task-b\n• task-c");
    }

    #[test]
    fn persistent_summary_replaces_previous_and_clears_when_done() {
        let service = MemoryNotifications::new();
        let sync = NotificationSync::new(&service, &english());
        let tasks = vec![make_task("a", Priority::Low, 0)];

        sync.update_persistent_notification(&tasks).unwrap();
        sync.update_persistent_notification(&tasks).unwrap();
        assert_eq!(service.presented().len(), 1);

        assert_eq!(sync.update_persistent_notification(&[]).unwrap(), None);
        assert!(service.presented().is_empty());
    }

    #[test]
    fn disabled_summary_only_dismisses() {
        let service = MemoryNotifications::new();
        let mut sync = NotificationSync::new(&service, &english());
        sync.update_persistent_notification(&[make_task("a", Priority::Low, 0)])
            .unwrap();
        let settings = Settings {
            persistent_notification: false,
            ..english()
        };
        sync.apply_settings(&settings);
        assert_eq!(
            sync.update_persistent_notification(&[make_task("a", Priority::Low, 0)])
                .unwrap(),
            None
        );
        assert!(service.presented().is_empty());
    }

    #[test]
    fn cancel_all_clears_scheduled_and_presented() {
        let service = MemoryNotifications::new();
        let sync = NotificationSync::new(&service, &english());
        let task = make_task("a", Priority::Urgent, 5);
        sync.schedule_task_reminder(&task).unwrap();
        sync.update_persistent_notification(&[task]).unwrap();

        sync.cancel_all_notifications().unwrap();
        assert!(service.scheduled().unwrap().is_empty());
        assert!(service.presented().is_empty());
    }
}
