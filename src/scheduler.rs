use std::collections::HashMap;
use std::time::Duration;

use chrono::TimeDelta;

use crate::clock::Clock;
use crate::models::Timestamp;
use crate::notification::{NotificationService, ScheduledNotification, Trigger};

/// Tracks when each scheduled repeating reminder is next due.
#[derive(Debug, Default)]
pub struct ReminderTracker {
    next_due: HashMap<String, Timestamp>,
}

impl ReminderTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the reminders due at `now` and advances their next due time.
    /// A reminder seen for the first time is due one interval after `now`;
    /// reminders no longer scheduled are forgotten.
    pub fn collect_due(
        &mut self,
        scheduled: &[ScheduledNotification],
        now: Timestamp,
    ) -> Vec<ScheduledNotification> {
        self.next_due
            .retain(|id, _| scheduled.iter().any(|reminder| &reminder.id == id));

        let mut due = Vec::new();
        for reminder in scheduled {
            let Trigger::TimeInterval { seconds, repeats } = reminder.trigger;
            if seconds == 0 {
                continue;
            }
            let interval = i64::try_from(seconds)
                .ok()
                .and_then(TimeDelta::try_seconds);
            let Some(next) = self.next_due.get(&reminder.id).copied() else {
                self.next_due
                    .insert(reminder.id.clone(), advance(now, interval));
                continue;
            };
            if now < next {
                continue;
            }
            due.push(reminder.clone());
            if repeats {
                // Skip missed periods instead of firing a burst after a sleep.
                let mut following = advance(next, interval);
                while following <= now {
                    following = advance(following, interval);
                }
                self.next_due.insert(reminder.id.clone(), following);
            } else {
                self.next_due.insert(reminder.id.clone(), Timestamp::MAX_UTC);
            }
        }
        due
    }

    pub fn next_due(&self, id: &str) -> Option<Timestamp> {
        self.next_due.get(id).copied()
    }
}

/// Adds one interval; an interval past the representable range is never due.
fn advance(from: Timestamp, interval: Option<TimeDelta>) -> Timestamp {
    interval
        .and_then(|interval| from.checked_add_signed(interval))
        .unwrap_or(Timestamp::MAX_UTC)
}

/// Polls the service every `period` and hands due reminders to `on_fire`.
/// Stops after `max_ticks` ticks when given, otherwise runs until the task is dropped.
pub async fn run_reminder_ticker<N, C, F>(
    service: N,
    clock: C,
    period: Duration,
    max_ticks: Option<u64>,
    mut on_fire: F,
) where
    N: NotificationService,
    C: Clock,
    F: FnMut(&ScheduledNotification),
{
    let mut tracker = ReminderTracker::new();
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut ticks = 0u64;
    loop {
        if max_ticks.is_some_and(|max| ticks >= max) {
            break;
        }
        interval.tick().await;
        ticks += 1;
        let scheduled = match service.scheduled() {
            Ok(scheduled) => scheduled,
            Err(err) => {
                log::warn!("scheduler: failed to read scheduled reminders: {err}");
                continue;
            }
        };
        for reminder in tracker.collect_due(&scheduled, clock.now()) {
            log::info!(
                "scheduler: reminder fired id={} task={}",
                reminder.id,
                reminder.content.task_id.as_deref().unwrap_or("-")
            );
            on_fire(&reminder);
        }
    }
}
