//! Completion statistics over a trailing 30-day window.

use chrono::NaiveDate;

use crate::dates::{is_future, last_n_days};
use crate::models::{Analytics, DayStats, PriorityCounts, Task};

pub const WINDOW_DAYS: u32 = 30;
pub const WEEK_DAYS: usize = 7;

/// A carried task counts on its original day and on the day it currently sits on,
/// so it can appear twice in the window totals.
pub fn calculate_analytics(tasks: &[Task], today: NaiveDate) -> Analytics {
    let daily_stats: Vec<DayStats> = last_n_days(today, WINDOW_DAYS)
        .into_iter()
        .map(|date| day_stats(tasks, date))
        .collect();

    let total: usize = daily_stats.iter().map(|day| day.total).sum();
    let completed: usize = daily_stats.iter().map(|day| day.completed).sum();
    let carried = tasks.iter().filter(|task| task.carried_over).count();

    let mut tasks_by_priority = PriorityCounts::default();
    for task in tasks {
        tasks_by_priority.increment(task.priority);
    }

    Analytics {
        completion_rate: percentage(completed, total),
        carry_over_rate: percentage(carried, total),
        streak_days: streak_days(&daily_stats, today),
        tasks_by_priority,
        daily_stats,
    }
}

fn day_stats(tasks: &[Task], date: NaiveDate) -> DayStats {
    let on_day = tasks
        .iter()
        .filter(|task| task.scheduled_date == date || task.original_date == Some(date));
    let (total, completed) = on_day.fold((0, 0), |(total, done), task| {
        (total + 1, done + usize::from(task.completed))
    });
    DayStats {
        date,
        total,
        completed,
    }
}

/// Consecutive fully completed days, newest first. Days without tasks (and days
/// after `today`) are skipped; the first partially completed day ends the streak.
pub fn streak_days(daily_stats: &[DayStats], today: NaiveDate) -> usize {
    let mut streak = 0;
    for day in daily_stats.iter().rev() {
        if is_future(day.date, today) || day.total == 0 {
            continue;
        }
        if day.completed != day.total {
            break;
        }
        streak += 1;
    }
    streak
}

/// Completion rate over the last seven entries of the window.
pub fn completion_rate_for_week(analytics: &Analytics) -> f64 {
    let start = analytics.daily_stats.len().saturating_sub(WEEK_DAYS);
    let week = &analytics.daily_stats[start..];
    let total: usize = week.iter().map(|day| day.total).sum();
    let completed: usize = week.iter().map(|day| day.completed).sum();
    percentage(completed, total)
}

fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    part as f64 / total as f64 * 100.0
}
