//! Task lifecycle: mutations, the derived "today" views and the daily carry-over.
//!
//! Every operation loads the whole document, works on it and, when something
//! changed, writes it back. Unknown ids are quiet no-ops because callers may hold
//! a slightly stale list.

use chrono::NaiveDate;
use serde::Serialize;

use crate::analytics::calculate_analytics;
use crate::clock::Clock;
use crate::dates::{first_weekday_of_month, is_past, month_days};
use crate::decode::new_task_id;
use crate::models::{Analytics, AppState, NewTask, Settings, Task, TaskPatch, TaskType};
use crate::storage::{KeyValueStore, StateRepository, StorageError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub total: usize,
    pub incomplete: usize,
    pub is_today: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthOverview {
    pub year: i32,
    pub month: u32,
    /// Blank cells before day 1 in a Sunday-first grid.
    pub leading_blanks: u32,
    pub days: Vec<CalendarDay>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Progress {
    pub total: usize,
    pub completed: usize,
    pub percent: f64,
}

pub struct TaskEngine<S, C> {
    repo: StateRepository<S>,
    clock: C,
}

impl<S: KeyValueStore, C: Clock> TaskEngine<S, C> {
    pub fn new(store: S, clock: C) -> Self {
        Self {
            repo: StateRepository::new(store),
            clock,
        }
    }

    pub fn repository(&self) -> &StateRepository<S> {
        &self.repo
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn load(&self) -> Result<AppState, StorageError> {
        self.repo.load(self.clock.today(), self.clock.now())
    }

    pub fn settings(&self) -> Result<Settings, StorageError> {
        self.repo.load_settings()
    }

    pub fn save_settings(&self, settings: &Settings) -> Result<(), StorageError> {
        self.repo.save_settings(settings)
    }

    pub fn add_task(&self, fields: NewTask) -> Result<Task, StorageError> {
        let mut state = self.load()?;
        let task = Task {
            id: new_task_id(),
            title: fields.title,
            description: fields.description,
            task_type: fields.task_type,
            priority: fields.priority,
            scheduled_date: fields.scheduled_date,
            completed: false,
            completed_at: None,
            carried_over: false,
            original_date: None,
            created_at: self.clock.now(),
            reminder_interval: fields.reminder_interval,
        };
        state.tasks.push(task.clone());
        self.repo.save(&state)?;
        log::info!(
            "task: added id={} type={} date={}",
            task.id,
            task.task_type.as_str(),
            task.scheduled_date
        );
        Ok(task)
    }

    /// Merges `patch` into the task. Returns the updated task, or `None` if the id
    /// is unknown (nothing is written in that case).
    pub fn update_task(&self, task_id: &str, patch: TaskPatch) -> Result<Option<Task>, StorageError> {
        let mut state = self.load()?;
        let Some(task) = state.find_mut(task_id) else {
            log::debug!("task: update skipped, unknown id={task_id}");
            return Ok(None);
        };
        patch.apply(task);
        let updated = task.clone();
        self.repo.save(&state)?;
        log::info!("task: updated id={task_id}");
        Ok(Some(updated))
    }

    /// Returns whether a task was removed.
    pub fn delete_task(&self, task_id: &str) -> Result<bool, StorageError> {
        let mut state = self.load()?;
        let before = state.tasks.len();
        state.tasks.retain(|task| task.id != task_id);
        if state.tasks.len() == before {
            log::debug!("task: delete skipped, unknown id={task_id}");
            return Ok(false);
        }
        self.repo.save(&state)?;
        log::info!("task: deleted id={task_id}");
        Ok(true)
    }

    pub fn toggle_task_complete(&self, task_id: &str) -> Result<Option<Task>, StorageError> {
        let mut state = self.load()?;
        let now = self.clock.now();
        let Some(task) = state.find_mut(task_id) else {
            log::debug!("task: toggle skipped, unknown id={task_id}");
            return Ok(None);
        };
        task.completed = !task.completed;
        task.completed_at = task.completed.then_some(now);
        let toggled = task.clone();
        self.repo.save(&state)?;
        log::info!("task: toggled id={task_id} completed={}", toggled.completed);
        Ok(Some(toggled))
    }

    pub fn get_tasks(&self) -> Result<Vec<Task>, StorageError> {
        Ok(self.load()?.tasks)
    }

    pub fn get_task(&self, task_id: &str) -> Result<Option<Task>, StorageError> {
        Ok(self.load()?.tasks.into_iter().find(|task| task.id == task_id))
    }

    pub fn get_tasks_for_date(&self, date: NaiveDate) -> Result<Vec<Task>, StorageError> {
        Ok(tasks_for_date(self.load()?.tasks, date))
    }

    pub fn get_today_tasks(&self) -> Result<Vec<Task>, StorageError> {
        Ok(today_tasks(self.load()?.tasks, self.clock.today()))
    }

    pub fn get_incomplete_tasks(&self) -> Result<Vec<Task>, StorageError> {
        Ok(incomplete_tasks(self.load()?.tasks, self.clock.today()))
    }

    /// Rolls unfinished daily tasks from earlier days onto today. Runs at most once
    /// per calendar day; returns how many tasks moved.
    pub fn process_carry_over(&self) -> Result<usize, StorageError> {
        let mut state = self.load()?;
        let today = self.clock.today();
        if state.last_opened_date == today {
            return Ok(0);
        }
        let carried = carry_over(&mut state, today);
        self.repo.save(&state)?;
        if carried > 0 {
            log::info!("carry-over: moved {carried} task(s) to {today}");
        } else {
            log::debug!("carry-over: nothing to move, marked {today}");
        }
        Ok(carried)
    }

    pub fn has_incomplete_on(&self, date: NaiveDate) -> Result<bool, StorageError> {
        Ok(self
            .load()?
            .tasks
            .iter()
            .any(|task| task.scheduled_date == date && !task.completed))
    }

    pub fn month_overview(&self, year: i32, month: u32) -> Result<MonthOverview, StorageError> {
        let tasks = self.load()?.tasks;
        Ok(month_overview(&tasks, year, month, self.clock.today()))
    }

    pub fn today_progress(&self) -> Result<Progress, StorageError> {
        Ok(progress(&self.get_today_tasks()?))
    }

    pub fn calculate_analytics(&self) -> Result<Analytics, StorageError> {
        Ok(calculate_analytics(&self.load()?.tasks, self.clock.today()))
    }
}

/// Moves every incomplete daily task dated before `today` onto `today`, recording
/// the first date it was scheduled for, and stamps the document with `today`.
pub fn carry_over(state: &mut AppState, today: NaiveDate) -> usize {
    let mut carried = 0;
    for task in state
        .tasks
        .iter_mut()
        .filter(|task| task.task_type == TaskType::Daily && !task.completed)
        .filter(|task| is_past(task.scheduled_date, today))
    {
        task.carried_over = true;
        task.original_date = task.original_date.or(Some(task.scheduled_date));
        task.scheduled_date = today;
        carried += 1;
    }
    state.last_opened_date = today;
    carried
}

pub fn tasks_for_date(tasks: Vec<Task>, date: NaiveDate) -> Vec<Task> {
    tasks
        .into_iter()
        .filter(|task| task.scheduled_date == date)
        .collect()
}

/// Tasks dated today plus every unfinished lifetime task.
pub fn today_tasks(tasks: Vec<Task>, today: NaiveDate) -> Vec<Task> {
    tasks
        .into_iter()
        .filter(|task| task.scheduled_date == today || (task.is_lifetime() && !task.completed))
        .collect()
}

/// Unfinished tasks for today, including lifetime tasks.
pub fn incomplete_tasks(tasks: Vec<Task>, today: NaiveDate) -> Vec<Task> {
    tasks
        .into_iter()
        .filter(|task| !task.completed && (task.scheduled_date == today || task.is_lifetime()))
        .collect()
}

/// Display order: open tasks first, then urgent down to low. Stable otherwise.
pub fn sort_for_display(tasks: &mut [Task]) {
    tasks.sort_by(|a, b| {
        a.completed
            .cmp(&b.completed)
            .then_with(|| b.priority.cmp(&a.priority))
    });
}

pub fn progress(tasks: &[Task]) -> Progress {
    let total = tasks.len();
    let completed = tasks.iter().filter(|task| task.completed).count();
    let percent = if total > 0 {
        completed as f64 / total as f64 * 100.0
    } else {
        0.0
    };
    Progress {
        total,
        completed,
        percent,
    }
}

pub fn month_overview(tasks: &[Task], year: i32, month: u32, today: NaiveDate) -> MonthOverview {
    let days = month_days(year, month)
        .into_iter()
        .map(|date| {
            let on_day = tasks.iter().filter(|task| task.scheduled_date == date);
            let (total, incomplete) = on_day.fold((0, 0), |(total, open), task| {
                (total + 1, open + usize::from(!task.completed))
            });
            CalendarDay {
                date,
                total,
                incomplete,
                is_today: date == today,
            }
        })
        .collect();
    MonthOverview {
        year,
        month,
        leading_blanks: first_weekday_of_month(year, month),
        days,
    }
}
