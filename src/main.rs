use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use chrono::{Datelike, NaiveDate};
use clap::{Parser, Subcommand};
use serde::Serialize;

use task_reminder_lib::commands::{err, ok};
use task_reminder_lib::dates::{format_date, parse_date};
use task_reminder_lib::logging::init_logging;
use task_reminder_lib::notification::{NotificationService, ScheduledNotification, Trigger};
use task_reminder_lib::outbox::PresentedNotification;
use task_reminder_lib::scheduler::run_reminder_ticker;
use task_reminder_lib::{
    Clock, CommandResult, Commands, FileOutbox, FileStore, NewTask, Priority, SystemClock, Task,
    TaskEngine, TaskPatch, TaskType,
};

const APP_DIR: &str = "task-reminder";

#[derive(Parser)]
#[command(name = "task-reminder", version, about = "Daily and lifetime task reminders")]
struct Cli {
    /// Directory holding tasks, settings, notifications and logs.
    #[arg(long, global = true, env = "TASK_REMINDER_HOME")]
    data_dir: Option<PathBuf>,

    /// Print raw command results as JSON.
    #[arg(long, global = true)]
    json: bool,

    /// Mirror debug logs to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Show today's tasks (default).
    Today,
    /// Add a task.
    Add {
        title: String,
        #[arg(long)]
        description: Option<String>,
        /// Keep the task until it is done instead of attaching it to one day.
        #[arg(long)]
        lifetime: bool,
        #[arg(long, value_parser = parse_priority, default_value = "medium")]
        priority: Priority,
        /// YYYY-MM-DD, defaults to today.
        #[arg(long, value_parser = parse_date_arg)]
        date: Option<NaiveDate>,
        /// Minutes between reminders, 0 disables them.
        #[arg(long, default_value_t = 0)]
        remind_every: i64,
    },
    /// List tasks scheduled on a date.
    List {
        #[arg(long, value_parser = parse_date_arg)]
        date: NaiveDate,
    },
    /// Edit fields of a task.
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, value_parser = parse_priority)]
        priority: Option<Priority>,
        #[arg(long, value_parser = parse_date_arg)]
        date: Option<NaiveDate>,
        #[arg(long)]
        remind_every: Option<i64>,
    },
    /// Mark a task done, or open again.
    Toggle { id: String },
    /// Delete a task and its reminders.
    Delete { id: String },
    /// 30-day completion statistics.
    Analytics,
    /// Month overview; defaults to the current month.
    Calendar {
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        month: Option<u32>,
    },
    /// Show scheduled reminders and the current summary.
    Notifications {
        /// Rebuild reminders from the stored tasks first.
        #[arg(long)]
        resync: bool,
    },
    /// Stay in the foreground and print reminders as they come due.
    Watch,
    /// Show or change settings.
    Settings {
        #[arg(long)]
        language: Option<String>,
        #[arg(long)]
        persistent_notification: Option<bool>,
        #[arg(long)]
        summary_preview_limit: Option<usize>,
        #[arg(long)]
        tick_interval_secs: Option<u64>,
    },
}

fn parse_priority(value: &str) -> Result<Priority, String> {
    Priority::parse(value).ok_or_else(|| format!("unknown priority: {value}"))
}

fn parse_date_arg(value: &str) -> Result<NaiveDate, String> {
    parse_date(value).ok_or_else(|| format!("expected YYYY-MM-DD, got {value}"))
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

type CliCommands = Commands<FileStore, SystemClock, FileOutbox>;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let data_dir = cli.data_dir.clone().unwrap_or_else(default_data_dir);

    let store = FileStore::new(data_dir.clone());
    if let Err(error) = store.ensure_dirs() {
        eprintln!("cannot create data directory {}: {error}", data_dir.display());
        return ExitCode::FAILURE;
    }
    let _logger = match init_logging(&data_dir, cli.verbose) {
        Ok(handle) => Some(handle),
        Err(error) => {
            eprintln!("logging disabled: {error}");
            None
        }
    };
    log::info!("start data_dir={}", data_dir.display());

    let engine = TaskEngine::new(store, SystemClock);
    let mut commands = Commands::new(engine, FileOutbox::new(data_dir.clone()));

    let opened = commands.open_app();
    if !opened.ok {
        return finish(cli.json, opened, |_| {});
    }
    if let Some(payload) = &opened.data {
        if payload.carried > 0 && !cli.json {
            println!("↪ {} unfinished task(s) carried over to today", payload.carried);
        }
    }

    match cli.command.unwrap_or(Command::Today) {
        Command::Today => finish(cli.json, opened, |payload| {
            println!(
                "Today: {}/{} done ({:.0}%)",
                payload.progress.completed, payload.progress.total, payload.progress.percent
            );
            print_tasks(&payload.tasks);
        }),
        Command::Add {
            title,
            description,
            lifetime,
            priority,
            date,
            remind_every,
        } => {
            let fields = NewTask {
                title,
                description,
                task_type: if lifetime {
                    TaskType::Lifetime
                } else {
                    TaskType::Daily
                },
                priority,
                scheduled_date: date.unwrap_or_else(|| SystemClock.today()),
                reminder_interval: remind_every,
            };
            finish(cli.json, commands.create_task(fields), |task| {
                println!("added {}", task.id);
            })
        }
        Command::List { date } => {
            let open_work = commands.engine().has_incomplete_on(date).unwrap_or(false);
            finish(cli.json, commands.tasks_for_date(date), |tasks| {
                let marker = if open_work { " *" } else { "" };
                println!("{}{marker}", format_date(date));
                print_tasks(tasks);
            })
        }
        Command::Edit {
            id,
            title,
            description,
            priority,
            date,
            remind_every,
        } => {
            let patch = TaskPatch {
                title,
                description: description.map(|text| Some(text).filter(|t| !t.is_empty())),
                priority,
                scheduled_date: date,
                reminder_interval: remind_every,
                ..TaskPatch::default()
            };
            finish(cli.json, commands.update_task(&id, patch), |task| match task {
                Some(task) => println!("updated {}", task.id),
                None => println!("no task with id {id}"),
            })
        }
        Command::Toggle { id } => finish(cli.json, commands.toggle_task(&id), |task| match task {
            Some(task) if task.completed => println!("done: {}", task.title),
            Some(task) => println!("reopened: {}", task.title),
            None => println!("no task with id {id}"),
        }),
        Command::Delete { id } => finish(cli.json, commands.delete_task(&id), |removed| {
            if *removed {
                println!("deleted {id}");
            } else {
                println!("no task with id {id}");
            }
        }),
        Command::Analytics => finish(cli.json, commands.analytics(), |payload| {
            let analytics = &payload.analytics;
            println!("completion (30d): {:.1}%", analytics.completion_rate);
            println!("completion (7d):  {:.1}%", payload.week_completion_rate);
            println!("carry-over rate:  {:.1}%", analytics.carry_over_rate);
            println!("streak:           {} day(s)", analytics.streak_days);
            for priority in Priority::ALL.iter().rev() {
                println!(
                    "  {:<7} {}",
                    priority.as_str(),
                    analytics.tasks_by_priority.get(*priority)
                );
            }
        }),
        Command::Calendar { year, month } => {
            let today = SystemClock.today();
            let result = commands.month_overview(
                year.unwrap_or(today.year()),
                month.unwrap_or(today.month()),
            );
            finish(cli.json, result, |overview| {
                println!("{:04}-{:02}", overview.year, overview.month);
                println!(" Su Mo Tu We Th Fr Sa");
                let mut line = "   ".repeat(overview.leading_blanks as usize);
                for (index, day) in overview.days.iter().enumerate() {
                    let marker = if day.incomplete > 0 { '*' } else { ' ' };
                    line.push_str(&format!("{:>2}{marker}", index + 1));
                    if (overview.leading_blanks as usize + index + 1) % 7 == 0 {
                        println!("{}", line.trim_end());
                        line.clear();
                    }
                }
                if !line.is_empty() {
                    println!("{}", line.trim_end());
                }
            })
        }
        Command::Notifications { resync } => {
            if resync {
                let result = commands.resync_notifications();
                if !result.ok {
                    return finish(cli.json, result, |_| {});
                }
            }
            notifications_report(cli.json, &commands)
        }
        Command::Watch => watch(&commands),
        Command::Settings {
            language,
            persistent_notification,
            summary_preview_limit,
            tick_interval_secs,
        } => {
            let current = commands.settings();
            if !current.ok {
                return finish(cli.json, current, |_| {});
            }
            let mut settings = current.data.unwrap_or_default();
            let changed = language.is_some()
                || persistent_notification.is_some()
                || summary_preview_limit.is_some()
                || tick_interval_secs.is_some();
            if let Some(language) = language {
                settings.language = language;
            }
            if let Some(enabled) = persistent_notification {
                settings.persistent_notification = enabled;
            }
            if let Some(limit) = summary_preview_limit {
                settings.summary_preview_limit = limit;
            }
            if let Some(secs) = tick_interval_secs {
                settings.tick_interval_secs = secs.max(1);
            }
            let result = if changed {
                commands.update_settings(settings)
            } else {
                commands.settings()
            };
            finish(cli.json, result, |settings| {
                println!("language                {}", settings.language);
                println!("persistent_notification {}", settings.persistent_notification);
                println!("summary_preview_limit   {}", settings.summary_preview_limit);
                println!("tick_interval_secs      {}", settings.tick_interval_secs);
            })
        }
    }
}

fn finish<T: Serialize>(json: bool, result: CommandResult<T>, render: impl FnOnce(&T)) -> ExitCode {
    if json {
        match serde_json::to_string_pretty(&result) {
            Ok(text) => println!("{text}"),
            Err(error) => eprintln!("json error: {error}"),
        }
    } else if let Some(data) = &result.data {
        render(data);
    }
    if result.ok {
        ExitCode::SUCCESS
    } else {
        if !json {
            eprintln!("error: {}", result.error.unwrap_or_default());
        }
        ExitCode::FAILURE
    }
}

fn print_tasks(tasks: &[Task]) {
    if tasks.is_empty() {
        println!("  (no tasks)");
        return;
    }
    for task in tasks {
        let check = if task.completed { "x" } else { " " };
        let kind = match task.task_type {
            TaskType::Lifetime => " [lifetime]",
            TaskType::Daily => "",
        };
        let carried = match task.original_date {
            Some(date) if task.carried_over => format!(" (from {})", format_date(date)),
            _ => String::new(),
        };
        println!(
            "  [{check}] {:<6} {}{kind}{carried}  {}",
            task.priority.as_str(),
            task.title,
            task.id
        );
    }
}

#[derive(Serialize)]
struct NotificationsReport {
    scheduled: Vec<ScheduledNotification>,
    presented: Vec<PresentedNotification>,
}

fn notifications_report(json: bool, commands: &CliCommands) -> ExitCode {
    let outbox = commands.notifications().service();
    let report = outbox.scheduled().and_then(|scheduled| {
        Ok(NotificationsReport {
            scheduled,
            presented: outbox.presented()?,
        })
    });
    let result = match report {
        Ok(report) => ok(report),
        Err(error) => {
            log::warn!("notifications unreadable: {error}");
            err(&error.to_string())
        }
    };
    finish(json, result, |report| {
        for shown in &report.presented {
            println!("{}", shown.content.title);
            for line in shown.content.body.lines() {
                println!("  {line}");
            }
        }
        println!("{} reminder(s) scheduled", report.scheduled.len());
        for reminder in &report.scheduled {
            let Trigger::TimeInterval { seconds, .. } = reminder.trigger;
            println!("  {} every {}m  {}", reminder.id, seconds / 60, reminder.content.title);
        }
    })
}

fn watch(commands: &CliCommands) -> ExitCode {
    let period = commands
        .settings()
        .data
        .map(|settings| settings.tick_interval_secs.max(1))
        .unwrap_or(30);
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
    {
        Ok(runtime) => runtime,
        Err(error) => {
            eprintln!("cannot start runtime: {error}");
            return ExitCode::FAILURE;
        }
    };
    println!("watching reminders every {period}s, Ctrl+C to stop");
    runtime.block_on(run_reminder_ticker(
        commands.notifications().service(),
        SystemClock,
        Duration::from_secs(period),
        None,
        |reminder| {
            println!("{}", reminder.content.title);
            println!("  {}", reminder.content.body);
        },
    ));
    ExitCode::SUCCESS
}
