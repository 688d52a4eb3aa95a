//! Core of a personal task reminder: daily and lifetime tasks kept in one local
//! JSON document, a once-a-day carry-over of unfinished work, completion analytics,
//! and local notifications that track what is still outstanding.

pub mod analytics;
pub mod clock;
pub mod commands;
pub mod dates;
pub mod decode;
pub mod labels;
pub mod lifecycle;
pub mod logging;
pub mod models;
pub mod notification;
pub mod outbox;
pub mod scheduler;
pub mod storage;

pub use clock::{Clock, FixedClock, SystemClock, ZonedClock};
pub use commands::{CommandResult, Commands};
pub use lifecycle::TaskEngine;
pub use models::{
    Analytics, AppState, DayStats, NewTask, Priority, PriorityCounts, Settings, Task, TaskPatch,
    TaskType,
};
pub use notification::{MemoryNotifications, NotificationService, NotificationSync};
pub use outbox::FileOutbox;
pub use storage::{FileStore, KeyValueStore, MemoryStore, StateRepository, StorageError};
