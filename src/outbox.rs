use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::notification::{
    NotificationContent, NotificationError, NotificationService, ScheduledNotification, Trigger,
};
use crate::storage::{write_atomic, StorageError};

pub const OUTBOX_FILE: &str = "notifications.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct PresentedNotification {
    pub id: String,
    pub content: NotificationContent,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct OutboxFile {
    #[serde(default)]
    pub next_id: u64,
    #[serde(default)]
    pub scheduled: Vec<ScheduledNotification>,
    #[serde(default)]
    pub presented: Vec<PresentedNotification>,
}

impl From<StorageError> for NotificationError {
    fn from(value: StorageError) -> Self {
        NotificationError(value.to_string())
    }
}

/// Notification service backed by a JSON file, for hosts without a platform
/// notification center. Each call reads and rewrites the whole file, so several
/// processes (a `watch` loop and one-off commands) see the same reminders.
pub struct FileOutbox {
    path: PathBuf,
}

impl FileOutbox {
    pub fn new(root: PathBuf) -> Self {
        Self {
            path: root.join(OUTBOX_FILE),
        }
    }

    pub fn read(&self) -> Result<OutboxFile, NotificationError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => serde_json::from_str(&raw)
                .map_err(|err| NotificationError::from(StorageError::Json(err))),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(OutboxFile::default()),
            Err(err) => Err(StorageError::Io(err).into()),
        }
    }

    fn write(&self, data: &OutboxFile) -> Result<(), NotificationError> {
        let json = serde_json::to_vec_pretty(data).map_err(StorageError::Json)?;
        write_atomic(&self.path, &json)?;
        Ok(())
    }

    fn update<T>(
        &self,
        mutate: impl FnOnce(&mut OutboxFile) -> T,
    ) -> Result<T, NotificationError> {
        let mut data = self.read()?;
        let out = mutate(&mut data);
        self.write(&data)?;
        Ok(out)
    }

    pub fn presented(&self) -> Result<Vec<PresentedNotification>, NotificationError> {
        Ok(self.read()?.presented)
    }
}

fn allocate_id(data: &mut OutboxFile) -> String {
    data.next_id += 1;
    format!("local-{}", data.next_id)
}

impl NotificationService for FileOutbox {
    fn schedule(
        &self,
        content: NotificationContent,
        trigger: Trigger,
    ) -> Result<String, NotificationError> {
        self.update(|data| {
            let id = allocate_id(data);
            data.scheduled.push(ScheduledNotification {
                id: id.clone(),
                content,
                trigger,
            });
            id
        })
    }

    fn scheduled(&self) -> Result<Vec<ScheduledNotification>, NotificationError> {
        Ok(self.read()?.scheduled)
    }

    fn cancel(&self, id: &str) -> Result<(), NotificationError> {
        self.update(|data| data.scheduled.retain(|scheduled| scheduled.id != id))
    }

    fn cancel_all(&self) -> Result<(), NotificationError> {
        self.update(|data| data.scheduled.clear())
    }

    fn present(&self, content: NotificationContent) -> Result<String, NotificationError> {
        self.update(|data| {
            let id = allocate_id(data);
            data.presented.push(PresentedNotification {
                id: id.clone(),
                content,
            });
            id
        })
    }

    fn dismiss_all(&self) -> Result<(), NotificationError> {
        self.update(|data| data.presented.clear())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content(task_id: Option<&str>) -> NotificationContent {
        NotificationContent {
            title: "title".to_string(),
            body: "body".to_string(),
            task_id: task_id.map(str::to_string),
            sticky: false,
        }
    }

    #[test]
    fn missing_file_reads_as_empty_outbox() {
        let dir = tempfile::tempdir().unwrap();
        let outbox = FileOutbox::new(dir.path().to_path_buf());
        assert_eq!(outbox.read().unwrap(), OutboxFile::default());
        assert!(outbox.scheduled().unwrap().is_empty());
    }

    #[test]
    fn schedule_cancel_and_present_persist_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let outbox = FileOutbox::new(dir.path().to_path_buf());
        let trigger = Trigger::TimeInterval {
            seconds: 60,
            repeats: true,
        };
        let first = outbox.schedule(content(Some("a")), trigger).unwrap();
        let second = outbox.schedule(content(Some("b")), trigger).unwrap();
        assert_ne!(first, second);
        outbox.present(content(None)).unwrap();

        let reopened = FileOutbox::new(dir.path().to_path_buf());
        assert_eq!(reopened.scheduled().unwrap().len(), 2);
        assert_eq!(reopened.presented().unwrap().len(), 1);

        reopened.cancel(&first).unwrap();
        let remaining = outbox.scheduled().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, second);

        reopened.dismiss_all().unwrap();
        reopened.cancel_all().unwrap();
        let data = outbox.read().unwrap();
        assert!(data.scheduled.is_empty());
        assert!(data.presented.is_empty());
        // Ids keep increasing so a cancelled id is never reused.
        assert_eq!(data.next_id, 3);
    }

    #[test]
    fn corrupt_file_surfaces_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(OUTBOX_FILE), b"{ nope").unwrap();
        let outbox = FileOutbox::new(dir.path().to_path_buf());
        let err = outbox.scheduled().unwrap_err();
        assert!(err.to_string().contains("json error"));
    }
}
