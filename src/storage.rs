use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::decode::{DecodeContext, RawAppState};
use crate::models::{AppState, Settings, Timestamp};

pub const STATE_KEY: &str = "task_reminder_app_state";
pub const SETTINGS_KEY: &str = "settings";

#[derive(Debug)]
pub enum StorageError {
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Io(err) => write!(f, "io error: {err}"),
            StorageError::Json(err) => write!(f, "json error: {err}"),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<std::io::Error> for StorageError {
    fn from(value: std::io::Error) -> Self {
        StorageError::Io(value)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(value: serde_json::Error) -> Self {
        StorageError::Json(value)
    }
}

/// Platform key-value persistence: whole string values stored under fixed keys.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// One `<key>.json` file per key under a root directory.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn ensure_dirs(&self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let mut file = match File::open(self.path_for(key)) {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let mut buf = String::new();
        file.read_to_string(&mut buf)?;
        Ok(Some(buf))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        write_atomic(&self.path_for(key), value.as_bytes())
    }
}

/// Writes through a sibling temp file so readers never observe a half-written document.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let temp_path = path.with_extension("tmp");
    {
        let mut file = File::create(&temp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    fs::rename(temp_path, path)?;
    Ok(())
}

/// In-process store, used by tests and embedders without a filesystem.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let guard = self.entries.lock().expect("store poisoned");
        Ok(guard.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut guard = self.entries.lock().expect("store poisoned");
        guard.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &S {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }
}

/// Loads and saves the whole app document. Every call goes to the backing store;
/// nothing is cached between operations.
pub struct StateRepository<S> {
    store: S,
}

impl<S: KeyValueStore> StateRepository<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the sanitized document, or an empty one dated `today` if nothing
    /// has been saved yet.
    pub fn load(&self, today: NaiveDate, now: Timestamp) -> Result<AppState, StorageError> {
        let Some(raw) = self.store.get(STATE_KEY)? else {
            log::debug!("storage: no saved state, starting empty today={today}");
            return Ok(AppState::empty(today));
        };
        let raw: RawAppState = serde_json::from_str(&raw)?;
        Ok(raw.decode(DecodeContext { today, now }))
    }

    /// Overwrites the stored document unconditionally.
    pub fn save(&self, state: &AppState) -> Result<(), StorageError> {
        let json = serde_json::to_string(state)?;
        self.store.set(STATE_KEY, &json)?;
        log::debug!(
            "storage: saved state tasks={} last_opened_date={}",
            state.tasks.len(),
            state.last_opened_date
        );
        Ok(())
    }

    pub fn load_settings(&self) -> Result<Settings, StorageError> {
        Ok(self.load_json(SETTINGS_KEY)?.unwrap_or_default())
    }

    pub fn save_settings(&self, settings: &Settings) -> Result<(), StorageError> {
        self.save_json(SETTINGS_KEY, settings)
    }

    fn load_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        match self.store.get(key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    fn save_json<T: Serialize>(&self, key: &str, data: &T) -> Result<(), StorageError> {
        let json = serde_json::to_string_pretty(data)?;
        self.store.set(key, &json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Priority, Task, TaskType};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 3).unwrap()
    }

    fn now() -> Timestamp {
        "2024-01-03T09:00:00Z".parse().unwrap()
    }

    fn make_task(id: &str) -> Task {
        Task {
            id: id.to_string(),
            title: format!("task-{id}"),
            description: Some("notes".to_string()),
            task_type: TaskType::Daily,
            priority: Priority::High,
            scheduled_date: today(),
            completed: true,
            completed_at: Some("2024-01-03T10:30:15.250Z".parse().unwrap()),
            carried_over: true,
            original_date: NaiveDate::from_ymd_opt(2024, 1, 1),
            created_at: "2024-01-01T08:00:00Z".parse().unwrap(),
            reminder_interval: 30,
        }
    }

    #[test]
    fn load_without_saved_state_returns_empty_document_for_today() {
        let repo = StateRepository::new(MemoryStore::new());
        let state = repo.load(today(), now()).unwrap();
        assert_eq!(state, AppState::empty(today()));
    }

    #[test]
    fn save_of_load_leaves_document_unchanged() {
        let repo = StateRepository::new(MemoryStore::new());
        let mut state = AppState::empty(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        state.tasks.push(make_task("a"));
        let mut lifetime = make_task("b");
        lifetime.task_type = TaskType::Lifetime;
        lifetime.description = None;
        lifetime.completed = false;
        lifetime.completed_at = None;
        lifetime.carried_over = false;
        lifetime.original_date = None;
        state.tasks.push(lifetime);
        repo.save(&state).unwrap();

        let before = repo.store().get(STATE_KEY).unwrap().unwrap();
        let loaded = repo.load(today(), now()).unwrap();
        assert_eq!(loaded, state);
        repo.save(&loaded).unwrap();
        let after = repo.store().get(STATE_KEY).unwrap().unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn load_sanitizes_legacy_document() {
        let store = MemoryStore::new();
        store
            .set(
                STATE_KEY,
                r#"{
                  "lastOpenedDate": "2024-01-02",
                  "tasks": [{
                    "id": "old",
                    "title": "legacy",
                    "type": "daily",
                    "priority": "medium",
                    "scheduledDate": "2024-01-02",
                    "completed": "true",
                    "carriedOver": "true",
                    "createdAt": "2024-01-02T08:00:00.000Z",
                    "reminderInterval": "20"
                  }]
                }"#,
            )
            .unwrap();
        let repo = StateRepository::new(store);
        let state = repo.load(today(), now()).unwrap();
        assert_eq!(state.last_opened_date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        let task = &state.tasks[0];
        assert!(task.completed);
        assert!(task.carried_over);
        assert_eq!(task.reminder_interval, 20);
    }

    #[test]
    fn millisecond_timestamps_are_rewritten_in_canonical_form() {
        let store = MemoryStore::new();
        store
            .set(
                STATE_KEY,
                r#"{"lastOpenedDate":"2024-01-03","tasks":[{"id":"js","title":"from js","type":"daily","priority":"low","scheduledDate":"2024-01-03","completed":false,"carriedOver":false,"createdAt":"2024-01-03T07:00:00.000Z","reminderInterval":0}]}"#,
            )
            .unwrap();
        let repo = StateRepository::new(store);
        let loaded = repo.load(today(), now()).unwrap();
        assert_eq!(
            loaded.tasks[0].created_at,
            "2024-01-03T07:00:00Z".parse::<Timestamp>().unwrap()
        );

        repo.save(&loaded).unwrap();
        let first = repo.store().get(STATE_KEY).unwrap().unwrap();
        assert!(first.contains(r#""createdAt":"2024-01-03T07:00:00Z""#));

        repo.save(&repo.load(today(), now()).unwrap()).unwrap();
        let second = repo.store().get(STATE_KEY).unwrap().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn load_propagates_unparseable_document() {
        let store = MemoryStore::new();
        store.set(STATE_KEY, "{ not json").unwrap();
        let repo = StateRepository::new(store);
        assert!(matches!(
            repo.load(today(), now()),
            Err(StorageError::Json(_))
        ));
    }

    #[test]
    fn settings_default_when_missing_and_round_trip() {
        let repo = StateRepository::new(MemoryStore::new());
        assert_eq!(repo.load_settings().unwrap(), Settings::default());

        let mut settings = Settings::default();
        settings.language = "id".to_string();
        settings.summary_preview_limit = 5;
        repo.save_settings(&settings).unwrap();
        assert_eq!(repo.load_settings().unwrap(), settings);
    }

    #[test]
    fn file_store_reads_missing_key_as_none_and_writes_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("data"));
        assert_eq!(store.get(STATE_KEY).unwrap(), None);

        store.set(STATE_KEY, "{}").unwrap();
        assert!(store.path_for(STATE_KEY).is_file());
        assert!(!store.path_for(STATE_KEY).with_extension("tmp").exists());
        assert_eq!(store.get(STATE_KEY).unwrap().as_deref(), Some("{}"));

        store.set(STATE_KEY, "{\"a\":1}").unwrap();
        assert_eq!(store.get(STATE_KEY).unwrap().as_deref(), Some("{\"a\":1}"));
    }

    #[test]
    fn file_store_surfaces_io_errors() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf());
        fs::create_dir_all(store.path_for(STATE_KEY)).unwrap();
        assert!(matches!(store.get(STATE_KEY), Err(StorageError::Io(_))));

        let blocked = FileStore::new(dir.path().join("file"));
        fs::write(dir.path().join("file"), b"x").unwrap();
        assert!(blocked.set(STATE_KEY, "{}").is_err());
        assert!(blocked.ensure_dirs().is_err());
    }

    #[test]
    fn repository_over_file_store_persists_between_instances() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = AppState::empty(today());
        state.tasks.push(make_task("a"));
        StateRepository::new(FileStore::new(dir.path().to_path_buf()))
            .save(&state)
            .unwrap();

        let reopened = StateRepository::new(FileStore::new(dir.path().to_path_buf()));
        assert_eq!(reopened.load(today(), now()).unwrap(), state);
    }
}
