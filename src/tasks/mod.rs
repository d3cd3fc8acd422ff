// Local task store
// Keeps the ordered task list in memory and mirrors it to device storage on every change

pub mod reminder;
pub mod storage;
pub mod views;

use crate::error::Result;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

pub use reminder::{Notification, ReminderScheduler};
pub use storage::{FileStorage, MemoryStorage, Storage};
pub use views::TaskViews;

/// Single key the whole task list is serialized under.
pub const STORAGE_KEY: &str = "tasks";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Task {
    pub fn new(title: impl Into<String>, due_date: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            completed: false,
            due_date,
            created_at: now,
        }
    }
}

pub struct TaskStore<S: Storage> {
    tasks: Vec<Task>,
    storage: S,
}

impl<S: Storage> TaskStore<S> {
    /// Loads the persisted list; a missing entry means an empty store.
    pub fn load(storage: S) -> Result<Self> {
        let tasks: Vec<Task> = match storage.get(STORAGE_KEY)? {
            Some(raw) => serde_json::from_str(&raw)?,
            None => Vec::new(),
        };
        tracing::debug!("Loaded {} tasks from local storage", tasks.len());
        Ok(Self { tasks, storage })
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn add(&mut self, title: &str, due_date: Option<DateTime<Utc>>) -> Result<Option<&Task>> {
        self.add_at(title, due_date, Utc::now())
    }

    /// Blank titles are ignored and leave the store untouched.
    pub fn add_at(
        &mut self,
        title: &str,
        due_date: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<Option<&Task>> {
        if title.trim().is_empty() {
            return Ok(None);
        }

        let mut next = self.tasks.clone();
        next.push(Task::new(title, due_date, now));
        self.commit(next)?;
        Ok(self.tasks.last())
    }

    /// Returns whether a task with that id existed.
    pub fn toggle(&mut self, id: &str) -> Result<bool> {
        let mut next = self.tasks.clone();
        let Some(task) = next.iter_mut().find(|task| task.id == id) else {
            return Ok(false);
        };
        task.completed = !task.completed;
        self.commit(next)?;
        Ok(true)
    }

    pub fn delete(&mut self, id: &str) -> Result<bool> {
        let next: Vec<Task> = self.tasks.iter().filter(|task| task.id != id).cloned().collect();
        if next.len() == self.tasks.len() {
            return Ok(false);
        }
        self.commit(next)?;
        Ok(true)
    }

    /// Adopts a whole task set, e.g. one pulled from the cloud. Later duplicates of an id are dropped.
    pub fn replace_all(&mut self, tasks: Vec<Task>) -> Result<()> {
        let mut seen = HashSet::new();
        let next = tasks
            .into_iter()
            .filter(|task| seen.insert(task.id.clone()))
            .collect();
        self.commit(next)
    }

    /// Writes `next` to storage and adopts it only once the write succeeded.
    fn commit(&mut self, next: Vec<Task>) -> Result<()> {
        let raw = serde_json::to_string(&next)?;
        self.storage.set(STORAGE_KEY, &raw)?;
        self.tasks = next;
        Ok(())
    }
}

/// Picks a due date out of spoken input: "tomorrow" beats "today".
pub fn infer_due_date(transcript: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let lowered = transcript.to_lowercase();
    if lowered.contains("tomorrow") {
        Some(now + Duration::days(1))
    } else if lowered.contains("today") {
        Some(now)
    } else {
        None
    }
}
