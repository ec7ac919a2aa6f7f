//! Task list with key-value persistence
//!
//! The whole list lives under one storage key as a JSON array. Every
//! mutation replaces the list (copy-on-write: snapshots handed out
//! earlier never change) and writes the result back, with one
//! deliberate exception: the empty-list skip described on `commit`.

use crate::tasks::types::Task;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

/// Storage key holding the serialized task array
pub const TASKS_KEY: &str = "tasks";

/// Minimal key-value persistence boundary: one string per key.
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str);
}

/// File-backed store: each key is a file `<root>/<key>.json`.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", key))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        std::fs::read_to_string(self.path_for(key)).ok()
    }

    fn set(&mut self, key: &str, value: &str) {
        if let Err(e) = std::fs::create_dir_all(&self.root) {
            warn!("Failed to create storage directory {:?}: {}", self.root, e);
            return;
        }
        if let Err(e) = std::fs::write(self.path_for(key), value) {
            warn!("Failed to persist {}: {}", key, e);
        }
    }
}

/// In-memory store for tests and ephemeral sessions. Clones share the
/// same backing map, so one handle observes another's writes the way
/// two loads of the same file would.
#[derive(Default, Clone)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.entries
            .lock()
            .insert(key.to_string(), value.to_string());
    }
}

/// The to-do list and its persistence.
pub struct TaskStore {
    tasks: Arc<Vec<Task>>,
    storage: Box<dyn KeyValueStore>,
}

impl TaskStore {
    /// Load the list once from storage. Unparseable data is discarded
    /// with a warning and the list starts empty.
    pub fn load(storage: Box<dyn KeyValueStore>) -> Self {
        let tasks = match storage.get(TASKS_KEY) {
            Some(raw) => match serde_json::from_str::<Vec<Task>>(&raw) {
                Ok(tasks) => tasks,
                Err(e) => {
                    warn!("Discarding unparseable task list: {}", e);
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        debug!("Loaded {} tasks", tasks.len());

        Self {
            tasks: Arc::new(tasks),
            storage,
        }
    }

    /// Snapshot of the current list. Later mutations produce a new
    /// list; this snapshot never changes.
    pub fn tasks(&self) -> Arc<Vec<Task>> {
        Arc::clone(&self.tasks)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Append a task. Blank or whitespace-only text is a no-op.
    pub fn add(&mut self, text: &str) {
        if text.trim().is_empty() {
            return;
        }
        let mut next = self.tasks.as_ref().clone();
        next.push(Task::new(text));
        self.commit(next);
    }

    /// Flip completion of the task at `index`; out of range is ignored.
    pub fn toggle(&mut self, index: usize) {
        if index >= self.tasks.len() {
            return;
        }
        let mut next = self.tasks.as_ref().clone();
        next[index].completed = !next[index].completed;
        self.commit(next);
    }

    /// Remove the task at `index`; out of range is ignored.
    pub fn delete(&mut self, index: usize) {
        if index >= self.tasks.len() {
            return;
        }
        let mut next = self.tasks.as_ref().clone();
        next.remove(index);
        self.commit(next);
    }

    /// Swap in the new list and write it back.
    ///
    /// Policy: an empty list is never written back, so storage keeps
    /// the last non-empty state after the final task is deleted and a
    /// fresh load returns that stale list. Kept as observed behavior;
    /// see DESIGN.md before changing it.
    fn commit(&mut self, next: Vec<Task>) {
        self.tasks = Arc::new(next);

        if self.tasks.is_empty() {
            return;
        }

        match serde_json::to_string(self.tasks.as_ref()) {
            Ok(raw) => self.storage.set(TASKS_KEY, &raw),
            Err(e) => warn!("Failed to serialize task list: {}", e),
        }
    }
}
