use anyhow::Context;
use tracing::{debug, instrument, warn};

use crate::storage::KeyValueStore;
use crate::task::Task;

pub const TODOS_KEY: &str = "todos";
pub const DARK_MODE_KEY: &str = "darkMode";

/// Full-overwrite sync of the task list and theme flag to a key-value
/// medium.
#[derive(Debug)]
pub struct Persistence<S> {
    storage: S,
}

impl<S: KeyValueStore> Persistence<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }

    /// Stored tasks, or an empty list when nothing usable is stored.
    #[instrument(skip(self))]
    pub fn load_tasks(&self) -> Vec<Task> {
        let raw = match self.storage.get(TODOS_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("no stored task list");
                return Vec::new();
            }
            Err(err) => {
                warn!(
                    error = %format!("{err:#}"),
                    "failed reading stored task list; starting empty"
                );
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<Task>>(&raw) {
            Ok(tasks) => {
                debug!(count = tasks.len(), "loaded stored task list");
                tasks
            }
            Err(err) => {
                warn!(error = %err, "discarding malformed stored task list");
                Vec::new()
            }
        }
    }

    /// Stored theme flag. Dark when nothing is stored.
    #[instrument(skip(self))]
    pub fn load_dark_mode(&self) -> bool {
        match self.storage.get(DARK_MODE_KEY) {
            Ok(Some(raw)) => raw == "true",
            Ok(None) => true,
            Err(err) => {
                warn!(error = %format!("{err:#}"), "failed reading theme flag; defaulting to dark");
                true
            }
        }
    }

    #[instrument(skip(self, tasks), fields(count = tasks.len()))]
    pub fn save_tasks(&mut self, tasks: &[Task]) -> anyhow::Result<()> {
        let serialized = serde_json::to_string(tasks).context("failed to serialize task list")?;
        self.storage
            .set(TODOS_KEY, &serialized)
            .context("failed to write task list")
    }

    #[instrument(skip(self))]
    pub fn save_dark_mode(&mut self, dark_mode: bool) -> anyhow::Result<()> {
        self.storage
            .set(DARK_MODE_KEY, &dark_mode.to_string())
            .context("failed to write theme flag")
    }

    /// Raw stored task list, as written by `save_tasks`.
    pub fn raw_tasks(&self) -> anyhow::Result<Option<String>> {
        self.storage.get(TODOS_KEY)
    }
}
