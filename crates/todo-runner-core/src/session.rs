//! Task store wired to its persistence adapter.
//!
//! Each method forwards to the store and, when the task list changed,
//! writes the whole list back to the medium before returning.

use chrono::NaiveDate;
use tracing::{debug, info, instrument};

use crate::clock::Clock;
use crate::filter::Filter;
use crate::persist::Persistence;
use crate::storage::KeyValueStore;
use crate::store::{Draft, TaskStore};
use crate::task::{Priority, TaskId};

#[derive(Debug)]
pub struct Session<S: KeyValueStore> {
    store: TaskStore,
    persistence: Persistence<S>,
    dark_mode: bool,
}

impl<S: KeyValueStore> Session<S> {
    #[instrument(skip(storage, clock))]
    pub fn open(storage: S, clock: Box<dyn Clock>) -> Self {
        let persistence = Persistence::new(storage);
        let loaded = persistence.load_tasks();
        let dark_mode = persistence.load_dark_mode();

        let mut store = TaskStore::new(clock);
        let kept = store.init(loaded);
        info!(tasks = kept, dark_mode, "session opened");

        Self {
            store,
            persistence,
            dark_mode,
        }
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn persistence(&self) -> &Persistence<S> {
        &self.persistence
    }

    pub fn dark_mode(&self) -> bool {
        self.dark_mode
    }

    pub fn draft_mut(&mut self) -> &mut Draft {
        self.store.draft_mut()
    }

    pub fn add(
        &mut self,
        text: &str,
        priority: Priority,
        due_date: Option<NaiveDate>,
    ) -> anyhow::Result<Option<TaskId>> {
        let id = self.store.add(text, priority, due_date);
        self.flush_if(id.is_some())?;
        Ok(id)
    }

    pub fn add_draft(&mut self) -> anyhow::Result<Option<TaskId>> {
        let id = self.store.add_draft();
        self.flush_if(id.is_some())?;
        Ok(id)
    }

    pub fn toggle(&mut self, id: &TaskId) -> anyhow::Result<bool> {
        let changed = self.store.toggle(id);
        self.flush_if(changed)?;
        Ok(changed)
    }

    pub fn remove(&mut self, id: &TaskId) -> anyhow::Result<bool> {
        let changed = self.store.remove(id);
        self.flush_if(changed)?;
        Ok(changed)
    }

    pub fn start_edit(&mut self, id: &TaskId) -> bool {
        self.store.start_edit(id)
    }

    pub fn set_edit_buffer(&mut self, text: &str) -> bool {
        self.store.set_edit_buffer(text)
    }

    pub fn commit_edit(&mut self, id: &TaskId) -> anyhow::Result<bool> {
        let changed = self.store.commit_edit(id);
        self.flush_if(changed)?;
        Ok(changed)
    }

    pub fn cancel_edit(&mut self) {
        self.store.cancel_edit();
    }

    /// Starts an edit, fills the buffer and commits it in one step.
    pub fn replace_text(&mut self, id: &TaskId, text: &str) -> anyhow::Result<bool> {
        if !self.store.start_edit(id) {
            return Ok(false);
        }
        self.store.set_edit_buffer(text);
        let changed = self.commit_edit(id)?;
        if !changed {
            self.store.cancel_edit();
        }
        Ok(changed)
    }

    pub fn clear_completed(&mut self) -> anyhow::Result<usize> {
        let removed = self.store.clear_completed();
        self.flush_if(removed > 0)?;
        Ok(removed)
    }

    pub fn set_filter(&mut self, filter: Filter) {
        self.store.set_filter(filter);
    }

    pub fn poll_celebration(&mut self) -> bool {
        self.store.poll_celebration()
    }

    #[instrument(skip(self))]
    pub fn set_dark_mode(&mut self, dark_mode: bool) -> anyhow::Result<()> {
        self.dark_mode = dark_mode;
        self.persistence.save_dark_mode(dark_mode)
    }

    pub fn toggle_theme(&mut self) -> anyhow::Result<bool> {
        self.set_dark_mode(!self.dark_mode)?;
        Ok(self.dark_mode)
    }

    /// Disposes the store and hands back the medium.
    #[instrument(skip(self))]
    pub fn close(mut self) -> S {
        self.store.dispose();
        self.persistence.into_storage()
    }

    fn flush_if(&mut self, changed: bool) -> anyhow::Result<()> {
        if !changed {
            return Ok(());
        }
        debug!(count = self.store.tasks().len(), "flushing task list");
        self.persistence.save_tasks(self.store.tasks())
    }
}
