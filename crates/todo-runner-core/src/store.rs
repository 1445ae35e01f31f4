//! In-memory task list plus the transient selection state around it.
//!
//! Every mutating operation is a silent no-op on bad input or unknown
//! ids and reports through its return value whether the task list
//! changed, which is what the session uses to decide when to persist.

use std::collections::HashSet;

use chrono::NaiveDate;
use tracing::{debug, info, instrument, warn};

use crate::clock::Clock;
use crate::filter::Filter;
use crate::signal::Celebration;
use crate::task::{Priority, Task, TaskId};

/// At most one task is edited at a time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum EditMode {
    #[default]
    Viewing,
    Editing { id: TaskId, buffer: String },
}

/// Pending input fields of the add form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    pub text: String,
    pub priority: Priority,
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub total: usize,
    pub active: usize,
    pub completed: usize,
}

impl Stats {
    /// Percentage of completed tasks, rounded half up. Zero for an
    /// empty list.
    pub fn completion_rate(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        let rate = (200 * self.completed + self.total) / (2 * self.total);
        u8::try_from(rate).unwrap_or(100)
    }
}

#[derive(Debug)]
pub struct TaskStore {
    tasks: Vec<Task>,
    filter: Filter,
    mode: EditMode,
    draft: Draft,
    celebration: Celebration,
    clock: Box<dyn Clock>,
    disposed: bool,
}

impl TaskStore {
    pub fn new(clock: Box<dyn Clock>) -> Self {
        Self {
            tasks: Vec::new(),
            filter: Filter::default(),
            mode: EditMode::default(),
            draft: Draft::default(),
            celebration: Celebration::default(),
            clock,
            disposed: false,
        }
    }

    /// Replaces the list with previously stored tasks. Entries with a
    /// blank text or an id already seen are dropped. Returns the number
    /// of tasks kept.
    #[instrument(skip(self, loaded), fields(loaded = loaded.len()))]
    pub fn init(&mut self, loaded: Vec<Task>) -> usize {
        let mut seen = HashSet::new();
        let mut kept = Vec::with_capacity(loaded.len());
        for task in loaded {
            if task.text.trim().is_empty() {
                warn!(id = %task.id, "dropping stored task with empty text");
                continue;
            }
            if !seen.insert(task.id.clone()) {
                warn!(id = %task.id, "dropping stored task with duplicate id");
                continue;
            }
            kept.push(task);
        }

        self.tasks = kept;
        self.filter = Filter::default();
        self.mode = EditMode::Viewing;
        self.draft = Draft::default();
        self.celebration.cancel();
        self.disposed = false;

        info!(count = self.tasks.len(), "task store initialized");
        self.tasks.len()
    }

    /// Cancels the pending celebration reset and drops edit state.
    /// Later mutations are ignored.
    #[instrument(skip(self))]
    pub fn dispose(&mut self) {
        self.celebration.cancel();
        self.mode = EditMode::Viewing;
        self.disposed = true;
        info!(count = self.tasks.len(), "task store disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| &t.id == id)
    }

    pub fn filter(&self) -> Filter {
        self.filter
    }

    pub fn set_filter(&mut self, filter: Filter) {
        debug!(%filter, "filter selected");
        self.filter = filter;
    }

    pub fn mode(&self) -> &EditMode {
        &self.mode
    }

    pub fn editing_id(&self) -> Option<&TaskId> {
        match &self.mode {
            EditMode::Editing { id, .. } => Some(id),
            EditMode::Viewing => None,
        }
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut Draft {
        &mut self.draft
    }

    /// Prepends a new task. Blank text is rejected and surrounding
    /// whitespace is trimmed before storing. On success the draft is
    /// reset to its defaults.
    #[instrument(skip(self, text))]
    pub fn add(
        &mut self,
        text: &str,
        priority: Priority,
        due_date: Option<NaiveDate>,
    ) -> Option<TaskId> {
        if !self.ensure_live("add") {
            return None;
        }
        let text = text.trim();
        if text.is_empty() {
            debug!("ignoring add with empty text");
            return None;
        }

        let id = self.fresh_id();
        let task = Task::new(
            id.clone(),
            text.to_string(),
            priority,
            due_date,
            self.clock.now_ms(),
        );
        self.tasks.insert(0, task);
        self.draft = Draft::default();

        debug!(id = %id, total = self.tasks.len(), "task added");
        Some(id)
    }

    pub fn add_draft(&mut self) -> Option<TaskId> {
        let Draft {
            text,
            priority,
            due_date,
        } = self.draft.clone();
        self.add(&text, priority, due_date)
    }

    #[instrument(skip(self), fields(id = %id))]
    pub fn toggle(&mut self, id: &TaskId) -> bool {
        if !self.ensure_live("toggle") {
            return false;
        }
        let now = self.clock.now_ms();
        let Some(task) = self.tasks.iter_mut().find(|t| &t.id == id) else {
            debug!("toggle on unknown id");
            return false;
        };

        task.completed = !task.completed;
        if task.completed {
            self.celebration.raise(now);
        }
        debug!(completed = task.completed, "task toggled");
        true
    }

    #[instrument(skip(self), fields(id = %id))]
    pub fn remove(&mut self, id: &TaskId) -> bool {
        if !self.ensure_live("remove") {
            return false;
        }
        let before = self.tasks.len();
        self.tasks.retain(|t| &t.id != id);
        if self.tasks.len() == before {
            debug!("remove on unknown id");
            return false;
        }

        if self.editing_id() == Some(id) {
            self.mode = EditMode::Viewing;
        }
        debug!(total = self.tasks.len(), "task removed");
        true
    }

    /// Enters edit mode for `id`, abandoning any other edit in progress.
    #[instrument(skip(self), fields(id = %id))]
    pub fn start_edit(&mut self, id: &TaskId) -> bool {
        if !self.ensure_live("start_edit") {
            return false;
        }
        let Some(task) = self.get(id) else {
            debug!("start_edit on unknown id");
            return false;
        };

        let buffer = task.text.clone();
        if let Some(previous) = self.editing_id() {
            debug!(previous = %previous, "abandoning previous edit");
        }
        self.mode = EditMode::Editing {
            id: id.clone(),
            buffer,
        };
        true
    }

    pub fn set_edit_buffer(&mut self, text: &str) -> bool {
        match &mut self.mode {
            EditMode::Editing { buffer, .. } => {
                *buffer = text.to_string();
                true
            }
            EditMode::Viewing => false,
        }
    }

    /// Writes the trimmed edit buffer into the task being edited. A
    /// blank buffer leaves edit mode open.
    #[instrument(skip(self), fields(id = %id))]
    pub fn commit_edit(&mut self, id: &TaskId) -> bool {
        if !self.ensure_live("commit_edit") {
            return false;
        }
        let text = match &self.mode {
            EditMode::Editing { id: editing, buffer } if editing == id => buffer.trim().to_string(),
            _ => {
                debug!("commit_edit without a matching edit in progress");
                return false;
            }
        };
        if text.is_empty() {
            debug!("ignoring commit with empty buffer");
            return false;
        }

        self.mode = EditMode::Viewing;
        match self.tasks.iter_mut().find(|t| &t.id == id) {
            Some(task) => {
                task.text = text;
                debug!("edit committed");
                true
            }
            None => {
                debug!("edited task no longer exists");
                false
            }
        }
    }

    pub fn cancel_edit(&mut self) {
        if let Some(id) = self.editing_id() {
            debug!(id = %id, "edit cancelled");
        }
        self.mode = EditMode::Viewing;
    }

    /// Removes every completed task. Returns how many were removed.
    #[instrument(skip(self))]
    pub fn clear_completed(&mut self) -> usize {
        if !self.ensure_live("clear_completed") {
            return 0;
        }
        let before = self.tasks.len();
        self.tasks.retain(|t| !t.completed);
        let removed = before - self.tasks.len();

        if let Some(id) = self.editing_id().cloned()
            && self.get(&id).is_none()
        {
            self.mode = EditMode::Viewing;
        }
        debug!(removed, "cleared completed tasks");
        removed
    }

    pub fn visible_tasks(&self, filter: Filter) -> Vec<&Task> {
        self.tasks.iter().filter(|t| filter.matches(t)).collect()
    }

    pub fn visible(&self) -> Vec<&Task> {
        self.visible_tasks(self.filter)
    }

    pub fn stats(&self) -> Stats {
        let completed = self.tasks.iter().filter(|t| t.completed).count();
        Stats {
            total: self.tasks.len(),
            active: self.tasks.len() - completed,
            completed,
        }
    }

    pub fn completion_rate(&self) -> u8 {
        self.stats().completion_rate()
    }

    pub fn overdue(&self, today: NaiveDate) -> Vec<&Task> {
        self.tasks.iter().filter(|t| t.is_overdue(today)).collect()
    }

    /// Runs the scheduled celebration reset if due and reports whether
    /// the signal is still showing.
    pub fn poll_celebration(&mut self) -> bool {
        let now = self.clock.now_ms();
        self.celebration.poll(now);
        self.celebration.is_active(now)
    }

    pub fn is_celebrating(&self) -> bool {
        self.celebration.is_active(self.clock.now_ms())
    }

    fn fresh_id(&self) -> TaskId {
        loop {
            let id = TaskId::generate();
            if self.get(&id).is_none() {
                return id;
            }
            warn!(id = %id, "generated id already in use; retrying");
        }
    }

    fn ensure_live(&self, op: &str) -> bool {
        if self.disposed {
            warn!(op, "ignoring operation on disposed task store");
        }
        !self.disposed
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use chrono::NaiveDate;

    use super::{Draft, EditMode, Stats, TaskStore};
    use crate::clock::ManualClock;
    use crate::filter::Filter;
    use crate::signal::CELEBRATION_MS;
    use crate::task::{Priority, Task, TaskId};

    fn store_at(start_ms: i64) -> (TaskStore, ManualClock) {
        let clock = ManualClock::new(start_ms);
        (TaskStore::new(Box::new(clock.clone())), clock)
    }

    #[test]
    fn add_prepends_trimmed_incomplete_task() {
        let (mut store, _clock) = store_at(42);
        let first = store.add("first", Priority::Low, None).expect("added");
        let second = store
            .add("  second  ", Priority::High, NaiveDate::from_ymd_opt(2026, 12, 1))
            .expect("added");

        assert_ne!(first, second);
        let tasks = store.tasks();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].id, second);
        assert_eq!(tasks[0].text, "second");
        assert!(!tasks[0].completed);
        assert_eq!(tasks[0].created_at, 42);
        assert_eq!(tasks[0].due_date, NaiveDate::from_ymd_opt(2026, 12, 1));
        assert_eq!(tasks[1].id, first);
    }

    #[test]
    fn blank_add_is_a_no_op() {
        let (mut store, _clock) = store_at(0);
        store.draft_mut().text = "   ".to_string();
        store.draft_mut().priority = Priority::High;

        assert!(store.add("", Priority::Low, None).is_none());
        assert!(store.add_draft().is_none());
        assert!(store.tasks().is_empty());
        assert_eq!(store.draft().priority, Priority::High);
    }

    #[test]
    fn successful_add_resets_draft() {
        let (mut store, _clock) = store_at(0);
        *store.draft_mut() = Draft {
            text: "Buy milk".to_string(),
            priority: Priority::High,
            due_date: NaiveDate::from_ymd_opt(2026, 10, 20),
        };

        let id = store.add_draft().expect("added");
        let task = store.get(&id).expect("stored");
        assert_eq!(task.priority, Priority::High);
        assert_eq!(task.due_date, NaiveDate::from_ymd_opt(2026, 10, 20));
        assert_eq!(store.draft(), &Draft::default());
    }

    #[test]
    fn toggle_twice_restores_task() {
        let (mut store, _clock) = store_at(0);
        let id = store.add("laundry", Priority::Medium, None).expect("added");
        let before = store.get(&id).cloned().expect("stored");

        assert!(store.toggle(&id));
        assert!(store.get(&id).expect("stored").completed);
        assert!(store.toggle(&id));
        assert_eq!(store.get(&id), Some(&before));
        assert!(!store.toggle(&TaskId::from("missing")));
    }

    #[test]
    fn completing_raises_celebration_for_three_seconds() {
        let (mut store, clock) = store_at(10_000);
        let id = store.add("ship it", Priority::High, None).expect("added");

        assert!(!store.is_celebrating());
        store.toggle(&id);
        assert!(store.poll_celebration());

        clock.advance(CELEBRATION_MS - 1);
        assert!(store.poll_celebration());
        clock.advance(1);
        assert!(!store.poll_celebration());

        // Un-completing never raises the signal.
        store.toggle(&id);
        assert!(!store.is_celebrating());
    }

    #[test]
    fn overlapping_completions_extend_celebration() {
        let (mut store, clock) = store_at(0);
        let a = store.add("a", Priority::Low, None).expect("added");
        let b = store.add("b", Priority::Low, None).expect("added");

        store.toggle(&a);
        clock.advance(2_000);
        store.toggle(&b);
        clock.advance(2_000);
        assert!(store.is_celebrating());
        clock.advance(1_000);
        assert!(!store.is_celebrating());
    }

    #[test]
    fn remove_is_idempotent() {
        let (mut store, _clock) = store_at(0);
        let keep = store.add("keep", Priority::Low, None).expect("added");
        let gone = store.add("gone", Priority::Low, None).expect("added");

        assert!(store.remove(&gone));
        assert_eq!(store.stats().total, 1);
        assert!(!store.remove(&gone));
        assert_eq!(store.stats().total, 1);
        assert!(store.get(&keep).is_some());
    }

    #[test]
    fn commit_edit_changes_only_text() {
        let (mut store, _clock) = store_at(7);
        let id = store
            .add("draft report", Priority::High, NaiveDate::from_ymd_opt(2026, 1, 2))
            .expect("added");
        store.toggle(&id);
        let before = store.get(&id).cloned().expect("stored");

        assert!(store.start_edit(&id));
        assert_eq!(
            store.mode(),
            &EditMode::Editing {
                id: id.clone(),
                buffer: "draft report".to_string(),
            }
        );
        assert!(store.set_edit_buffer("  final report "));
        assert!(store.commit_edit(&id));

        let after = store.get(&id).expect("stored");
        assert_eq!(after.text, "final report");
        assert_eq!(after.id, before.id);
        assert_eq!(after.completed, before.completed);
        assert_eq!(after.priority, before.priority);
        assert_eq!(after.created_at, before.created_at);
        assert_eq!(after.due_date, before.due_date);
        assert_eq!(store.mode(), &EditMode::Viewing);
    }

    #[test]
    fn blank_commit_keeps_edit_open() {
        let (mut store, _clock) = store_at(0);
        let id = store.add("keep me", Priority::Medium, None).expect("added");
        store.start_edit(&id);
        store.set_edit_buffer("   ");

        assert!(!store.commit_edit(&id));
        assert_eq!(store.editing_id(), Some(&id));
        assert_eq!(store.get(&id).expect("stored").text, "keep me");

        store.cancel_edit();
        assert_eq!(store.mode(), &EditMode::Viewing);
        assert_eq!(store.get(&id).expect("stored").text, "keep me");
    }

    #[test]
    fn starting_another_edit_abandons_the_first() {
        let (mut store, _clock) = store_at(0);
        let a = store.add("a", Priority::Medium, None).expect("added");
        let b = store.add("b", Priority::Medium, None).expect("added");

        store.start_edit(&a);
        store.set_edit_buffer("changed a");
        store.start_edit(&b);

        assert!(!store.commit_edit(&a));
        assert_eq!(store.get(&a).expect("stored").text, "a");
        assert_eq!(
            store.mode(),
            &EditMode::Editing {
                id: b,
                buffer: "b".to_string(),
            }
        );
        assert!(!store.start_edit(&TaskId::from("missing")));
    }

    #[test]
    fn removing_edited_task_leaves_edit_mode() {
        let (mut store, _clock) = store_at(0);
        let id = store.add("a", Priority::Medium, None).expect("added");
        store.start_edit(&id);
        store.remove(&id);
        assert_eq!(store.mode(), &EditMode::Viewing);
    }

    #[test]
    fn active_and_completed_views_partition_the_list() {
        let (mut store, _clock) = store_at(0);
        let ids: Vec<TaskId> = (0..6)
            .map(|n| {
                store
                    .add(&format!("task {n}"), Priority::Medium, None)
                    .expect("added")
            })
            .collect();
        for id in ids.iter().step_by(2) {
            store.toggle(id);
        }

        let active: HashSet<_> = store
            .visible_tasks(Filter::Active)
            .iter()
            .map(|t| t.id.clone())
            .collect();
        let completed: HashSet<_> = store
            .visible_tasks(Filter::Completed)
            .iter()
            .map(|t| t.id.clone())
            .collect();
        let all: HashSet<_> = store.tasks().iter().map(|t| t.id.clone()).collect();

        assert!(active.is_disjoint(&completed));
        assert_eq!(active.union(&completed).cloned().collect::<HashSet<_>>(), all);

        let order: Vec<_> = store.visible_tasks(Filter::All).iter().map(|t| t.id.clone()).collect();
        let expected: Vec<_> = store.tasks().iter().map(|t| t.id.clone()).collect();
        assert_eq!(order, expected);
    }

    #[test]
    fn set_filter_leaves_list_untouched() {
        let (mut store, _clock) = store_at(0);
        let id = store.add("x", Priority::Medium, None).expect("added");
        store.toggle(&id);
        store.set_filter(Filter::Active);
        assert!(store.visible().is_empty());
        assert_eq!(store.tasks().len(), 1);
        store.set_filter(Filter::Completed);
        assert_eq!(store.visible().len(), 1);
    }

    #[test]
    fn completion_rate_rounds_half_up() {
        assert_eq!(Stats::default().completion_rate(), 0);
        let rate = |completed, total| {
            Stats {
                total,
                active: total - completed,
                completed,
            }
            .completion_rate()
        };
        assert_eq!(rate(1, 3), 33);
        assert_eq!(rate(2, 3), 67);
        assert_eq!(rate(1, 8), 13);
        assert_eq!(rate(4, 4), 100);
    }

    #[test]
    fn priority_scenario() {
        let (mut store, _clock) = store_at(0);
        let a = store.add("A", Priority::Low, None).expect("added");
        let b = store.add("B", Priority::High, None).expect("added");
        let c = store.add("C", Priority::Medium, None).expect("added");

        let order: Vec<_> = store.tasks().iter().map(|t| t.id.clone()).collect();
        assert_eq!(order, vec![c, b.clone(), a]);

        store.toggle(&b);
        assert_eq!(
            store.stats(),
            Stats {
                total: 3,
                active: 2,
                completed: 1,
            }
        );
        assert_eq!(store.completion_rate(), 33);
    }

    #[test]
    fn clear_completed_removes_only_done_tasks() {
        let (mut store, _clock) = store_at(0);
        let a = store.add("a", Priority::Medium, None).expect("added");
        let b = store.add("b", Priority::Medium, None).expect("added");
        store.toggle(&a);
        store.start_edit(&a);

        assert_eq!(store.clear_completed(), 1);
        assert_eq!(store.clear_completed(), 0);
        assert!(store.get(&b).is_some());
        assert_eq!(store.mode(), &EditMode::Viewing);
    }

    #[test]
    fn init_drops_duplicate_ids_and_blank_text() {
        let (mut store, _clock) = store_at(0);
        let task = |id: &str, text: &str| {
            Task::new(TaskId::from(id), text.to_string(), Priority::Low, None, 1)
        };

        let kept = store.init(vec![
            task("1", "one"),
            task("2", "  "),
            task("1", "dup"),
            task("3", "three"),
        ]);

        assert_eq!(kept, 2);
        let texts: Vec<_> = store.tasks().iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["one", "three"]);
    }

    #[test]
    fn disposed_store_ignores_mutations() {
        let (mut store, _clock) = store_at(0);
        let id = store.add("a", Priority::Medium, None).expect("added");
        store.toggle(&id);
        store.dispose();

        assert!(!store.is_celebrating());
        assert!(store.add("b", Priority::Medium, None).is_none());
        assert!(!store.toggle(&id));
        assert!(!store.remove(&id));
        assert_eq!(store.tasks().len(), 1);

        store.init(Vec::new());
        assert!(!store.is_disposed());
        assert!(store.add("c", Priority::Medium, None).is_some());
    }

    #[test]
    fn overdue_lists_open_tasks_past_due() {
        let (mut store, _clock) = store_at(0);
        let today = NaiveDate::from_ymd_opt(2026, 10, 19).expect("date");
        let late = store
            .add("late", Priority::Medium, NaiveDate::from_ymd_opt(2026, 10, 1))
            .expect("added");
        let done = store
            .add("done", Priority::Medium, NaiveDate::from_ymd_opt(2026, 10, 1))
            .expect("added");
        store.add("future", Priority::Medium, NaiveDate::from_ymd_opt(2026, 11, 1));
        store.toggle(&done);

        let overdue: Vec<_> = store.overdue(today).iter().map(|t| t.id.clone()).collect();
        assert_eq!(overdue, vec![late]);
    }
}
