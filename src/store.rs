// Task store: owns the ordered collection and keeps it persisted

use chrono::{DateTime, SubsecRound, Utc};
use mockable::{Clock, DefaultClock};
use tracing::{debug, info, warn};

use crate::blob::BlobStore;
use crate::error::TaskError;
use crate::models::{Priority, Task, TaskId, normalize_text};
use crate::snapshot;

/// Blob key the collection is stored under unless told otherwise
pub const DEFAULT_KEY: &str = "tasks";

/// The ordered task collection plus its durable copy
///
/// Every mutation writes the full candidate collection to the blob store
/// first and only then swaps it in, so a failed write leaves memory exactly
/// as the last successful write left it.
pub struct TaskStore<B: BlobStore, C: Clock = DefaultClock> {
    blob: B,
    key: String,
    tasks: Vec<Task>,
    last_id: TaskId,
    clock: C,
}

impl<B: BlobStore> TaskStore<B> {
    /// Load the collection stored under [`DEFAULT_KEY`]
    ///
    /// Never fails: missing or unreadable data starts an empty collection.
    pub fn load(blob: B) -> Self {
        Self::load_with(blob, DEFAULT_KEY, DefaultClock)
    }

    /// Load the collection stored under `key`
    pub fn load_with_key(blob: B, key: &str) -> Self {
        Self::load_with(blob, key, DefaultClock)
    }
}

impl<B: BlobStore, C: Clock> TaskStore<B, C> {
    /// Load with an explicit key and clock
    pub fn load_with(blob: B, key: &str, clock: C) -> Self {
        let tasks = Self::read_snapshot(&blob, key);
        let last_id = tasks.iter().map(|t| t.id).max().unwrap_or(0);

        Self {
            blob,
            key: key.to_string(),
            tasks,
            last_id,
            clock,
        }
    }

    fn read_snapshot(blob: &B, key: &str) -> Vec<Task> {
        let raw = match blob.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(key, "No stored tasks, starting empty");
                return Vec::new();
            }
            Err(e) => {
                warn!(key, error = ?e, "Failed to read stored tasks, starting empty");
                return Vec::new();
            }
        };

        match snapshot::decode(&raw) {
            Ok(tasks) => {
                info!(key, count = tasks.len(), "Loaded tasks");
                tasks
            }
            Err(e) => {
                warn!(key, error = ?e, "Stored tasks are unusable, starting empty");
                Vec::new()
            }
        }
    }

    /// The current collection, most recent first
    pub fn list(&self) -> &[Task] {
        &self.tasks
    }

    /// Look up a task by id
    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Blob key this store persists under
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The underlying blob store
    pub fn blob(&self) -> &B {
        &self.blob
    }

    /// Give back the blob store, e.g. to reload it elsewhere
    pub fn into_blob(self) -> B {
        self.blob
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Create a pending, medium-priority task and put it first
    pub fn add(&mut self, text: &str) -> Result<Task, TaskError> {
        let text = normalize_text(text)?;
        let now = self.now();
        let id = self.next_id(now);
        let task = Task::new(id, text, now);

        let mut next = Vec::with_capacity(self.tasks.len() + 1);
        next.push(task.clone());
        next.extend(self.tasks.iter().cloned());

        self.commit(next)?;
        self.last_id = id;

        info!(id, "Added task");
        Ok(task)
    }

    /// Flip completion of a task
    pub fn toggle(&mut self, id: TaskId) -> Result<Task, TaskError> {
        let now = self.now();
        let task = self.update(id, |task| {
            task.toggle(now);
            Ok(())
        })?;

        info!(id, completed = task.completed, "Toggled task");
        Ok(task)
    }

    /// Replace a task's text, leaving everything else untouched
    pub fn edit(&mut self, id: TaskId, text: &str) -> Result<Task, TaskError> {
        let task = self.update(id, |task| {
            task.text = normalize_text(text)?;
            Ok(())
        })?;

        info!(id, "Edited task");
        Ok(task)
    }

    /// Set a task's priority from its name (`low`, `medium`, `high`)
    ///
    /// The id is checked before the priority, so an unknown id reports
    /// [`TaskError::NotFound`] even when the priority is also invalid.
    pub fn set_priority(&mut self, id: TaskId, priority: &str) -> Result<Task, TaskError> {
        let task = self.update(id, |task| {
            task.priority = priority.parse::<Priority>()?;
            Ok(())
        })?;

        info!(id, priority = %task.priority, "Changed task priority");
        Ok(task)
    }

    /// Remove a task; returns whether anything was removed
    ///
    /// Deleting an unknown id is a no-op, but the collection is still written.
    pub fn delete(&mut self, id: TaskId) -> Result<bool, TaskError> {
        let next: Vec<Task> = self.tasks.iter().filter(|t| t.id != id).cloned().collect();
        let removed = next.len() != self.tasks.len();

        self.commit(next)?;

        info!(id, removed, "Deleted task");
        Ok(removed)
    }

    /// Remove every completed task; returns how many were removed
    pub fn clear_completed(&mut self) -> Result<usize, TaskError> {
        let next: Vec<Task> = self.tasks.iter().filter(|t| !t.completed).cloned().collect();
        let removed = self.tasks.len() - next.len();

        self.commit(next)?;

        info!(removed, "Cleared completed tasks");
        Ok(removed)
    }

    /// Remove every task; returns how many were removed
    pub fn clear_all(&mut self) -> Result<usize, TaskError> {
        let removed = self.tasks.len();

        self.commit(Vec::new())?;

        info!(removed, "Cleared all tasks");
        Ok(removed)
    }

    // ========================================================================
    // Helper methods
    // ========================================================================

    /// Snapshots store milliseconds, so anything finer would not survive a reload
    fn now(&self) -> DateTime<Utc> {
        self.clock.utc().trunc_subsecs(3)
    }

    /// Ids follow creation time in milliseconds but never repeat, even when
    /// two tasks land in the same millisecond or the clock steps backwards
    fn next_id(&self, now: DateTime<Utc>) -> TaskId {
        let ms = TaskId::try_from(now.timestamp_millis()).unwrap_or(0);
        ms.max(self.last_id.saturating_add(1))
    }

    fn update<F>(&mut self, id: TaskId, apply: F) -> Result<Task, TaskError>
    where
        F: FnOnce(&mut Task) -> Result<(), TaskError>,
    {
        let index = self
            .tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or(TaskError::NotFound(id))?;

        let mut next = self.tasks.clone();
        let mut task = next.remove(index);
        apply(&mut task)?;
        next.insert(index, task.clone());

        self.commit(next)?;
        Ok(task)
    }

    fn commit(&mut self, next: Vec<Task>) -> Result<(), TaskError> {
        let raw = snapshot::encode(&next).map_err(|e| TaskError::persistence(&self.key, &e))?;

        if let Err(e) = self.blob.put(&self.key, &raw) {
            warn!(key = %self.key, error = ?e, "Failed to persist tasks, keeping previous state");
            return Err(TaskError::persistence(&self.key, &e));
        }

        debug!(key = %self.key, count = next.len(), "Persisted tasks");
        self.tasks = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::{FileBlobStore, MemoryBlobStore};
    use crate::filter::FilterMode;
    use crate::view::{Stats, project, stats};
    use chrono::{Local, TimeZone};
    use std::cell::{Cell, RefCell};
    use std::fs;
    use std::rc::Rc;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    /// Clock the test can move by hand
    #[derive(Clone)]
    struct ManualClock(Arc<Mutex<DateTime<Utc>>>);

    impl ManualClock {
        fn new() -> Self {
            Self(Arc::new(Mutex::new(Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap())))
        }

        fn advance_ms(&self, ms: i64) {
            let mut now = self.0.lock().unwrap();
            *now += chrono::Duration::milliseconds(ms);
        }
    }

    impl Clock for ManualClock {
        fn local(&self) -> DateTime<Local> {
            self.utc().with_timezone(&Local)
        }

        fn utc(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }
    }

    /// Blob store whose writes can be switched off
    #[derive(Default, Clone)]
    struct FlakyBlobStore {
        inner: Rc<RefCell<MemoryBlobStore>>,
        fail_writes: Rc<Cell<bool>>,
    }

    impl BlobStore for FlakyBlobStore {
        fn get(&self, key: &str) -> eyre::Result<Option<String>> {
            self.inner.borrow().get(key)
        }

        fn put(&mut self, key: &str, value: &str) -> eyre::Result<()> {
            if self.fail_writes.get() {
                return Err(eyre::eyre!("quota exceeded"));
            }
            self.inner.borrow_mut().put(key, value)
        }
    }

    fn memory_store() -> (TaskStore<MemoryBlobStore, ManualClock>, ManualClock) {
        let clock = ManualClock::new();
        let store = TaskStore::load_with(MemoryBlobStore::new(), DEFAULT_KEY, clock.clone());
        (store, clock)
    }

    #[test]
    fn test_load_empty_blob_store() {
        let store = TaskStore::load(MemoryBlobStore::new());
        assert!(store.list().is_empty());
        assert_eq!(store.key(), DEFAULT_KEY);
    }

    #[test]
    fn test_load_unparseable_blob_starts_empty() {
        let mut blob = MemoryBlobStore::new();
        blob.put(DEFAULT_KEY, "{malformed json}").unwrap();

        let store = TaskStore::load(blob);
        assert!(store.list().is_empty());
    }

    #[test]
    fn test_load_wrong_shape_starts_empty() {
        let mut blob = MemoryBlobStore::new();
        blob.put(DEFAULT_KEY, r#"[{"id":1,"title":"not a task"}]"#).unwrap();

        let store = TaskStore::load(blob);
        assert!(store.list().is_empty());
    }

    #[test]
    fn test_add_prepends_trimmed_pending_task() {
        let (mut store, clock) = memory_store();

        let first = store.add("  Buy milk  ").unwrap();
        clock.advance_ms(10);
        let second = store.add("Call mom").unwrap();

        assert_eq!(first.text, "Buy milk");
        assert!(!first.completed);
        assert_eq!(first.priority, Priority::Medium);
        assert_eq!(first.created_at, Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap());
        assert!(first.completed_at.is_none());

        let ids: Vec<TaskId> = store.list().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[test]
    fn test_add_rejects_empty_text() {
        let (mut store, _) = memory_store();
        store.add("Buy milk").unwrap();
        let before = store.list().to_vec();

        assert!(matches!(store.add(""), Err(TaskError::Validation(_))));
        assert!(matches!(store.add("   "), Err(TaskError::Validation(_))));
        assert_eq!(store.list(), before.as_slice());
    }

    #[test]
    fn test_ids_follow_clock_and_never_collide() {
        let (mut store, clock) = memory_store();

        let a = store.add("a").unwrap();
        let b = store.add("b").unwrap();
        clock.advance_ms(-1000);
        let c = store.add("c").unwrap();
        clock.advance_ms(5000);
        let d = store.add("d").unwrap();

        assert_eq!(a.id, 1_709_285_400_000);
        assert_eq!(b.id, a.id + 1);
        assert_eq!(c.id, b.id + 1);
        assert_eq!(d.id, 1_709_285_404_000);
    }

    #[test]
    fn test_ids_stay_unique_after_reload() {
        let (mut store, _) = memory_store();
        let first = store.add("a").unwrap();

        // Same clock reading after reload must not reuse the stored id
        let clock = ManualClock::new();
        let mut reloaded = TaskStore::load_with(store.into_blob(), DEFAULT_KEY, clock);
        let second = reloaded.add("b").unwrap();

        assert!(second.id > first.id);
    }

    #[test]
    fn test_toggle_is_self_inverse() {
        let (mut store, clock) = memory_store();
        let task = store.add("Buy milk").unwrap();

        clock.advance_ms(250);
        let done = store.toggle(task.id).unwrap();
        assert!(done.completed);
        assert_eq!(done.completed_at, Some(clock.utc()));

        let undone = store.toggle(task.id).unwrap();
        assert_eq!(undone, task);
        assert_eq!(store.get(task.id), Some(&task));
    }

    #[test]
    fn test_toggle_unknown_id() {
        let (mut store, _) = memory_store();
        assert_eq!(store.toggle(99), Err(TaskError::NotFound(99)));
    }

    #[test]
    fn test_edit_changes_only_text() {
        let (mut store, clock) = memory_store();
        let task = store.add("Buy milk").unwrap();
        store.set_priority(task.id, "high").unwrap();
        store.toggle(task.id).unwrap();
        let before = store.get(task.id).cloned().unwrap();

        clock.advance_ms(1000);
        let edited = store.edit(task.id, "  Buy oat milk ").unwrap();

        assert_eq!(edited.text, "Buy oat milk");
        assert_eq!(edited.priority, before.priority);
        assert_eq!(edited.completed, before.completed);
        assert_eq!(edited.created_at, before.created_at);
        assert_eq!(edited.completed_at, before.completed_at);
    }

    #[test]
    fn test_edit_errors() {
        let (mut store, _) = memory_store();
        let task = store.add("Buy milk").unwrap();

        assert_eq!(store.edit(12345, ""), Err(TaskError::NotFound(12345)));
        assert!(matches!(store.edit(task.id, " "), Err(TaskError::Validation(_))));
        assert_eq!(store.get(task.id).unwrap().text, "Buy milk");
    }

    #[test]
    fn test_set_priority() {
        let (mut store, _) = memory_store();
        let task = store.add("Call mom").unwrap();

        let updated = store.set_priority(task.id, "high").unwrap();
        assert_eq!(updated.priority, Priority::High);

        assert!(matches!(store.set_priority(task.id, "urgent"), Err(TaskError::Validation(_))));
        assert!(matches!(store.set_priority(task.id, "LOW"), Err(TaskError::Validation(_))));
        assert!(matches!(store.set_priority(task.id, " low"), Err(TaskError::Validation(_))));
        assert_eq!(store.get(task.id).unwrap().priority, Priority::High);

        // Unknown id wins over an invalid priority
        assert_eq!(store.set_priority(1, "urgent"), Err(TaskError::NotFound(1)));
    }

    #[test]
    fn test_delete_is_idempotent() {
        let (mut store, clock) = memory_store();
        let a = store.add("a").unwrap();
        clock.advance_ms(1);
        let b = store.add("b").unwrap();

        assert!(store.delete(a.id).unwrap());
        assert!(!store.delete(a.id).unwrap());
        assert_eq!(store.list(), &[b]);
    }

    #[test]
    fn test_clear_completed_is_idempotent() {
        let (mut store, clock) = memory_store();
        for text in ["a", "b", "c", "d"] {
            clock.advance_ms(1);
            store.add(text).unwrap();
        }
        let ids: Vec<TaskId> = store.list().iter().map(|t| t.id).collect();
        store.toggle(ids[0]).unwrap();
        store.toggle(ids[2]).unwrap();

        assert_eq!(store.clear_completed().unwrap(), 2);
        let once = store.list().to_vec();
        assert_eq!(store.clear_completed().unwrap(), 0);

        assert_eq!(store.list(), once.as_slice());
        let remaining: Vec<&str> = once.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(remaining, vec!["c", "a"]);
    }

    #[test]
    fn test_clear_all() {
        let (mut store, _) = memory_store();
        store.add("a").unwrap();
        store.add("b").unwrap();

        assert_eq!(store.clear_all().unwrap(), 2);
        assert!(store.list().is_empty());
        assert_eq!(store.blob().get(DEFAULT_KEY).unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn test_every_mutation_is_persisted() {
        let (mut store, _) = memory_store();
        let task = store.add("Buy milk").unwrap();
        store.toggle(task.id).unwrap();
        store.set_priority(task.id, "low").unwrap();
        store.edit(task.id, "Buy bread").unwrap();

        let stored = snapshot::decode(&store.blob().get(DEFAULT_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(stored, store.list());
    }

    #[test]
    fn test_save_load_round_trip() {
        let (mut store, clock) = memory_store();
        let a = store.add("Buy milk").unwrap();
        clock.advance_ms(1234);
        let b = store.add("Call mom").unwrap();
        store.set_priority(b.id, "high").unwrap();
        clock.advance_ms(77);
        store.toggle(a.id).unwrap();
        let before = store.list().to_vec();

        let reloaded = TaskStore::load(store.into_blob());
        assert_eq!(reloaded.list(), before.as_slice());
    }

    #[test]
    fn test_file_store_round_trip() {
        let temp = TempDir::new().unwrap();
        let before = {
            let mut store = TaskStore::load(FileBlobStore::open(temp.path()).unwrap());
            let task = store.add("Water plants").unwrap();
            store.toggle(task.id).unwrap();
            store.list().to_vec()
        };

        let store = TaskStore::load(FileBlobStore::open(temp.path()).unwrap());
        assert_eq!(store.list(), before.as_slice());
        assert!(temp.path().join("tasks.json").exists());
    }

    #[test]
    fn test_file_store_failed_write_keeps_durable_copy() {
        let temp = TempDir::new().unwrap();
        let mut store = TaskStore::load(FileBlobStore::open(temp.path()).unwrap());
        let task = store.add("Buy milk").unwrap();
        let before = store.list().to_vec();

        // A directory where the writer lock belongs makes every put fail
        fs::create_dir(temp.path().join(".tasks.lock")).unwrap();

        assert!(matches!(store.toggle(task.id), Err(TaskError::Persistence { .. })));
        assert!(matches!(store.add("Call mom"), Err(TaskError::Persistence { .. })));
        assert_eq!(store.list(), before.as_slice());

        let reloaded = TaskStore::load(FileBlobStore::open(temp.path()).unwrap());
        assert_eq!(reloaded.list(), before.as_slice());
    }

    #[test]
    fn test_failed_write_leaves_state_unchanged() {
        let blob = FlakyBlobStore::default();
        let fail_writes = blob.fail_writes.clone();
        let mut store = TaskStore::load(blob);
        let task = store.add("Buy milk").unwrap();
        let before = store.list().to_vec();

        fail_writes.set(true);
        assert!(matches!(store.add("Call mom"), Err(TaskError::Persistence { .. })));
        assert!(matches!(store.toggle(task.id), Err(TaskError::Persistence { .. })));
        assert!(matches!(store.clear_all(), Err(TaskError::Persistence { .. })));
        assert_eq!(store.list(), before.as_slice());

        // Durable copy still matches memory
        let stored = snapshot::decode(&store.blob().get(DEFAULT_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(stored, before);

        fail_writes.set(false);
        let next = store.add("Call mom").unwrap();
        assert!(next.id > task.id);
    }

    #[test]
    fn test_validation_checked_before_write() {
        let blob = FlakyBlobStore::default();
        blob.fail_writes.set(true);
        let mut store = TaskStore::load(blob);

        assert!(matches!(store.add(" "), Err(TaskError::Validation(_))));
        assert_eq!(store.toggle(5), Err(TaskError::NotFound(5)));
    }

    #[test]
    fn test_scenario_buy_milk_call_mom() {
        let (mut store, clock) = memory_store();

        let milk = store.add("Buy milk").unwrap();
        assert_eq!(store.list().len(), 1);
        assert_eq!(
            stats(store.list()),
            Stats {
                total: 1,
                completed: 0,
                pending: 1,
                progress_percent: 0
            }
        );

        store.toggle(milk.id).unwrap();
        assert_eq!(
            stats(store.list()),
            Stats {
                total: 1,
                completed: 1,
                pending: 0,
                progress_percent: 100
            }
        );

        clock.advance_ms(1);
        let mom = store.add("Call mom").unwrap();
        store.set_priority(mom.id, "high").unwrap();
        let high: Vec<&str> = project(store.list(), FilterMode::Priority, "")
            .iter()
            .map(|t| t.text.as_str())
            .collect();
        assert_eq!(high, vec!["Call mom"]);

        let before = store.list().to_vec();
        assert!(matches!(store.edit(milk.id, ""), Err(TaskError::Validation(_))));
        assert_eq!(store.list(), before.as_slice());

        store.clear_all().unwrap();
        assert!(store.list().is_empty());
        assert_eq!(stats(store.list()), Stats::default());
    }
}
