//! Task sources: providers of (pattern, task) pairs, queried once per tick.

use std::sync::Arc;

use parking_lot::Mutex;
use uuid::Uuid;

use crontide_pattern::SchedulingPattern;

use crate::task::Task;

/// An ordered snapshot of (pattern, task) pairs.
///
/// Launchers take a fresh table from every source at each tick and walk it
/// in order.
#[derive(Default)]
pub struct TaskTable {
    pairs: Vec<(SchedulingPattern, Arc<dyn Task>)>,
}

impl TaskTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, pattern: SchedulingPattern, task: Arc<dyn Task>) {
        self.pairs.push((pattern, task));
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn pairs(&self) -> &[(SchedulingPattern, Arc<dyn Task>)] {
        &self.pairs
    }
}

/// Produces the pairs a launcher evaluates at each tick.
///
/// Must be side-effect-free, and the ordering must be stable within one
/// query (callers rely on registration order).
pub trait TaskSource: Send + Sync {
    fn task_table(&self) -> TaskTable;
}

struct MemoryEntry {
    id: Uuid,
    pattern: SchedulingPattern,
    task: Arc<dyn Task>,
}

/// The scheduler's built-in source: the target of schedule, reschedule,
/// and deschedule. All access goes through one lock, so a launcher's
/// snapshot always sees an atomically consistent (pattern, task) pair.
#[derive(Default)]
pub(crate) struct MemoryTaskSource {
    entries: Mutex<Vec<MemoryEntry>>,
}

impl MemoryTaskSource {
    pub(crate) fn add(&self, pattern: SchedulingPattern, task: Arc<dyn Task>) -> Uuid {
        let id = Uuid::new_v4();
        self.entries.lock().push(MemoryEntry { id, pattern, task });
        id
    }

    pub(crate) fn update_pattern(&self, id: Uuid, pattern: SchedulingPattern) -> bool {
        let mut entries = self.entries.lock();
        match entries.iter_mut().find(|entry| entry.id == id) {
            Some(entry) => {
                entry.pattern = pattern;
                true
            }
            None => false,
        }
    }

    pub(crate) fn remove(&self, id: Uuid) -> bool {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|entry| entry.id != id);
        entries.len() != before
    }

    pub(crate) fn task(&self, id: Uuid) -> Option<Arc<dyn Task>> {
        self.entries
            .lock()
            .iter()
            .find(|entry| entry.id == id)
            .map(|entry| entry.task.clone())
    }

    pub(crate) fn pattern(&self, id: Uuid) -> Option<SchedulingPattern> {
        self.entries
            .lock()
            .iter()
            .find(|entry| entry.id == id)
            .map(|entry| entry.pattern.clone())
    }
}

impl TaskSource for MemoryTaskSource {
    fn task_table(&self) -> TaskTable {
        let entries = self.entries.lock();
        let mut table = TaskTable::new();
        for entry in entries.iter() {
            table.add(entry.pattern.clone(), entry.task.clone());
        }
        table
    }
}
