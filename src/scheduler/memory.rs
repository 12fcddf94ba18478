use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::{ScheduledTaskDescriptor, TaskScheduler};
use crate::errors::Result;

type TaskTable = HashMap<String, ScheduledTaskDescriptor>;

/// Scheduler that keeps tasks in memory. Clones share the same task table.
#[derive(Debug, Clone, Default)]
pub struct InMemoryScheduler {
    tasks: Arc<Mutex<TaskTable>>,
}

impl InMemoryScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<ScheduledTaskDescriptor> {
        self.lock().get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every write is a single map operation, so a poisoned table is still consistent.
    fn lock(&self) -> MutexGuard<'_, TaskTable> {
        self.tasks.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl TaskScheduler for InMemoryScheduler {
    fn create(&self, task: &ScheduledTaskDescriptor) -> Result<()> {
        self.lock().insert(task.name.clone(), task.clone());
        Ok(())
    }

    fn delete(&self, name: &str) -> Result<bool> {
        Ok(self.lock().remove(name).is_some())
    }

    fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.lock().contains_key(name))
    }
}
