//! Result Store (C4): single-writer, multi-reader map of task id to outcome.
//!
//! Owned exclusively by the `ParallelDagExecutor` for the lifetime of one
//! `execute` call; the Dependency Resolver only ever reads it.

use parking_lot::RwLock;
use std::collections::HashMap;
use taskgraph_common::{TaskId, TaskResult};

#[derive(Default)]
pub struct ResultStore {
    inner: RwLock<HashMap<TaskId, TaskResult>>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, result: TaskResult) {
        self.inner.write().insert(result.task_id.clone(), result);
    }

    pub fn get(&self, id: &str) -> Option<TaskResult> {
        self.inner.read().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of every result recorded so far, in insertion-arbitrary order
    /// (callers that need DAG order should re-sort by the DAG's task list).
    pub fn snapshot(&self) -> Vec<TaskResult> {
        self.inner.read().values().cloned().collect()
    }

    /// Seeds the store from a prior `WorkflowState`, used by the checkpoint
    /// resume path. Overwrites any existing entry with the same id.
    pub fn seed(&self, results: impl IntoIterator<Item = TaskResult>) {
        let mut inner = self.inner.write();
        for result in results {
            inner.insert(result.task_id.clone(), result);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn put_then_get_round_trips() {
        let store = ResultStore::new();
        store.put(TaskResult::success("t1", json!(42), 5));
        let result = store.get("t1").unwrap();
        assert_eq!(result.output, Some(json!(42)));
    }

    #[test]
    fn missing_id_is_none() {
        let store = ResultStore::new();
        assert!(store.get("ghost").is_none());
    }

    #[test]
    fn seed_overwrites_existing() {
        let store = ResultStore::new();
        store.put(TaskResult::error("t1", "first", 1));
        store.seed(vec![TaskResult::success("t1", json!(1), 2)]);
        assert_eq!(store.get("t1").unwrap().output, Some(json!(1)));
    }
}
