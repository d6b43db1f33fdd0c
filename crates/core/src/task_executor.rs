//! Task Executor contract (C1): invokes a single leaf task given a tool name
//! and its resolved dependency map. Pluggable — concrete implementations
//! live in `taskgraph-backends`.

use async_trait::async_trait;
use std::collections::HashMap;
use taskgraph_common::{Error, JsonValue, Result, TaskId, TaskResult};

/// Runs exactly one task. Implementations should not retry or time out
/// internally — both are the executor's job (§5).
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    /// Invokes `tool` with `arguments`, given the resolved results of its
    /// dependencies. Any error returned here becomes
    /// `TaskResult{status: error, error: message}` — it never propagates out
    /// of the parallel DAG executor.
    async fn run(
        &self,
        tool: &str,
        arguments: &JsonValue,
        deps: &HashMap<TaskId, TaskResult>,
    ) -> Result<JsonValue>;

    /// Best-effort cancellation hint for an in-flight task. Implementations
    /// that cannot cancel mid-flight may treat this as a no-op (§5).
    async fn cancel(&self, _task_id: &TaskId) {}
}

/// A trivial executor is handy as a default/fallback and in tests.
pub struct NoopExecutor;

#[async_trait]
impl TaskExecutor for NoopExecutor {
    async fn run(
        &self,
        _tool: &str,
        _arguments: &JsonValue,
        _deps: &HashMap<TaskId, TaskResult>,
    ) -> Result<JsonValue> {
        Err(Error::Internal("no task executor configured".into()))
    }
}
