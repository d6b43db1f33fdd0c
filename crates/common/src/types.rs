//! Data model shared by the executor, checkpoint manager and priority engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{Error, Result};

/// Task ids are opaque, non-empty strings, unique within a DAG.
pub type TaskId = String;

/// Arbitrary, opaque JSON payload carried as task arguments/output.
pub type JsonValue = serde_json::Value;

/// Embedding vector, treated opaquely by the core.
pub type Embedding = Vec<f32>;

/// Per-task metadata. Only `pure`/`safe_to_fail`/`timeout_ms`/`body` are
/// interpreted by the core; everything else passes through untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskMetadata {
    /// Enables the static "no side-effecting identifiers" admission check.
    #[serde(default)]
    pub pure: bool,
    /// A failure of this task yields `failed_safe` instead of aborting the run.
    #[serde(default)]
    pub safe_to_fail: bool,
    /// Per-task timeout; expiry yields `TaskResult{status: error, error: "timeout"}`.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    /// Source body of a `pure` task, scanned for forbidden identifiers at admission.
    #[serde(default)]
    pub body: Option<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, JsonValue>,
}

/// A single node in a DAG: an opaque tool invocation plus its dependencies.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    /// Opaque identifier of the form `<namespace>:<operation>`.
    pub tool: String,
    #[serde(default)]
    pub arguments: JsonValue,
    #[serde(default)]
    pub depends_on: Vec<TaskId>,
    #[serde(default)]
    pub metadata: TaskMetadata,
}

impl Task {
    /// Namespace portion of `tool`, i.e. the part before the first `:`.
    pub fn namespace(&self) -> &str {
        self.tool.split(':').next().unwrap_or(&self.tool)
    }
}

/// An ordered sequence of tasks, admitted as a unit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dag {
    pub tasks: Vec<Task>,
}

impl Dag {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self { tasks }
    }

    /// Checks the invariants of spec.md §3: unique ids, every `dependsOn`
    /// resolves within the DAG, no self-referential or forward-only cycles
    /// (cycle detection itself happens during layering, not here).
    pub fn validate(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::with_capacity(self.tasks.len());
        for task in &self.tasks {
            if task.id.is_empty() {
                return Err(Error::Internal("task id must not be empty".into()));
            }
            if !seen.insert(task.id.as_str()) {
                return Err(Error::DuplicateTaskId(task.id.clone()));
            }
        }
        for task in &self.tasks {
            for dep in &task.depends_on {
                if !seen.contains(dep.as_str()) {
                    return Err(Error::UnknownDependency(dep.clone()));
                }
            }
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }
}

/// Outcome of running one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Success,
    Error,
    FailedSafe,
}

/// Per-task outcome. `success` implies `output` is present (may be `null`);
/// `error` implies `error` carries a message; `failed_safe` means the task
/// was `safe_to_fail` and downstream tasks must observe this status rather
/// than having the workflow aborted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResult {
    pub task_id: TaskId,
    pub status: TaskStatus,
    #[serde(default)]
    pub output: Option<JsonValue>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub execution_time_ms: Option<u64>,
    #[serde(default)]
    pub layer_index: Option<usize>,
}

impl TaskResult {
    pub fn success(task_id: impl Into<TaskId>, output: JsonValue, execution_time_ms: u64) -> Self {
        Self {
            task_id: task_id.into(),
            status: TaskStatus::Success,
            output: Some(output),
            error: None,
            execution_time_ms: Some(execution_time_ms),
            layer_index: None,
        }
    }

    pub fn error(task_id: impl Into<TaskId>, error: impl Into<String>, execution_time_ms: u64) -> Self {
        Self {
            task_id: task_id.into(),
            status: TaskStatus::Error,
            output: None,
            error: Some(error.into()),
            execution_time_ms: Some(execution_time_ms),
            layer_index: None,
        }
    }

    pub fn failed_safe(task_id: impl Into<TaskId>, error: impl Into<String>, execution_time_ms: u64) -> Self {
        Self {
            task_id: task_id.into(),
            status: TaskStatus::FailedSafe,
            output: None,
            error: Some(error.into()),
            execution_time_ms: Some(execution_time_ms),
            layer_index: None,
        }
    }
}

/// A maximal set of tasks with no intra-set edges, numbered in topological order.
#[derive(Debug, Clone)]
pub struct Layer {
    pub index: usize,
    pub tasks: Vec<Task>,
}

/// Snapshot of a workflow's progress, owned exclusively by the controlled
/// executor and referenced (never mutated) by a `Checkpoint`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowState {
    pub workflow_id: String,
    pub tasks: Vec<TaskResult>,
    /// Index of the last layer whose execution *started*.
    pub current_layer: Option<usize>,
    /// Opaque multi-turn context carried in from the upstream planner.
    #[serde(default)]
    pub messages: JsonValue,
    /// Opaque planning decisions carried in from the upstream planner.
    #[serde(default)]
    pub decisions: JsonValue,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl WorkflowState {
    pub fn new(workflow_id: impl Into<String>, ttl: chrono::Duration) -> Self {
        let now = Utc::now();
        Self {
            workflow_id: workflow_id.into(),
            tasks: Vec::new(),
            current_layer: None,
            messages: JsonValue::Null,
            decisions: JsonValue::Null,
            created_at: now,
            expires_at: now + ttl,
        }
    }
}

/// Durable snapshot of a `WorkflowState` at a layer boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    pub checkpoint_id: String,
    pub workflow_id: String,
    /// Last layer that completed successfully.
    pub layer_index: usize,
    pub state: WorkflowState,
    pub created_at: DateTime<Utc>,
}

/// Cached prior result for a `(code-hash, context, tool-versions)` fingerprint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub key: String,
    pub result: TaskResult,
    pub tool_versions: HashMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub hit_count: u64,
}

/// Execution trace recorded after a workflow finishes, the unit the
/// TD-priority engine and the replay queue operate on.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trace {
    pub id: String,
    pub intent_text: String,
    pub executed_path: Vec<String>,
    pub success: bool,
    #[serde(default)]
    pub error_message: Option<String>,
    pub duration_ms: u64,
    pub priority: f64,
    pub predicted: f64,
    pub actual: f64,
    pub is_cold_start: bool,
    pub executed_at: DateTime<Utc>,
}

/// Execution mode recorded alongside each adaptive-threshold observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    Speculative,
    Suggestion,
    Explicit,
}

/// Dynamic confidence cutoffs tuned by the adaptive threshold manager.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdaptiveThresholds {
    pub explicit_threshold: f64,
    pub suggestion_threshold: f64,
    pub min_threshold: f64,
    pub max_threshold: f64,
}

/// Aggregate report returned by every terminal workflow outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionReport {
    pub results: Vec<TaskResult>,
    pub successful_tasks: usize,
    pub failed_tasks: usize,
    pub errors: Vec<TaskError>,
    pub parallelization_layers: usize,
    pub execution_time_ms: u64,
    pub speedup: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskError {
    pub task_id: TaskId,
    pub error: String,
}
