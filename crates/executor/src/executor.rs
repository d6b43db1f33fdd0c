//! Parallel DAG Executor (C5): runs layers, fans out tasks, aggregates
//! metrics, and drives the event stream (C12).

use futures::future::join_all;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;
use taskgraph_common::{
    Dag, Error, ExecutionReport, Result, Task, TaskError, TaskId, TaskResult, TaskStatus,
};
use taskgraph_core::TaskExecutor;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tracing::{info, instrument, warn};

use crate::admission;
use crate::cache::{cache_key, ExecutionCache};
use crate::cancel::CancelHandle;
use crate::events::{self, Event, EventSink, WorkflowEndStatus};
use crate::layerer;
use crate::resolver;
use crate::result_store::ResultStore;

/// Runs a single DAG to completion (or abort) using a pluggable `TaskExecutor`.
pub struct ParallelDagExecutor {
    executor: Arc<dyn TaskExecutor>,
    cache: Option<Arc<ExecutionCache>>,
    tool_versions: HashMap<String, String>,
}

impl ParallelDagExecutor {
    pub fn new(executor: Arc<dyn TaskExecutor>) -> Self {
        Self {
            executor,
            cache: None,
            tool_versions: HashMap::new(),
        }
    }

    /// Consults `cache` (C6) before invoking a task and populates it after a
    /// successful run, realizing the `C8 -> (C6 lookup) -> C5` data flow.
    /// `tool_versions` is folded into every cache key so a version bump
    /// invalidates prior entries implicitly.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<ExecutionCache>, tool_versions: HashMap<String, String>) -> Self {
        self.cache = Some(cache);
        self.tool_versions = tool_versions;
        self
    }

    /// Runs `dag` to completion, discarding the event stream. Equivalent to
    /// draining `execute_stream` down to its final `workflow_end` event: the
    /// run happens on a spawned task while this future drains the channel
    /// concurrently, so a layer wider than the channel's buffer can never
    /// block on a receiver nobody is polling.
    #[instrument(skip(self, dag))]
    pub async fn execute(&self, dag: &Dag) -> Result<ExecutionReport> {
        let (sink, mut stream) = events::channel(64);
        let dag = dag.clone();
        let executor = Arc::clone(&self.executor);
        let cache = self.cache.clone();
        let tool_versions = self.tool_versions.clone();
        let handle = tokio::spawn(async move {
            let runner = ParallelDagExecutor {
                executor,
                cache,
                tool_versions,
            };
            runner
                .run(&dag, &ResultStore::new(), 0, sink, &CancelHandle::new())
                .await
        });
        while stream.next().await.is_some() {}
        handle
            .await
            .map_err(|err| Error::Internal(err.to_string()))?
    }

    /// Streams progress events while the workflow runs. Returns immediately;
    /// the workflow body executes on a spawned task.
    pub fn execute_stream(&self, dag: Dag, _workflow_id: String) -> (ReceiverStream<Event>, CancelHandle) {
        let (sink, stream) = events::channel(64);
        let cancel = CancelHandle::new();
        let executor = Arc::clone(&self.executor);
        let cache = self.cache.clone();
        let tool_versions = self.tool_versions.clone();
        let cancel_for_task = cancel.clone();
        tokio::spawn(async move {
            let runner = ParallelDagExecutor {
                executor,
                cache,
                tool_versions,
            };
            let _ = runner
                .run(&dag, &ResultStore::new(), 0, sink, &cancel_for_task)
                .await;
        });
        (stream, cancel)
    }

    /// Shared core used by both `execute` and `execute_stream`, and by the
    /// controlled executor (`taskgraph-checkpoint`), which shares its own
    /// `ResultStore` across a `run` call to checkpoint between layers, and
    /// passes a non-zero `start_layer` when resuming.
    pub async fn run(
        &self,
        dag: &Dag,
        store: &ResultStore,
        start_layer: usize,
        sink: EventSink,
        cancel: &CancelHandle,
    ) -> Result<ExecutionReport> {
        dag.validate()?;
        admission::validate_purity(dag)?;
        let layers = layerer::layer(dag)?;

        if layers.is_empty() {
            let report = ExecutionReport {
                results: vec![],
                successful_tasks: 0,
                failed_tasks: 0,
                errors: vec![],
                parallelization_layers: 0,
                execution_time_ms: 0,
                speedup: 1.0,
            };
            sink.send(Event::WorkflowEnd {
                status: WorkflowEndStatus::Success,
                report: report.clone(),
            })
            .await;
            return Ok(report);
        }

        let start = Instant::now();
        let mut aborted = false;
        let mut cancelled = false;

        for layer in layers.iter().skip(start_layer) {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            sink.send(Event::LayerStart {
                layer_index: layer.index,
                tasks: layer.tasks.iter().map(|t| t.id.clone()).collect(),
            })
            .await;

            let outcomes = join_all(
                layer
                    .tasks
                    .iter()
                    .map(|task| self.run_task(task, store, layer.index)),
            )
            .await;

            for (task, result) in layer.tasks.iter().zip(outcomes) {
                store.put(result.clone());
                sink.send(Event::TaskComplete {
                    task_id: result.task_id.clone(),
                    status: result.status,
                })
                .await;
                if result.status == TaskStatus::Error && !task.metadata.safe_to_fail {
                    warn!(task_id = %task.id, "task failed, halting further layers");
                    aborted = true;
                }
            }

            sink.send(Event::LayerEnd {
                layer_index: layer.index,
            })
            .await;

            if aborted {
                break;
            }
        }

        let execution_time_ms = start.elapsed().as_millis() as u64;
        let results = ordered_results(dag, store);
        let sequential_estimate_ms: u64 = results.iter().filter_map(|r| r.execution_time_ms).sum();
        let speedup = if execution_time_ms > 0 {
            sequential_estimate_ms as f64 / execution_time_ms as f64
        } else {
            1.0
        };

        let successful_tasks = results
            .iter()
            .filter(|r| r.status == TaskStatus::Success)
            .count();
        let failed_tasks = results
            .iter()
            .filter(|r| r.status == TaskStatus::Error)
            .count();
        let errors = results
            .iter()
            .filter(|r| r.status == TaskStatus::Error)
            .map(|r| TaskError {
                task_id: r.task_id.clone(),
                error: r.error.clone().unwrap_or_default(),
            })
            .collect();

        let report = ExecutionReport {
            results,
            successful_tasks,
            failed_tasks,
            errors,
            parallelization_layers: layers.len(),
            execution_time_ms,
            speedup,
        };

        let status = if cancelled {
            WorkflowEndStatus::Cancelled
        } else if aborted {
            WorkflowEndStatus::Error
        } else {
            WorkflowEndStatus::Success
        };

        info!(?status, tasks = report.results.len(), "workflow finished");
        sink.send(Event::WorkflowEnd {
            status,
            report: report.clone(),
        })
        .await;

        Ok(report)
    }

    async fn run_task(&self, task: &Task, store: &ResultStore, layer_index: usize) -> TaskResult {
        let start = Instant::now();

        let deps = match resolver::resolve(&task.depends_on, store) {
            Ok(deps) => deps,
            Err(err) => {
                return with_layer(
                    TaskResult::error(task.id.clone(), err.to_string(), elapsed_ms(start)),
                    layer_index,
                )
            }
        };

        if let Some(cache) = &self.cache {
            let key = cache_key_for(task, &deps, &self.tool_versions);
            if let Some(mut cached) = cache.get(&key) {
                cached.layer_index = Some(layer_index);
                return cached;
            }
            let result = with_layer(self.invoke(task, &deps, start).await, layer_index);
            if result.status == TaskStatus::Success {
                cache.set(key, result.clone(), self.tool_versions.clone());
            }
            return result;
        }

        with_layer(self.invoke(task, &deps, start).await, layer_index)
    }

    async fn invoke(
        &self,
        task: &Task,
        deps: &HashMap<TaskId, TaskResult>,
        start: Instant,
    ) -> TaskResult {
        let outcome = match task.metadata.timeout_ms {
            Some(ms) => {
                match tokio::time::timeout(
                    std::time::Duration::from_millis(ms),
                    self.executor.run(&task.tool, &task.arguments, deps),
                )
                .await
                {
                    Ok(result) => result,
                    Err(_) => Err(Error::Timeout),
                }
            }
            None => self.executor.run(&task.tool, &task.arguments, deps).await,
        };

        let elapsed = elapsed_ms(start);
        match outcome {
            Ok(output) => TaskResult::success(task.id.clone(), output, elapsed),
            Err(err) if task.metadata.safe_to_fail => {
                TaskResult::failed_safe(task.id.clone(), err.to_string(), elapsed)
            }
            Err(err) => TaskResult::error(task.id.clone(), err.to_string(), elapsed),
        }
    }
}

/// Builds the Execution Cache key for a task: `code` is its pure-code body
/// when present (falling back to the tool id for non-code tasks), `context`
/// folds in both its own arguments and the resolved outputs of its
/// dependencies so an upstream result change invalidates the entry too.
fn cache_key_for(
    task: &Task,
    deps: &HashMap<TaskId, TaskResult>,
    tool_versions: &HashMap<String, String>,
) -> String {
    let code = task.metadata.body.clone().unwrap_or_else(|| task.tool.clone());
    let dep_outputs: BTreeMap<&TaskId, &Option<taskgraph_common::JsonValue>> =
        deps.iter().map(|(id, result)| (id, &result.output)).collect();
    let context = serde_json::json!({
        "arguments": task.arguments,
        "deps": dep_outputs,
    })
    .to_string();
    cache_key(&code, &context, tool_versions)
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

fn with_layer(mut result: TaskResult, layer_index: usize) -> TaskResult {
    result.layer_index = Some(layer_index);
    result
}

/// Orders the Result Store's contents to match the DAG's declared task order,
/// the order callers expect an `ExecutionReport.results` to follow.
fn ordered_results(dag: &Dag, store: &ResultStore) -> Vec<TaskResult> {
    let by_id: HashMap<TaskId, TaskResult> = store
        .snapshot()
        .into_iter()
        .map(|r| (r.task_id.clone(), r))
        .collect();
    dag.tasks
        .iter()
        .filter_map(|task| by_id.get(&task.id).cloned())
        .collect()
}
