//! Controlled Executor (C8): wraps the `ParallelDagExecutor` with
//! checkpointing and resumption.

use futures::StreamExt;
use std::sync::Arc;
use taskgraph_common::{Dag, Error, JsonValue, Result, TaskId};
use taskgraph_executor::{CancelHandle, Event, ParallelDagExecutor, ResultStore, WorkflowEndStatus};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, instrument};

use crate::manager::CheckpointManager;

/// A DAG paired with the workflow id it runs under, and (when resuming) the
/// layer execution should resume after.
pub struct ControlledExecutor {
    executor: Arc<ParallelDagExecutor>,
    manager: Arc<CheckpointManager>,
}

impl ControlledExecutor {
    pub fn new(executor: Arc<ParallelDagExecutor>, manager: Arc<CheckpointManager>) -> Self {
        Self { executor, manager }
    }

    /// Fresh run from layer 0, checkpointing after every successful layer.
    pub fn execute_stream(
        self: &Arc<Self>,
        dag: Dag,
        workflow_id: String,
    ) -> (ReceiverStream<Event>, CancelHandle) {
        self.run_from(dag, workflow_id, Arc::new(ResultStore::new()), 0)
    }

    /// Loads `checkpoint_id`, validates it against `dag`, seeds the Result
    /// Store from the snapshot and resumes at `layerIndex + 1`.
    #[instrument(skip(self, dag))]
    pub async fn resume_from_checkpoint(
        self: &Arc<Self>,
        dag: Dag,
        checkpoint_id: &str,
    ) -> Result<(ReceiverStream<Event>, CancelHandle)> {
        let checkpoint = self.manager.load(checkpoint_id).await?;

        let snapshot_ids: Vec<TaskId> = checkpoint
            .state
            .tasks
            .iter()
            .map(|t| t.task_id.clone())
            .collect();
        let dag_prefix: Vec<TaskId> = dag
            .tasks
            .iter()
            .take(snapshot_ids.len())
            .map(|t| t.id.clone())
            .collect();
        if snapshot_ids != dag_prefix {
            return Err(Error::DagMismatch);
        }

        let store = Arc::new(ResultStore::new());
        store.seed(checkpoint.state.tasks.clone());

        info!(
            workflow_id = %checkpoint.workflow_id,
            resume_layer = checkpoint.layer_index + 1,
            "resuming from checkpoint"
        );

        Ok(self.run_from(dag, checkpoint.workflow_id.clone(), store, checkpoint.layer_index + 1))
    }

    fn run_from(
        self: &Arc<Self>,
        dag: Dag,
        workflow_id: String,
        store: Arc<ResultStore>,
        start_layer: usize,
    ) -> (ReceiverStream<Event>, CancelHandle) {
        let (inner_sink, inner_stream) = taskgraph_executor::events::channel(64);
        let (out_tx, out_rx) = tokio::sync::mpsc::channel(64);
        let cancel = CancelHandle::new();

        let executor = Arc::clone(&self.executor);
        let store_for_run = Arc::clone(&store);
        let cancel_for_run = cancel.clone();
        let dag_for_run = dag.clone();
        tokio::spawn(async move {
            let _ = executor
                .run(&dag_for_run, &store_for_run, start_layer, inner_sink, &cancel_for_run)
                .await;
        });

        let manager = Arc::clone(&self.manager);
        let dag_for_relay = dag;
        tokio::spawn(async move {
            let mut inner = inner_stream;
            while let Some(event) = inner.next().await {
                let layer_end = matches!(event, Event::LayerEnd { .. });
                let layer_index = match &event {
                    Event::LayerEnd { layer_index } => Some(*layer_index),
                    _ => None,
                };

                if out_tx.send(event).await.is_err() {
                    break;
                }

                if layer_end {
                    if let Some(layer_index) = layer_index {
                        let tasks = ordered_snapshot(&dag_for_relay, &store);
                        match manager
                            .checkpoint(
                                &workflow_id,
                                layer_index,
                                tasks,
                                JsonValue::Null,
                                JsonValue::Null,
                            )
                            .await
                        {
                            Ok(checkpoint) => {
                                let _ = out_tx
                                    .send(Event::Checkpoint {
                                        checkpoint_id: checkpoint.checkpoint_id,
                                        layer_index,
                                    })
                                    .await;
                            }
                            Err(err) => {
                                tracing::warn!(%err, "failed to write checkpoint");
                            }
                        }
                    }
                }
            }
        });

        (ReceiverStream::new(out_rx), cancel)
    }
}

fn ordered_snapshot(
    dag: &Dag,
    store: &ResultStore,
) -> Vec<taskgraph_common::TaskResult> {
    let results = store.snapshot();
    let mut by_id: std::collections::HashMap<_, _> =
        results.into_iter().map(|r| (r.task_id.clone(), r)).collect();
    dag.tasks
        .iter()
        .filter_map(|task| by_id.remove(&task.id))
        .collect()
}

/// Status a caller observes once the stream returned by [`ControlledExecutor`]
/// is fully drained; derived from the final `workflow_end` event.
pub fn terminal_status(event: &Event) -> Option<WorkflowEndStatus> {
    match event {
        Event::WorkflowEnd { status, .. } => Some(*status),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use taskgraph_common::{Task, TaskMetadata, TaskResult};
    use taskgraph_core::TaskExecutor;

    use crate::store::InMemoryCheckpointStore;

    struct InstantExecutor;

    #[async_trait]
    impl TaskExecutor for InstantExecutor {
        async fn run(
            &self,
            _tool: &str,
            _arguments: &serde_json::Value,
            _deps: &HashMap<String, TaskResult>,
        ) -> taskgraph_common::Result<serde_json::Value> {
            Ok(json!(null))
        }
    }

    fn task(id: &str, deps: &[&str]) -> Task {
        Task {
            id: id.to_string(),
            tool: "code:noop".to_string(),
            arguments: json!({}),
            depends_on: deps.iter().map(|s| s.to_string()).collect(),
            metadata: TaskMetadata::default(),
        }
    }

    fn controlled() -> Arc<ControlledExecutor> {
        let executor = Arc::new(ParallelDagExecutor::new(Arc::new(InstantExecutor)));
        let manager = Arc::new(CheckpointManager::new(Arc::new(InMemoryCheckpointStore::new())));
        Arc::new(ControlledExecutor::new(executor, manager))
    }

    #[tokio::test]
    async fn checkpoint_is_emitted_after_each_layer() {
        let controlled = controlled();
        let dag = Dag::new(vec![task("t1", &[]), task("t2", &["t1"])]);
        let (mut stream, _cancel) = controlled.execute_stream(dag, "wf-1".to_string());

        let mut checkpoints = 0;
        let mut last_checkpoint_id = None;
        while let Some(event) = stream.next().await {
            if let Event::Checkpoint { checkpoint_id, .. } = &event {
                checkpoints += 1;
                last_checkpoint_id = Some(checkpoint_id.clone());
            }
        }
        assert_eq!(checkpoints, 2);
        assert!(last_checkpoint_id.is_some());
    }

    #[tokio::test]
    async fn resume_continues_after_the_checkpointed_layer() {
        let controlled = controlled();
        let dag = Dag::new(vec![
            task("t1", &[]),
            task("t2", &["t1"]),
            task("t3", &["t2"]),
        ]);

        let (mut stream, _cancel) = controlled.execute_stream(dag.clone(), "wf-2".to_string());
        let mut first_checkpoint = None;
        while let Some(event) = stream.next().await {
            if let Event::Checkpoint { checkpoint_id, layer_index } = event {
                first_checkpoint = Some((checkpoint_id, layer_index));
                break;
            }
        }
        let (checkpoint_id, layer_index) = first_checkpoint.unwrap();
        assert_eq!(layer_index, 0);

        let (mut resumed, _cancel) = controlled
            .resume_from_checkpoint(dag, &checkpoint_id)
            .await
            .unwrap();

        let mut started_layers = vec![];
        while let Some(event) = resumed.next().await {
            if let Event::LayerStart { layer_index, .. } = event {
                started_layers.push(layer_index);
            }
        }
        assert_eq!(started_layers, vec![1, 2]);
    }

    #[tokio::test]
    async fn dag_mismatch_is_rejected() {
        let controlled = controlled();
        let dag = Dag::new(vec![task("t1", &[]), task("t2", &["t1"])]);
        let (mut stream, _cancel) = controlled.execute_stream(dag, "wf-3".to_string());
        let mut checkpoint_id = None;
        while let Some(event) = stream.next().await {
            if let Event::Checkpoint { checkpoint_id: id, .. } = event {
                checkpoint_id = Some(id);
            }
        }
        let other_dag = Dag::new(vec![task("different", &[])]);
        let err = controlled
            .resume_from_checkpoint(other_dag, &checkpoint_id.unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DagMismatch));
    }
}
