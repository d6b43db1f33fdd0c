//! Event Stream (C12): a typed, cancellable sequence of progress events.
//!
//! Emitted strictly in the partial order
//! `layer_start -> (task_complete)* -> layer_end -> checkpoint -> ... -> workflow_end`
//! per workflow (the `checkpoint` event is only emitted by the controlled
//! executor; the plain `ParallelDagExecutor` never writes one).

use serde::{Deserialize, Serialize};
use taskgraph_common::{ExecutionReport, TaskId, TaskStatus};
use tokio_stream::wrappers::ReceiverStream;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    LayerStart {
        layer_index: usize,
        tasks: Vec<TaskId>,
    },
    TaskComplete {
        task_id: TaskId,
        status: TaskStatus,
    },
    LayerEnd {
        layer_index: usize,
    },
    Checkpoint {
        checkpoint_id: String,
        layer_index: usize,
    },
    WorkflowEnd {
        status: WorkflowEndStatus,
        report: ExecutionReport,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowEndStatus {
    Success,
    Error,
    Cancelled,
}

/// Producer-side handle. Cloned into every task future so each worker can
/// emit `task_complete` without contending on the executor's own state.
#[derive(Clone)]
pub struct EventSink {
    tx: tokio::sync::mpsc::Sender<Event>,
}

impl EventSink {
    pub fn new(tx: tokio::sync::mpsc::Sender<Event>) -> Self {
        Self { tx }
    }

    /// Best-effort send: a consumer that has dropped the stream must not
    /// panic in-flight layers, it should simply stop being observed.
    pub async fn send(&self, event: Event) {
        let _ = self.tx.send(event).await;
    }
}

pub fn channel(buffer: usize) -> (EventSink, ReceiverStream<Event>) {
    let (tx, rx) = tokio::sync::mpsc::channel(buffer);
    (EventSink::new(tx), ReceiverStream::new(rx))
}
