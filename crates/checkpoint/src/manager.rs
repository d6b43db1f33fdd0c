//! Checkpoint Manager (C7): builds, persists and restores per-layer
//! `WorkflowState` snapshots on top of a `CheckpointStore` collaborator.

use std::sync::Arc;
use taskgraph_common::{Checkpoint, Error, JsonValue, Result, TaskResult, WorkflowState};
use taskgraph_core::CheckpointStore;
use tracing::instrument;
use uuid::Uuid;

/// Default checkpoint TTL per spec.md §6 (`checkpoint.ttlSeconds = 3600`).
pub const DEFAULT_TTL_SECONDS: u64 = 3600;
/// Default TTL for the `WorkflowState` itself, independent of the checkpoint
/// record's own TTL; kept equal by default.
const STATE_TTL_SECONDS: i64 = DEFAULT_TTL_SECONDS as i64;

pub struct CheckpointManager {
    store: Arc<dyn CheckpointStore>,
    ttl_seconds: u64,
}

impl CheckpointManager {
    pub fn new(store: Arc<dyn CheckpointStore>) -> Self {
        Self {
            store,
            ttl_seconds: DEFAULT_TTL_SECONDS,
        }
    }

    pub fn with_ttl(store: Arc<dyn CheckpointStore>, ttl_seconds: u64) -> Self {
        Self { store, ttl_seconds }
    }

    /// Persists a snapshot at a layer boundary and returns the `Checkpoint`
    /// record (its `checkpoint_id` is opaque to the caller).
    #[instrument(skip(self, tasks, messages, decisions))]
    pub async fn checkpoint(
        &self,
        workflow_id: &str,
        layer_index: usize,
        tasks: Vec<TaskResult>,
        messages: JsonValue,
        decisions: JsonValue,
    ) -> Result<Checkpoint> {
        let mut state = WorkflowState::new(workflow_id, chrono::Duration::seconds(STATE_TTL_SECONDS));
        state.tasks = tasks;
        state.current_layer = Some(layer_index);
        state.messages = messages;
        state.decisions = decisions;

        let checkpoint = Checkpoint {
            checkpoint_id: Uuid::new_v4().to_string(),
            workflow_id: workflow_id.to_string(),
            layer_index,
            state,
            created_at: chrono::Utc::now(),
        };

        let bytes = serde_json::to_vec(&checkpoint)?;
        self.store
            .put(&checkpoint.checkpoint_id, bytes, self.ttl_seconds)
            .await?;
        Ok(checkpoint)
    }

    /// Loads a checkpoint by id. The underlying store collapses miss and
    /// expiry into a single `None`, so both surface as `CheckpointNotFound`
    /// here; `CheckpointExpired` is reserved for a store that can tell them
    /// apart.
    #[instrument(skip(self))]
    pub async fn load(&self, checkpoint_id: &str) -> Result<Checkpoint> {
        let bytes = self
            .store
            .get(checkpoint_id)
            .await?
            .ok_or_else(|| Error::CheckpointNotFound(checkpoint_id.to_string()))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub async fn delete(&self, checkpoint_id: &str) -> Result<()> {
        self.store.delete(checkpoint_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryCheckpointStore;
    use serde_json::json;

    fn manager() -> CheckpointManager {
        CheckpointManager::new(Arc::new(InMemoryCheckpointStore::new()))
    }

    #[tokio::test]
    async fn checkpoint_then_load_round_trips() {
        let manager = manager();
        let checkpoint = manager
            .checkpoint(
                "wf-1",
                1,
                vec![TaskResult::success("t1", json!(1), 5)],
                json!(["hi"]),
                json!({"picked": "t1"}),
            )
            .await
            .unwrap();

        let loaded = manager.load(&checkpoint.checkpoint_id).await.unwrap();
        assert_eq!(loaded.workflow_id, "wf-1");
        assert_eq!(loaded.layer_index, 1);
        assert_eq!(loaded.state.tasks.len(), 1);
        assert_eq!(loaded.state.messages, json!(["hi"]));
    }

    #[tokio::test]
    async fn unknown_checkpoint_id_is_not_found() {
        let manager = manager();
        let err = manager.load("ghost").await.unwrap_err();
        assert!(matches!(err, Error::CheckpointNotFound(_)));
    }
}
