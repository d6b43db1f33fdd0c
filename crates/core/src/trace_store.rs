//! Trace Store contract (C10 inbound collaborator): append-only durable sink
//! for prioritized execution traces, the single source of truth for the
//! replay queue.

use async_trait::async_trait;
use taskgraph_common::{Result, Trace};

#[async_trait]
pub trait TraceStore: Send + Sync {
    /// Inserts `trace` atomically, returning its final id (traces may be
    /// assigned an id by the store rather than the caller).
    async fn insert_trace(&self, trace: Trace) -> Result<String>;

    /// Returns up to `limit` traces ordered by `priority DESC`, ties broken
    /// by `executed_at DESC`, then by `id`.
    async fn get_high_priority_traces(&self, limit: usize) -> Result<Vec<Trace>>;
}
