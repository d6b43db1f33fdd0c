//! In-memory Trace Store (C10): append-only sink for prioritized traces,
//! the single source of truth for the replay queue. Backed by
//! `priority_queue`, the workspace's scheduling-priority crate, keyed by
//! trace id.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use priority_queue::PriorityQueue;
use std::cmp::Ordering;
use std::collections::HashMap;
use taskgraph_common::{Result, Trace};
use taskgraph_core::TraceStore;
use uuid::Uuid;

/// Ordering key for the replay queue: `priority DESC`, then
/// `executed_at DESC`, then `id DESC` — the tiebreak chain from spec.md §4.7.
#[derive(Debug, Clone, PartialEq)]
struct ReplayRank {
    priority: f64,
    executed_at: DateTime<Utc>,
    id: String,
}

impl Eq for ReplayRank {}

impl PartialOrd for ReplayRank {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ReplayRank {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .total_cmp(&other.priority)
            .then_with(|| self.executed_at.cmp(&other.executed_at))
            .then_with(|| self.id.cmp(&other.id))
    }
}

struct Inner {
    queue: PriorityQueue<String, ReplayRank>,
    traces: HashMap<String, Trace>,
}

/// Durable only for the lifetime of the process; the trait seam lets a real
/// deployment swap in a SQL-backed store without touching the priority
/// engine or the upstream replay consumer.
pub struct InMemoryTraceStore {
    inner: Mutex<Inner>,
}

impl InMemoryTraceStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                queue: PriorityQueue::new(),
                traces: HashMap::new(),
            }),
        }
    }
}

impl Default for InMemoryTraceStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TraceStore for InMemoryTraceStore {
    async fn insert_trace(&self, mut trace: Trace) -> Result<String> {
        if trace.id.is_empty() {
            trace.id = Uuid::new_v4().to_string();
        }
        let rank = ReplayRank {
            priority: trace.priority,
            executed_at: trace.executed_at,
            id: trace.id.clone(),
        };
        let mut inner = self.inner.lock();
        let id = trace.id.clone();
        inner.queue.push(id.clone(), rank);
        inner.traces.insert(id.clone(), trace);
        Ok(id)
    }

    async fn get_high_priority_traces(&self, limit: usize) -> Result<Vec<Trace>> {
        let inner = self.inner.lock();
        let mut ranked: Vec<&ReplayRank> = inner.queue.iter().map(|(_, rank)| rank).collect();
        ranked.sort_by(|a, b| b.cmp(a));
        Ok(ranked
            .into_iter()
            .take(limit)
            .filter_map(|rank| inner.traces.get(&rank.id).cloned())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trace(id: &str, priority: f64, executed_at: DateTime<Utc>) -> Trace {
        Trace {
            id: id.to_string(),
            intent_text: "intent".to_string(),
            executed_path: vec!["code:run".to_string()],
            success: true,
            error_message: None,
            duration_ms: 10,
            priority,
            predicted: 0.5,
            actual: 1.0,
            is_cold_start: false,
            executed_at,
        }
    }

    #[tokio::test]
    async fn returns_traces_ordered_by_priority_desc() {
        let store = InMemoryTraceStore::new();
        let now = Utc::now();
        store.insert_trace(trace("low", 0.1, now)).await.unwrap();
        store.insert_trace(trace("high", 0.9, now)).await.unwrap();
        store.insert_trace(trace("mid", 0.5, now)).await.unwrap();

        let top = store.get_high_priority_traces(10).await.unwrap();
        let ids: Vec<_> = top.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["high", "mid", "low"]);
    }

    #[tokio::test]
    async fn ties_break_by_executed_at_desc_then_id() {
        let store = InMemoryTraceStore::new();
        let earlier = Utc::now() - chrono::Duration::seconds(10);
        let later = Utc::now();
        store.insert_trace(trace("b", 0.5, earlier)).await.unwrap();
        store.insert_trace(trace("a", 0.5, later)).await.unwrap();

        let top = store.get_high_priority_traces(10).await.unwrap();
        let ids: Vec<_> = top.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn limit_truncates_results() {
        let store = InMemoryTraceStore::new();
        let now = Utc::now();
        for i in 0..5 {
            store
                .insert_trace(trace(&format!("t{i}"), i as f64 / 10.0, now))
                .await
                .unwrap();
        }
        let top = store.get_high_priority_traces(2).await.unwrap();
        assert_eq!(top.len(), 2);
    }
}
