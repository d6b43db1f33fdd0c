//! In-memory `CheckpointStore` (C7 collaborator): a `dashmap`-backed KV store
//! with per-record TTL, mirroring the executor crate's `dashmap` usage for
//! concurrent-without-an-explicit-lock access.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use taskgraph_common::Result;
use taskgraph_core::CheckpointStore;

struct Record {
    bytes: Vec<u8>,
    expires_at: DateTime<Utc>,
}

/// Durable only for the lifetime of the process; a real deployment swaps
/// this for a persistent `CheckpointStore` without touching the manager.
#[derive(Default)]
pub struct InMemoryCheckpointStore {
    records: DashMap<String, Record>,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, ttl_seconds: u64) -> Result<()> {
        self.records.insert(
            key.to_string(),
            Record {
                bytes,
                expires_at: Utc::now() + chrono::Duration::seconds(ttl_seconds as i64),
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let expired = self
            .records
            .get(key)
            .map(|r| r.expires_at < Utc::now())
            .unwrap_or(false);
        if expired {
            self.records.remove(key);
            return Ok(None);
        }
        Ok(self.records.get(key).map(|r| r.bytes.clone()))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.records.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let store = InMemoryCheckpointStore::new();
        store.put("k1", vec![1, 2, 3], 60).await.unwrap();
        assert_eq!(store.get("k1").await.unwrap(), Some(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn expired_record_is_a_miss_and_is_removed() {
        let store = InMemoryCheckpointStore::new();
        store.put("k1", vec![1], 0).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        assert_eq!(store.get("k1").await.unwrap(), None);
        assert!(store.records.is_empty());
    }

    #[tokio::test]
    async fn delete_removes_entry() {
        let store = InMemoryCheckpointStore::new();
        store.put("k1", vec![1], 60).await.unwrap();
        store.delete("k1").await.unwrap();
        assert_eq!(store.get("k1").await.unwrap(), None);
    }
}
