//! Checkpoint Store contract (C7 inbound collaborator): a key-value store
//! with per-record TTL. The checkpoint manager is the only writer; the id
//! space is opaque to this trait.

use async_trait::async_trait;
use taskgraph_common::Result;

#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Stores `bytes` under `key`, expiring after `ttl_seconds`.
    async fn put(&self, key: &str, bytes: Vec<u8>, ttl_seconds: u64) -> Result<()>;

    /// Returns `None` on miss or expiry (an expired record is treated as a
    /// delete and removed from the store, same as a cache miss).
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    async fn delete(&self, key: &str) -> Result<()>;
}
