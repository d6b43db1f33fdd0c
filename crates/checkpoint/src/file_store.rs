//! Disk-backed `CheckpointStore` (C7 collaborator): one JSON file per key
//! under a configured directory. Unlike `InMemoryCheckpointStore`, records
//! survive across process invocations, so a checkpoint id printed by one
//! `run` can be resumed by a later, separate `resume` invocation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use taskgraph_common::{Error, Result};
use taskgraph_core::CheckpointStore;

#[derive(Serialize, Deserialize)]
struct Record {
    bytes: Vec<u8>,
    expires_at: DateTime<Utc>,
}

pub struct FileCheckpointStore {
    dir: PathBuf,
}

impl FileCheckpointStore {
    /// Creates (if needed) `dir` and returns a store rooted there.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|err| Error::Internal(err.to_string()))?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, ttl_seconds: u64) -> Result<()> {
        let record = Record {
            bytes,
            expires_at: Utc::now() + chrono::Duration::seconds(ttl_seconds as i64),
        };
        let json = serde_json::to_vec(&record).map_err(|err| Error::Internal(err.to_string()))?;
        tokio::fs::write(self.path_for(key), json)
            .await
            .map_err(|err| Error::Internal(err.to_string()))
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(Error::Internal(err.to_string())),
        };
        let record: Record =
            serde_json::from_slice(&bytes).map_err(|err| Error::Internal(err.to_string()))?;
        if record.expires_at < Utc::now() {
            let _ = tokio::fs::remove_file(&path).await;
            return Ok(None);
        }
        Ok(Some(record.bytes))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) | Err(_) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!(
            "taskgraph-file-store-test-{}",
            uuid::Uuid::new_v4()
        ))
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let store = FileCheckpointStore::new(temp_dir()).unwrap();
        store.put("k1", vec![1, 2, 3], 60).await.unwrap();
        assert_eq!(store.get("k1").await.unwrap(), Some(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn missing_key_is_a_miss() {
        let store = FileCheckpointStore::new(temp_dir()).unwrap();
        assert_eq!(store.get("ghost").await.unwrap(), None);
    }

    #[tokio::test]
    async fn expired_record_is_a_miss_and_is_removed() {
        let store = FileCheckpointStore::new(temp_dir()).unwrap();
        store.put("k1", vec![1], 0).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        assert_eq!(store.get("k1").await.unwrap(), None);
        assert!(!store.path_for("k1").exists());
    }

    #[tokio::test]
    async fn delete_removes_entry() {
        let store = FileCheckpointStore::new(temp_dir()).unwrap();
        store.put("k1", vec![1], 60).await.unwrap();
        store.delete("k1").await.unwrap();
        assert_eq!(store.get("k1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn a_store_reopened_at_the_same_directory_sees_prior_writes() {
        let dir = temp_dir();
        let first = FileCheckpointStore::new(&dir).unwrap();
        first.put("k1", vec![9], 60).await.unwrap();
        drop(first);

        let second = FileCheckpointStore::new(&dir).unwrap();
        assert_eq!(second.get("k1").await.unwrap(), Some(vec![9]));
    }
}
