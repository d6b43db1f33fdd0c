//! Default `EmbeddingProvider` (C9 collaborator): a deterministic,
//! hash-based embedding used when no real embedding model is wired in.
//! Replaces the teacher's `BGEEmbeddingModel` with the same dimension and
//! the same "wrap a model name" shape, but a computable body instead of a
//! network call.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use taskgraph_common::{Embedding, Result};
use taskgraph_core::EmbeddingProvider;

const DIMENSION: usize = 768;

/// Hashes `text` into a fixed-dimension unit-ish vector. Not a real
/// embedding model — good enough to exercise the priority engine and its
/// tests without a live model dependency.
pub struct HashEmbeddingProvider {
    dimension: usize,
}

impl HashEmbeddingProvider {
    pub fn new() -> Self {
        Self { dimension: DIMENSION }
    }
}

impl Default for HashEmbeddingProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Embedding> {
        let mut out = Vec::with_capacity(self.dimension);
        let mut counter: u32 = 0;
        while out.len() < self.dimension {
            let mut hasher = Sha256::new();
            hasher.update(text.as_bytes());
            hasher.update(counter.to_le_bytes());
            let digest = hasher.finalize();
            out.extend(digest.iter().map(|b| (*b as f32 / 255.0) - 0.5));
            counter += 1;
        }
        out.truncate(self.dimension);
        Ok(out)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
