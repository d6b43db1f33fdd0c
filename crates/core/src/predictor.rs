//! Predictor and embedding provider contracts (C9 inbound collaborators).
//! Owned by the external planner; the TD priority engine only ever reads
//! from these.

use async_trait::async_trait;
use taskgraph_common::{Embedding, Result};

/// Successor-predictor capability graph ("SHGAT" in the upstream planner).
/// The priority engine treats this purely as a success-probability oracle.
#[async_trait]
pub trait Predictor: Send + Sync {
    /// Estimated probability in `[0, 1]` that `executed_path` succeeds given
    /// `intent_embedding`.
    async fn predict_success(&self, intent_embedding: &Embedding, executed_path: &[String]) -> f64;

    /// Number of nodes currently in the predictor graph. Zero nodes signals
    /// a cold start.
    fn node_count(&self) -> usize;
}

/// Opaque text-to-vector embedding provider.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Embedding>;

    /// Dimension of vectors returned by [`EmbeddingProvider::embed`].
    fn dimension(&self) -> usize;
}

/// A predictor with no nodes, used to exercise the cold-start path without
/// wiring up the real planner.
#[derive(Debug, Default, Clone, Copy)]
pub struct ColdPredictor;

#[async_trait]
impl Predictor for ColdPredictor {
    async fn predict_success(&self, _intent_embedding: &Embedding, _executed_path: &[String]) -> f64 {
        0.5
    }

    fn node_count(&self) -> usize {
        0
    }
}
