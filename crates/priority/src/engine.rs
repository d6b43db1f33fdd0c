//! TD Priority Engine (C9): turns a finished workflow execution into a
//! `Trace` whose replay priority is the absolute temporal-difference error
//! between the predictor's success estimate and the observed outcome.

use std::sync::Arc;
use taskgraph_common::Trace;
use taskgraph_core::{EmbeddingProvider, Predictor};
use tracing::instrument;
use uuid::Uuid;

/// Priority is floored here so a trace is never permanently unreplayable
/// even when the predictor was exactly right.
const MIN_PRIORITY: f64 = 0.01;
const MAX_PRIORITY: f64 = 1.0;

pub struct TdPriorityEngine {
    predictor: Arc<dyn Predictor>,
    embeddings: Arc<dyn EmbeddingProvider>,
}

impl TdPriorityEngine {
    pub fn new(predictor: Arc<dyn Predictor>, embeddings: Arc<dyn EmbeddingProvider>) -> Self {
        Self { predictor, embeddings }
    }

    /// Computes a `Trace` for one finished workflow. `executed_path` is the
    /// sequence of tool ids invoked, in execution order.
    #[instrument(skip(self, intent_text, executed_path, error_message))]
    pub async fn record(
        &self,
        intent_text: &str,
        executed_path: Vec<String>,
        success: bool,
        error_message: Option<String>,
        duration_ms: u64,
    ) -> Trace {
        let actual = if success { 1.0 } else { 0.0 };

        let (predicted, is_cold_start) = if self.predictor.node_count() == 0 {
            (0.5, true)
        } else {
            let embedding = match self.embeddings.embed(intent_text).await {
                Ok(e) => e,
                Err(_) => Vec::new(),
            };
            let predicted = self
                .predictor
                .predict_success(&embedding, &executed_path)
                .await;
            (predicted, false)
        };

        let priority = if is_cold_start {
            0.5
        } else {
            (actual - predicted).abs().clamp(MIN_PRIORITY, MAX_PRIORITY)
        };

        Trace {
            id: Uuid::new_v4().to_string(),
            intent_text: intent_text.to_string(),
            executed_path,
            success,
            error_message,
            duration_ms,
            priority,
            predicted,
            actual,
            is_cold_start,
            executed_at: chrono::Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use taskgraph_common::Embedding;

    struct FixedPredictor {
        nodes: usize,
        predicted: f64,
    }

    #[async_trait]
    impl Predictor for FixedPredictor {
        async fn predict_success(&self, _embedding: &Embedding, _path: &[String]) -> f64 {
            self.predicted
        }

        fn node_count(&self) -> usize {
            self.nodes
        }
    }

    fn engine(nodes: usize, predicted: f64) -> TdPriorityEngine {
        TdPriorityEngine::new(
            Arc::new(FixedPredictor { nodes, predicted }),
            Arc::new(crate::embedding::HashEmbeddingProvider::new()),
        )
    }

    #[tokio::test]
    async fn cold_start_when_predictor_has_no_nodes() {
        let engine = engine(0, 0.9);
        let trace = engine
            .record("do the thing", vec!["code:run".into()], true, None, 10)
            .await;
        assert!(trace.is_cold_start);
        assert_eq!(trace.predicted, 0.5);
        assert_eq!(trace.priority, 0.5);
    }

    #[tokio::test]
    async fn priority_is_the_clamped_absolute_td_error() {
        let engine = engine(5, 0.2);
        let trace = engine
            .record("do the thing", vec!["code:run".into()], true, None, 10)
            .await;
        assert!(!trace.is_cold_start);
        assert_eq!(trace.actual, 1.0);
        assert!((trace.priority - 0.8).abs() < 1e-9);
    }

    #[tokio::test]
    async fn priority_never_drops_below_the_floor() {
        let engine = engine(5, 1.0);
        let trace = engine
            .record("do the thing", vec!["code:run".into()], true, None, 10)
            .await;
        assert_eq!(trace.priority, MIN_PRIORITY);
    }

    #[tokio::test]
    async fn failure_sets_actual_to_zero() {
        let engine = engine(5, 0.1);
        let trace = engine
            .record("do the thing", vec![], false, Some("boom".into()), 10)
            .await;
        assert_eq!(trace.actual, 0.0);
        assert!((trace.priority - 0.1).abs() < 1e-9);
    }
}
