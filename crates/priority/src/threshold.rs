//! Adaptive Threshold Manager (C11): a sliding window of execution records
//! whose false-positive/false-negative rates tune the speculative-execution
//! confidence cutoffs used by the upstream planner.

use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::collections::VecDeque;
use taskgraph_common::{AdaptiveThresholds, ExecutionMode};

/// Minimum number of observations before any adjustment is considered.
const MIN_OBSERVATIONS: usize = 20;
/// False-positive / false-negative rate that triggers an adjustment.
const TRIGGER_RATE: f64 = 0.20;
/// Fixed step applied to `suggestion_threshold` on each adjustment.
const STEP: f64 = 0.02;

/// One observed execution, fed into the sliding window after it completes.
#[derive(Debug, Clone)]
pub struct ExecutionRecord {
    pub confidence: f64,
    pub mode: ExecutionMode,
    pub success: bool,
    pub user_accepted: Option<bool>,
    pub execution_time_ms: u64,
}

/// Metrics exposed alongside the tuned thresholds (spec.md §4.8).
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct ThresholdMetrics {
    pub speculative_attempts: u64,
    pub speculative_successes: u64,
    pub speculative_failures: u64,
    pub average_execution_time_ms: f64,
    pub average_confidence: f64,
    pub saved_latency_ms: u64,
    pub wasted_compute_ms: u64,
}

struct Inner {
    window: VecDeque<ExecutionRecord>,
    window_size: usize,
    thresholds: AdaptiveThresholds,
}

pub struct AdaptiveThresholdManager {
    inner: Mutex<Inner>,
}

impl AdaptiveThresholdManager {
    pub fn new(thresholds: AdaptiveThresholds, window_size: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                window: VecDeque::with_capacity(window_size),
                window_size,
                thresholds,
            }),
        }
    }

    pub fn thresholds(&self) -> AdaptiveThresholds {
        self.inner.lock().thresholds
    }

    /// Records one execution and re-tunes `suggestion_threshold` if the
    /// window has reached the minimum observation count. FP adjustment is
    /// applied before FN, per spec.md §4.8.
    pub fn record(&self, record: ExecutionRecord) {
        let mut inner = self.inner.lock();
        if inner.window.len() == inner.window_size {
            inner.window.pop_front();
        }
        inner.window.push_back(record);

        if inner.window.len() < MIN_OBSERVATIONS {
            return;
        }

        let window_len = inner.window.len() as f64;

        let speculative_failures = inner
            .window
            .iter()
            .filter(|r| r.mode == ExecutionMode::Speculative && !r.success)
            .count() as f64;
        let false_positive_rate = speculative_failures / window_len;
        if false_positive_rate > TRIGGER_RATE {
            let max = inner.thresholds.max_threshold;
            inner.thresholds.suggestion_threshold =
                (inner.thresholds.suggestion_threshold + STEP).min(max);
        }

        let suggestion_threshold = inner.thresholds.suggestion_threshold;
        let false_negatives = inner
            .window
            .iter()
            .filter(|r| {
                r.mode == ExecutionMode::Suggestion
                    && r.success
                    && r.user_accepted == Some(true)
                    && r.confidence < suggestion_threshold
            })
            .count() as f64;
        let false_negative_rate = false_negatives / window_len;
        if false_negative_rate > TRIGGER_RATE {
            let min = inner.thresholds.min_threshold;
            inner.thresholds.suggestion_threshold =
                (inner.thresholds.suggestion_threshold - STEP).max(min);
        }
    }

    /// Aggregate metrics over the speculative records currently in the window.
    pub fn metrics(&self) -> ThresholdMetrics {
        let inner = self.inner.lock();
        let speculative: Vec<&ExecutionRecord> = inner
            .window
            .iter()
            .filter(|r| r.mode == ExecutionMode::Speculative)
            .collect();

        if speculative.is_empty() {
            return ThresholdMetrics::default();
        }

        let successes = speculative.iter().filter(|r| r.success).count() as u64;
        let failures = speculative.len() as u64 - successes;
        let total_time: u64 = speculative.iter().map(|r| r.execution_time_ms).sum();
        let total_confidence: f64 = speculative.iter().map(|r| r.confidence).sum();
        let saved_latency_ms = speculative
            .iter()
            .filter(|r| r.success)
            .map(|r| r.execution_time_ms)
            .sum();
        let wasted_compute_ms = speculative
            .iter()
            .filter(|r| !r.success)
            .map(|r| r.execution_time_ms)
            .sum();

        ThresholdMetrics {
            speculative_attempts: speculative.len() as u64,
            speculative_successes: successes,
            speculative_failures: failures,
            average_execution_time_ms: total_time as f64 / speculative.len() as f64,
            average_confidence: total_confidence / speculative.len() as f64,
            saved_latency_ms,
            wasted_compute_ms,
        }
    }
}

/// Stable digest of `{workflow_type, domain, complexity}`, used to shard
/// thresholds per context. Equal inputs hash equal; distinct inputs hash
/// distinct (collision-free for the practically finite context domain).
pub fn context_hash(workflow_type: &str, domain: &str, complexity: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(workflow_type.as_bytes());
    hasher.update(b"\0");
    hasher.update(domain.as_bytes());
    hasher.update(b"\0");
    hasher.update(complexity.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thresholds() -> AdaptiveThresholds {
        AdaptiveThresholds {
            explicit_threshold: 0.8,
            suggestion_threshold: 0.70,
            min_threshold: 0.3,
            max_threshold: 0.95,
        }
    }

    fn speculative(success: bool) -> ExecutionRecord {
        ExecutionRecord {
            confidence: 0.75,
            mode: ExecutionMode::Speculative,
            success,
            user_accepted: None,
            execution_time_ms: 100,
        }
    }

    #[test]
    fn threshold_frozen_below_twenty_observations() {
        let manager = AdaptiveThresholdManager::new(thresholds(), 30);
        for _ in 0..15 {
            manager.record(speculative(false));
        }
        assert_eq!(manager.thresholds().suggestion_threshold, 0.70);
    }

    #[test]
    fn high_false_positive_rate_raises_suggestion_threshold() {
        let manager = AdaptiveThresholdManager::new(thresholds(), 30);
        for _ in 0..20 {
            manager.record(speculative(false));
        }
        let result = manager.thresholds();
        assert!(result.suggestion_threshold > 0.70);
        assert!(result.suggestion_threshold <= result.max_threshold);
    }

    #[test]
    fn threshold_never_leaves_min_max_bounds() {
        let manager = AdaptiveThresholdManager::new(thresholds(), 20);
        for _ in 0..500 {
            manager.record(speculative(false));
            let t = manager.thresholds();
            assert!(t.suggestion_threshold >= t.min_threshold);
            assert!(t.suggestion_threshold <= t.max_threshold);
        }
    }

    #[test]
    fn high_false_negative_rate_lowers_suggestion_threshold() {
        let manager = AdaptiveThresholdManager::new(thresholds(), 20);
        let accepted_below_threshold = ExecutionRecord {
            confidence: 0.5,
            mode: ExecutionMode::Suggestion,
            success: true,
            user_accepted: Some(true),
            execution_time_ms: 50,
        };
        for _ in 0..20 {
            manager.record(accepted_below_threshold.clone());
        }
        assert!(manager.thresholds().suggestion_threshold < 0.70);
    }

    #[test]
    fn metrics_aggregate_speculative_records_only() {
        let manager = AdaptiveThresholdManager::new(thresholds(), 30);
        manager.record(speculative(true));
        manager.record(speculative(false));
        let metrics = manager.metrics();
        assert_eq!(metrics.speculative_attempts, 2);
        assert_eq!(metrics.speculative_successes, 1);
        assert_eq!(metrics.speculative_failures, 1);
        assert_eq!(metrics.saved_latency_ms, 100);
        assert_eq!(metrics.wasted_compute_ms, 100);
    }

    #[test]
    fn context_hash_is_stable_and_collision_free_for_distinct_inputs() {
        let a = context_hash("refactor", "backend", "high");
        let b = context_hash("refactor", "backend", "high");
        let c = context_hash("refactor", "backend", "low");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
