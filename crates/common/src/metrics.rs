//! Metrics collection and reporting for the DAG executor.

use crate::error::Result;
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_gauge_vec, register_histogram_vec, CounterVec, GaugeVec,
    HistogramVec, Registry,
};

/// Global metrics registry.
pub static METRICS_REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

/// Tasks completed, labelled by terminal status.
pub static TASKS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "taskgraph_tasks_total",
        "Total number of tasks executed",
        &["status", "tool"]
    )
    .unwrap()
});

/// Layer wall-clock duration.
pub static LAYER_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "taskgraph_layer_duration_seconds",
        "Layer execution duration in seconds",
        &["layer_index"],
        vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0]
    )
    .unwrap()
});

/// Execution cache hit/miss counters.
pub static CACHE_EVENTS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "taskgraph_cache_events_total",
        "Execution cache hits and misses",
        &["outcome"]
    )
    .unwrap()
});

/// Checkpoints written.
pub static CHECKPOINTS_WRITTEN: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "taskgraph_checkpoints_written_total",
        "Checkpoints persisted by the controlled executor",
        &["workflow_id"]
    )
    .unwrap()
});

/// Current adaptive threshold values.
pub static ADAPTIVE_THRESHOLD: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "taskgraph_adaptive_threshold",
        "Current adaptive threshold value",
        &["kind"]
    )
    .unwrap()
});

/// Error counter by severity.
pub static ERROR_COUNTER: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "taskgraph_errors_total",
        "Total number of errors",
        &["severity"]
    )
    .unwrap()
});

/// Registers every metric above with [`METRICS_REGISTRY`]. Call once at
/// process start.
pub fn init_metrics() -> Result<()> {
    METRICS_REGISTRY.register(Box::new(TASKS_TOTAL.clone()))?;
    METRICS_REGISTRY.register(Box::new(LAYER_DURATION.clone()))?;
    METRICS_REGISTRY.register(Box::new(CACHE_EVENTS.clone()))?;
    METRICS_REGISTRY.register(Box::new(CHECKPOINTS_WRITTEN.clone()))?;
    METRICS_REGISTRY.register(Box::new(ADAPTIVE_THRESHOLD.clone()))?;
    METRICS_REGISTRY.register(Box::new(ERROR_COUNTER.clone()))?;
    Ok(())
}

/// Narrow seam so tests can swap in a no-op collector instead of touching the
/// global registry.
pub trait MetricsCollector: Send + Sync {
    fn record_task(&self, status: &str, tool: &str);
    fn record_layer_duration(&self, layer_index: usize, duration_secs: f64);
    fn record_cache_event(&self, outcome: &str);
    fn record_checkpoint(&self, workflow_id: &str);
    fn set_threshold(&self, kind: &str, value: f64);
    fn record_error(&self, severity: &str);
}

#[derive(Clone, Default)]
pub struct DefaultMetricsCollector;

impl MetricsCollector for DefaultMetricsCollector {
    fn record_task(&self, status: &str, tool: &str) {
        TASKS_TOTAL.with_label_values(&[status, tool]).inc();
    }

    fn record_layer_duration(&self, layer_index: usize, duration_secs: f64) {
        LAYER_DURATION
            .with_label_values(&[&layer_index.to_string()])
            .observe(duration_secs);
    }

    fn record_cache_event(&self, outcome: &str) {
        CACHE_EVENTS.with_label_values(&[outcome]).inc();
    }

    fn record_checkpoint(&self, workflow_id: &str) {
        CHECKPOINTS_WRITTEN.with_label_values(&[workflow_id]).inc();
    }

    fn set_threshold(&self, kind: &str, value: f64) {
        ADAPTIVE_THRESHOLD.with_label_values(&[kind]).set(value);
    }

    fn record_error(&self, severity: &str) {
        ERROR_COUNTER.with_label_values(&[severity]).inc();
    }
}

/// Collector that discards every observation; used in unit tests.
#[derive(Clone, Default)]
pub struct NullMetricsCollector;

impl MetricsCollector for NullMetricsCollector {
    fn record_task(&self, _status: &str, _tool: &str) {}
    fn record_layer_duration(&self, _layer_index: usize, _duration_secs: f64) {}
    fn record_cache_event(&self, _outcome: &str) {}
    fn record_checkpoint(&self, _workflow_id: &str) {}
    fn set_threshold(&self, _kind: &str, _value: f64) {}
    fn record_error(&self, _severity: &str) {}
}
