//! Tracing/logging setup.

use crate::config::{LogFormat, ObservabilityConfig};
use crate::error::Result;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Initializes the global `tracing` subscriber from observability config.
/// Call once at process start, before any `#[instrument]`'d call runs.
pub fn init_telemetry(config: &ObservabilityConfig) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let registry = Registry::default().with(env_filter);

    match config.log_format {
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(fmt::layer().pretty()).init(),
        LogFormat::Compact => registry.with(fmt::layer().compact()).init(),
    }

    Ok(())
}

/// Span builder for the attributes every executor span shares.
pub struct SpanBuilder {
    name: &'static str,
    workflow_id: Option<String>,
    task_id: Option<String>,
}

impl SpanBuilder {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            workflow_id: None,
            task_id: None,
        }
    }

    pub fn with_workflow_id(mut self, workflow_id: impl Into<String>) -> Self {
        self.workflow_id = Some(workflow_id.into());
        self
    }

    pub fn with_task_id(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    pub fn build(self) -> tracing::Span {
        tracing::info_span!(
            "taskgraph",
            name = self.name,
            workflow_id = self.workflow_id.as_deref().unwrap_or(""),
            task_id = self.task_id.as_deref().unwrap_or("")
        )
    }
}
