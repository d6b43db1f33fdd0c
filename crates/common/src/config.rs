//! Configuration loading for the taskgraph workspace.

use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration, deserialized from `config.toml` layered with
/// `TASKGRAPH__`-prefixed environment variables.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub executor: ExecutorConfig,
    pub cache: CacheConfig,
    pub checkpoint: CheckpointConfig,
    pub threshold: ThresholdConfig,
    pub observability: ObservabilityConfig,
}

/// Host/port the owning gateway binds to. The HTTP surface itself is out of
/// scope for this core, but the config stanza stays so the gateway can share
/// one configuration file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_ms: u64,
}

/// Parallel DAG executor configuration (C5).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExecutorConfig {
    pub default_task_timeout_ms: u64,
    pub dag_max_depth: usize,
}

/// Execution cache configuration (C6).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    pub enabled: bool,
    pub max_entries: usize,
    pub ttl_seconds: u64,
    pub persistence: bool,
}

/// Checkpoint manager configuration (C7).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CheckpointConfig {
    pub enabled: bool,
    pub ttl_seconds: u64,
}

/// Adaptive threshold manager configuration (C11).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ThresholdConfig {
    pub initial_explicit_threshold: f64,
    pub initial_suggestion_threshold: f64,
    pub min_threshold: f64,
    pub max_threshold: f64,
    pub window_size: usize,
}

/// Logging/tracing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,
    pub metrics_port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
    Compact,
}

impl Config {
    /// Load configuration from `config.toml` (if present) and the
    /// environment, falling back to the defaults below.
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("server.request_timeout_ms", 30000)?
            .set_default("executor.default_task_timeout_ms", 60000)?
            .set_default("executor.dag_max_depth", 64)?
            .set_default("cache.enabled", true)?
            .set_default("cache.max_entries", 1000)?
            .set_default("cache.ttl_seconds", 300)?
            .set_default("cache.persistence", false)?
            .set_default("checkpoint.enabled", true)?
            .set_default("checkpoint.ttl_seconds", 3600)?
            .set_default("threshold.initial_explicit_threshold", 0.8)?
            .set_default("threshold.initial_suggestion_threshold", 0.7)?
            .set_default("threshold.min_threshold", 0.3)?
            .set_default("threshold.max_threshold", 0.95)?
            .set_default("threshold.window_size", 50)?
            .set_default("observability.metrics_enabled", true)?
            .set_default("observability.metrics_port", 9090)?
            .set_default("observability.log_level", "info")?
            .set_default("observability.log_format", "pretty")?;

        if Path::new("config.toml").exists() {
            builder = builder.add_source(File::with_name("config"));
        }

        builder = builder.add_source(
            Environment::with_prefix("TASKGRAPH")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }

    /// Accumulates every configuration problem instead of failing on the first.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.threshold.min_threshold > self.threshold.max_threshold {
            errors.push("threshold.min_threshold must be <= threshold.max_threshold".to_string());
        }
        for (name, value) in [
            ("threshold.initial_explicit_threshold", self.threshold.initial_explicit_threshold),
            ("threshold.initial_suggestion_threshold", self.threshold.initial_suggestion_threshold),
        ] {
            if !(self.threshold.min_threshold..=self.threshold.max_threshold).contains(&value) {
                errors.push(format!("{name} must lie within [min_threshold, max_threshold]"));
            }
        }
        if self.cache.max_entries == 0 {
            errors.push("cache.max_entries must be greater than 0".to_string());
        }
        if self.server.port == 0 {
            errors.push("server.port must be greater than 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                request_timeout_ms: 30_000,
            },
            executor: ExecutorConfig {
                default_task_timeout_ms: 60_000,
                dag_max_depth: 64,
            },
            cache: CacheConfig {
                enabled: true,
                max_entries: 1000,
                ttl_seconds: 300,
                persistence: false,
            },
            checkpoint: CheckpointConfig {
                enabled: true,
                ttl_seconds: 3600,
            },
            threshold: ThresholdConfig {
                initial_explicit_threshold: 0.8,
                initial_suggestion_threshold: 0.7,
                min_threshold: 0.3,
                max_threshold: 0.95,
                window_size: 50,
            },
            observability: ObservabilityConfig {
                metrics_enabled: true,
                metrics_port: 9090,
                log_level: "info".to_string(),
                log_format: LogFormat::Pretty,
            },
        }
    }
}
