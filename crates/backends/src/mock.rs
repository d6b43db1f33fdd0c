//! Deterministic in-memory `TaskExecutor` used in tests and the CLI's
//! `--dry-run` mode: echoes `arguments` back as `output` after an optional
//! configured delay, with no real side effects.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use taskgraph_common::{JsonValue, Result, TaskId, TaskResult};
use taskgraph_core::TaskExecutor;

/// Echoes `arguments` as `output`, after sleeping `delay_ms` if configured.
/// Tools that start with `fail:` always return an error, which is handy for
/// exercising `safeToFail`/abort behavior in tests.
pub struct MockExecutor {
    delay_ms: u64,
    invocations: AtomicUsize,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self {
            delay_ms: 0,
            invocations: AtomicUsize::new(0),
        }
    }

    pub fn with_delay_ms(delay_ms: u64) -> Self {
        Self {
            delay_ms,
            invocations: AtomicUsize::new(0),
        }
    }

    pub fn invocation_count(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }
}

impl Default for MockExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskExecutor for MockExecutor {
    async fn run(
        &self,
        tool: &str,
        arguments: &JsonValue,
        _deps: &HashMap<TaskId, TaskResult>,
    ) -> Result<JsonValue> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        if self.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
        }
        if tool.starts_with("fail:") {
            return Err(taskgraph_common::Error::TaskFailed(format!(
                "mock executor configured to fail tool {tool}"
            )));
        }
        Ok(arguments.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn echoes_arguments() {
        let executor = MockExecutor::new();
        let out = executor
            .run("code:noop", &json!({"a": 1}), &HashMap::new())
            .await
            .unwrap();
        assert_eq!(out, json!({"a": 1}));
        assert_eq!(executor.invocation_count(), 1);
    }

    #[tokio::test]
    async fn fail_prefixed_tools_error() {
        let executor = MockExecutor::new();
        let err = executor
            .run("fail:boom", &json!({}), &HashMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, taskgraph_common::Error::TaskFailed(_)));
    }
}
