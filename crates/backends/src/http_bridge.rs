//! Generic HTTP tool-bridge `TaskExecutor`: dispatches `tool` to a
//! downstream tool server over JSON-RPC-shaped HTTP, the way the teacher's
//! per-provider agent clients each wrapped a `reqwest::Client` around a
//! single submit call.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use taskgraph_common::{Error, JsonValue, Result, TaskId, TaskResult};
use taskgraph_core::TaskExecutor;
use tracing::instrument;

#[derive(Serialize)]
struct ToolRequest<'a> {
    tool: &'a str,
    arguments: &'a JsonValue,
    dependencies: &'a HashMap<TaskId, TaskResult>,
}

/// Calls `POST {base_url}/invoke` on a downstream tool server and expects a
/// bare JSON value back as the task's output. The tool server is an
/// external collaborator (spec.md §1); this struct is the one seam the core
/// owns into it.
pub struct HttpBridgeExecutor {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBridgeExecutor {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| Error::Internal(format!("failed to build http client: {err}")))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl TaskExecutor for HttpBridgeExecutor {
    #[instrument(skip(self, arguments, deps))]
    async fn run(
        &self,
        tool: &str,
        arguments: &JsonValue,
        deps: &HashMap<TaskId, TaskResult>,
    ) -> Result<JsonValue> {
        let response = self
            .client
            .post(format!("{}/invoke", self.base_url))
            .json(&ToolRequest {
                tool,
                arguments,
                dependencies: deps,
            })
            .send()
            .await
            .map_err(|err| Error::TaskFailed(format!("tool server request failed: {err}")))?;

        if !response.status().is_success() {
            return Err(Error::TaskFailed(format!(
                "tool server returned status {}",
                response.status()
            )));
        }

        response
            .json::<JsonValue>()
            .await
            .map_err(|err| Error::TaskFailed(format!("invalid tool server response: {err}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn posts_tool_and_arguments_and_returns_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/invoke"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .mount(&server)
            .await;

        let executor = HttpBridgeExecutor::new(server.uri());
        let out = executor
            .run("http:fetch", &json!({"url": "https://example.com"}), &HashMap::new())
            .await
            .unwrap();
        assert_eq!(out, json!({"ok": true}));
    }

    #[tokio::test]
    async fn non_2xx_status_is_a_task_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/invoke"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let executor = HttpBridgeExecutor::new(server.uri());
        let err = executor
            .run("http:fetch", &json!({}), &HashMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::TaskFailed(_)));
    }
}
