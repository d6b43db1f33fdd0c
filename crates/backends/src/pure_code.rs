//! `TaskExecutor` for the `code:` namespace. Admission already rejects any
//! `pure = true` task whose body references a side-effecting identifier
//! (taskgraph-executor's admission pass); this executor only ever needs to
//! evaluate small, genuinely side-effect-free JSON transforms.

use async_trait::async_trait;
use serde_json::Number;
use std::collections::HashMap;
use taskgraph_common::{Error, JsonValue, Result, TaskId, TaskResult};
use taskgraph_core::TaskExecutor;

/// Evaluates `code:<op>` tools over opaque JSON arguments. Unknown
/// operations are a task error, not a panic — the executor never aborts a
/// workflow on behalf of one bad task.
pub struct PureCodeExecutor;

impl PureCodeExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PureCodeExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskExecutor for PureCodeExecutor {
    async fn run(
        &self,
        tool: &str,
        arguments: &JsonValue,
        _deps: &HashMap<TaskId, TaskResult>,
    ) -> Result<JsonValue> {
        let op = tool
            .strip_prefix("code:")
            .ok_or_else(|| Error::TaskFailed(format!("not a code: tool: {tool}")))?;

        match op {
            "identity" => Ok(arguments.clone()),
            "sum" => sum(arguments),
            "concat" => concat(arguments),
            other => Err(Error::TaskFailed(format!("unknown code operation: {other}"))),
        }
    }
}

fn sum(arguments: &JsonValue) -> Result<JsonValue> {
    let values = arguments
        .get("values")
        .and_then(JsonValue::as_array)
        .ok_or_else(|| Error::TaskFailed("code:sum requires an array field `values`".into()))?;

    let mut total = 0.0;
    for value in values {
        total += value
            .as_f64()
            .ok_or_else(|| Error::TaskFailed("code:sum values must be numbers".into()))?;
    }
    Ok(JsonValue::Number(
        Number::from_f64(total).unwrap_or_else(|| Number::from(0)),
    ))
}

fn concat(arguments: &JsonValue) -> Result<JsonValue> {
    let values = arguments
        .get("values")
        .and_then(JsonValue::as_array)
        .ok_or_else(|| Error::TaskFailed("code:concat requires an array field `values`".into()))?;

    let mut joined = String::new();
    for value in values {
        let piece = value
            .as_str()
            .ok_or_else(|| Error::TaskFailed("code:concat values must be strings".into()))?;
        joined.push_str(piece);
    }
    Ok(JsonValue::String(joined))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn sum_adds_numbers() {
        let executor = PureCodeExecutor::new();
        let out = executor
            .run("code:sum", &json!({"values": [1, 2, 3]}), &HashMap::new())
            .await
            .unwrap();
        assert_eq!(out, json!(6.0));
    }

    #[tokio::test]
    async fn concat_joins_strings() {
        let executor = PureCodeExecutor::new();
        let out = executor
            .run("code:concat", &json!({"values": ["a", "b"]}), &HashMap::new())
            .await
            .unwrap();
        assert_eq!(out, json!("ab"));
    }

    #[tokio::test]
    async fn unknown_operation_errors() {
        let executor = PureCodeExecutor::new();
        let err = executor
            .run("code:frobnicate", &json!({}), &HashMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::TaskFailed(_)));
    }

    #[tokio::test]
    async fn non_code_tool_errors() {
        let executor = PureCodeExecutor::new();
        let err = executor
            .run("http:get", &json!({}), &HashMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::TaskFailed(_)));
    }
}
