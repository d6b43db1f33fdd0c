//! Dependency Resolver (C2): pure, synchronous mapping from a task's
//! `dependsOn` list to the Result Store entries it names.

use std::collections::HashMap;
use taskgraph_common::{Error, Result, TaskId, TaskResult, TaskStatus};

use crate::result_store::ResultStore;

/// Resolves `depends_on` against `store`. Never mutates the store.
///
/// Duplicate ids in `depends_on` are preserved as-is per spec: both entries
/// resolve to the same `TaskResult`, no deduplication.
pub fn resolve(
    depends_on: &[TaskId],
    store: &ResultStore,
) -> Result<HashMap<TaskId, TaskResult>> {
    let mut deps = HashMap::with_capacity(depends_on.len());
    for id in depends_on {
        let result = store
            .get(id)
            .ok_or_else(|| Error::MissingDependency(id.clone()))?;
        match result.status {
            TaskStatus::Error => {
                return Err(Error::UpstreamFailed {
                    id: id.clone(),
                    error: result.error.clone().unwrap_or_default(),
                })
            }
            TaskStatus::Success | TaskStatus::FailedSafe => {
                deps.insert(id.clone(), result);
            }
        }
    }
    Ok(deps)
}
