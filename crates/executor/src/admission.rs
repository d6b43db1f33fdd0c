//! Static admission checks that run before any task is scheduled.

use taskgraph_common::{Dag, Error, Result};

/// Identifiers forbidden in the body of a task declared `pure = true`.
/// `import(` stands in for the dynamic-import form; a static `import` at the
/// top of a module is not scanned for (the core never sees module text).
const FORBIDDEN: &[&str] = &["fetch", "Deno", "eval", "Function(", "setTimeout", "import("];

/// Validates every `pure` task in `dag` whose tool lives in the `code:`
/// namespace: its body must not contain a side-effecting identifier.
pub fn validate_purity(dag: &Dag) -> Result<()> {
    for task in &dag.tasks {
        if task.metadata.pure && task.namespace() == "code" {
            let body = task.metadata.body.as_deref().unwrap_or("");
            if let Some(hit) = FORBIDDEN.iter().find(|needle| body.contains(*needle)) {
                return Err(Error::ImpureTask(format!("{} (found `{hit}`)", task.id)));
            }
        }
    }
    Ok(())
}
