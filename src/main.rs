//! taskgraph entry point: loads configuration, initializes telemetry, and
//! hands off to the CLI for actual workflow execution.

use anyhow::Result;
use taskgraph_common::{telemetry, Config};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().unwrap_or_else(|_| Config::default());

    if let Err(errors) = config.validate() {
        for error in errors {
            eprintln!("config error: {error}");
        }
        std::process::exit(1);
    }

    telemetry::init_telemetry(&config.observability)?;
    info!("taskgraph v{} starting", env!("CARGO_PKG_VERSION"));
    info!("run `taskgraph-cli run <dag.json>` to execute a workflow");

    Ok(())
}
