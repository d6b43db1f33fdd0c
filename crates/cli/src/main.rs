//! taskgraph CLI: run a DAG from a JSON file, resume a workflow from a
//! checkpoint, or inspect the trace-store replay queue.

use clap::{Parser, Subcommand};
use futures::StreamExt;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use taskgraph_backends::MockExecutor;
use taskgraph_checkpoint::{CheckpointManager, ControlledExecutor, FileCheckpointStore};
use taskgraph_common::{Config, Dag};
use taskgraph_core::{ColdPredictor, TraceStore};
use taskgraph_executor::{Event, ExecutionCache, ParallelDagExecutor};
use taskgraph_priority::{HashEmbeddingProvider, InMemoryTraceStore, TdPriorityEngine};

#[derive(Parser)]
#[command(name = "taskgraph-cli", version, about = "Parallel DAG execution core")]
struct Cli {
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory checkpoints are written to and read from. `run` and
    /// `resume` must be pointed at the same directory for a checkpoint id
    /// printed by one invocation to be resumable by another.
    #[arg(long, value_name = "DIR", default_value = ".taskgraph/checkpoints")]
    checkpoint_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a DAG from a JSON file to completion, printing the event stream.
    Run {
        /// Path to a JSON-encoded `Dag`.
        dag: PathBuf,
        /// Workflow id to checkpoint under.
        #[arg(long, default_value = "cli-workflow")]
        workflow_id: String,
    },
    /// Resume a previously checkpointed workflow.
    Resume {
        dag: PathBuf,
        checkpoint_id: String,
    },
    /// Record a trace from the priority engine (cold-start demo) and show
    /// the resulting replay queue ordering.
    Traces {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().unwrap_or_else(|_| Config::default());
    taskgraph_common::telemetry::init_telemetry(&config.observability)?;

    let cli = Cli::parse();
    let checkpoint_dir = cli.checkpoint_dir.clone();
    match cli.command {
        Commands::Run { dag, workflow_id } => run(&config, &checkpoint_dir, dag, workflow_id).await,
        Commands::Resume { dag, checkpoint_id } => {
            resume(&config, &checkpoint_dir, dag, checkpoint_id).await
        }
        Commands::Traces { limit } => traces(limit).await,
    }
}

fn load_dag(path: &PathBuf) -> anyhow::Result<Dag> {
    let bytes = std::fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn controlled_executor(config: &Config, checkpoint_dir: &PathBuf) -> anyhow::Result<Arc<ControlledExecutor>> {
    let cache = Arc::new(ExecutionCache::new(
        config.cache.enabled,
        config.cache.max_entries,
        config.cache.ttl_seconds,
    ));
    let executor = Arc::new(
        ParallelDagExecutor::new(Arc::new(MockExecutor::new())).with_cache(cache, HashMap::new()),
    );
    let manager = Arc::new(CheckpointManager::new(Arc::new(FileCheckpointStore::new(
        checkpoint_dir,
    )?)));
    Ok(Arc::new(ControlledExecutor::new(executor, manager)))
}

async fn drain_and_report(mut stream: impl futures::Stream<Item = Event> + Unpin) {
    while let Some(event) = stream.next().await {
        match &event {
            Event::LayerStart { layer_index, tasks } => {
                println!("layer {layer_index} start: {tasks:?}");
            }
            Event::TaskComplete { task_id, status } => {
                println!("  task {task_id} -> {status:?}");
            }
            Event::LayerEnd { layer_index } => {
                println!("layer {layer_index} end");
            }
            Event::Checkpoint {
                checkpoint_id,
                layer_index,
            } => {
                println!("checkpoint {checkpoint_id} after layer {layer_index}");
            }
            Event::WorkflowEnd { status, report } => {
                println!(
                    "workflow end: {status:?} ({} ok, {} failed, speedup {:.2}x)",
                    report.successful_tasks, report.failed_tasks, report.speedup
                );
            }
        }
    }
}

async fn run(config: &Config, checkpoint_dir: &PathBuf, dag_path: PathBuf, workflow_id: String) -> anyhow::Result<()> {
    let dag = load_dag(&dag_path)?;
    let controlled = controlled_executor(config, checkpoint_dir)?;
    let (stream, _cancel) = controlled.execute_stream(dag, workflow_id);
    drain_and_report(stream).await;
    Ok(())
}

async fn resume(
    config: &Config,
    checkpoint_dir: &PathBuf,
    dag_path: PathBuf,
    checkpoint_id: String,
) -> anyhow::Result<()> {
    let dag = load_dag(&dag_path)?;
    let controlled = controlled_executor(config, checkpoint_dir)?;
    let (stream, _cancel) = controlled
        .resume_from_checkpoint(dag, &checkpoint_id)
        .await?;
    drain_and_report(stream).await;
    Ok(())
}

async fn traces(limit: usize) -> anyhow::Result<()> {
    let store = InMemoryTraceStore::new();
    let engine = TdPriorityEngine::new(
        Arc::new(ColdPredictor),
        Arc::new(HashEmbeddingProvider::new()),
    );

    let trace = engine
        .record("demo intent", vec!["code:sum".to_string()], true, None, 42)
        .await;
    store.insert_trace(trace).await?;

    for trace in store.get_high_priority_traces(limit).await? {
        println!(
            "{} priority={:.3} success={} cold_start={}",
            trace.id, trace.priority, trace.success, trace.is_cold_start
        );
    }
    Ok(())
}
