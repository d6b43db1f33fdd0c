#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! Trait contracts for every external collaborator named in §6 of the
//! specification. Concrete implementations live in the sibling crates
//! (`taskgraph-executor`, `taskgraph-checkpoint`, `taskgraph-priority`,
//! `taskgraph-backends`); this crate only defines the seams.

pub mod checkpoint_store;
pub mod predictor;
pub mod task_executor;
pub mod trace_store;

pub use checkpoint_store::CheckpointStore;
pub use predictor::{ColdPredictor, EmbeddingProvider, Predictor};
pub use task_executor::{NoopExecutor, TaskExecutor};
pub use trace_store::TraceStore;
