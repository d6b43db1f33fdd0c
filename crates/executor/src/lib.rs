#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! Layered DAG executor: topological layering, dependency resolution, the
//! in-memory result store and execution cache, the parallel executor itself,
//! and the event stream it drives.

pub mod admission;
pub mod cache;
pub mod cancel;
pub mod events;
pub mod executor;
pub mod layerer;
pub mod resolver;
pub mod result_store;

pub use cache::{cache_key, CacheStats, ExecutionCache};
pub use cancel::CancelHandle;
pub use events::{Event, EventSink, WorkflowEndStatus};
pub use executor::ParallelDagExecutor;
pub use layerer::layer;
pub use result_store::ResultStore;
