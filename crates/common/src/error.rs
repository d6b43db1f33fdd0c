//! Error taxonomy for the taskgraph execution core

use thiserror::Error;

/// Main error type for the executor, checkpoint manager and priority engine
#[derive(Error, Debug)]
pub enum Error {
    // --- Admission errors (fatal, raised before any event is emitted) ---
    /// A pass over the DAG produced an empty frontier while tasks remained
    #[error("cycle detected in DAG")]
    CycleDetected,

    /// A `dependsOn` id does not reference any task in the DAG
    #[error("unknown dependency: {0}")]
    UnknownDependency(String),

    /// Two tasks in the same DAG share an id
    #[error("duplicate task id: {0}")]
    DuplicateTaskId(String),

    /// A task marked `pure = true` has a body containing a forbidden identifier
    #[error("impure task body for pure task {0}")]
    ImpureTask(String),

    /// A checkpoint's task set is not a prefix of the DAG being resumed
    #[error("checkpoint task set does not match DAG")]
    DagMismatch,

    // --- Dependency errors (per task, raised by the resolver) ---
    /// A dependency id is absent from the result store
    #[error("missing dependency: {0}")]
    MissingDependency(String),

    /// A dependency resolved with `status = error`
    #[error("upstream task {id} failed: {error}")]
    UpstreamFailed { id: String, error: String },

    // --- Checkpoint errors ---
    /// No checkpoint exists under the given id
    #[error("checkpoint not found: {0}")]
    CheckpointNotFound(String),

    /// The checkpoint's TTL elapsed before it was read
    #[error("checkpoint expired: {0}")]
    CheckpointExpired(String),

    /// The checkpoint store backend could not be reached
    #[error("checkpoint store unavailable: {0}")]
    CheckpointStoreUnavailable(String),

    // --- Task executor errors ---
    /// The task executor threw while running a task
    #[error("task execution failed: {0}")]
    TaskFailed(String),

    /// A task exceeded its per-task timeout
    #[error("timeout")]
    Timeout,

    // --- Generic ---
    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Metrics registry errors
    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// IO errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error
    #[error("internal error: {0}")]
    Internal(String),

    /// Unknown / wrapped errors
    #[error("unknown error: {0}")]
    Unknown(#[from] anyhow::Error),
}

/// Result type alias used throughout the workspace
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Admission errors are fatal before any task runs; everything else can
    /// surface mid-workflow.
    pub fn is_admission(&self) -> bool {
        matches!(
            self,
            Error::CycleDetected
                | Error::UnknownDependency(_)
                | Error::DuplicateTaskId(_)
                | Error::ImpureTask(_)
                | Error::DagMismatch
        )
    }

    /// Whether retrying the operation that produced this error is sensible.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Timeout | Error::CheckpointStoreUnavailable(_))
    }

    /// Error severity, used for metrics labelling.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Error::CycleDetected
            | Error::DuplicateTaskId(_)
            | Error::ImpureTask(_)
            | Error::DagMismatch
            | Error::UnknownDependency(_) => ErrorSeverity::Critical,
            Error::UpstreamFailed { .. } | Error::CheckpointStoreUnavailable(_) => {
                ErrorSeverity::High
            }
            Error::Timeout | Error::MissingDependency(_) => ErrorSeverity::Medium,
            _ => ErrorSeverity::Low,
        }
    }
}

/// Error severity levels, mirrored in the metrics labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}
