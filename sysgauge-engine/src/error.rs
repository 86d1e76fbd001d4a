//! Error types for the engine.

use sysgauge_types::RunKind;
use thiserror::Error;

/// Errors produced by a metric sampler.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SampleError {
    /// The underlying metric source could not produce a snapshot.
    #[error("Metric source unavailable: {0}")]
    SourceUnavailable(String),
}

/// Errors produced by a durable storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the backing store failed.
    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The backend refused the write.
    #[error("Storage write rejected: {0}")]
    Rejected(String),
}

/// Errors surfaced by engine operations.
///
/// None of these are fatal; every variant leaves previously displayed and
/// persisted state intact.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The sampler could not produce a snapshot; keep the last known value.
    #[error(transparent)]
    SourceUnavailable(#[from] SampleError),

    /// The durable write failed and the in-memory log was rolled back.
    #[error("Failed to persist history: {0}")]
    PersistenceWriteFailure(#[source] StorageError),

    /// A run is already in progress.
    #[error("A {running} run is already in progress")]
    ConcurrentRunRejected { running: RunKind },

    /// A step of the run failed; the run was recorded as failed.
    #[error("Step {step} failed: {reason}")]
    RunFailure { step: usize, reason: String },

    /// An exported history blob could not be parsed.
    #[error("Invalid history export: {0}")]
    InvalidExport(String),

    /// A run was started outside a tokio runtime; nothing was changed.
    #[error("No async runtime available: {0}")]
    RuntimeUnavailable(String),

    /// The background run task ended without reporting an outcome.
    #[error("Run task aborted: {0}")]
    Join(String),
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::InvalidExport(err.to_string())
    }
}
