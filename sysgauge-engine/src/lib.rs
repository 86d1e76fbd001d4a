//! # sysgauge-engine
//!
//! Core of sysgauge: sampling, health scoring, chart series, run
//! orchestration and the durable run history.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use sysgauge_engine::{
//!     FileStorage, HistoryStore, Monitor, Orchestrator, SeriesSet, SimulatedSampler,
//! };
//! use sysgauge_types::RunKind;
//!
//! #[tokio::main]
//! async fn main() {
//!     let sampler = Arc::new(SimulatedSampler::new());
//!     let history = Arc::new(HistoryStore::open(Arc::new(FileStorage::new(".sysgauge"))));
//!
//!     // Feed the charts once a second
//!     let monitor = Arc::new(Monitor::new(sampler.clone(), Arc::new(SeriesSet::default())));
//!     let sampling = monitor.start(Duration::from_secs(1));
//!
//!     // Run a system check and record it
//!     let orchestrator = Orchestrator::builder(sampler, history.clone()).build();
//!     let record = orchestrator.run(RunKind::Check).await.unwrap();
//!     println!("{:?} -> {:?}", record.status, record.health_score);
//!
//!     sampling.stop().await;
//! }
//! ```
//!
//! ## Modules
//!
//! - **sampler**: where snapshots come from (simulated or fixed)
//! - **scorer**: snapshot to 0-100 health score
//! - **series**: capped chart buffers per channel
//! - **monitor**: periodic sampling into the series
//! - **orchestrator**: cancellable multi-step runs
//! - **history**: append-only run log with export and import
//! - **storage**: durable key-value backends

mod error;
mod history;
mod monitor;
mod orchestrator;
mod plan;
mod recommend;
mod report;
mod sampler;
mod scorer;
mod series;
mod storage;

pub use error::{EngineError, SampleError, StorageError};
pub use history::{HistoryStore, TimeRange};
pub use monitor::{
    Monitor, MonitorHandle, Reading, DEFAULT_SAMPLE_INTERVAL, MIN_SAMPLE_INTERVAL,
};
pub use orchestrator::{
    CompleteCallback, Orchestrator, OrchestratorBuilder, ProgressCallback, RunHandle, RunProgress,
    RunState, SimulatedExecutor, StepExecutor, DEFAULT_STEP_DELAY,
};
pub use plan::{percent_complete, plan_for, CHECK_STEPS, INSTALL_STEPS};
pub use recommend::{recommendations_for, Priority, Recommendation, CATALOG};
pub use report::{Report, SystemStats};
pub use sampler::{FixedSampler, MetricSampler, SimulatedSampler};
pub use scorer::score;
pub use series::{SeriesBuffer, SeriesSet, DEFAULT_CAPACITY};
pub use storage::{FileStorage, MemoryStorage, Storage, HISTORY_KEY, THEME_KEY};

// Re-export types for convenience
pub use sysgauge_types::{
    Channel, HealthScore, HealthStatus, IoSample, MetricSnapshot, RunKind, RunRecord, RunStatus,
    RunStep, SeriesPoint,
};
