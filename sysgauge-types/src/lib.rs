//! # sysgauge-types
//!
//! Core data model for sysgauge. These types are shared by the engine and any
//! view layer that renders its output: metric snapshots, health scores, chart
//! series points and the records of completed runs.
//!
//! ## Features
//!
//! - `serde`: JSON (or any serde format) serialization of snapshots and run
//!   records. Required by the engine for the durable history store.
//!
//! ## Example
//!
//! ```rust
//! use sysgauge_types::{MetricSnapshot, RunKind, RunRecord, RunStatus};
//!
//! let snapshot = MetricSnapshot::builder()
//!     .cpu_percent(42.0)
//!     .memory_percent(63.5)
//!     .disk_percent(71.0)
//!     .temperature_c(48.0)
//!     .build()
//!     .unwrap();
//! assert_eq!(snapshot.cpu_percent(), 42.0);
//!
//! let record = RunRecord::new(1_703_160_000_000, RunKind::Check, RunStatus::Completed, Some(85));
//! assert_eq!(record.health_score, Some(85));
//! ```

mod health;
mod metrics;
mod run;
mod series;

pub use health::*;
pub use metrics::*;
pub use run::*;
pub use series::*;

/// Milliseconds since the Unix epoch, or 0 if the clock is before it.
pub fn now_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
