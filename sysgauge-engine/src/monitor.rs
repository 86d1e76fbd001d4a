//! Periodic sampling into the chart buffers.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, TimeZone};
use parking_lot::Mutex;
use sysgauge_types::{Channel, HealthScore, IoSample, MetricSnapshot, SeriesPoint};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::EngineError;
use crate::sampler::MetricSampler;
use crate::scorer;
use crate::series::SeriesSet;

/// Interval between samples when none is configured.
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_secs(1);

/// Shortest interval the sampling loop accepts; smaller values are raised to it.
pub const MIN_SAMPLE_INTERVAL: Duration = Duration::from_millis(1);

/// One scored sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub snapshot: MetricSnapshot,
    pub score: HealthScore,
    /// Missing when the sampler had no throughput figures this tick.
    pub io: Option<IoSample>,
}

/// Samples the system, scores it and feeds the chart series.
///
/// A failed sample leaves the series and the last reading untouched, so
/// consumers keep showing the last known good values.
pub struct Monitor {
    sampler: Arc<dyn MetricSampler>,
    series: Arc<SeriesSet>,
    last: Mutex<Option<Reading>>,
}

impl Monitor {
    pub fn new(sampler: Arc<dyn MetricSampler>, series: Arc<SeriesSet>) -> Self {
        Self {
            sampler,
            series,
            last: Mutex::new(None),
        }
    }

    /// Take one sample: score it and append to every chart series.
    pub fn tick(&self) -> Result<Reading, EngineError> {
        let snapshot = match self.sampler.sample() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Sample failed, keeping last reading: {}", e);
                return Err(e.into());
            }
        };

        let io = match self.sampler.sample_io() {
            Ok(io) => Some(io),
            Err(e) => {
                debug!("No throughput sample this tick: {}", e);
                None
            }
        };

        let score = scorer::score(&snapshot);
        let label = time_label(snapshot.taken_at());

        self.series.push(
            Channel::Cpu,
            SeriesPoint::new(label.clone(), snapshot.cpu_percent()),
        );
        self.series.push(
            Channel::Memory,
            SeriesPoint::new(label.clone(), snapshot.memory_percent()),
        );
        if let Some(io) = io {
            self.series.push(
                Channel::Disk,
                SeriesPoint::new(label.clone(), io.disk_mb_per_sec),
            );
            self.series.push(
                Channel::Network,
                SeriesPoint::new(label, io.network_kb_per_sec),
            );
        }

        let reading = Reading {
            snapshot,
            score,
            io,
        };
        *self.last.lock() = Some(reading.clone());
        Ok(reading)
    }

    /// Most recent successful reading.
    pub fn last_reading(&self) -> Option<Reading> {
        self.last.lock().clone()
    }

    pub fn series(&self) -> &Arc<SeriesSet> {
        &self.series
    }

    /// Empty every chart series. The last reading is kept.
    pub fn clear_charts(&self) {
        self.series.clear_all();
    }

    /// Tick on a fixed interval until the returned handle is stopped or dropped.
    ///
    /// The first tick happens immediately. An interval below
    /// [`MIN_SAMPLE_INTERVAL`] is raised to it. Must be called from within a
    /// tokio runtime.
    pub fn start(self: &Arc<Self>, interval: Duration) -> MonitorHandle {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let monitor = self.clone();
        let interval = interval.max(MIN_SAMPLE_INTERVAL);

        let task = tokio::spawn(async move {
            let mut timer = tokio::time::interval(interval);
            timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = timer.tick() => {
                        // Failures are logged in tick; the loop keeps going.
                        let _ = monitor.tick();
                    }
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            debug!("Monitor stopped");
        });

        MonitorHandle { stop_tx, task }
    }
}

impl std::fmt::Debug for Monitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Monitor")
            .field("last", &self.last.lock())
            .finish()
    }
}

/// Handle to a running [`Monitor`] loop.
///
/// Dropping the handle also stops the loop.
pub struct MonitorHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl MonitorHandle {
    /// Stop sampling and wait for the loop to exit.
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        let _ = self.task.await;
    }
}

/// Wall-clock `HH:MM:SS` label for a sample taken at `taken_at_ms`.
fn time_label(taken_at_ms: u64) -> String {
    let local = i64::try_from(taken_at_ms)
        .ok()
        .and_then(|ms| Local.timestamp_millis_opt(ms).single());
    match local {
        Some(t) => t.format("%H:%M:%S").to_string(),
        None => Local::now().format("%H:%M:%S").to_string(),
    }
}
