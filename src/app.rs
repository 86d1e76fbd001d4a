//! Wires the engine together for the command-line driver.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use sysgauge_engine::{
    Channel, FileStorage, HistoryStore, MetricSampler, Monitor, Orchestrator, Reading, Report,
    RunKind, RunProgress, RunRecord, SeriesPoint, SeriesSet, SimulatedSampler, Storage, TimeRange,
};
use sysgauge_types::now_ms;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::settings::Settings;

/// Engine components shared by every command.
pub struct App {
    settings: Settings,
    sampler: Arc<dyn MetricSampler>,
    storage: Arc<dyn Storage>,
    history: Arc<HistoryStore>,
    monitor: Arc<Monitor>,
}

impl App {
    /// Simulated metrics with history stored under `settings.data_dir`.
    pub fn new(settings: Settings) -> Self {
        let storage = Arc::new(FileStorage::new(&settings.data_dir));
        Self::with_parts(settings, Arc::new(SimulatedSampler::new()), storage)
    }

    pub fn with_parts(
        settings: Settings,
        sampler: Arc<dyn MetricSampler>,
        storage: Arc<dyn Storage>,
    ) -> Self {
        let history = Arc::new(HistoryStore::open(storage.clone()));
        let series = Arc::new(SeriesSet::new(settings.series_capacity));
        let monitor = Arc::new(Monitor::new(sampler.clone(), series));

        Self {
            settings,
            sampler,
            storage,
            history,
            monitor,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn history_store(&self) -> &Arc<HistoryStore> {
        &self.history
    }

    /// Take one scored sample.
    pub fn sample(&self) -> Result<Reading> {
        Ok(self.monitor.tick()?)
    }

    /// Sample `ticks` times at the configured interval and return the charts.
    ///
    /// Failed ticks are skipped; the charts keep their last good points.
    pub async fn monitor(&self, ticks: usize) -> Result<BTreeMap<Channel, Vec<SeriesPoint>>> {
        let mut timer = tokio::time::interval(self.settings.sample_interval());
        for _ in 0..ticks {
            timer.tick().await;
            if let Err(e) = self.monitor.tick() {
                warn!("Skipping tick: {}", e);
            }
        }

        let series = self.monitor.series();
        Ok(Channel::ALL
            .into_iter()
            .map(|channel| (channel, series.snapshot(channel)))
            .collect())
    }

    /// Run a plan to the end, reporting each step to `on_progress`.
    ///
    /// With `cancel_after = Some(n)` the run is cancelled once `n` steps
    /// have completed.
    pub async fn run(
        &self,
        kind: RunKind,
        cancel_after: Option<usize>,
        mut on_progress: impl FnMut(&RunProgress),
    ) -> Result<RunRecord> {
        let (progress_tx, mut progress_rx) = mpsc::unbounded_channel();
        let orchestrator = Orchestrator::builder(self.sampler.clone(), self.history.clone())
            .step_delay(self.settings.step_delay())
            .on_progress(move |p| {
                let _ = progress_tx.send(p.clone());
            })
            .build();

        let handle = orchestrator.start(kind)?;
        // The run task keeps the progress sender alive until it finishes,
        // so the channel closes exactly when the run is over.
        drop(orchestrator);

        if cancel_after == Some(0) {
            handle.cancel();
        }

        let mut completed = 0;
        while let Some(progress) = progress_rx.recv().await {
            on_progress(&progress);
            completed += 1;
            if cancel_after == Some(completed) {
                handle.cancel();
            }
        }

        let record = handle.finished().await?;
        Ok(record)
    }

    /// Records inside `range`, in append order.
    pub fn history(&self, range: TimeRange) -> Vec<RunRecord> {
        self.history.query_range(range, now_ms())
    }

    /// Write the full history to `out`. Returns the number of records.
    pub fn export_history(&self, out: &Path) -> Result<usize> {
        let bytes = self.history.export_all()?;
        std::fs::write(out, bytes)
            .with_context(|| format!("Failed to write export to {}", out.display()))?;

        let count = self.history.len();
        info!("Exported {} records to {}", count, out.display());
        Ok(count)
    }

    /// Replace the history with an export read from `from`.
    pub fn import_history(&mut self, from: &Path) -> Result<usize> {
        let bytes = std::fs::read(from)
            .with_context(|| format!("Failed to read export from {}", from.display()))?;
        let restored = HistoryStore::restore(self.storage.clone(), &bytes)
            .with_context(|| format!("Failed to import {}", from.display()))?;

        let count = restored.len();
        self.history = Arc::new(restored);
        info!("Imported {} records from {}", count, from.display());
        Ok(count)
    }

    /// Capture a report from a fresh sample and write it to `out`.
    ///
    /// Falls back to the last good reading if sampling fails.
    pub fn report(&self, out: &Path) -> Result<Report> {
        let reading = match self.monitor.tick() {
            Ok(reading) => reading,
            Err(e) => self
                .monitor
                .last_reading()
                .ok_or(e)
                .context("No metrics available for the report")?,
        };

        let report = Report::capture(&reading.snapshot, Utc::now());
        std::fs::write(out, report.to_json()?)
            .with_context(|| format!("Failed to write report to {}", out.display()))?;
        Ok(report)
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("settings", &self.settings)
            .field("history", &self.history.len())
            .finish()
    }
}
