//! Metric sources.
//!
//! The engine never reads the operating system directly. It asks a
//! [`MetricSampler`] for snapshots, so a real collector can replace the
//! simulated one without touching the rest of the core.

use parking_lot::Mutex;
use rand::Rng;
use sysgauge_types::{IoSample, MetricSnapshot};

use crate::error::SampleError;

/// A replaceable source of metric snapshots.
pub trait MetricSampler: Send + Sync {
    /// Produce one snapshot with every field inside its declared range.
    fn sample(&self) -> Result<MetricSnapshot, SampleError>;

    /// Produce current disk and network throughput for the I/O charts.
    fn sample_io(&self) -> Result<IoSample, SampleError>;
}

/// Sampler that generates random values in realistic ranges.
///
/// CPU, memory and disk usage fall in `0..100`, temperature in `30..80` °C,
/// load average in `0..4` and swap in `0..50`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimulatedSampler;

impl SimulatedSampler {
    pub fn new() -> Self {
        Self
    }
}

impl MetricSampler for SimulatedSampler {
    fn sample(&self) -> Result<MetricSnapshot, SampleError> {
        let mut rng = rand::thread_rng();
        let load = (rng.gen_range(0.0..4.0_f64) * 100.0).round() / 100.0;

        MetricSnapshot::builder()
            .cpu_percent(rng.gen_range(0..100) as f64)
            .memory_percent(rng.gen_range(0..100) as f64)
            .disk_percent(rng.gen_range(0..100) as f64)
            .temperature_c(rng.gen_range(30..80) as f64)
            .load_average(load)
            .swap_percent(rng.gen_range(0..50) as f64)
            .build()
            .map_err(|e| SampleError::SourceUnavailable(e.to_string()))
    }

    fn sample_io(&self) -> Result<IoSample, SampleError> {
        let mut rng = rand::thread_rng();
        Ok(IoSample {
            disk_mb_per_sec: rng.gen_range(0.0..100.0),
            network_kb_per_sec: rng.gen_range(0.0..50.0),
        })
    }
}

/// Deterministic sampler that returns a configured reading.
///
/// The reading can be swapped at any time, including for an error, which
/// makes it useful for tests and for demonstrating fallback behavior.
#[derive(Debug)]
pub struct FixedSampler {
    reading: Mutex<Result<MetricSnapshot, SampleError>>,
    io: IoSample,
}

impl FixedSampler {
    /// Create a sampler that always returns `snapshot`.
    pub fn new(snapshot: MetricSnapshot) -> Self {
        Self {
            reading: Mutex::new(Ok(snapshot)),
            io: IoSample::default(),
        }
    }

    /// Create a sampler whose source is unavailable.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            reading: Mutex::new(Err(SampleError::SourceUnavailable(reason.into()))),
            io: IoSample::default(),
        }
    }

    /// Use the given throughput for I/O samples.
    pub fn with_io(mut self, io: IoSample) -> Self {
        self.io = io;
        self
    }

    /// Replace the snapshot returned by subsequent samples.
    pub fn set(&self, snapshot: MetricSnapshot) {
        *self.reading.lock() = Ok(snapshot);
    }

    /// Make subsequent samples fail as if the source went away.
    pub fn fail(&self, reason: impl Into<String>) {
        *self.reading.lock() = Err(SampleError::SourceUnavailable(reason.into()));
    }
}

impl MetricSampler for FixedSampler {
    fn sample(&self) -> Result<MetricSnapshot, SampleError> {
        self.reading.lock().clone()
    }

    fn sample_io(&self) -> Result<IoSample, SampleError> {
        match &*self.reading.lock() {
            Ok(_) => Ok(self.io),
            Err(e) => Err(e.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulated_samples_stay_in_range() {
        let sampler = SimulatedSampler::new();
        for _ in 0..500 {
            let s = sampler.sample().unwrap();
            assert!((0.0..100.0).contains(&s.cpu_percent()));
            assert!((0.0..100.0).contains(&s.memory_percent()));
            assert!((0.0..100.0).contains(&s.disk_percent()));
            assert!((30.0..80.0).contains(&s.temperature_c()));
            assert!((0.0..=4.0).contains(&s.load_average()));
            assert!((0.0..50.0).contains(&s.swap_percent()));

            let io = sampler.sample_io().unwrap();
            assert!((0.0..100.0).contains(&io.disk_mb_per_sec));
            assert!((0.0..50.0).contains(&io.network_kb_per_sec));
        }
    }

    #[test]
    fn fixed_sampler_can_switch_between_reading_and_error() {
        let snapshot = MetricSnapshot::builder().cpu_percent(12.0).build().unwrap();
        let sampler = FixedSampler::new(snapshot.clone());
        assert_eq!(sampler.sample().unwrap(), snapshot);

        sampler.fail("sensor offline");
        assert_eq!(
            sampler.sample().unwrap_err(),
            SampleError::SourceUnavailable("sensor offline".to_string())
        );
        assert!(sampler.sample_io().is_err());

        sampler.set(snapshot.clone());
        assert!(sampler.sample().is_ok());
    }

    #[test]
    fn unavailable_sampler_reports_source_error() {
        let sampler = FixedSampler::unavailable("no /proc");
        assert!(matches!(sampler.sample(), Err(SampleError::SourceUnavailable(_))));
    }
}
