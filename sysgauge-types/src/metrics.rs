//! Metric snapshots - an immutable view of system load at one instant.

use std::fmt;

/// Error returned when a snapshot field falls outside its declared range.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRangeError {
    /// Name of the offending field.
    pub field: &'static str,
    /// The rejected value.
    pub value: f64,
}

impl fmt::Display for MetricRangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} out of range: {}", self.field, self.value)
    }
}

impl std::error::Error for MetricRangeError {}

/// A point-in-time reading of system health metrics.
///
/// Snapshots can only be created through [`MetricSnapshotBuilder`], which
/// checks every field: percentages lie in `0..=100`, the load average is
/// non-negative and all values are finite. Once built a snapshot never changes.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct MetricSnapshot {
    cpu_percent: f64,
    memory_percent: f64,
    disk_percent: f64,
    temperature_c: f64,
    load_average: f64,
    swap_percent: f64,
    /// Unix timestamp in milliseconds.
    taken_at: u64,
}

impl MetricSnapshot {
    /// Create a builder for constructing snapshots.
    pub fn builder() -> MetricSnapshotBuilder {
        MetricSnapshotBuilder::new()
    }

    pub fn cpu_percent(&self) -> f64 {
        self.cpu_percent
    }

    pub fn memory_percent(&self) -> f64 {
        self.memory_percent
    }

    pub fn disk_percent(&self) -> f64 {
        self.disk_percent
    }

    pub fn temperature_c(&self) -> f64 {
        self.temperature_c
    }

    pub fn load_average(&self) -> f64 {
        self.load_average
    }

    pub fn swap_percent(&self) -> f64 {
        self.swap_percent
    }

    /// When the snapshot was taken (milliseconds since the Unix epoch).
    pub fn taken_at(&self) -> u64 {
        self.taken_at
    }
}

/// Builder for [`MetricSnapshot`].
///
/// Unset fields default to zero; the timestamp defaults to the current time.
#[derive(Debug, Default, Clone)]
pub struct MetricSnapshotBuilder {
    cpu_percent: f64,
    memory_percent: f64,
    disk_percent: f64,
    temperature_c: f64,
    load_average: f64,
    swap_percent: f64,
    taken_at: Option<u64>,
}

impl MetricSnapshotBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cpu_percent(mut self, value: f64) -> Self {
        self.cpu_percent = value;
        self
    }

    pub fn memory_percent(mut self, value: f64) -> Self {
        self.memory_percent = value;
        self
    }

    pub fn disk_percent(mut self, value: f64) -> Self {
        self.disk_percent = value;
        self
    }

    pub fn temperature_c(mut self, value: f64) -> Self {
        self.temperature_c = value;
        self
    }

    pub fn load_average(mut self, value: f64) -> Self {
        self.load_average = value;
        self
    }

    pub fn swap_percent(mut self, value: f64) -> Self {
        self.swap_percent = value;
        self
    }

    /// Set a specific timestamp (milliseconds since Unix epoch).
    pub fn taken_at(mut self, ts: u64) -> Self {
        self.taken_at = Some(ts);
        self
    }

    /// Validate every field and build the snapshot.
    pub fn build(self) -> Result<MetricSnapshot, MetricRangeError> {
        let percent = |field: &'static str, value: f64| {
            if value.is_finite() && (0.0..=100.0).contains(&value) {
                Ok(value)
            } else {
                Err(MetricRangeError { field, value })
            }
        };

        if !self.temperature_c.is_finite() {
            return Err(MetricRangeError {
                field: "temperatureC",
                value: self.temperature_c,
            });
        }
        if !self.load_average.is_finite() || self.load_average < 0.0 {
            return Err(MetricRangeError {
                field: "loadAverage",
                value: self.load_average,
            });
        }

        Ok(MetricSnapshot {
            cpu_percent: percent("cpuPercent", self.cpu_percent)?,
            memory_percent: percent("memoryPercent", self.memory_percent)?,
            disk_percent: percent("diskPercent", self.disk_percent)?,
            temperature_c: self.temperature_c,
            load_average: self.load_average,
            swap_percent: percent("swapPercent", self.swap_percent)?,
            taken_at: self.taken_at.unwrap_or_else(crate::now_ms),
        })
    }
}

/// Disk and network throughput, used to feed the I/O chart channels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct IoSample {
    /// Disk throughput in MB/s.
    pub disk_mb_per_sec: f64,
    /// Network throughput in KB/s.
    pub network_kb_per_sec: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_accepts_values_in_range() {
        let snapshot = MetricSnapshot::builder()
            .cpu_percent(100.0)
            .memory_percent(0.0)
            .disk_percent(55.5)
            .temperature_c(-5.0)
            .load_average(3.2)
            .swap_percent(12.0)
            .taken_at(1_703_160_000_000)
            .build()
            .unwrap();

        assert_eq!(snapshot.cpu_percent(), 100.0);
        assert_eq!(snapshot.temperature_c(), -5.0);
        assert_eq!(snapshot.taken_at(), 1_703_160_000_000);
    }

    #[test]
    fn builder_rejects_percent_above_hundred() {
        let err = MetricSnapshot::builder().cpu_percent(100.5).build().unwrap_err();
        assert_eq!(err.field, "cpuPercent");
    }

    #[test]
    fn builder_rejects_negative_load_and_nan() {
        let err = MetricSnapshot::builder().load_average(-0.1).build().unwrap_err();
        assert_eq!(err.field, "loadAverage");

        let err = MetricSnapshot::builder().swap_percent(f64::NAN).build().unwrap_err();
        assert_eq!(err.field, "swapPercent");

        let err = MetricSnapshot::builder()
            .temperature_c(f64::INFINITY)
            .build()
            .unwrap_err();
        assert_eq!(err.field, "temperatureC");
    }

    #[test]
    fn default_timestamp_is_now() {
        let before = crate::now_ms();
        let snapshot = MetricSnapshot::builder().build().unwrap();
        assert!(snapshot.taken_at() >= before);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn snapshot_serializes_camel_case() {
        let snapshot = MetricSnapshot::builder()
            .cpu_percent(10.0)
            .taken_at(5)
            .build()
            .unwrap();
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["cpuPercent"], 10.0);
        assert_eq!(json["takenAt"], 5);
    }
}
