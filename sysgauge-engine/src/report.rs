//! Point-in-time system report.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use sysgauge_types::MetricSnapshot;

use crate::recommend::recommendations_for;
use crate::scorer;

/// Snapshot values as they appear in a report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStats {
    pub cpu: f64,
    pub memory: f64,
    pub disk: f64,
    pub temperature: f64,
    pub load_average: f64,
    pub swap: f64,
}

/// Shareable summary of the current state with its recommendations.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    /// RFC 3339 time the report was taken.
    pub timestamp: String,
    pub system_stats: SystemStats,
    pub health_score: u8,
    pub health_status: &'static str,
    /// Titles of the recommendations that apply.
    pub recommendations: Vec<&'static str>,
}

impl Report {
    pub fn capture(snapshot: &MetricSnapshot, now: DateTime<Utc>) -> Self {
        let score = scorer::score(snapshot);
        Self {
            timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            system_stats: SystemStats {
                cpu: snapshot.cpu_percent(),
                memory: snapshot.memory_percent(),
                disk: snapshot.disk_percent(),
                temperature: snapshot.temperature_c(),
                load_average: snapshot.load_average(),
                swap: snapshot.swap_percent(),
            },
            health_score: score.value,
            health_status: score.status.label(),
            recommendations: recommendations_for(snapshot)
                .into_iter()
                .map(|r| r.title)
                .collect(),
        }
    }

    /// Pretty-printed JSON document.
    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
    }
}
