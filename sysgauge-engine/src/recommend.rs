//! Tuning recommendations derived from a snapshot.

use serde::Serialize;
use sysgauge_types::MetricSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

/// A suggested tweak with a short explanation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recommendation {
    pub title: &'static str,
    pub description: &'static str,
    pub priority: Priority,
}

/// Every recommendation the engine knows, in display order.
pub const CATALOG: [Recommendation; 5] = [
    Recommendation {
        title: "Optimize CPU Usage",
        description: "Close unnecessary applications and consider upgrading your CPU if frequently at 80%+ usage",
        priority: Priority::High,
    },
    Recommendation {
        title: "Memory Management",
        description: "Enable swap file and close memory-intensive applications",
        priority: Priority::Medium,
    },
    Recommendation {
        title: "Disk Cleanup",
        description: "Remove temporary files and consider upgrading to SSD for better performance",
        priority: Priority::Medium,
    },
    Recommendation {
        title: "Temperature Control",
        description: "Clean dust from fans and ensure proper ventilation",
        priority: Priority::High,
    },
    Recommendation {
        title: "System Updates",
        description: "Keep your system and drivers up to date for optimal performance",
        priority: Priority::Low,
    },
];

/// Recommendations that apply to a snapshot, in catalog order.
///
/// System updates are always recommended.
pub fn recommendations_for(snapshot: &MetricSnapshot) -> Vec<Recommendation> {
    let triggered = [
        snapshot.cpu_percent() > 80.0,
        snapshot.memory_percent() > 80.0,
        snapshot.disk_percent() > 70.0,
        snapshot.temperature_c() > 70.0,
        true,
    ];

    CATALOG
        .iter()
        .zip(triggered)
        .filter(|(_, on)| *on)
        .map(|(rec, _)| rec.clone())
        .collect()
}
