//! Health scoring.
//!
//! Scoring starts at 100 and subtracts one tiered penalty per dimension. Only
//! the highest tier that applies to a dimension counts, and each threshold is
//! a strict "greater than".
//!
//! | dimension   | severe          | moderate        |
//! |-------------|-----------------|-----------------|
//! | cpu %       | > 80 → -20      | > 60 → -10      |
//! | memory %    | > 80 → -20      | > 60 → -10      |
//! | disk %      | > 90 → -30      | > 70 → -15      |
//! | temperature | > 70 °C → -20   | > 50 °C → -10   |
//!
//! The sum is clamped into `0..=100` and banded into a
//! [`HealthStatus`](sysgauge_types::HealthStatus).

use sysgauge_types::{HealthScore, MetricSnapshot};

/// A two-tier penalty for one dimension.
#[derive(Debug, Clone, Copy)]
struct Penalty {
    severe_above: f64,
    severe: i32,
    moderate_above: f64,
    moderate: i32,
}

impl Penalty {
    fn apply(&self, value: f64) -> i32 {
        if value > self.severe_above {
            self.severe
        } else if value > self.moderate_above {
            self.moderate
        } else {
            0
        }
    }
}

const CPU: Penalty = Penalty {
    severe_above: 80.0,
    severe: 20,
    moderate_above: 60.0,
    moderate: 10,
};

const MEMORY: Penalty = Penalty {
    severe_above: 80.0,
    severe: 20,
    moderate_above: 60.0,
    moderate: 10,
};

const DISK: Penalty = Penalty {
    severe_above: 90.0,
    severe: 30,
    moderate_above: 70.0,
    moderate: 15,
};

const TEMPERATURE: Penalty = Penalty {
    severe_above: 70.0,
    severe: 20,
    moderate_above: 50.0,
    moderate: 10,
};

/// Score a snapshot. Pure and total: the same snapshot always yields the same score.
pub fn score(snapshot: &MetricSnapshot) -> HealthScore {
    let penalty = CPU.apply(snapshot.cpu_percent())
        + MEMORY.apply(snapshot.memory_percent())
        + DISK.apply(snapshot.disk_percent())
        + TEMPERATURE.apply(snapshot.temperature_c());

    HealthScore::from_raw(100 - penalty)
}
