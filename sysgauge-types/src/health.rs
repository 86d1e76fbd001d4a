//! Health score and qualitative status.

/// Qualitative health band derived from a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HealthStatus {
    NeedsAttention,
    Good,
    Excellent,
}

impl HealthStatus {
    /// Band for a score: `>= 80` Excellent, `>= 60` Good, otherwise NeedsAttention.
    pub fn from_value(value: u8) -> Self {
        if value >= 80 {
            HealthStatus::Excellent
        } else if value >= 60 {
            HealthStatus::Good
        } else {
            HealthStatus::NeedsAttention
        }
    }

    /// Returns the display label.
    pub fn label(&self) -> &'static str {
        match self {
            HealthStatus::Excellent => "Excellent",
            HealthStatus::Good => "Good",
            HealthStatus::NeedsAttention => "Needs Attention",
        }
    }
}

/// A 0-100 health score with its status band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HealthScore {
    pub value: u8,
    pub status: HealthStatus,
}

impl HealthScore {
    /// Build a score from a raw value, clamping it into `0..=100`.
    pub fn from_raw(raw: i32) -> Self {
        let value = raw.clamp(0, 100) as u8;
        Self {
            value,
            status: HealthStatus::from_value(value),
        }
    }
}
