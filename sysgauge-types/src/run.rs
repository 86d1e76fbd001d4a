//! Runs: the kinds of simulated operations, their steps and their records.

use std::fmt;
use std::str::FromStr;

/// The kind of multi-step operation a run performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RunKind {
    Install,
    Check,
    Tweak,
}

impl RunKind {
    /// Short machine name (`install`, `check`, `tweak`).
    pub fn as_str(&self) -> &'static str {
        match self {
            RunKind::Install => "install",
            RunKind::Check => "check",
            RunKind::Tweak => "tweak",
        }
    }

    /// Human-readable title shown in activity lists.
    pub fn title(&self) -> &'static str {
        match self {
            RunKind::Install => "Tools Installation",
            RunKind::Check => "System Check",
            RunKind::Tweak => "System Tweaks",
        }
    }

    /// Whether a completed run of this kind carries a health score.
    pub fn is_scored(&self) -> bool {
        !matches!(self, RunKind::Tweak)
    }
}

impl fmt::Display for RunKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown run kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseRunKindError(pub String);

impl fmt::Display for ParseRunKindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown run kind '{}' (expected install, check or tweak)", self.0)
    }
}

impl std::error::Error for ParseRunKindError {}

impl FromStr for RunKind {
    type Err = ParseRunKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "install" => Ok(RunKind::Install),
            "check" => Ok(RunKind::Check),
            "tweak" => Ok(RunKind::Tweak),
            _ => Err(ParseRunKindError(s.to_string())),
        }
    }
}

/// Terminal status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RunStatus {
    Completed,
    Failed,
    Cancelled,
}

/// Summary of one finished run, as stored in the history log.
///
/// Records are immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct RunRecord {
    /// Unix timestamp in milliseconds when the run finished.
    pub timestamp: u64,
    pub run_kind: RunKind,
    pub status: RunStatus,
    /// Health score at completion; `None` for tweaks, failures and cancellations.
    pub health_score: Option<u8>,
}

impl RunRecord {
    pub fn new(timestamp: u64, run_kind: RunKind, status: RunStatus, health_score: Option<u8>) -> Self {
        Self {
            timestamp,
            run_kind,
            status,
            health_score: health_score.map(|s| s.min(100)),
        }
    }
}

/// One labeled step of a run plan.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RunStep {
    pub index: usize,
    pub description: String,
}
