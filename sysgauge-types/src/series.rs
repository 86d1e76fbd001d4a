//! Chart channels and the points that feed them.

use std::fmt;
use std::str::FromStr;

/// A named metric stream with its own rolling buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Channel {
    Cpu,
    Memory,
    Disk,
    Network,
}

impl Channel {
    /// Every channel, in display order.
    pub const ALL: [Channel; 4] = [Channel::Cpu, Channel::Memory, Channel::Disk, Channel::Network];

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Cpu => "cpu",
            Channel::Memory => "memory",
            Channel::Disk => "disk",
            Channel::Network => "network",
        }
    }

    /// Unit suffix used when displaying the channel's values.
    pub fn unit(&self) -> &'static str {
        match self {
            Channel::Cpu | Channel::Memory => "%",
            Channel::Disk => "MB/s",
            Channel::Network => "KB/s",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cpu" => Ok(Channel::Cpu),
            "memory" => Ok(Channel::Memory),
            "disk" => Ok(Channel::Disk),
            "network" => Ok(Channel::Network),
            other => Err(format!("unknown channel: {}", other)),
        }
    }
}

/// One labeled value in a chart series.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SeriesPoint {
    pub label: String,
    pub value: f64,
}

impl SeriesPoint {
    pub fn new(label: impl Into<String>, value: f64) -> Self {
        Self {
            label: label.into(),
            value,
        }
    }
}
