//! Layered runtime settings.
//!
//! Sources, later ones winning:
//!
//! 1. built-in defaults
//! 2. an optional TOML file (`--config`)
//! 3. `SYSGAUGE_*` environment variables, e.g. `SYSGAUGE_STEP_DELAY_MS=100`

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use sysgauge_engine::MIN_SAMPLE_INTERVAL;

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "SYSGAUGE";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    /// Directory holding the durable store.
    pub data_dir: PathBuf,
    /// Points kept per chart channel.
    pub series_capacity: usize,
    pub sample_interval_ms: u64,
    pub step_delay_ms: u64,
    /// Fallback log filter when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Settings {
    /// Load settings from defaults, `path` and the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, Environment::with_prefix(ENV_PREFIX))
    }

    fn load_with_env(path: Option<&Path>, env: Environment) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("data_dir", "./.sysgauge")?
            .set_default("series_capacity", 20_i64)?
            .set_default("sample_interval_ms", 1000_i64)?
            .set_default("step_delay_ms", 500_i64)?
            .set_default("log_level", "info")?;

        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }

        let settings = builder
            .add_source(env.try_parsing(true))
            .build()
            .and_then(|config| config.try_deserialize::<Settings>())
            .with_context(|| match path {
                Some(p) => format!("Failed to load settings from {}", p.display()),
                None => "Failed to load settings".to_string(),
            })?;

        if settings.sample_interval_ms == 0 {
            bail!("sample_interval_ms must be at least 1");
        }
        Ok(settings)
    }

    /// Live monitor period, never below [`MIN_SAMPLE_INTERVAL`].
    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms).max(MIN_SAMPLE_INTERVAL)
    }

    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.step_delay_ms)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./.sysgauge"),
            series_capacity: 20,
            sample_interval_ms: 1000,
            step_delay_ms: 500,
            log_level: "info".to_string(),
        }
    }
}
