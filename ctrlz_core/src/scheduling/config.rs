//! Scheduler configuration
//!
//! Key names follow the configuration documents robot applications already
//! ship (`dt`, `CheckFrequency`, ...), so the same JSON/YAML/TOML block can
//! be handed to the scheduler unchanged.

use crate::error::{CtrlzError, CtrlzResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Scheduler options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Nominal seconds per `spin_once()`
    #[serde(rename = "dt")]
    pub dt: f64,

    /// Enable the EWMA period drift diagnostic
    #[serde(rename = "CheckFrequency")]
    pub check_frequency: bool,

    /// Seconds `start()` waits for task threads before spinning is enabled
    #[serde(rename = "SettleTime")]
    pub settle_time: f64,

    /// Print the colored start-up banner
    #[serde(rename = "PrintBanner")]
    pub print_banner: bool,

    /// mlockall() the process in `start()` so page faults cannot stall a cycle
    #[serde(rename = "LockMemory")]
    pub lock_memory: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::standard()
    }
}

impl SchedulerConfig {
    /// 1 kHz control loop with all diagnostics
    pub fn standard() -> Self {
        Self {
            dt: 0.001,
            check_frequency: true,
            settle_time: 1.0,
            print_banner: true,
            lock_memory: false,
        }
    }

    /// Stepped from a simulator or a test: no settle delay, no banner, no
    /// wall-clock frequency check.
    pub fn simulation(dt: f64) -> Self {
        Self {
            dt,
            check_frequency: false,
            settle_time: 0.0,
            print_banner: false,
            lock_memory: false,
        }
    }

    pub fn with_dt(mut self, dt: f64) -> Self {
        self.dt = dt;
        self
    }

    pub fn with_settle_time(mut self, seconds: f64) -> Self {
        self.settle_time = seconds;
        self
    }

    /// Parse from a JSON document. `null` yields the defaults.
    pub fn from_json(value: &serde_json::Value) -> CtrlzResult<Self> {
        if value.is_null() {
            log::warn!("Scheduler config is null, using defaults");
            return Ok(Self::default());
        }
        let config: Self = serde_json::from_value(value.clone())?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file, format chosen by extension (json, yaml, yml, toml)
    pub fn from_file<P: AsRef<Path>>(path: P) -> CtrlzResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        let config: Self = match extension.as_str() {
            "json" => serde_json::from_str(&content)?,
            "yaml" | "yml" => serde_yaml::from_str(&content)?,
            "toml" => toml::from_str(&content)?,
            other => {
                return Err(CtrlzError::config(format!(
                    "Unsupported config format '{}' for {}",
                    other,
                    path.display()
                )))
            }
        };

        config.validate()?;
        log::info!("Loaded scheduler config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> CtrlzResult<()> {
        if !self.dt.is_finite() || self.dt <= 0.0 {
            return Err(CtrlzError::config(format!(
                "dt must be a positive number of seconds, got {}",
                self.dt
            )));
        }
        if !self.settle_time.is_finite() || self.settle_time < 0.0 {
            return Err(CtrlzError::config(format!(
                "SettleTime must be >= 0, got {}",
                self.settle_time
            )));
        }
        Ok(())
    }

    /// Nominal loop frequency in Hz
    pub fn frequency(&self) -> f64 {
        1.0 / self.dt
    }
}
