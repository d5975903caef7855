use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Result, StaggerError};

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub sampling: SamplingConfig,
}

impl AppConfig {
    /// Reads a JSON configuration file. Missing sections fall back to defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.engine.validate()?;
        self.sampling.validate()
    }
}

/// Configuration for sequence playback.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Minimum number of seconds between two activations of a Manual group.
    /// Zero disables the limit.
    pub min_rearm_interval: f64,
    /// Cancelled runs kept around so their exit animations can still be painted.
    pub cancelled_history: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_rearm_interval: 0.0,
            cancelled_history: 4,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.min_rearm_interval.is_finite() || self.min_rearm_interval < 0.0 {
            return Err(StaggerError::invalid(
                "min_rearm_interval",
                self.min_rearm_interval,
            ));
        }
        Ok(())
    }
}

/// Fixed-step sampling used by the simulator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    pub step: f64,
    pub until: f64,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            step: 0.1,
            until: 3.0,
        }
    }
}

impl SamplingConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.step.is_finite() || self.step <= 0.0 {
            return Err(StaggerError::msg(format!(
                "sampling step must be a positive number, got {}",
                self.step
            )));
        }
        if !self.until.is_finite() || self.until < 0.0 {
            return Err(StaggerError::invalid("until", self.until));
        }
        Ok(())
    }
}
