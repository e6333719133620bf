// src/config.rs

use crate::error::{CountError, Result as CountResult};
use crate::types::Config;
use anyhow::{Context, Result};
use std::fs;

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("Failed to read config file: {}", path))?;
        let config: Config = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path))?;
        Ok(config)
    }

    /// Rejects settings no session could run with. Lane geometry is checked
    /// separately when the registry is built.
    pub fn validate(&self) -> CountResult<()> {
        if self.session.history_capacity == 0 {
            return Err(CountError::InvalidConfig(
                "session.history_capacity must be at least 1".into(),
            ));
        }
        if self.session.event_bus_capacity == 0 {
            return Err(CountError::InvalidConfig(
                "session.event_bus_capacity must be at least 1".into(),
            ));
        }
        if !(self.calibration.pixels_per_meter > 0.0) {
            return Err(CountError::InvalidConfig(format!(
                "calibration.pixels_per_meter must be positive, got {}",
                self.calibration.pixels_per_meter
            )));
        }
        if !(self.calibration.time_constant > 0.0) {
            return Err(CountError::InvalidConfig(format!(
                "calibration.time_constant must be positive, got {}",
                self.calibration.time_constant
            )));
        }
        if self.lanes.tilt_tolerance_px < 0 {
            return Err(CountError::InvalidConfig(
                "lanes.tilt_tolerance_px cannot be negative".into(),
            ));
        }
        Ok(())
    }
}
