//! Machine profiles
//!
//! Static per-machine descriptors and the built-in sawmill lines.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Static descriptor of one machine on the line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineProfile {
    /// Unique machine key (also the telemetry key)
    pub name: String,
    /// Nominal power draw in kW
    pub nominal_power_kw: f64,
    /// Average fraction of nominal power drawn while running, in (0, 1]
    pub load_factor: f64,
    /// Runs on the off-peak tariff (e.g. kilns running overnight)
    #[serde(default)]
    pub off_peak: bool,
}

impl MachineProfile {
    /// Create a peak-tariff machine
    pub fn new(name: impl Into<String>, nominal_power_kw: f64, load_factor: f64) -> Self {
        Self {
            name: name.into(),
            nominal_power_kw,
            load_factor,
            off_peak: false,
        }
    }

    /// Builder: mark the machine as off-peak eligible
    pub fn with_off_peak(mut self, off_peak: bool) -> Self {
        self.off_peak = off_peak;
        self
    }

    /// Check power and load factor ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.nominal_power_kw > 0.0) {
            return Err(ConfigError::non_positive(
                format!("nominal power of {}", self.name),
                self.nominal_power_kw,
            ));
        }
        if !(self.load_factor > 0.0 && self.load_factor <= 1.0) {
            return Err(ConfigError::LoadFactorOutOfRange {
                machine: self.name.clone(),
                value: self.load_factor,
            });
        }
        Ok(())
    }
}

/// Built-in sawmill lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SawmillLine {
    /// Head saw, edger, dust extraction, kiln, conveyors
    #[default]
    Standard,
    /// Standard line plus an optimising trimmer
    Extended,
}

impl SawmillLine {
    /// Machine profiles for this line, in display order
    pub fn profiles(self) -> Vec<MachineProfile> {
        let mut profiles = vec![
            MachineProfile::new("Head saw", 75.0, 0.65),
            MachineProfile::new("Edger", 30.0, 0.50),
            MachineProfile::new("Dust extraction", 45.0, 0.90),
            MachineProfile::new("Kiln", 110.0, 0.85).with_off_peak(true),
            MachineProfile::new("Conveyors", 15.0, 0.40),
        ];
        if self == SawmillLine::Extended {
            profiles.push(MachineProfile::new("Optimising trimmer", 22.0, 0.55));
        }
        profiles
    }
}

/// Find a profile by machine name
pub fn find<'a>(profiles: &'a [MachineProfile], name: &str) -> Option<&'a MachineProfile> {
    profiles.iter().find(|p| p.name == name)
}
