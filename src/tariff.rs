//! Electricity tariff schedule

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Peak and off-peak electricity rates (currency per kWh)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TariffSchedule {
    pub peak: f64,
    pub off_peak: f64,
}

impl Default for TariffSchedule {
    fn default() -> Self {
        Self {
            peak: 0.22,
            off_peak: 0.14,
        }
    }
}

impl TariffSchedule {
    pub fn new(peak: f64, off_peak: f64) -> Self {
        Self { peak, off_peak }
    }

    /// Single-rate contract
    pub fn flat(rate: f64) -> Self {
        Self {
            peak: rate,
            off_peak: rate,
        }
    }

    /// Rate applicable to a machine
    pub fn rate_for(&self, off_peak_eligible: bool) -> f64 {
        if off_peak_eligible {
            self.off_peak
        } else {
            self.peak
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.peak > 0.0) {
            return Err(ConfigError::non_positive("peak tariff", self.peak));
        }
        if !(self.off_peak > 0.0) {
            return Err(ConfigError::non_positive("off-peak tariff", self.off_peak));
        }
        Ok(())
    }
}
