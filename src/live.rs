//! Live power readings
//!
//! A [`LiveSnapshot`] is an immutable copy of the last known power draw per
//! machine, taken by the telemetry side before each estimation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Last known power draw per machine (kW)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LiveSnapshot {
    readings: BTreeMap<String, f64>,
}

impl LiveSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: add a reading
    pub fn with_reading(mut self, machine: impl Into<String>, power_kw: f64) -> Self {
        self.readings.insert(machine.into(), power_kw);
        self
    }

    /// Usable power for a machine: present, finite and > 0
    pub fn power_for(&self, machine: &str) -> Option<f64> {
        self.readings
            .get(machine)
            .copied()
            .filter(|kw| kw.is_finite() && *kw > 0.0)
    }

    /// Raw stored value, including unusable ones
    pub fn raw(&self, machine: &str) -> Option<f64> {
        self.readings.get(machine).copied()
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}

impl FromIterator<(String, f64)> for LiveSnapshot {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self {
            readings: iter.into_iter().collect(),
        }
    }
}
