//! Estimation reports
//!
//! Reports are immutable: a configuration change produces a new
//! [`AggregateReport`], never an in-place update.

use serde::{Deserialize, Serialize};
use xxhash_rust::xxh64::Xxh64;

use crate::config::HardnessAdjustment;

/// Seed for report fingerprints
const FINGERPRINT_SEED: u64 = 0x5741_4f4f_445f_4e52;

/// Per-machine result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineReport {
    pub name: String,
    /// Nominal power from the profile (kW)
    pub nominal_power_kw: f64,
    /// Load factor from the profile
    pub base_load_factor: f64,
    /// Load factor used in the energy formula (after any clamp)
    pub effective_load_factor: f64,
    /// Power used in the energy formula (kW)
    pub adjusted_power_kw: f64,
    /// Whether a live reading replaced the nominal power
    pub live_reading_used: bool,
    /// Tariff applied (currency/kWh)
    pub tariff_rate: f64,
    pub consumption_kwh: f64,
    pub cost: f64,
    pub emissions_tonnes: f64,
    pub cost_per_m3: f64,
}

/// Whole-line result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateReport {
    /// One entry per profile, in profile order
    pub machines: Vec<MachineReport>,
    pub total_cost: f64,
    pub total_emissions_tonnes: f64,
    pub total_consumption_kwh: f64,
    /// Total cost ÷ target volume
    pub cost_per_m3: f64,
    pub species: String,
    pub effort_coefficient: f64,
    pub operating_hours: f64,
    pub target_volume_m3: f64,
    pub adjustment: HardnessAdjustment,
}

impl AggregateReport {
    /// Report for one machine
    pub fn machine(&self, name: &str) -> Option<&MachineReport> {
        self.machines.iter().find(|m| m.name == name)
    }

    /// Extra energy cost relative to the baseline species, in percent
    pub fn surcharge_percent(&self) -> f64 {
        (self.effort_coefficient - 1.0) * 100.0
    }

    /// Number of machines using a live reading
    pub fn live_count(&self) -> usize {
        self.machines.iter().filter(|m| m.live_reading_used).count()
    }

    /// Hash of every field's exact bit pattern.
    ///
    /// Identical inputs always produce identical fingerprints, so callers can
    /// skip downstream work when a recomputation changed nothing.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = Xxh64::new(FINGERPRINT_SEED);
        for m in &self.machines {
            hasher.update(m.name.as_bytes());
            hasher.update(&[0, m.live_reading_used as u8]);
            for v in [
                m.nominal_power_kw,
                m.base_load_factor,
                m.effective_load_factor,
                m.adjusted_power_kw,
                m.tariff_rate,
                m.consumption_kwh,
                m.cost,
                m.emissions_tonnes,
                m.cost_per_m3,
            ] {
                hasher.update(&v.to_bits().to_le_bytes());
            }
        }
        hasher.update(self.species.as_bytes());
        hasher.update(self.adjustment.as_str().as_bytes());
        for v in [
            self.total_cost,
            self.total_emissions_tonnes,
            self.total_consumption_kwh,
            self.cost_per_m3,
            self.effort_coefficient,
            self.operating_hours,
            self.target_volume_m3,
        ] {
            hasher.update(&v.to_bits().to_le_bytes());
        }
        hasher.digest()
    }

    /// Generate a human-readable report
    pub fn summary(&self) -> String {
        let mut report = String::new();

        report.push_str("=== WoodEnergy Report ===\n\n");

        report.push_str(&format!("Species: {}\n", self.species));
        report.push_str(&format!(
            "Effort factor: x{} ({:+.0}% vs baseline)\n",
            self.effort_coefficient,
            self.surcharge_percent()
        ));
        report.push_str(&format!("Hardness model: {}\n", self.adjustment.as_str()));
        report.push_str(&format!("Operating time: {:.1} h\n", self.operating_hours));
        report.push_str(&format!("Target volume: {:.0} m³\n\n", self.target_volume_m3));

        report.push_str(&format!(
            "Total consumption: {:.0} kWh\n",
            self.total_consumption_kwh
        ));
        report.push_str(&format!("Energy budget: {:.2}\n", self.total_cost));
        report.push_str(&format!("Cost per m³: {:.2}\n", self.cost_per_m3));
        report.push_str(&format!(
            "Carbon footprint: {:.3} t CO2\n\n",
            self.total_emissions_tonnes
        ));

        report.push_str("Machines:\n");
        for m in &self.machines {
            report.push_str(&format!(
                "  {:<20} {:>7.1} kW{} {:>10.0} kWh {:>10.2} {:>8.3} t {:>6.2}/m³\n",
                m.name,
                m.adjusted_power_kw,
                if m.live_reading_used { "*" } else { " " },
                m.consumption_kwh,
                m.cost,
                m.emissions_tonnes,
                m.cost_per_m3,
            ));
        }
        if self.live_count() > 0 {
            report.push_str("\n* live reading\n");
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AggregateReport {
        let machine = MachineReport {
            name: "Head saw".to_string(),
            nominal_power_kw: 75.0,
            base_load_factor: 0.65,
            effective_load_factor: 0.65,
            adjusted_power_kw: 75.0,
            live_reading_used: false,
            tariff_rate: 0.22,
            consumption_kwh: 8580.0,
            cost: 1887.6,
            emissions_tonnes: 0.429,
            cost_per_m3: 1.8876,
        };
        AggregateReport {
            total_cost: machine.cost,
            total_emissions_tonnes: machine.emissions_tonnes,
            total_consumption_kwh: machine.consumption_kwh,
            cost_per_m3: machine.cost_per_m3,
            machines: vec![machine],
            species: "Fir/Spruce".to_string(),
            effort_coefficient: 1.0,
            operating_hours: 176.0,
            target_volume_m3: 1000.0,
            adjustment: HardnessAdjustment::ScalePower,
        }
    }

    #[test]
    fn test_fingerprint_stable_and_sensitive() {
        let a = sample();
        let b = sample();
        assert_eq!(a.fingerprint(), b.fingerprint());

        let mut c = sample();
        c.machines[0].cost += 0.01;
        assert_ne!(a.fingerprint(), c.fingerprint());

        let mut d = sample();
        d.adjustment = HardnessAdjustment::ScaleLoadFactor;
        assert_ne!(a.fingerprint(), d.fingerprint());
    }

    #[test]
    fn test_summary() {
        let text = sample().summary();
        assert!(text.contains("Fir/Spruce"));
        assert!(text.contains("Head saw"));
        assert!(text.contains("176.0 h"));
        assert!(!text.contains("live reading"));
    }

    #[test]
    fn test_machine_lookup() {
        let report = sample();
        assert!(report.machine("Head saw").is_some());
        assert!(report.machine("Kiln").is_none());
    }
}
