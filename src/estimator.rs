//! Cost-and-emissions estimator
//!
//! Pure mapping from machine profiles, a production configuration and an
//! optional live snapshot to an [`AggregateReport`]. Inputs are validated up
//! front; once validation passes the computation cannot fail.
//!
//! Per machine:
//!
//! ```text
//! base power   = live reading if > 0, else nominal
//! ScalePower:      power = base × effort,  load = load factor
//! ScaleLoadFactor: power = base,           load = min(load factor × effort, 1)
//! energy (kWh) = power × hours × load
//! cost         = energy × tariff (off-peak if eligible)
//! CO2 (t)      = energy × g/kWh ÷ 1 000 000
//! ```

use std::collections::HashSet;

use crate::config::{HardnessAdjustment, ProductionConfig};
use crate::error::{ConfigError, Result};
use crate::live::LiveSnapshot;
use crate::profile::MachineProfile;
use crate::report::{AggregateReport, MachineReport};

/// Grams per tonne
pub const GRAMS_PER_TONNE: f64 = 1_000_000.0;

/// Maximum duty cycle a motor can reach
pub const MAX_LOAD_FACTOR: f64 = 1.0;

/// Check every precondition of [`compute`].
pub fn validate(profiles: &[MachineProfile], config: &ProductionConfig) -> Result<()> {
    validate_profiles(profiles)?;
    config.validate()?;
    Ok(())
}

/// Non-empty line, unique names, valid power and load factor
pub fn validate_profiles(profiles: &[MachineProfile]) -> Result<()> {
    if profiles.is_empty() {
        return Err(ConfigError::EmptyProfiles.into());
    }

    let mut seen = HashSet::with_capacity(profiles.len());
    for profile in profiles {
        if !seen.insert(profile.name.as_str()) {
            return Err(ConfigError::DuplicateMachine(profile.name.clone()).into());
        }
        profile.validate()?;
    }
    Ok(())
}

/// Compute the report for every profile.
///
/// `live` is a snapshot taken by the caller before the call; machines
/// without a usable reading fall back to their nominal power. Readings for
/// machines outside `profiles` are ignored.
///
/// Fails with `InvalidConfiguration` before producing any output if a
/// precondition does not hold.
pub fn compute(
    profiles: &[MachineProfile],
    config: &ProductionConfig,
    live: Option<&LiveSnapshot>,
) -> Result<AggregateReport> {
    validate(profiles, config)?;

    let hours = config.operating_hours();
    let machines: Vec<MachineReport> = profiles
        .iter()
        .map(|profile| estimate_machine(profile, config, hours, live))
        .collect();

    let total_cost: f64 = machines.iter().map(|m| m.cost).sum();
    let total_emissions_tonnes: f64 = machines.iter().map(|m| m.emissions_tonnes).sum();
    let total_consumption_kwh: f64 = machines.iter().map(|m| m.consumption_kwh).sum();

    #[cfg(feature = "logging")]
    log::debug!(
        "Estimated {} machines for {} over {:.1} h: {:.0} kWh, cost {:.2}, {:.3} t CO2",
        machines.len(),
        config.species.name,
        hours,
        total_consumption_kwh,
        total_cost,
        total_emissions_tonnes
    );

    Ok(AggregateReport {
        machines,
        total_cost,
        total_emissions_tonnes,
        total_consumption_kwh,
        cost_per_m3: total_cost / config.target_volume_m3,
        species: config.species.name.clone(),
        effort_coefficient: config.species.effort_coefficient,
        operating_hours: hours,
        target_volume_m3: config.target_volume_m3,
        adjustment: config.adjustment,
    })
}

/// Power draw and load factor after the hardness adjustment
pub fn adjust_for_hardness(
    adjustment: HardnessAdjustment,
    base_power_kw: f64,
    load_factor: f64,
    effort_coefficient: f64,
) -> (f64, f64) {
    match adjustment {
        HardnessAdjustment::ScalePower => (base_power_kw * effort_coefficient, load_factor),
        HardnessAdjustment::ScaleLoadFactor => (
            base_power_kw,
            (load_factor * effort_coefficient).min(MAX_LOAD_FACTOR),
        ),
    }
}

fn estimate_machine(
    profile: &MachineProfile,
    config: &ProductionConfig,
    hours: f64,
    live: Option<&LiveSnapshot>,
) -> MachineReport {
    let live_power = live.and_then(|snapshot| snapshot.power_for(&profile.name));
    let base_power = live_power.unwrap_or(profile.nominal_power_kw);

    let (adjusted_power_kw, effective_load_factor) = adjust_for_hardness(
        config.adjustment,
        base_power,
        profile.load_factor,
        config.species.effort_coefficient,
    );

    let tariff_rate = config.tariff.rate_for(profile.off_peak);
    let consumption_kwh = adjusted_power_kw * hours * effective_load_factor;
    let cost = consumption_kwh * tariff_rate;
    let emissions_tonnes = consumption_kwh * config.emissions_g_per_kwh / GRAMS_PER_TONNE;

    MachineReport {
        name: profile.name.clone(),
        nominal_power_kw: profile.nominal_power_kw,
        base_load_factor: profile.load_factor,
        effective_load_factor,
        adjusted_power_kw,
        live_reading_used: live_power.is_some(),
        tariff_rate,
        consumption_kwh,
        cost,
        emissions_tonnes,
        cost_per_m3: cost / config.target_volume_m3,
    }
}

/// Estimator bound to a fixed machine line
#[derive(Debug, Clone)]
pub struct Estimator {
    profiles: Vec<MachineProfile>,
}

impl Estimator {
    /// Create an estimator, rejecting empty or invalid lines
    pub fn new(profiles: Vec<MachineProfile>) -> Result<Self> {
        validate_profiles(&profiles)?;
        Ok(Self { profiles })
    }

    pub fn profiles(&self) -> &[MachineProfile] {
        &self.profiles
    }

    /// Estimate with nominal power everywhere
    pub fn estimate(&self, config: &ProductionConfig) -> Result<AggregateReport> {
        compute(&self.profiles, config, None)
    }

    /// Estimate with a live snapshot
    pub fn estimate_live(
        &self,
        config: &ProductionConfig,
        live: &LiveSnapshot,
    ) -> Result<AggregateReport> {
        compute(&self.profiles, config, Some(live))
    }
}
