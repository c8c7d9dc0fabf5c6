//! Production configuration and scenario files
//!
//! [`ProductionConfig`] is the resolved input of the estimator.
//! [`ScenarioConfig`] is its serializable, name-based counterpart, loaded
//! from JSON and resolved against a species catalog and a sawmill line.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result, WoodEnergyError};
use crate::profile::{MachineProfile, SawmillLine};
use crate::species::{SpeciesCatalog, WoodSpecies};
use crate::tariff::TariffSchedule;

/// Default grid emissions intensity (g CO2/kWh, French mix)
pub const DEFAULT_EMISSIONS_G_PER_KWH: f64 = 50.0;

/// Default throughput for the baseline species (m³/h)
pub const DEFAULT_BASELINE_THROUGHPUT_M3_PER_HOUR: f64 = 10.0;

/// How long the machines run for the period being estimated
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum OperatingSchedule {
    /// Calendar schedule: days per month × hours per day
    Fixed {
        days_per_month: f64,
        hours_per_day: f64,
    },
    /// Explicit total operating hours
    TotalHours { hours: f64 },
    /// Hours needed to saw the target volume at the species' speed
    VolumeDriven { baseline_throughput_m3_per_hour: f64 },
}

impl Default for OperatingSchedule {
    fn default() -> Self {
        OperatingSchedule::Fixed {
            days_per_month: 22.0,
            hours_per_day: 8.0,
        }
    }
}

impl OperatingSchedule {
    /// Volume-driven schedule at the default baseline throughput
    pub fn volume_driven() -> Self {
        OperatingSchedule::VolumeDriven {
            baseline_throughput_m3_per_hour: DEFAULT_BASELINE_THROUGHPUT_M3_PER_HOUR,
        }
    }

    /// Operating hours for a species and a target volume.
    ///
    /// Assumes [`validate`](Self::validate) and the species/volume checks
    /// have passed.
    pub fn hours(&self, species: &WoodSpecies, target_volume_m3: f64) -> f64 {
        match *self {
            OperatingSchedule::Fixed {
                days_per_month,
                hours_per_day,
            } => days_per_month * hours_per_day,
            OperatingSchedule::TotalHours { hours } => hours,
            OperatingSchedule::VolumeDriven {
                baseline_throughput_m3_per_hour,
            } => target_volume_m3 / (baseline_throughput_m3_per_hour * species.relative_speed),
        }
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        match *self {
            OperatingSchedule::Fixed {
                days_per_month,
                hours_per_day,
            } => {
                if !(days_per_month > 0.0) {
                    return Err(ConfigError::non_positive("days per month", days_per_month));
                }
                if !(hours_per_day > 0.0) {
                    return Err(ConfigError::non_positive("hours per day", hours_per_day));
                }
            }
            OperatingSchedule::TotalHours { hours } => {
                if !(hours > 0.0) {
                    return Err(ConfigError::non_positive("operating hours", hours));
                }
            }
            OperatingSchedule::VolumeDriven {
                baseline_throughput_m3_per_hour,
            } => {
                if !(baseline_throughput_m3_per_hour > 0.0) {
                    return Err(ConfigError::non_positive(
                        "baseline throughput",
                        baseline_throughput_m3_per_hour,
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Where the species effort coefficient is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HardnessAdjustment {
    /// Power draw × coefficient, load factor unchanged
    #[default]
    ScalePower,
    /// Load factor × coefficient, capped at 1.0 (full duty cycle)
    ScaleLoadFactor,
}

impl HardnessAdjustment {
    pub fn as_str(&self) -> &'static str {
        match self {
            HardnessAdjustment::ScalePower => "scale_power",
            HardnessAdjustment::ScaleLoadFactor => "scale_load_factor",
        }
    }
}

/// Resolved inputs of one estimation
#[derive(Debug, Clone, PartialEq)]
pub struct ProductionConfig {
    pub species: WoodSpecies,
    /// Volume to produce over the period (m³)
    pub target_volume_m3: f64,
    pub tariff: TariffSchedule,
    /// Grid emissions intensity (g CO2/kWh)
    pub emissions_g_per_kwh: f64,
    pub schedule: OperatingSchedule,
    pub adjustment: HardnessAdjustment,
}

impl ProductionConfig {
    /// Monthly budget: calendar schedule, effort scales power draw
    pub fn monthly_budget(species: WoodSpecies, target_volume_m3: f64) -> Self {
        Self {
            species,
            target_volume_m3,
            tariff: TariffSchedule::default(),
            emissions_g_per_kwh: DEFAULT_EMISSIONS_G_PER_KWH,
            schedule: OperatingSchedule::default(),
            adjustment: HardnessAdjustment::ScalePower,
        }
    }

    /// Species rentability: volume-driven hours, effort scales load factor
    pub fn species_rentability(species: WoodSpecies, target_volume_m3: f64) -> Self {
        Self {
            species,
            target_volume_m3,
            tariff: TariffSchedule::default(),
            emissions_g_per_kwh: DEFAULT_EMISSIONS_G_PER_KWH,
            schedule: OperatingSchedule::volume_driven(),
            adjustment: HardnessAdjustment::ScaleLoadFactor,
        }
    }

    pub fn with_tariff(mut self, tariff: TariffSchedule) -> Self {
        self.tariff = tariff;
        self
    }

    pub fn with_emissions(mut self, g_per_kwh: f64) -> Self {
        self.emissions_g_per_kwh = g_per_kwh;
        self
    }

    pub fn with_schedule(mut self, schedule: OperatingSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    pub fn with_adjustment(mut self, adjustment: HardnessAdjustment) -> Self {
        self.adjustment = adjustment;
        self
    }

    /// Operating hours for this configuration
    pub fn operating_hours(&self) -> f64 {
        self.schedule.hours(&self.species, self.target_volume_m3)
    }

    /// Check every scalar input range
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if !(self.target_volume_m3 > 0.0) {
            return Err(ConfigError::non_positive(
                "target volume",
                self.target_volume_m3,
            ));
        }
        self.tariff.validate()?;
        self.species.validate()?;
        if !(self.emissions_g_per_kwh >= 0.0) {
            return Err(ConfigError::NegativeEmissions(self.emissions_g_per_kwh));
        }
        self.schedule.validate()
    }
}

/// A resolved scenario: the machine line plus its production config
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    pub profiles: Vec<MachineProfile>,
    pub config: ProductionConfig,
}

/// Name-based scenario description, as stored in JSON files
///
/// Example:
/// ```json
/// {
///   "species": "Beech",
///   "target_volume_m3": 1000,
///   "tariff": { "peak": 0.22, "off_peak": 0.14 },
///   "emissions_g_per_kwh": 50,
///   "schedule": { "mode": "fixed", "days_per_month": 22, "hours_per_day": 8 },
///   "adjustment": "scale_power"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    /// Species name, looked up in the default catalog plus `extra_species`
    pub species: String,
    /// Additional or overriding species definitions
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extra_species: Vec<WoodSpecies>,
    /// Built-in line, ignored when `machines` is set
    pub line: SawmillLine,
    /// Explicit machine list
    #[serde(skip_serializing_if = "Option::is_none")]
    pub machines: Option<Vec<MachineProfile>>,
    pub target_volume_m3: f64,
    pub tariff: TariffSchedule,
    pub emissions_g_per_kwh: f64,
    pub schedule: OperatingSchedule,
    pub adjustment: HardnessAdjustment,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            species: "Fir/Spruce".to_string(),
            extra_species: Vec::new(),
            line: SawmillLine::Standard,
            machines: None,
            target_volume_m3: 1000.0,
            tariff: TariffSchedule::default(),
            emissions_g_per_kwh: DEFAULT_EMISSIONS_G_PER_KWH,
            schedule: OperatingSchedule::default(),
            adjustment: HardnessAdjustment::ScalePower,
        }
    }
}

impl ScenarioConfig {
    /// Parse from JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| WoodEnergyError::Scenario(e.to_string()))
    }

    /// Load from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            WoodEnergyError::Scenario(format!("Failed to read '{}': {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| WoodEnergyError::Scenario(e.to_string()))
    }

    /// Species catalog: defaults plus `extra_species`
    pub fn catalog(&self) -> SpeciesCatalog {
        let mut catalog = SpeciesCatalog::default();
        for species in &self.extra_species {
            catalog.insert(species.clone());
        }
        catalog
    }

    /// Resolve names into an estimator-ready [`Scenario`]
    pub fn resolve(&self) -> Result<Scenario> {
        let species = self.catalog().get(&self.species)?.clone();
        let profiles = match &self.machines {
            Some(machines) => machines.clone(),
            None => self.line.profiles(),
        };

        Ok(Scenario {
            profiles,
            config: ProductionConfig {
                species,
                target_volume_m3: self.target_volume_m3,
                tariff: self.tariff,
                emissions_g_per_kwh: self.emissions_g_per_kwh,
                schedule: self.schedule,
                adjustment: self.adjustment,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oak() -> WoodSpecies {
        WoodSpecies::new("Oak", 1.6, 0.6)
    }

    #[test]
    fn test_fixed_hours() {
        let schedule = OperatingSchedule::default();
        assert_eq!(schedule.hours(&oak(), 500.0), 176.0);
    }

    #[test]
    fn test_volume_driven_hours() {
        let schedule = OperatingSchedule::VolumeDriven {
            baseline_throughput_m3_per_hour: 10.0,
        };
        let hours = schedule.hours(&oak(), 500.0);
        assert!((hours - 83.333_333_333).abs() < 1e-6);
    }

    #[test]
    fn test_total_hours() {
        let schedule = OperatingSchedule::TotalHours { hours: 120.0 };
        assert_eq!(schedule.hours(&oak(), 500.0), 120.0);
    }

    #[test]
    fn test_presets() {
        let monthly = ProductionConfig::monthly_budget(oak(), 1000.0);
        assert_eq!(monthly.adjustment, HardnessAdjustment::ScalePower);
        assert!(matches!(monthly.schedule, OperatingSchedule::Fixed { .. }));

        let rentability = ProductionConfig::species_rentability(oak(), 500.0);
        assert_eq!(rentability.adjustment, HardnessAdjustment::ScaleLoadFactor);
        assert!(matches!(
            rentability.schedule,
            OperatingSchedule::VolumeDriven { .. }
        ));
    }

    #[test]
    fn test_validate_rejects_non_positive() {
        let config = ProductionConfig::monthly_budget(oak(), 0.0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NonPositive { .. })
        ));

        let config = ProductionConfig::monthly_budget(oak(), 100.0)
            .with_tariff(TariffSchedule::new(0.2, 0.0));
        assert!(config.validate().is_err());

        let config = ProductionConfig::monthly_budget(oak(), 100.0).with_emissions(-1.0);
        assert_eq!(config.validate(), Err(ConfigError::NegativeEmissions(-1.0)));

        let config = ProductionConfig::monthly_budget(oak(), 100.0)
            .with_schedule(OperatingSchedule::TotalHours { hours: 0.0 });
        assert!(config.validate().is_err());

        let config = ProductionConfig::monthly_budget(oak(), 100.0).with_emissions(0.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_scenario_defaults_roundtrip() {
        let scenario = ScenarioConfig::default();
        let json = scenario.to_json().unwrap();
        let parsed = ScenarioConfig::from_json(&json).unwrap();
        assert_eq!(parsed, scenario);
    }

    #[test]
    fn test_scenario_partial_json() {
        let json = r#"{
            "species": "Beech",
            "target_volume_m3": 500,
            "schedule": { "mode": "volume_driven", "baseline_throughput_m3_per_hour": 10 },
            "adjustment": "scale_load_factor"
        }"#;
        let scenario = ScenarioConfig::from_json(json).unwrap().resolve().unwrap();

        assert_eq!(scenario.profiles.len(), 5);
        assert_eq!(scenario.config.species.name, "Beech");
        assert_eq!(scenario.config.tariff, TariffSchedule::default());
        assert_eq!(
            scenario.config.adjustment,
            HardnessAdjustment::ScaleLoadFactor
        );
    }

    #[test]
    fn test_scenario_unknown_species() {
        let config = ScenarioConfig {
            species: "Teak".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.resolve(),
            Err(WoodEnergyError::InvalidConfiguration(
                ConfigError::UnknownSpecies("Teak".to_string())
            ))
        );
    }

    #[test]
    fn test_scenario_extra_species_and_machines() {
        let config = ScenarioConfig {
            species: "Douglas".to_string(),
            extra_species: vec![WoodSpecies::new("Douglas", 1.2, 0.9)],
            machines: Some(vec![MachineProfile::new("Band saw", 55.0, 0.6)]),
            ..Default::default()
        };
        let scenario = config.resolve().unwrap();
        assert_eq!(scenario.profiles.len(), 1);
        assert_eq!(scenario.config.species.effort_coefficient, 1.2);
    }

    #[test]
    fn test_scenario_from_file() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"species": "Oak", "line": "extended"}}"#).unwrap();
        file.flush().unwrap();

        let scenario = ScenarioConfig::from_file(file.path())
            .unwrap()
            .resolve()
            .unwrap();
        assert_eq!(scenario.profiles.len(), 6);
        assert_eq!(scenario.config.species.name, "Oak");

        assert!(ScenarioConfig::from_file(file.path().with_extension("missing")).is_err());
    }

    #[test]
    fn test_scenario_malformed_json() {
        assert!(matches!(
            ScenarioConfig::from_json("{ not json"),
            Err(WoodEnergyError::Scenario(_))
        ));
    }
}
