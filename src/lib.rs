//! # WoodEnergy - Sawmill energy analytics
//!
//! Estimates electricity consumption, cost and CO2 emissions for the
//! machines of a sawmill line, given the wood species being cut, the
//! production volume, the tariff and the operating schedule.
//!
//! ## Key Features
//!
//! - **Pure estimator**: same inputs, bit-identical report
//! - **Two hardness models**: scale power draw, or scale load factor with a
//!   full-duty-cycle cap
//! - **Two schedules**: calendar hours, or hours needed to saw a volume
//! - **Live readings**: measured power replaces nominal power when usable
//!
//! ## Quick Start
//!
//! ```rust
//! use woodenergy::{compute, ProductionConfig, SawmillLine, SpeciesCatalog, LiveSnapshot};
//!
//! let profiles = SawmillLine::Standard.profiles();
//! let beech = SpeciesCatalog::default().get("Beech").unwrap().clone();
//! let config = ProductionConfig::monthly_budget(beech, 1000.0);
//!
//! // Nominal power everywhere
//! let report = compute(&profiles, &config, None).unwrap();
//! assert_eq!(report.machines.len(), 5);
//!
//! // With a live reading for the head saw
//! let live = LiveSnapshot::new().with_reading("Head saw", 82.5);
//! let live_report = compute(&profiles, &config, Some(&live)).unwrap();
//! assert!(live_report.machine("Head saw").unwrap().live_reading_used);
//! ```
//!
//! ## Modules
//!
//! - [`estimator`]: The cost-and-emissions computation
//! - [`config`]: Production configuration and JSON scenarios
//! - [`profile`]: Machine profiles and built-in lines
//! - [`species`]: Wood species catalog
//! - [`tariff`]: Peak / off-peak rates
//! - [`live`]: Live power snapshots
//! - [`report`]: Per-machine and aggregate reports
//! - [`export`]: CSV export

// Modules
pub mod config;
pub mod error;
pub mod estimator;
pub mod export;
pub mod live;
pub mod profile;
pub mod report;
pub mod species;
pub mod tariff;

// Re-exports for convenient access
pub use config::{
    HardnessAdjustment, OperatingSchedule, ProductionConfig, Scenario, ScenarioConfig,
};
pub use error::{ConfigError, Result, WoodEnergyError};
pub use estimator::{compute, validate, Estimator};
pub use export::{to_csv_string, write_csv, ExportError, ExportOptions};
pub use live::LiveSnapshot;
pub use profile::{MachineProfile, SawmillLine};
pub use report::{AggregateReport, MachineReport};
pub use species::{SpeciesCatalog, WoodSpecies};
pub use tariff::TariffSchedule;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
