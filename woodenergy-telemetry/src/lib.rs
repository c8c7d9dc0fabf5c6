// WoodEnergy Telemetry - Live power ingestion
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! # WoodEnergy Telemetry - Live power ingestion
//!
//! Turns sensor messages into the [`LiveSnapshot`](woodenergy::LiveSnapshot)
//! consumed by the WoodEnergy estimator.
//!
//! ## Features
//!
//! - **Message parsing**: `{"machine": ..., "power_kw": ...}` JSON payloads
//! - **Last-known value store**: one reading per machine of the line
//! - **Explicit drops**: malformed or unknown-machine messages come back as
//!   errors for the caller to log, and never touch the store
//! - **Simulation**: seeded load-variation generator for benches without sensors
//!
//! ## Quick Start
//!
//! ```rust
//! use woodenergy::{compute, ProductionConfig, SawmillLine, WoodSpecies};
//! use woodenergy_telemetry::{TelemetryError, TelemetryStore};
//!
//! let profiles = SawmillLine::Standard.profiles();
//! let mut store = TelemetryStore::new(&profiles);
//!
//! store.ingest(br#"{"machine":"Head saw","power_kw":81.0}"#, 1_000).unwrap();
//!
//! // Unknown machines are reported, not stored
//! let err = store.ingest(br#"{"machine":"Planer","power_kw":9.0}"#, 1_001);
//! assert!(matches!(err, Err(TelemetryError::UnknownTelemetry(_))));
//!
//! // Snapshot, then compute
//! let live = store.snapshot();
//! let config = ProductionConfig::monthly_budget(WoodSpecies::new("Pine", 1.1, 1.0), 800.0);
//! let report = compute(&profiles, &config, Some(&live)).unwrap();
//! assert!(report.machine("Head saw").unwrap().live_reading_used);
//! ```

mod error;
mod message;
mod simulator;
mod store;

// Public API
pub use error::{Result, TelemetryError};
pub use message::TelemetryMessage;
pub use simulator::{LoadVariationSimulator, NoiseModel, NominalGenerator, TelemetryGenerator};
pub use store::{IngestOutcome, IngestStats, Reading, TelemetryStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
