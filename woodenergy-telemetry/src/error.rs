// WoodEnergy Telemetry - Live power ingestion
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Error types for WoodEnergy Telemetry

use thiserror::Error;

/// Reasons a telemetry message is dropped
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TelemetryError {
    /// Payload is not valid JSON or misses a field
    #[error("Unparseable telemetry payload: {0}")]
    ParseFailure(String),

    /// Message names a machine outside the line
    #[error("Unknown machine in telemetry: {0}")]
    UnknownTelemetry(String),

    /// Power value is NaN or infinite
    #[error("Non-finite power for {machine}: {value}")]
    NonFiniteValue { machine: String, value: f64 },
}

/// Result type alias for telemetry operations
pub type Result<T> = std::result::Result<T, TelemetryError>;
