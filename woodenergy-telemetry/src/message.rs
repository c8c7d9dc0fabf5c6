// WoodEnergy Telemetry - Live power ingestion
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Telemetry message format.
//!
//! Example JSON:
//! ```json
//! { "machine": "Head saw", "power_kw": 78.4 }
//! ```
//!
//! `kw` is accepted as an alias of `power_kw` for older sensor gateways.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TelemetryError};

/// One power reading published by a machine sensor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryMessage {
    /// Machine key
    pub machine: String,
    /// Instantaneous power draw (kW)
    #[serde(alias = "kw")]
    pub power_kw: f64,
}

impl TelemetryMessage {
    pub fn new(machine: impl Into<String>, power_kw: f64) -> Self {
        Self {
            machine: machine.into(),
            power_kw,
        }
    }

    /// Parse from raw payload bytes (UTF-8 JSON)
    pub fn from_bytes(payload: &[u8]) -> Result<Self> {
        serde_json::from_slice(payload).map_err(|e| TelemetryError::ParseFailure(e.to_string()))
    }

    /// Parse from JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_bytes(json.as_bytes())
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
