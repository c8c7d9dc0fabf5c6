// WoodEnergy Telemetry - Live power ingestion
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Last-known-value store for live power readings
//!
//! The [`TelemetryStore`] keeps the most recent reading per known machine.
//! Estimations never read it directly: they work on a [`LiveSnapshot`]
//! copied out of the store, so a producer updating the store cannot tear
//! a computation in progress.

use std::collections::{HashMap, HashSet};

use woodenergy::{LiveSnapshot, MachineProfile};

use crate::error::{Result, TelemetryError};
use crate::message::TelemetryMessage;

/// A stored reading
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    /// Power draw (kW), possibly non-positive
    pub power_kw: f64,
    /// Caller-supplied receive time (ms)
    pub timestamp_ms: u64,
}

/// What an accepted message did to the store
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IngestOutcome {
    /// First reading for this machine
    Inserted,
    /// Replaced an earlier reading
    Updated { previous_kw: f64 },
}

/// Message counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub accepted: u64,
    pub malformed: u64,
    pub unknown: u64,
}

impl IngestStats {
    /// Total messages dropped
    pub fn rejected(&self) -> u64 {
        self.malformed + self.unknown
    }
}

/// Most recent reading per machine of a line
#[derive(Debug, Clone)]
pub struct TelemetryStore {
    known: HashSet<String>,
    readings: HashMap<String, Reading>,
    stats: IngestStats,
}

impl TelemetryStore {
    /// Create a store accepting readings for the given machines
    pub fn new(profiles: &[MachineProfile]) -> Self {
        Self::with_machines(profiles.iter().map(|p| p.name.clone()))
    }

    /// Create a store from bare machine names
    pub fn with_machines(machines: impl IntoIterator<Item = String>) -> Self {
        Self {
            known: machines.into_iter().collect(),
            readings: HashMap::new(),
            stats: IngestStats::default(),
        }
    }

    /// Parse and record a raw payload.
    ///
    /// Errors leave the store unchanged; the caller logs and drops them.
    pub fn ingest(&mut self, payload: &[u8], timestamp_ms: u64) -> Result<IngestOutcome> {
        let message = match TelemetryMessage::from_bytes(payload) {
            Ok(message) => message,
            Err(e) => {
                self.stats.malformed += 1;
                log::debug!("Dropping telemetry payload: {}", e);
                return Err(e);
            }
        };
        self.apply(&message, timestamp_ms)
    }

    /// Record an already parsed message
    pub fn apply(
        &mut self,
        message: &TelemetryMessage,
        timestamp_ms: u64,
    ) -> Result<IngestOutcome> {
        self.record(&message.machine, message.power_kw, timestamp_ms)
    }

    /// Record a reading for a machine
    pub fn record(
        &mut self,
        machine: &str,
        power_kw: f64,
        timestamp_ms: u64,
    ) -> Result<IngestOutcome> {
        if !self.known.contains(machine) {
            self.stats.unknown += 1;
            log::debug!("Dropping telemetry for unknown machine '{}'", machine);
            return Err(TelemetryError::UnknownTelemetry(machine.to_string()));
        }
        if !power_kw.is_finite() {
            self.stats.malformed += 1;
            return Err(TelemetryError::NonFiniteValue {
                machine: machine.to_string(),
                value: power_kw,
            });
        }

        self.stats.accepted += 1;
        let reading = Reading {
            power_kw,
            timestamp_ms,
        };
        Ok(match self.readings.insert(machine.to_string(), reading) {
            Some(previous) => IngestOutcome::Updated {
                previous_kw: previous.power_kw,
            },
            None => IngestOutcome::Inserted,
        })
    }

    /// Immutable copy of the current readings
    pub fn snapshot(&self) -> LiveSnapshot {
        self.readings
            .iter()
            .map(|(machine, reading)| (machine.clone(), reading.power_kw))
            .collect()
    }

    /// Copy of the readings received at or after `since_ms`
    pub fn snapshot_since(&self, since_ms: u64) -> LiveSnapshot {
        self.readings
            .iter()
            .filter(|(_, reading)| reading.timestamp_ms >= since_ms)
            .map(|(machine, reading)| (machine.clone(), reading.power_kw))
            .collect()
    }

    /// Latest reading for a machine
    pub fn reading(&self, machine: &str) -> Option<&Reading> {
        self.readings.get(machine)
    }

    /// Number of machines with a reading
    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn stats(&self) -> IngestStats {
        self.stats
    }

    /// Forget every reading (counters are kept)
    pub fn clear(&mut self) {
        self.readings.clear();
    }
}
