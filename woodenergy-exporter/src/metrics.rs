// WoodEnergy Exporter - Prometheus metrics definitions
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Prometheus metrics for WoodEnergy reports.
//!
//! This module defines all Prometheus metrics exposed by the exporter
//! and provides functions to update them from an [`AggregateReport`].

use lazy_static::lazy_static;
use prometheus::{
    register_counter, register_counter_vec, register_gauge, register_gauge_vec, Counter,
    CounterVec, Encoder, Gauge, GaugeVec, TextEncoder,
};
use woodenergy::AggregateReport;
use woodenergy_telemetry::TelemetryError;

lazy_static! {
    // ============================================================
    // Line totals (from AggregateReport)
    // ============================================================

    /// Energy budget for the period.
    pub static ref TOTAL_COST: Gauge = register_gauge!(
        "woodenergy_total_cost",
        "Electricity cost of the whole line for the period"
    ).unwrap();

    pub static ref TOTAL_CONSUMPTION_KWH: Gauge = register_gauge!(
        "woodenergy_total_consumption_kwh",
        "Electricity consumed by the whole line in kWh"
    ).unwrap();

    pub static ref TOTAL_EMISSIONS_TONNES: Gauge = register_gauge!(
        "woodenergy_total_emissions_tonnes",
        "CO2 emitted by the whole line in tonnes"
    ).unwrap();

    /// Total cost divided by target volume.
    pub static ref COST_PER_M3: Gauge = register_gauge!(
        "woodenergy_cost_per_m3",
        "Energy cost per cubic metre produced"
    ).unwrap();

    pub static ref EFFORT_COEFFICIENT: Gauge = register_gauge!(
        "woodenergy_effort_coefficient",
        "Effort coefficient of the species being cut"
    ).unwrap();

    pub static ref OPERATING_HOURS: Gauge = register_gauge!(
        "woodenergy_operating_hours",
        "Operating hours for the period"
    ).unwrap();

    pub static ref TARGET_VOLUME_M3: Gauge = register_gauge!(
        "woodenergy_target_volume_m3",
        "Target production volume in cubic metres"
    ).unwrap();

    // ============================================================
    // Per-machine metrics (labeled by machine name)
    // ============================================================

    pub static ref MACHINE_POWER_KW: GaugeVec = register_gauge_vec!(
        "woodenergy_machine_power_kw",
        "Power used in the estimate after hardness adjustment",
        &["machine"]
    ).unwrap();

    pub static ref MACHINE_LOAD_FACTOR: GaugeVec = register_gauge_vec!(
        "woodenergy_machine_load_factor",
        "Load factor used in the estimate",
        &["machine"]
    ).unwrap();

    pub static ref MACHINE_CONSUMPTION_KWH: GaugeVec = register_gauge_vec!(
        "woodenergy_machine_consumption_kwh",
        "Electricity consumed per machine in kWh",
        &["machine"]
    ).unwrap();

    pub static ref MACHINE_COST: GaugeVec = register_gauge_vec!(
        "woodenergy_machine_cost",
        "Electricity cost per machine",
        &["machine"]
    ).unwrap();

    pub static ref MACHINE_EMISSIONS_TONNES: GaugeVec = register_gauge_vec!(
        "woodenergy_machine_emissions_tonnes",
        "CO2 emitted per machine in tonnes",
        &["machine"]
    ).unwrap();

    pub static ref MACHINE_COST_PER_M3: GaugeVec = register_gauge_vec!(
        "woodenergy_machine_cost_per_m3",
        "Energy cost per cubic metre, per machine",
        &["machine"]
    ).unwrap();

    /// 1 when a live reading replaced nominal power.
    pub static ref MACHINE_LIVE: GaugeVec = register_gauge_vec!(
        "woodenergy_machine_live",
        "Whether the machine estimate uses a live reading (1) or nominal power (0)",
        &["machine"]
    ).unwrap();

    // ============================================================
    // Event Counters
    // ============================================================

    /// Telemetry messages by outcome (accepted, malformed, unknown).
    pub static ref TELEMETRY_MESSAGES_TOTAL: CounterVec = register_counter_vec!(
        "woodenergy_telemetry_messages_total",
        "Telemetry messages received, by outcome",
        &["outcome"]
    ).unwrap();

    pub static ref RECOMPUTATIONS_TOTAL: Counter = register_counter!(
        "woodenergy_recomputations_total",
        "Reports recomputed since startup"
    ).unwrap();

    // ============================================================
    // Exporter Metrics
    // ============================================================

    /// Current replay position (sample index).
    pub static ref REPLAY_POSITION: Gauge = register_gauge!(
        "woodenergy_exporter_replay_position",
        "Current replay position (sample index)"
    ).unwrap();

    /// Total samples in the replay dataset.
    pub static ref REPLAY_TOTAL_SAMPLES: Gauge = register_gauge!(
        "woodenergy_exporter_replay_total_samples",
        "Total samples in the replay dataset"
    ).unwrap();

    /// Replay speed multiplier.
    pub static ref REPLAY_SPEED: Gauge = register_gauge!(
        "woodenergy_exporter_replay_speed",
        "Replay speed multiplier"
    ).unwrap();
}

/// Outcome label of a telemetry message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelemetryOutcome {
    Accepted,
    Malformed,
    Unknown,
}

impl TelemetryOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            TelemetryOutcome::Accepted => "accepted",
            TelemetryOutcome::Malformed => "malformed",
            TelemetryOutcome::Unknown => "unknown",
        }
    }
}

impl From<&TelemetryError> for TelemetryOutcome {
    fn from(err: &TelemetryError) -> Self {
        match err {
            TelemetryError::UnknownTelemetry(_) => TelemetryOutcome::Unknown,
            TelemetryError::ParseFailure(_) | TelemetryError::NonFiniteValue { .. } => {
                TelemetryOutcome::Malformed
            }
        }
    }
}

/// Update every report gauge.
pub fn update_report_metrics(report: &AggregateReport) {
    TOTAL_COST.set(report.total_cost);
    TOTAL_CONSUMPTION_KWH.set(report.total_consumption_kwh);
    TOTAL_EMISSIONS_TONNES.set(report.total_emissions_tonnes);
    COST_PER_M3.set(report.cost_per_m3);
    EFFORT_COEFFICIENT.set(report.effort_coefficient);
    OPERATING_HOURS.set(report.operating_hours);
    TARGET_VOLUME_M3.set(report.target_volume_m3);

    for m in &report.machines {
        let labels = [m.name.as_str()];
        MACHINE_POWER_KW
            .with_label_values(&labels)
            .set(m.adjusted_power_kw);
        MACHINE_LOAD_FACTOR
            .with_label_values(&labels)
            .set(m.effective_load_factor);
        MACHINE_CONSUMPTION_KWH
            .with_label_values(&labels)
            .set(m.consumption_kwh);
        MACHINE_COST.with_label_values(&labels).set(m.cost);
        MACHINE_EMISSIONS_TONNES
            .with_label_values(&labels)
            .set(m.emissions_tonnes);
        MACHINE_COST_PER_M3
            .with_label_values(&labels)
            .set(m.cost_per_m3);
        MACHINE_LIVE
            .with_label_values(&labels)
            .set(if m.live_reading_used { 1.0 } else { 0.0 });
    }
}

/// Count a telemetry message.
pub fn record_telemetry(outcome: TelemetryOutcome) {
    TELEMETRY_MESSAGES_TOTAL
        .with_label_values(&[outcome.as_str()])
        .inc();
}

/// Count a recomputation.
pub fn increment_recomputations() {
    RECOMPUTATIONS_TOTAL.inc();
}

/// Update replay position metrics.
pub fn update_replay_metrics(position: usize, total: usize, speed: f64) {
    REPLAY_POSITION.set(position as f64);
    REPLAY_TOTAL_SAMPLES.set(total as f64);
    REPLAY_SPEED.set(speed);
}

/// Encode all metrics to Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
    }
    String::from_utf8(buffer).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use woodenergy::{compute, ProductionConfig, SawmillLine, WoodSpecies};

    #[test]
    fn test_outcome_from_error() {
        assert_eq!(
            TelemetryOutcome::from(&TelemetryError::UnknownTelemetry("x".to_string())),
            TelemetryOutcome::Unknown
        );
        assert_eq!(
            TelemetryOutcome::from(&TelemetryError::ParseFailure("eof".to_string())),
            TelemetryOutcome::Malformed
        );
        assert_eq!(TelemetryOutcome::Accepted.as_str(), "accepted");
    }

    #[test]
    fn test_encode_metrics() {
        let profiles = SawmillLine::Standard.profiles();
        let config =
            ProductionConfig::monthly_budget(WoodSpecies::new("Fir/Spruce", 1.0, 1.2), 1000.0);
        let report = compute(&profiles, &config, None).unwrap();

        update_report_metrics(&report);
        record_telemetry(TelemetryOutcome::Accepted);
        increment_recomputations();

        let output = encode_metrics();
        assert!(output.contains("woodenergy_total_cost"));
        assert!(output.contains("woodenergy_machine_cost{machine=\"Kiln\"}"));
        assert!(output.contains("woodenergy_telemetry_messages_total"));
    }
}
