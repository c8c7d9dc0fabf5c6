// WoodEnergy Exporter - Live report state
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Shared report state behind the HTTP handlers and the replay engine.
//!
//! Every accepted telemetry message triggers a snapshot-then-compute cycle:
//! the telemetry lock is held only while copying the readings out, never
//! while the estimator runs.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, warn};
use woodenergy::{compute, AggregateReport, MachineProfile, ProductionConfig, Scenario};
use woodenergy_telemetry::{
    IngestOutcome, IngestStats, TelemetryError, TelemetryGenerator, TelemetryMessage,
    TelemetryStore,
};

use crate::metrics::{
    increment_recomputations, record_telemetry, update_report_metrics, TelemetryOutcome,
};

/// Current time in milliseconds since the Unix epoch.
pub fn now_ms() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}

/// Scenario, telemetry store and latest report.
pub struct Dashboard {
    profiles: Vec<MachineProfile>,
    config: ProductionConfig,
    telemetry: RwLock<TelemetryStore>,
    report: RwLock<Arc<AggregateReport>>,
}

impl Dashboard {
    /// Validate the scenario and compute the initial (nominal) report.
    pub fn new(scenario: Scenario) -> woodenergy::Result<Self> {
        let Scenario { profiles, config } = scenario;
        let report = compute(&profiles, &config, None)?;
        update_report_metrics(&report);

        Ok(Self {
            telemetry: RwLock::new(TelemetryStore::new(&profiles)),
            profiles,
            config,
            report: RwLock::new(Arc::new(report)),
        })
    }

    pub fn profiles(&self) -> &[MachineProfile] {
        &self.profiles
    }

    pub fn config(&self) -> &ProductionConfig {
        &self.config
    }

    /// Latest report.
    pub async fn report(&self) -> Arc<AggregateReport> {
        Arc::clone(&*self.report.read().await)
    }

    pub async fn telemetry_stats(&self) -> IngestStats {
        self.telemetry.read().await.stats()
    }

    /// Ingest one raw telemetry payload and recompute when accepted.
    pub async fn ingest(
        &self,
        payload: &[u8],
        timestamp_ms: u64,
    ) -> Result<IngestOutcome, TelemetryError> {
        let result = self.telemetry.write().await.ingest(payload, timestamp_ms);
        self.after_ingest(result).await
    }

    /// Record one reading and recompute when accepted.
    #[cfg(test)]
    pub async fn record(
        &self,
        machine: &str,
        power_kw: f64,
        timestamp_ms: u64,
    ) -> Result<IngestOutcome, TelemetryError> {
        let result = self
            .telemetry
            .write()
            .await
            .record(machine, power_kw, timestamp_ms);
        self.after_ingest(result).await
    }

    /// Record a batch of readings, then recompute once.
    pub async fn record_batch(&self, messages: &[TelemetryMessage], timestamp_ms: u64) -> usize {
        let mut accepted = 0;
        {
            let mut store = self.telemetry.write().await;
            for message in messages {
                match store.apply(message, timestamp_ms) {
                    Ok(_) => {
                        accepted += 1;
                        record_telemetry(TelemetryOutcome::Accepted);
                    }
                    Err(e) => {
                        warn!("Dropping telemetry: {}", e);
                        record_telemetry(TelemetryOutcome::from(&e));
                    }
                }
            }
        }
        if accepted > 0 {
            self.refresh().await;
        }
        accepted
    }

    /// Apply one round of simulated readings.
    pub async fn simulate(&self, generator: &mut (dyn TelemetryGenerator + Send)) -> usize {
        let messages = generator.generate(&self.profiles);
        self.record_batch(&messages, now_ms()).await
    }

    /// Snapshot the telemetry, compute, and publish the new report.
    ///
    /// The report lock is taken before the snapshot so that publications
    /// happen in snapshot order.
    pub async fn recompute(&self) -> woodenergy::Result<Arc<AggregateReport>> {
        let mut current = self.report.write().await;
        let snapshot = self.telemetry.read().await.snapshot();
        let report = Arc::new(compute(&self.profiles, &self.config, Some(&snapshot))?);
        increment_recomputations();

        if current.fingerprint() != report.fingerprint() {
            update_report_metrics(&report);
            *current = Arc::clone(&report);
            debug!(
                "Report updated: cost {:.2}, {} live machines",
                report.total_cost,
                report.live_count()
            );
        }
        Ok(Arc::clone(&current))
    }

    /// Forget every live reading and fall back to nominal power.
    pub async fn reset_telemetry(&self) {
        self.telemetry.write().await.clear();
        self.refresh().await;
    }

    async fn after_ingest(
        &self,
        result: Result<IngestOutcome, TelemetryError>,
    ) -> Result<IngestOutcome, TelemetryError> {
        match &result {
            Ok(_) => {
                record_telemetry(TelemetryOutcome::Accepted);
                self.refresh().await;
            }
            Err(e) => {
                warn!("Dropping telemetry: {}", e);
                record_telemetry(TelemetryOutcome::from(e));
            }
        }
        result
    }

    async fn refresh(&self) {
        if let Err(e) = self.recompute().await {
            // The configuration was validated in `new`, so this is unexpected
            tracing::error!("Recomputation failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use woodenergy::ScenarioConfig;
    use woodenergy_telemetry::LoadVariationSimulator;

    fn dashboard() -> Dashboard {
        let scenario = ScenarioConfig::default().resolve().unwrap();
        Dashboard::new(scenario).unwrap()
    }

    #[tokio::test]
    async fn test_initial_report_is_nominal() {
        let dashboard = dashboard();
        let report = dashboard.report().await;
        assert_eq!(report.machines.len(), 5);
        assert_eq!(report.live_count(), 0);
    }

    #[tokio::test]
    async fn test_ingest_updates_report() {
        let dashboard = dashboard();
        let before = dashboard.report().await;

        dashboard
            .ingest(br#"{"machine":"Kiln","power_kw":130}"#, 1)
            .await
            .unwrap();
        let after = dashboard.report().await;

        assert!(after.machine("Kiln").unwrap().live_reading_used);
        assert!(after.total_cost > before.total_cost);
    }

    #[tokio::test]
    async fn test_rejected_telemetry_keeps_report() {
        let dashboard = dashboard();
        let before = dashboard.report().await;

        assert!(dashboard.ingest(b"nope", 1).await.is_err());
        assert!(dashboard.record("Planer", 10.0, 2).await.is_err());

        let after = dashboard.report().await;
        assert_eq!(before.fingerprint(), after.fingerprint());
        assert_eq!(dashboard.telemetry_stats().await.rejected(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_ingest_publishes_latest_snapshot() {
        let dashboard = Arc::new(dashboard());
        let machines = ["Head saw", "Edger", "Dust extraction", "Kiln", "Conveyors"];

        let tasks: Vec<_> = machines
            .iter()
            .enumerate()
            .map(|(t, machine)| {
                let dashboard = Arc::clone(&dashboard);
                let machine = machine.to_string();
                tokio::spawn(async move {
                    for i in 0..20u64 {
                        let kw = 10.0 + (t as f64) * 7.0 + i as f64 * 0.5;
                        dashboard.record(&machine, kw, i).await.unwrap();
                    }
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        let snapshot = dashboard.telemetry.read().await.snapshot();
        let expected = compute(dashboard.profiles(), dashboard.config(), Some(&snapshot)).unwrap();
        let published = dashboard.report().await;

        assert_eq!(published.fingerprint(), expected.fingerprint());
        assert_eq!(published.live_count(), 5);
    }

    #[tokio::test]
    async fn test_simulate_and_reset() {
        let dashboard = dashboard();
        let mut sim = LoadVariationSimulator::seeded(11);

        assert_eq!(dashboard.simulate(&mut sim).await, 5);
        assert_eq!(dashboard.report().await.live_count(), 5);

        dashboard.reset_telemetry().await;
        assert_eq!(dashboard.report().await.live_count(), 0);
    }
}
