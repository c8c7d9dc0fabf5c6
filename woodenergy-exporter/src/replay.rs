// WoodEnergy Exporter - Telemetry replay engine
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Replays recorded power readings from a CSV file into the dashboard.
//!
//! The file layout is `timestamp_ms,<machine>,<machine>,...` with one row per
//! sample. Empty cells mean "no reading" for that machine in that row.

use crate::dashboard::Dashboard;
use crate::metrics::update_replay_metrics;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use woodenergy_telemetry::TelemetryMessage;

/// Configuration for telemetry replay.
#[derive(Debug, Clone)]
pub struct ReplayConfig {
    /// Path to CSV dataset file.
    pub csv_path: String,
    /// Replay speed multiplier (1.0 = real-time, 10.0 = 10x faster).
    pub speed: f64,
    /// Whether to loop the dataset.
    pub loop_replay: bool,
    /// Interval after the last sample, and for single-row datasets.
    pub default_sample_interval_ms: u64,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            csv_path: String::new(),
            speed: 1.0,
            loop_replay: true,
            default_sample_interval_ms: 60_000,
        }
    }
}

/// State of the replay engine, shared with the HTTP handlers.
#[derive(Debug, Default)]
pub struct ReplayState {
    /// Current position in the dataset (sample index).
    pub position: AtomicUsize,
    /// Total samples in the dataset.
    pub total_samples: AtomicUsize,
    pub running: AtomicBool,
    pub paused: AtomicBool,
    stopped: AtomicBool,
}

impl ReplayState {
    /// Pause or resume the replay loop.
    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::SeqCst);
    }

    /// Ask the replay loop to exit. A stopped replay cannot be restarted.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
struct DataRow {
    timestamp_ms: u64,
    readings: Vec<TelemetryMessage>,
}

/// Feeds a recorded dataset through the dashboard.
pub struct ReplayEngine {
    config: ReplayConfig,
    state: Arc<ReplayState>,
    dashboard: Arc<Dashboard>,
    machines: Vec<String>,
    rows: Vec<DataRow>,
}

impl ReplayEngine {
    /// Load a CSV dataset for the given dashboard.
    ///
    /// Columns naming machines outside the dashboard's line are skipped with a
    /// warning.
    pub fn from_csv(config: ReplayConfig, dashboard: Arc<Dashboard>) -> Result<Self, ReplayError> {
        if !(config.speed > 0.0) {
            return Err(ReplayError::InvalidSpeed(config.speed));
        }
        let path = Path::new(&config.csv_path);
        if !path.exists() {
            return Err(ReplayError::FileNotFound(config.csv_path.clone()));
        }

        let (columns, rows) = Self::parse_csv(path)?;
        if rows.is_empty() {
            return Err(ReplayError::EmptyDataset);
        }

        let mut machines = Vec::new();
        for column in &columns {
            if woodenergy::profile::find(dashboard.profiles(), column).is_some() {
                machines.push(column.clone());
            } else {
                warn!("Ignoring replay column '{}': not a machine of the line", column);
            }
        }
        if machines.is_empty() {
            return Err(ReplayError::InvalidFormat(
                "No column matches a machine of the line".to_string(),
            ));
        }

        let rows: Vec<DataRow> = rows
            .into_iter()
            .map(|mut row| {
                row.readings.retain(|m| machines.contains(&m.machine));
                row
            })
            .collect();

        let state = Arc::new(ReplayState::default());
        state.total_samples.store(rows.len(), Ordering::SeqCst);

        info!(
            "Loaded dataset: {} machines, {} samples",
            machines.len(),
            rows.len()
        );

        Ok(Self {
            config,
            state,
            dashboard,
            machines,
            rows,
        })
    }

    /// Parse a CSV file into column names and data rows.
    fn parse_csv(path: &Path) -> Result<(Vec<String>, Vec<DataRow>), ReplayError> {
        let mut reader = csv::Reader::from_path(path)?;

        let headers = reader.headers()?.clone();
        let header_strs: Vec<&str> = headers.iter().map(str::trim).collect();

        if header_strs.is_empty() || header_strs[0] != "timestamp_ms" {
            return Err(ReplayError::InvalidFormat(
                "First column must be 'timestamp_ms'".to_string(),
            ));
        }

        let columns: Vec<String> = header_strs[1..].iter().map(|s| s.to_string()).collect();

        let mut rows = Vec::new();
        for (line, result) in reader.records().enumerate() {
            let record = result?;
            let Some(first) = record.get(0) else {
                continue;
            };

            let timestamp_ms: u64 = first.trim().parse().map_err(|_| {
                ReplayError::InvalidFormat(format!("Invalid timestamp on row {}", line + 1))
            })?;

            let readings = columns
                .iter()
                .enumerate()
                .filter_map(|(i, machine)| {
                    let cell = record.get(i + 1)?.trim();
                    match cell.parse::<f64>() {
                        Ok(kw) => Some(TelemetryMessage::new(machine.clone(), kw)),
                        Err(_) => {
                            if !cell.is_empty() {
                                debug!("Skipping unparsable cell '{}' for {}", cell, machine);
                            }
                            None
                        }
                    }
                })
                .collect();

            rows.push(DataRow {
                timestamp_ms,
                readings,
            });
        }

        Ok((columns, rows))
    }

    pub fn state(&self) -> Arc<ReplayState> {
        Arc::clone(&self.state)
    }

    /// Start the replay loop (runs until stopped or the dataset ends).
    pub async fn run(&self) {
        self.state.running.store(true, Ordering::SeqCst);
        info!(
            "Starting replay: speed={}, loop={}",
            self.config.speed, self.config.loop_replay
        );

        loop {
            if self.state.is_stopped() {
                info!("Replay stopped");
                self.state.running.store(false, Ordering::SeqCst);
                break;
            }

            if self.state.paused.load(Ordering::SeqCst) {
                sleep(Duration::from_millis(100)).await;
                continue;
            }

            let position = self.state.position.load(Ordering::SeqCst);

            if position >= self.rows.len() {
                if self.config.loop_replay {
                    info!("Dataset complete, looping...");
                    self.state.position.store(0, Ordering::SeqCst);
                    self.dashboard.reset_telemetry().await;
                    continue;
                } else {
                    info!("Dataset complete, stopping");
                    self.state.running.store(false, Ordering::SeqCst);
                    break;
                }
            }

            let row = &self.rows[position];
            self.process_row(row, position).await;

            self.state.position.fetch_add(1, Ordering::SeqCst);
            update_replay_metrics(position + 1, self.rows.len(), self.config.speed);

            let base_interval_ms = match self.rows.get(position + 1) {
                Some(next) => next.timestamp_ms.saturating_sub(row.timestamp_ms),
                None => self.config.default_sample_interval_ms,
            };

            let sleep_ms = (base_interval_ms as f64 / self.config.speed) as u64;
            if sleep_ms > 0 {
                sleep(Duration::from_millis(sleep_ms)).await;
            }
        }
    }

    async fn process_row(&self, row: &DataRow, position: usize) {
        debug!(
            "Replaying sample {} at timestamp {} ({} readings)",
            position,
            row.timestamp_ms,
            row.readings.len()
        );
        if row.readings.is_empty() {
            return;
        }
        self.dashboard
            .record_batch(&row.readings, row.timestamp_ms)
            .await;
    }

    pub fn dataset_info(&self) -> DatasetInfo {
        let duration_ms = match (self.rows.first(), self.rows.last()) {
            (Some(first), Some(last)) => last.timestamp_ms.saturating_sub(first.timestamp_ms),
            _ => 0,
        };

        DatasetInfo {
            machine_count: self.machines.len(),
            sample_count: self.rows.len(),
            duration_ms,
            machines: self.machines.clone(),
        }
    }
}

/// Dataset information.
#[derive(Debug, Clone)]
pub struct DatasetInfo {
    pub machine_count: usize,
    pub sample_count: usize,
    pub duration_ms: u64,
    pub machines: Vec<String>,
}

/// Replay errors.
#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Empty dataset")]
    EmptyDataset,

    #[error("Replay speed must be positive, got {0}")]
    InvalidSpeed(f64),
}
