// WoodEnergy Exporter - Prometheus exporter for sawmill energy reports
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! # WoodEnergy Exporter
//!
//! Serves the energy report of a sawmill line over HTTP, keeps it current
//! with live power telemetry, and exposes it as Prometheus metrics.
//!
//! ## Usage
//!
//! ```bash
//! # Print the monthly report for oak and exit
//! woodenergy-exporter --species Oak --once
//!
//! # Serve a scenario file and replay recorded telemetry 10x faster
//! woodenergy-exporter --scenario line.json --csv readings.csv --speed 10.0
//!
//! # Push a reading
//! curl -X POST localhost:9100/telemetry -d '{"machine":"Kiln","power_kw":118}'
//! ```

mod dashboard;
mod metrics;

#[cfg(feature = "replay")]
mod replay;

use axum::{
    body::Bytes,
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use clap::Parser;
use dashboard::{now_ms, Dashboard};
use metrics::encode_metrics;
use serde::Serialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;
use woodenergy::{
    to_csv_string, write_csv, AggregateReport, ExportOptions, Scenario, ScenarioConfig,
};
use woodenergy_telemetry::{IngestOutcome, LoadVariationSimulator, TelemetryError};

#[cfg(feature = "replay")]
use replay::{DatasetInfo, ReplayConfig, ReplayEngine, ReplayState};

/// WoodEnergy Prometheus Exporter
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "9100")]
    port: u16,

    /// Scenario JSON file (defaults to the standard line cutting Fir/Spruce)
    #[arg(long)]
    scenario: Option<PathBuf>,

    /// Override the scenario's species
    #[arg(long)]
    species: Option<String>,

    /// Write the machine table as CSV to this path
    #[arg(long)]
    export_csv: Option<PathBuf>,

    /// Print the report and exit without serving
    #[arg(long)]
    once: bool,

    /// Telemetry CSV file to replay
    #[arg(short, long)]
    csv: Option<String>,

    /// Replay speed multiplier (1.0 = real-time)
    #[arg(long, default_value = "1.0")]
    speed: f64,

    /// Loop the replay when it reaches the end
    #[arg(long)]
    loop_replay: bool,

    /// Seed for POST /simulate (random when absent)
    #[arg(long)]
    seed: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// Application state shared across handlers.
struct AppState {
    dashboard: Arc<Dashboard>,
    simulator: Mutex<LoadVariationSimulator>,
    #[cfg(feature = "replay")]
    replay_state: Option<Arc<ReplayState>>,
    #[cfg(feature = "replay")]
    dataset_info: Option<DatasetInfo>,
    start_time: std::time::Instant,
    started_at: DateTime<Utc>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = match args.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        };
        EnvFilter::from_default_env().add_directive(level.into())
    });

    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("WoodEnergy Exporter v{}", env!("CARGO_PKG_VERSION"));

    let scenario = match load_scenario(&args) {
        Ok(scenario) => scenario,
        Err(e) => {
            error!("Invalid scenario: {}", e);
            std::process::exit(1);
        }
    };

    info!(
        "Scenario: {} machines, species {}, {} m³",
        scenario.profiles.len(),
        scenario.config.species.name,
        scenario.config.target_volume_m3
    );

    let dashboard = match Dashboard::new(scenario) {
        Ok(dashboard) => Arc::new(dashboard),
        Err(e) => {
            error!("Invalid scenario: {}", e);
            std::process::exit(1);
        }
    };

    if args.once {
        let report = dashboard.report().await;
        println!("{}", report.summary());
        if let Some(path) = &args.export_csv {
            if let Err(e) = export_to_file(&report, path) {
                error!("Failed to write {}: {}", path.display(), e);
                std::process::exit(1);
            }
            info!("Wrote {}", path.display());
        }
        return;
    }

    if let Some(path) = &args.export_csv {
        let report = dashboard.report().await;
        match export_to_file(&report, path) {
            Ok(()) => info!("Wrote {}", path.display()),
            Err(e) => error!("Failed to write {}: {}", path.display(), e),
        }
    }

    #[cfg(feature = "replay")]
    let (replay_state, dataset_info) = if let Some(csv_path) = args.csv.clone() {
        let config = ReplayConfig {
            csv_path,
            speed: args.speed,
            loop_replay: args.loop_replay,
            default_sample_interval_ms: 60_000,
        };

        match ReplayEngine::from_csv(config, Arc::clone(&dashboard)) {
            Ok(engine) => {
                let state = engine.state();
                let info = engine.dataset_info();

                info!(
                    "Dataset loaded: {} machines, {} samples",
                    info.machine_count, info.sample_count
                );

                tokio::spawn(async move {
                    engine.run().await;
                });

                (Some(state), Some(info))
            }
            Err(e) => {
                error!("Failed to load dataset: {}", e);
                (None, None)
            }
        }
    } else {
        info!("No dataset specified, waiting for telemetry on POST /telemetry");
        (None, None)
    };

    #[cfg(not(feature = "replay"))]
    if args.csv.is_some() {
        tracing::warn!("Replay feature not enabled, ignoring --csv argument");
    }

    let simulator = match args.seed {
        Some(seed) => LoadVariationSimulator::seeded(seed),
        None => LoadVariationSimulator::from_entropy(),
    };

    let state = Arc::new(AppState {
        dashboard,
        simulator: Mutex::new(simulator),
        #[cfg(feature = "replay")]
        replay_state,
        #[cfg(feature = "replay")]
        dataset_info,
        start_time: std::time::Instant::now(),
        started_at: Utc::now(),
    });

    let app = Router::new()
        .route("/", get(root_handler))
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .route("/status", get(status_handler))
        .route("/report", get(report_handler))
        .route("/report.csv", get(report_csv_handler))
        .route("/telemetry", post(telemetry_handler))
        .route("/simulate", post(simulate_handler));

    #[cfg(feature = "replay")]
    let app = app
        .route("/replay/pause", post(replay_pause_handler))
        .route("/replay/resume", post(replay_resume_handler))
        .route("/replay/stop", post(replay_stop_handler));

    let app = app.with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    info!("Starting server on http://{}", addr);
    info!("Metrics endpoint: http://{}/metrics", addr);

    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Scenario from file or defaults, with the species override applied.
fn load_scenario(args: &Args) -> woodenergy::Result<Scenario> {
    let mut config = match &args.scenario {
        Some(path) => ScenarioConfig::from_file(path)?,
        None => ScenarioConfig::default(),
    };
    if let Some(species) = &args.species {
        config.species = species.clone();
    }
    config.resolve()
}

fn export_to_file(report: &AggregateReport, path: &Path) -> Result<(), woodenergy::ExportError> {
    let file = std::fs::File::create(path)?;
    write_csv(report, file, &ExportOptions::default())
}

/// Root handler - shows a simple HTML page.
async fn root_handler() -> Html<&'static str> {
    Html(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>WoodEnergy Exporter</title>
    <style>
        body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; max-width: 800px; margin: 50px auto; padding: 20px; }
        h1 { color: #5d4037; }
        a { color: #3498db; text-decoration: none; }
        a:hover { text-decoration: underline; }
        .endpoints { background: #f8f9fa; padding: 20px; border-radius: 8px; margin: 20px 0; }
        .endpoint { margin: 10px 0; }
        code { background: #e9ecef; padding: 2px 6px; border-radius: 4px; }
    </style>
</head>
<body>
    <h1>WoodEnergy Exporter</h1>
    <p>Electricity cost and CO2 estimates for a sawmill line.</p>

    <div class="endpoints">
        <h2>Endpoints</h2>
        <div class="endpoint"><a href="/metrics">/metrics</a> - Prometheus metrics</div>
        <div class="endpoint"><a href="/report">/report</a> - Current report (JSON)</div>
        <div class="endpoint"><a href="/report.csv">/report.csv</a> - Machine table (CSV)</div>
        <div class="endpoint"><a href="/health">/health</a> - Health check</div>
        <div class="endpoint"><a href="/ready">/ready</a> - Readiness check</div>
        <div class="endpoint"><a href="/status">/status</a> - Status information (JSON)</div>
        <div class="endpoint"><code>POST /telemetry</code> - <code>{"machine": "...", "power_kw": ...}</code></div>
        <div class="endpoint"><code>POST /simulate</code> - Apply one simulated load variation</div>
        <div class="endpoint"><code>POST /replay/pause</code>, <code>/replay/resume</code>, <code>/replay/stop</code> - Control the telemetry replay</div>
    </div>

    <h2>Metrics</h2>
    <ul>
        <li><code>woodenergy_total_cost</code> - Energy budget for the period</li>
        <li><code>woodenergy_total_emissions_tonnes</code> - CO2 for the period</li>
        <li><code>woodenergy_cost_per_m3</code> - Energy cost per cubic metre</li>
        <li><code>woodenergy_machine_*</code> - Per-machine power, consumption, cost and emissions</li>
        <li><code>woodenergy_telemetry_messages_total</code> - Telemetry by outcome</li>
    </ul>
</body>
</html>"#,
    )
}

/// Metrics handler - returns Prometheus text format.
async fn metrics_handler() -> impl IntoResponse {
    let metrics = encode_metrics();
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        metrics,
    )
}

async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Ready once the replay (if any) is running.
async fn ready_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    #[cfg(feature = "replay")]
    {
        if let Some(ref replay_state) = state.replay_state {
            if !replay_state
                .running
                .load(std::sync::atomic::Ordering::SeqCst)
                && replay_state
                    .position
                    .load(std::sync::atomic::Ordering::SeqCst)
                    == 0
            {
                return (StatusCode::SERVICE_UNAVAILABLE, "Starting");
            }
        }
    }
    let _ = state;
    (StatusCode::OK, "Ready")
}

/// Status information response.
#[derive(Serialize)]
struct StatusResponse {
    version: String,
    started_at: DateTime<Utc>,
    uptime_secs: u64,
    species: String,
    machine_count: usize,
    operating_hours: f64,
    telemetry: TelemetryStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    replay: Option<ReplayStatus>,
}

#[derive(Serialize)]
struct TelemetryStatus {
    accepted: u64,
    malformed: u64,
    unknown: u64,
}

/// Replay status information.
#[derive(Serialize)]
struct ReplayStatus {
    running: bool,
    paused: bool,
    position: usize,
    total_samples: usize,
    progress_percent: f64,
    machines: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_ms: Option<u64>,
}

async fn status_handler(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    #[cfg(feature = "replay")]
    let replay = state.replay_state.as_ref().map(|replay_state| {
        let position = replay_state
            .position
            .load(std::sync::atomic::Ordering::SeqCst);
        let total = replay_state
            .total_samples
            .load(std::sync::atomic::Ordering::SeqCst);
        let progress = if total > 0 {
            (position as f64 / total as f64) * 100.0
        } else {
            0.0
        };

        ReplayStatus {
            running: replay_state
                .running
                .load(std::sync::atomic::Ordering::SeqCst),
            paused: replay_state
                .paused
                .load(std::sync::atomic::Ordering::SeqCst),
            position,
            total_samples: total,
            progress_percent: progress,
            machines: state
                .dataset_info
                .as_ref()
                .map(|i| i.machines.clone())
                .unwrap_or_default(),
            duration_ms: state.dataset_info.as_ref().map(|i| i.duration_ms),
        }
    });

    #[cfg(not(feature = "replay"))]
    let replay: Option<ReplayStatus> = None;

    let stats = state.dashboard.telemetry_stats().await;
    let config = state.dashboard.config();

    Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        started_at: state.started_at,
        uptime_secs: state.start_time.elapsed().as_secs(),
        species: config.species.name.clone(),
        machine_count: state.dashboard.profiles().len(),
        operating_hours: config.operating_hours(),
        telemetry: TelemetryStatus {
            accepted: stats.accepted,
            malformed: stats.malformed,
            unknown: stats.unknown,
        },
        replay,
    })
}

#[derive(Serialize)]
struct ReportResponse {
    generated_at: DateTime<Utc>,
    fingerprint: String,
    surcharge_percent: f64,
    #[serde(flatten)]
    report: AggregateReport,
}

async fn report_handler(State(state): State<Arc<AppState>>) -> Json<ReportResponse> {
    let report = state.dashboard.report().await;
    Json(ReportResponse {
        generated_at: Utc::now(),
        fingerprint: format!("{:016x}", report.fingerprint()),
        surcharge_percent: report.surcharge_percent(),
        report: AggregateReport::clone(&report),
    })
}

async fn report_csv_handler(State(state): State<Arc<AppState>>) -> Response {
    let report = state.dashboard.report().await;
    match to_csv_string(&report, &ExportOptions::default()) {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/csv; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!("CSV export failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

#[derive(Serialize)]
struct TelemetryResponse {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    previous_kw: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Ingest one telemetry message.
///
/// 202 when stored, 400 for malformed payloads, 422 for unknown machines.
async fn telemetry_handler(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> (StatusCode, Json<TelemetryResponse>) {
    match state.dashboard.ingest(&body, now_ms()).await {
        Ok(outcome) => {
            let previous_kw = match outcome {
                IngestOutcome::Inserted => None,
                IngestOutcome::Updated { previous_kw } => Some(previous_kw),
            };
            (
                StatusCode::ACCEPTED,
                Json(TelemetryResponse {
                    status: "accepted",
                    previous_kw,
                    error: None,
                }),
            )
        }
        Err(e) => {
            let code = match e {
                TelemetryError::UnknownTelemetry(_) => StatusCode::UNPROCESSABLE_ENTITY,
                TelemetryError::ParseFailure(_) | TelemetryError::NonFiniteValue { .. } => {
                    StatusCode::BAD_REQUEST
                }
            };
            (
                code,
                Json(TelemetryResponse {
                    status: "rejected",
                    previous_kw: None,
                    error: Some(e.to_string()),
                }),
            )
        }
    }
}

#[derive(Serialize)]
struct SimulateResponse {
    accepted: usize,
    total_cost: f64,
    total_emissions_tonnes: f64,
}

/// Apply one round of simulated load variation.
async fn simulate_handler(State(state): State<Arc<AppState>>) -> Json<SimulateResponse> {
    let accepted = {
        let mut simulator = state.simulator.lock().await;
        state.dashboard.simulate(&mut *simulator).await
    };
    let report = state.dashboard.report().await;
    Json(SimulateResponse {
        accepted,
        total_cost: report.total_cost,
        total_emissions_tonnes: report.total_emissions_tonnes,
    })
}

#[cfg(feature = "replay")]
#[derive(Debug, Clone, Copy)]
enum ReplayCommand {
    Pause,
    Resume,
    Stop,
}

#[cfg(feature = "replay")]
fn control_replay(state: &AppState, command: ReplayCommand) -> (StatusCode, &'static str) {
    let Some(replay) = state.replay_state.as_ref() else {
        return (StatusCode::NOT_FOUND, "No replay loaded");
    };
    if replay.is_stopped() {
        return (StatusCode::CONFLICT, "Replay stopped");
    }
    info!("Replay command: {:?}", command);
    match command {
        ReplayCommand::Pause => {
            replay.set_paused(true);
            (StatusCode::OK, "Paused")
        }
        ReplayCommand::Resume => {
            replay.set_paused(false);
            (StatusCode::OK, "Resumed")
        }
        ReplayCommand::Stop => {
            replay.stop();
            (StatusCode::OK, "Stopped")
        }
    }
}

#[cfg(feature = "replay")]
async fn replay_pause_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    control_replay(&state, ReplayCommand::Pause)
}

#[cfg(feature = "replay")]
async fn replay_resume_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    control_replay(&state, ReplayCommand::Resume)
}

#[cfg(feature = "replay")]
async fn replay_stop_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    control_replay(&state, ReplayCommand::Stop)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app_state() -> Arc<AppState> {
        let scenario = ScenarioConfig::default().resolve().unwrap();
        Arc::new(AppState {
            dashboard: Arc::new(Dashboard::new(scenario).unwrap()),
            simulator: Mutex::new(LoadVariationSimulator::seeded(5)),
            #[cfg(feature = "replay")]
            replay_state: None,
            #[cfg(feature = "replay")]
            dataset_info: None,
            start_time: std::time::Instant::now(),
            started_at: Utc::now(),
        })
    }

    #[tokio::test]
    async fn test_telemetry_status_codes() {
        let state = app_state();

        let (code, _) = telemetry_handler(
            State(Arc::clone(&state)),
            Bytes::from_static(br#"{"machine":"Edger","power_kw":28.0}"#),
        )
        .await;
        assert_eq!(code, StatusCode::ACCEPTED);

        let (code, Json(body)) =
            telemetry_handler(State(Arc::clone(&state)), Bytes::from_static(b"{")).await;
        assert_eq!(code, StatusCode::BAD_REQUEST);
        assert!(body.error.is_some());

        let (code, _) = telemetry_handler(
            State(Arc::clone(&state)),
            Bytes::from_static(br#"{"machine":"Planer","power_kw":5.0}"#),
        )
        .await;
        assert_eq!(code, StatusCode::UNPROCESSABLE_ENTITY);

        let stats = state.dashboard.telemetry_stats().await;
        assert_eq!((stats.accepted, stats.malformed, stats.unknown), (1, 1, 1));
    }

    #[tokio::test]
    async fn test_report_json_is_flat() {
        let state = app_state();
        let Json(response) = report_handler(State(state)).await;
        let value = serde_json::to_value(&response).unwrap();

        assert_eq!(value["fingerprint"].as_str().map(str::len), Some(16));
        assert_eq!(value["species"], "Fir/Spruce");
        assert_eq!(value["machines"].as_array().map(Vec::len), Some(5));
    }

    #[tokio::test]
    async fn test_simulate_marks_every_machine_live() {
        let state = app_state();
        let Json(response) = simulate_handler(State(Arc::clone(&state))).await;

        assert_eq!(response.accepted, 5);
        assert_eq!(state.dashboard.report().await.live_count(), 5);
    }

    #[cfg(feature = "replay")]
    #[test]
    fn test_replay_controls() {
        let without = app_state();
        assert_eq!(
            control_replay(&without, ReplayCommand::Pause).0,
            StatusCode::NOT_FOUND
        );

        let replay = Arc::new(ReplayState::default());
        let scenario = ScenarioConfig::default().resolve().unwrap();
        let state = AppState {
            dashboard: Arc::new(Dashboard::new(scenario).unwrap()),
            simulator: Mutex::new(LoadVariationSimulator::seeded(5)),
            replay_state: Some(Arc::clone(&replay)),
            dataset_info: None,
            start_time: std::time::Instant::now(),
            started_at: Utc::now(),
        };

        assert_eq!(control_replay(&state, ReplayCommand::Pause).0, StatusCode::OK);
        assert!(replay.paused.load(std::sync::atomic::Ordering::SeqCst));
        control_replay(&state, ReplayCommand::Resume);
        assert!(!replay.paused.load(std::sync::atomic::Ordering::SeqCst));

        assert_eq!(control_replay(&state, ReplayCommand::Stop).0, StatusCode::OK);
        assert!(replay.is_stopped());
        assert_eq!(
            control_replay(&state, ReplayCommand::Resume).0,
            StatusCode::CONFLICT
        );
    }

    #[tokio::test]
    async fn test_export_to_file() {
        let state = app_state();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.csv");

        let report = state.dashboard.report().await;
        export_to_file(&report, &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 1 + report.machines.len());
        assert!(text.contains("Kiln"));
    }

    #[test]
    fn test_species_override() {
        let args = Args::parse_from(["woodenergy-exporter", "--species", "Oak", "--once"]);
        let scenario = load_scenario(&args).unwrap();
        assert_eq!(scenario.config.species.name, "Oak");

        let args = Args::parse_from(["woodenergy-exporter", "--species", "Teak"]);
        assert!(load_scenario(&args).is_err());
    }
}
