//! Speed Trap
//!
//! Wires configuration, detection replay and the speed pipeline into one
//! run, and produces the end-of-run report.

pub mod display;
pub mod replay;

use anyhow::{Context, Result};
use control_zone::ControlZone;
use crossing_counter::Counter;
use metrics_exporter_prometheus::PrometheusBuilder;
use speed_estimator::{
    CentroidTracker, Detector, EstimatorSettings, RunReport, SpeedEstimator, SpeedPipeline,
};
use std::io::Write;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;
use traffic_config::TrafficConfig;

pub use display::DisplaySnapshot;
pub use replay::{DetectionLog, FrameRecord, ReplayDetector, ReplayError};

/// Initialize logging
pub fn init_logging(level: Level, json: bool) {
    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr);

    let result = if json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };
    result.expect("Failed to set tracing subscriber");
}

/// Serve Prometheus metrics on `addr`
pub fn init_metrics(addr: SocketAddr) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("Failed to install Prometheus exporter")?;
    info!("Serving metrics on http://{}/metrics", addr);
    Ok(())
}

/// Build the tracker, zones and counters described by the configuration
pub fn build_pipeline(config: &TrafficConfig) -> Result<SpeedPipeline<CentroidTracker>> {
    let zones = config
        .zone_specs()
        .into_iter()
        .map(|spec| {
            let id = spec.id;
            ControlZone::new(spec).with_context(|| format!("Invalid control zone {}", id))
        })
        .collect::<Result<Vec<_>>>()?;

    let settings = EstimatorSettings {
        fps: config.video.fps,
        display_frames: config.display_frames,
    };
    let estimator = SpeedEstimator::new(zones, settings)?;

    let counters = config
        .counters
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let name = c.name.clone().unwrap_or_else(|| format!("counter-{}", i));
            Counter::new(name, c.line(), config.classes.iter().cloned())
        })
        .collect();

    let tracker = CentroidTracker::new(config.max_disappeared);
    Ok(SpeedPipeline::new(tracker, estimator, counters))
}

/// Replay a detection log through the pipeline.
///
/// Stops at the end of the log or at the first frame boundary after `stop`
/// is raised. Display snapshots go to `snapshots` as JSON lines when given.
pub fn run_replay(
    config: &TrafficConfig,
    log: DetectionLog,
    stop: &AtomicBool,
    mut snapshots: Option<&mut dyn Write>,
) -> Result<RunReport> {
    let mut pipeline = build_pipeline(config)?;
    let mut detector = ReplayDetector::new(config.classes.iter().cloned(), config.min_confidence);

    for record in log {
        if stop.load(Ordering::Relaxed) {
            warn!("Interrupted, stopping at frame boundary");
            break;
        }

        let record = record?;
        let detections = match detector.detect(&record) {
            Ok(detections) => detections,
            Err(never) => match never {},
        };

        let Some(ctx) = pipeline.process(record.frame, detections) else {
            continue;
        };

        if let Some(out) = snapshots.as_deref_mut() {
            let snapshot = DisplaySnapshot::from_frame(&ctx, config);
            serde_json::to_writer(&mut *out, &snapshot)?;
            out.write_all(b"\n")?;
        }
    }

    let report = pipeline.report();
    info!(
        "Run finished: {} frames processed, {} skipped",
        report.stats.frames_processed, report.stats.frames_skipped
    );
    Ok(report)
}
