//! Speed Trap - Main Entry Point

use anyhow::{Context, Result};
use clap::Parser;
use speedtrap::{init_logging, init_metrics, run_replay, DetectionLog};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, Level};
use traffic_config::TrafficConfig;

#[derive(Parser, Debug)]
#[command(name = "speedtrap", version, about = "Vehicle speed estimation and crossing counts")]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long, default_value = "config/speedtrap.toml")]
    config: PathBuf,

    /// Recorded detections, one JSON frame per line
    #[arg(short, long = "in", value_name = "PATH")]
    input: PathBuf,

    /// Run report destination; stdout when omitted
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Per-frame display snapshots as JSON lines
    #[arg(long, value_name = "PATH")]
    snapshots: Option<PathBuf>,

    /// Override the configured frame rate
    #[arg(long)]
    fps: Option<f64>,

    /// Serve Prometheus metrics on this address
    #[arg(long, value_name = "ADDR")]
    metrics_addr: Option<SocketAddr>,

    #[arg(long, default_value_t = Level::INFO)]
    log_level: Level,

    /// Log as JSON
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_level, args.log_json);

    info!("=== Speed Trap v{} ===", env!("CARGO_PKG_VERSION"));

    if let Some(addr) = args.metrics_addr {
        init_metrics(addr)?;
    }

    let mut config = TrafficConfig::load(&args.config)
        .with_context(|| format!("Failed to load {}", args.config.display()))?;
    if let Some(fps) = args.fps {
        config.video.fps = fps;
        config.validate()?;
    }

    let log = DetectionLog::open(&args.input)?;
    let snapshots = args
        .snapshots
        .as_ref()
        .map(|path| {
            File::create(path)
                .map(BufWriter::new)
                .with_context(|| format!("Failed to create {}", path.display()))
        })
        .transpose()?;

    let stop = Arc::new(AtomicBool::new(false));
    let flag = stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received");
            flag.store(true, Ordering::Relaxed);
        }
    });

    let report = tokio::task::spawn_blocking(move || -> Result<_> {
        let mut snapshots = snapshots;
        let report = run_replay(
            &config,
            log,
            &stop,
            snapshots.as_mut().map(|w| w as &mut dyn Write),
        )?;
        if let Some(mut w) = snapshots {
            w.flush()?;
        }
        Ok(report)
    })
    .await??;

    match &args.out {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            let mut w = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut w, &report)?;
            w.flush()?;
            info!("Report written to {}", path.display());
        }
        None => {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            serde_json::to_writer_pretty(&mut lock, &report)?;
            writeln!(lock)?;
        }
    }

    Ok(())
}
