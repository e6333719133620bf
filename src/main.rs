// src/main.rs

use anyhow::{Context, Result};
use clap::Parser;
use lane_counter::counting_ledger::LedgerSummary;
use lane_counter::pipeline::{MetricsSummary, SessionEvent};
use lane_counter::{Config, CountingSession, FlowDirection, FrameContext, FrameSource};
use serde::Serialize;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

const FRAME_CHANNEL_CAPACITY: usize = 64;
const PROGRESS_EVERY: u64 = 500;

#[derive(Parser, Debug)]
#[command(name = "lane_counter", about = "Counts tracked vehicles crossing a line, per lane")]
struct Args {
    /// YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Tracked detections, one JSON frame per line
    #[arg(short, long)]
    detections: PathBuf,

    /// Write the final ledger and metrics as JSON
    #[arg(short, long)]
    summary: Option<PathBuf>,
}

#[derive(Serialize)]
struct SessionReport {
    ledger: LedgerSummary,
    metrics: MetricsSummary,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load(&args.config)?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.as_str()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("🚗 Lane Crossing Counter Starting");
    info!(
        "📋 Loaded config from {} ({} lane boundaries)",
        args.config,
        config.lanes.boundaries.len()
    );
    info!(
        "Frame {}x{}, {} lane boundary config(s), tilt tolerance {}px",
        config.lanes.frame_width,
        config.lanes.frame_height,
        config.lanes.boundaries.len(),
        config.lanes.tilt_tolerance_px
    );

    let mut session = CountingSession::new(&config)?;
    info!("✓ {} lane(s) active", session.registry().lanes().len());

    let mut source = FrameSource::open(&args.detections)
        .with_context(|| format!("Failed to open detections: {}", args.detections.display()))?;

    // Single producer reads the stream; the session consumes frames in order
    let (tx, mut rx) = mpsc::channel::<FrameContext>(FRAME_CHANNEL_CAPACITY);
    let reader = tokio::task::spawn_blocking(move || -> lane_counter::Result<u64> {
        while let Some(frame) = source.read_frame()? {
            if tx.blocking_send(frame).is_err() {
                break;
            }
        }
        Ok(source.frames_read())
    });

    while let Some(frame) = rx.recv().await {
        for event in session.process_frame(&frame)? {
            info!(
                "🚙 #{} {} {} lane {} at {} km/h{}",
                event.track_id,
                event.class_label,
                event.direction,
                event.lane_index,
                event.speed_kmh,
                if event.against_flow { " (against flow)" } else { "" }
            );
        }

        for event in session.drain_events() {
            match event {
                SessionEvent::CrossingDiscarded(d) => {
                    debug!("Crossing by #{} discarded at frame {}: {}", d.track_id, d.frame_id, d.reason.as_str())
                }
                SessionEvent::TrackEvicted { track_id, frame_id } => {
                    debug!("Track #{} left at frame {}", track_id, frame_id)
                }
                SessionEvent::CrossingCounted(_) => {}
            }
        }

        let frames = session.metrics().summary().total_frames;
        if frames % PROGRESS_EVERY == 0 {
            info!(
                "Progress: {} frames, in={} out={} ({:.1} FPS)",
                frames,
                session.ledger().totals(FlowDirection::In),
                session.ledger().totals(FlowDirection::Out),
                session.metrics().fps()
            );
        }
    }

    match reader.await? {
        Ok(frames_read) => debug!("Detection stream finished after {} frame(s)", frames_read),
        Err(e) => {
            error!("Detection stream aborted: {}", e);
            return Err(e.into());
        }
    }

    let ledger = session.ledger().summary();
    let metrics = session.metrics().summary();

    info!("\n========================================");
    info!("✓ Session complete");
    info!("  Total frames: {}", metrics.total_frames);
    info!(
        "  Frames with detections: {} ({:.1}%)",
        metrics.frames_with_detections,
        100.0 * metrics.frames_with_detections as f64 / metrics.total_frames.max(1) as f64
    );
    info!("  ⬇️  Entering: {}", ledger.total_in);
    for class in &ledger.entering {
        info!("     {}: {}", class.class_label, class.count);
    }
    info!("  ⬆️  Leaving: {}", ledger.total_out);
    for class in &ledger.leaving {
        info!("     {}: {}", class.class_label, class.count);
    }
    if metrics.unattributed_crossings > 0 {
        warn!(
            "  ⚠️  Crossings outside every lane: {}",
            metrics.unattributed_crossings
        );
    }
    if metrics.against_flow_events > 0 {
        warn!("  🚨 Against-flow crossings: {}", metrics.against_flow_events);
    }
    info!("  Processing Speed: {:.1} FPS", metrics.fps);
    if let Some(log) = session.event_log() {
        info!("  💾 {} line(s) in {}", log.lines_written(), log.path().display());
    }
    info!("========================================\n");

    if let Some(path) = args.summary {
        let report = SessionReport { ledger, metrics };
        let json = serde_json::to_string_pretty(&report)?;
        tokio::fs::write(&path, json)
            .await
            .with_context(|| format!("Failed to write summary: {}", path.display()))?;
        info!("💾 Summary written to {}", path.display());
    }

    Ok(())
}
