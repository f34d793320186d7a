//! CLI dispatcher for the agent binary.

use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use stream_ingest::{ChannelCursor, RawLumaDecoder};
use tracing::{info, warn};

use crate::{
    config::Config,
    detect::{self, classifier::YoloProcessClassifier, gate::ScheduleValidator},
    telemetry,
};

#[derive(Debug, Parser)]
#[command(name = "agent", version, about = "Motion-detection agent for live video")]
pub struct AgentCli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run motion detection against a live stream.
    Detect(DetectArgs),
}

#[derive(Debug, Args)]
pub struct DetectArgs {
    /// Path to the agent configuration file.
    #[arg(long, default_value = "config/agent.json")]
    config: PathBuf,
    /// Stream URI; overrides the configured capture source.
    #[arg(long)]
    source: Option<String>,
    /// Capture width in pixels.
    #[arg(long, default_value_t = 640)]
    width: i32,
    /// Capture height in pixels.
    #[arg(long, default_value_t = 480)]
    height: i32,
    /// Path to the YOLO helper script.
    #[arg(long, default_value = "yolo_detection.py")]
    classifier_script: PathBuf,
}

/// Parse CLI arguments and run the requested subcommand.
pub fn dispatch() -> Result<()> {
    let cli = AgentCli::parse();
    match cli.command {
        Command::Detect(args) => run_detect(args),
    }
}

fn run_detect(args: DetectArgs) -> Result<()> {
    let config = Config::from_file(&args.config)?;
    telemetry::init_metrics_recorder();

    let source_uri = args
        .source
        .unwrap_or_else(|| config.capture.rtsp.clone());
    if source_uri.is_empty() {
        anyhow::bail!("no stream source configured; set capture.rtsp or pass --source");
    }

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = shutdown.clone();
        if let Err(err) = ctrlc::set_handler(move || shutdown.store(true, Ordering::SeqCst)) {
            warn!("failed to install Ctrl+C handler: {err}");
        }
    }

    let packets = stream_ingest::ffmpeg::spawn_gray_packet_reader(
        &source_uri,
        (args.width, args.height),
    )
    .with_context(|| format!("starting capture for {source_uri}"))?;
    let cursor = ChannelCursor::new(packets);
    let decoder = RawLumaDecoder::new(args.width, args.height);

    // Recorder sink; the bounded channel stalls the detector when it falls
    // behind rather than dropping events.
    let (event_tx, event_rx) = crossbeam_channel::bounded::<detect::MotionEvent>(8);
    let recorder = thread::spawn(move || {
        for event in event_rx {
            info!(
                timestamp = event.timestamp,
                changed = event.changed_pixels,
                "motion event recorded"
            );
        }
    });

    let mut classifier = YoloProcessClassifier::new(args.classifier_script);
    let result = detect::run(
        &config,
        cursor,
        decoder,
        Box::new(ScheduleValidator),
        &mut classifier,
        None,
        Some(event_tx),
        shutdown,
    );

    let _ = recorder.join();
    result
}
