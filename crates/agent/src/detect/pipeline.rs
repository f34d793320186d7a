//! Orchestrating loop for motion detection.
//!
//! Drives the whole pipeline sequentially on the calling thread: prime the
//! window, rasterise the region mask once, then per accepted key frame run
//! the condition gate, the differencer, the classifier, and event delivery.
//! Cancellation is checked only at the top of each iteration so a frame is
//! never abandoned halfway through.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Result;
use chrono::Utc;
use crossbeam_channel::Sender;
use motion_core::{three_frame_diff, DELTA_THRESHOLD};
use stream_ingest::{FrameDecoder, PacketCursor};
use tracing::{debug, error, info};

use crate::{
    bus::MessageBus,
    config::Config,
    detect::{
        classifier::{contains_person, Classifier},
        emitter::EventEmitter,
        gate::{ConditionGate, ConditionValidator},
        window::{FrameSource, FrameWindow},
        MotionEvent,
    },
};

/// Run motion detection until the cursor ends or shutdown is requested.
pub fn run<C, D>(
    config: &Config,
    cursor: C,
    decoder: D,
    validator: Box<dyn ConditionValidator>,
    classifier: &mut dyn Classifier,
    bus: Option<Arc<dyn MessageBus>>,
    recorder: Option<Sender<MotionEvent>>,
    shutdown: Arc<AtomicBool>,
) -> Result<()>
where
    C: PacketCursor,
    D: FrameDecoder,
{
    debug!("starting motion detection");

    if config.continuous() {
        info!("continuous recording enabled, no motion detection required");
        return Ok(());
    }
    info!("motion detection enabled, priming the frame window");

    let gate = ConditionGate::new(validator, config.tz());
    let emitter = EventEmitter::new(config, bus, recorder);
    let change_threshold = config.pixel_change_threshold();

    let mut source = FrameSource::new(cursor, decoder);
    let Some(mut window) = FrameWindow::prime(&mut source) else {
        info!("stream ended before the frame window was primed");
        return Ok(());
    };

    let mask = config
        .region()
        .rasterise(window.oldest().width(), window.oldest().height());
    if mask.is_empty() {
        info!("no region of interest configured, skipping motion detection");
        return Ok(());
    }
    debug!(pixels = mask.len(), "region mask rasterised");

    while !shutdown.load(Ordering::Relaxed) {
        let Some(frame) = source.next_key_frame() else {
            break;
        };
        metrics::counter!("agent_detect_frames_total").increment(1);

        if frame.width() != mask.width() || frame.height() != mask.height() {
            error!(
                "stream dimensions changed from {}x{} to {}x{}, stopping detection",
                mask.width(),
                mask.height(),
                frame.width(),
                frame.height()
            );
            break;
        }

        window.rotate(frame);

        if !gate.is_active(config) {
            metrics::counter!("agent_detect_gated_frames_total").increment(1);
            continue;
        }
        if !config.motion_enabled() {
            continue;
        }

        let outcome = three_frame_diff(
            window.oldest().data(),
            window.middle().data(),
            window.newest().data(),
            &mask,
            DELTA_THRESHOLD,
            change_threshold,
        );
        if !outcome.triggered {
            continue;
        }
        metrics::counter!("agent_motion_candidates_total").increment(1);
        debug!(
            changed = outcome.changed_pixels,
            "pixel change threshold reached, confirming with classifier"
        );

        let detections = match classifier.classify(window.newest()) {
            Ok(detections) => detections,
            Err(err) => {
                error!("classifier failed: {err}");
                metrics::counter!("agent_classifier_failures_total").increment(1);
                continue;
            }
        };
        if !contains_person(&detections) {
            continue;
        }

        info!(
            changed = outcome.changed_pixels,
            "person-confirmed motion detected"
        );
        metrics::counter!("agent_motion_events_total").increment(1);
        emitter.emit(MotionEvent {
            timestamp: Utc::now().timestamp(),
            changed_pixels: outcome.changed_pixels,
        });
    }

    debug!("stopping motion detection");
    Ok(())
}
