//! End-to-end pipeline scenarios driven with in-process collaborators.

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex,
};

use chrono::DateTime;
use chrono_tz::Tz;
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use motion_core::Point;
use stream_ingest::{
    ChannelCursor, CursorError, DecodeError, FrameDecoder, GrayFrame, Packet, PacketCursor,
    RawLumaDecoder,
};

use agent::{
    bus::MessageBus,
    config::{Config, PolygonConfig, RegionConfig},
    detect::{
        self,
        classifier::{Classifier, ClassifyError, Detection},
        gate::{ConditionValidator, Verdict},
        MotionEvent,
    },
};

const WIDTH: i32 = 8;
const HEIGHT: i32 = 8;
const PIXELS: usize = (WIDTH * HEIGHT) as usize;

#[derive(Clone, Debug)]
struct Published {
    topic: String,
    qos: u8,
    retained: bool,
    payload: Vec<u8>,
}

/// Bus double capturing publishes. When a recorder probe is attached, every
/// publish asserts the recorder channel is still empty, which pins the
/// bus-before-recorder delivery order.
#[derive(Default)]
struct RecordingBus {
    published: Mutex<Vec<Published>>,
    recorder_probe: Option<Receiver<MotionEvent>>,
}

impl RecordingBus {
    fn with_probe(probe: Receiver<MotionEvent>) -> Self {
        Self {
            published: Mutex::new(Vec::new()),
            recorder_probe: Some(probe),
        }
    }

    fn published(&self) -> Vec<Published> {
        self.published.lock().unwrap().clone()
    }
}

impl MessageBus for RecordingBus {
    fn publish(&self, topic: &str, qos: u8, retained: bool, payload: &[u8]) -> anyhow::Result<()> {
        if let Some(probe) = &self.recorder_probe {
            assert!(
                probe.is_empty(),
                "recorder delivery must not precede bus publish"
            );
        }
        self.published.lock().unwrap().push(Published {
            topic: topic.to_string(),
            qos,
            retained,
            payload: payload.to_vec(),
        });
        Ok(())
    }
}

struct AlwaysActive;

impl ConditionValidator for AlwaysActive {
    fn validate(&self, _now: DateTime<Tz>, _config: &Config) -> Verdict {
        Verdict::active()
    }
}

/// Validator scripted to disable detection for the first N steady frames.
struct GatedThenActive {
    remaining: Mutex<usize>,
}

impl ConditionValidator for GatedThenActive {
    fn validate(&self, _now: DateTime<Tz>, _config: &Config) -> Verdict {
        let mut remaining = self.remaining.lock().unwrap();
        if *remaining > 0 {
            *remaining -= 1;
            Verdict::inactive("scripted gate closed")
        } else {
            Verdict::active()
        }
    }
}

struct ScriptedClassifier {
    detections: Vec<Detection>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedClassifier {
    fn new(detections: Vec<Detection>) -> Self {
        Self {
            detections,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Classifier for ScriptedClassifier {
    fn classify(&mut self, _frame: &GrayFrame) -> Result<Vec<Detection>, ClassifyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.detections.clone())
    }
}

struct PanickingClassifier;

impl Classifier for PanickingClassifier {
    fn classify(&mut self, _frame: &GrayFrame) -> Result<Vec<Detection>, ClassifyError> {
        panic!("classifier must not be invoked in this scenario");
    }
}

struct PanickingCursor;

impl PacketCursor for PanickingCursor {
    fn read_packet(&mut self) -> Result<Packet, CursorError> {
        panic!("cursor must not be read in continuous mode");
    }
}

/// Decoder whose output dimensions shrink after the first three frames,
/// simulating a stream renegotiating its resolution.
struct ShrinkingDecoder {
    decoded: usize,
}

impl FrameDecoder for ShrinkingDecoder {
    fn decode(&mut self, _packet: &Packet) -> Result<GrayFrame, DecodeError> {
        self.decoded += 1;
        if self.decoded <= 3 {
            GrayFrame::from_luma(vec![10u8; PIXELS], WIDTH, HEIGHT)
        } else {
            GrayFrame::from_luma(vec![10u8; 16], 4, 4)
        }
    }
}

fn person() -> Vec<Detection> {
    vec![Detection {
        class: "person".into(),
        confidence: 0.9,
    }]
}

fn uniform(value: u8) -> Vec<u8> {
    vec![value; PIXELS]
}

/// Paint a 3x3 block (9 pixels) with `value`.
fn with_block(mut data: Vec<u8>, value: u8) -> Vec<u8> {
    for y in 2..5 {
        for x in 2..5 {
            data[(y * WIDTH + x) as usize] = value;
        }
    }
    data
}

fn full_region() -> RegionConfig {
    RegionConfig {
        polygon: vec![PolygonConfig {
            coordinates: vec![
                Point::new(-1.0, -1.0),
                Point::new(WIDTH as f64 + 1.0, -1.0),
                Point::new(WIDTH as f64 + 1.0, HEIGHT as f64 + 1.0),
                Point::new(-1.0, HEIGHT as f64 + 1.0),
            ],
        }],
    }
}

fn base_config() -> Config {
    let mut config = Config::default();
    config.key = "d1".into();
    config.capture.pixel_change_threshold = 3;
    config.region = Some(full_region());
    config
}

fn cursor_over(frames: Vec<Vec<u8>>) -> ChannelCursor {
    let (tx, rx) = unbounded();
    for data in frames {
        tx.send(Packet {
            data,
            is_key_frame: true,
        })
        .unwrap();
    }
    drop(tx);
    ChannelCursor::new(rx)
}

fn recorder() -> (Sender<MotionEvent>, Receiver<MotionEvent>) {
    bounded(8)
}

fn run_pipeline(
    config: &Config,
    cursor: impl PacketCursor,
    validator: Box<dyn ConditionValidator>,
    classifier: &mut dyn Classifier,
    bus: Option<Arc<dyn MessageBus>>,
    recorder_tx: Option<Sender<MotionEvent>>,
) {
    detect::run(
        config,
        cursor,
        RawLumaDecoder::new(WIDTH, HEIGHT),
        validator,
        classifier,
        bus,
        recorder_tx,
        Arc::new(AtomicBool::new(false)),
    )
    .unwrap();
}

#[test]
fn baseline_positive_publishes_on_agent_topic() {
    let config = base_config();
    let cursor = cursor_over(vec![
        uniform(10),
        uniform(10),
        uniform(10),
        with_block(uniform(10), 200),
    ]);
    let (event_tx, event_rx) = recorder();
    let bus = Arc::new(RecordingBus::with_probe(event_rx.clone()));
    let mut classifier = ScriptedClassifier::new(person());

    run_pipeline(
        &config,
        cursor,
        Box::new(AlwaysActive),
        &mut classifier,
        Some(bus.clone() as Arc<dyn MessageBus>),
        Some(event_tx),
    );

    assert_eq!(classifier.calls(), 1);

    let events: Vec<MotionEvent> = event_rx.try_iter().collect();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].changed_pixels, 9);

    let published = bus.published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].topic, "kerberos/agent/d1");
    assert_eq!(published[0].qos, 2);
    assert!(!published[0].retained);
    assert_eq!(published[0].payload, b"motion");
}

#[test]
fn hub_key_routes_to_hub_topic_with_envelope() {
    let mut config = base_config();
    config.hub_key = "h1".into();
    let cursor = cursor_over(vec![
        uniform(10),
        uniform(10),
        uniform(10),
        with_block(uniform(10), 200),
    ]);
    let (event_tx, event_rx) = recorder();
    let bus = Arc::new(RecordingBus::default());
    let mut classifier = ScriptedClassifier::new(person());

    run_pipeline(
        &config,
        cursor,
        Box::new(AlwaysActive),
        &mut classifier,
        Some(bus.clone() as Arc<dyn MessageBus>),
        Some(event_tx),
    );

    let published = bus.published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].topic, "kerberos/hub/h1");
    assert_eq!(published[0].qos, 0);

    let envelope: serde_json::Value = serde_json::from_slice(&published[0].payload).unwrap();
    assert_eq!(envelope["payload"]["action"], "motion");
    assert_eq!(envelope["payload"]["device_id"], "d1");
    let event = event_rx.try_iter().next().unwrap();
    assert_eq!(
        envelope["payload"]["value"]["timestamp"],
        serde_json::json!(event.timestamp)
    );
}

#[test]
fn subthreshold_change_never_reaches_classifier() {
    let config = base_config();
    // Delta of 50 stays below the per-pixel threshold of 60.
    let cursor = cursor_over(vec![
        uniform(10),
        uniform(10),
        uniform(10),
        with_block(uniform(10), 60),
    ]);
    let (event_tx, event_rx) = recorder();
    let bus = Arc::new(RecordingBus::default());
    let mut classifier = ScriptedClassifier::new(person());

    run_pipeline(
        &config,
        cursor,
        Box::new(AlwaysActive),
        &mut classifier,
        Some(bus.clone() as Arc<dyn MessageBus>),
        Some(event_tx),
    );

    assert_eq!(classifier.calls(), 0);
    assert!(event_rx.try_iter().next().is_none());
    assert!(bus.published().is_empty());
}

#[test]
fn motion_without_person_is_not_emitted() {
    let config = base_config();
    let cursor = cursor_over(vec![
        uniform(10),
        uniform(10),
        uniform(10),
        with_block(uniform(10), 200),
    ]);
    let (event_tx, event_rx) = recorder();
    let bus = Arc::new(RecordingBus::default());
    let mut classifier = ScriptedClassifier::new(vec![Detection {
        class: "cat".into(),
        confidence: 0.9,
    }]);

    run_pipeline(
        &config,
        cursor,
        Box::new(AlwaysActive),
        &mut classifier,
        Some(bus.clone() as Arc<dyn MessageBus>),
        Some(event_tx),
    );

    assert_eq!(classifier.calls(), 1);
    assert!(event_rx.try_iter().next().is_none());
    assert!(bus.published().is_empty());
}

#[test]
fn offline_mode_suppresses_bus_but_not_recorder() {
    let mut config = base_config();
    config.offline = "true".into();
    let cursor = cursor_over(vec![
        uniform(10),
        uniform(10),
        uniform(10),
        with_block(uniform(10), 200),
    ]);
    let (event_tx, event_rx) = recorder();
    let bus = Arc::new(RecordingBus::default());
    let mut classifier = ScriptedClassifier::new(person());

    run_pipeline(
        &config,
        cursor,
        Box::new(AlwaysActive),
        &mut classifier,
        Some(bus.clone() as Arc<dyn MessageBus>),
        Some(event_tx),
    );

    assert!(bus.published().is_empty());
    let events: Vec<MotionEvent> = event_rx.try_iter().collect();
    assert_eq!(events.len(), 1);
}

#[test]
fn disabled_recording_suppresses_recorder_delivery() {
    let mut config = base_config();
    config.capture.recording = "false".into();
    let cursor = cursor_over(vec![
        uniform(10),
        uniform(10),
        uniform(10),
        with_block(uniform(10), 200),
    ]);
    let (event_tx, event_rx) = recorder();
    let bus = Arc::new(RecordingBus::default());
    let mut classifier = ScriptedClassifier::new(person());

    run_pipeline(
        &config,
        cursor,
        Box::new(AlwaysActive),
        &mut classifier,
        Some(bus.clone() as Arc<dyn MessageBus>),
        Some(event_tx),
    );

    assert_eq!(bus.published().len(), 1);
    assert!(event_rx.try_iter().next().is_none());
}

#[test]
fn empty_region_terminates_after_priming() {
    let mut config = base_config();
    config.region = None;
    let cursor = cursor_over(vec![
        uniform(10),
        uniform(10),
        uniform(10),
        with_block(uniform(10), 200),
        with_block(uniform(10), 200),
    ]);
    let (event_tx, event_rx) = recorder();

    run_pipeline(
        &config,
        cursor,
        Box::new(AlwaysActive),
        &mut PanickingClassifier,
        None,
        Some(event_tx),
    );

    assert!(event_rx.try_iter().next().is_none());
}

#[test]
fn continuous_mode_never_reads_the_cursor() {
    let mut config = base_config();
    config.capture.continuous = "true".into();

    run_pipeline(
        &config,
        PanickingCursor,
        Box::new(AlwaysActive),
        &mut PanickingClassifier,
        None,
        None,
    );
}

#[test]
fn motion_disabled_skips_detection_but_consumes_stream() {
    let mut config = base_config();
    config.capture.motion = "false".into();
    let cursor = cursor_over(vec![
        uniform(10),
        uniform(10),
        uniform(10),
        with_block(uniform(10), 200),
    ]);
    let (event_tx, event_rx) = recorder();

    run_pipeline(
        &config,
        cursor,
        Box::new(AlwaysActive),
        &mut PanickingClassifier,
        None,
        Some(event_tx),
    );

    assert!(event_rx.try_iter().next().is_none());
}

#[test]
fn window_keeps_rotating_while_gate_is_disabled() {
    let config = base_config();
    // Two gated frames already carry the change; by the time the gate opens,
    // the window holds only changed frames and the differencer stays quiet.
    let cursor = cursor_over(vec![
        uniform(10),
        uniform(10),
        uniform(10),
        with_block(uniform(10), 200),
        with_block(uniform(10), 200),
        with_block(uniform(10), 200),
    ]);
    let (event_tx, event_rx) = recorder();
    let validator = GatedThenActive {
        remaining: Mutex::new(2),
    };
    let mut classifier = ScriptedClassifier::new(person());

    run_pipeline(
        &config,
        cursor,
        Box::new(validator),
        &mut classifier,
        None,
        Some(event_tx),
    );

    assert_eq!(classifier.calls(), 0);
    assert!(event_rx.try_iter().next().is_none());
}

#[test]
fn dimension_change_stops_detection_cleanly() {
    let config = base_config();
    let packets = vec![vec![0u8; 1]; 6];
    let (tx, rx) = unbounded();
    for data in packets {
        tx.send(Packet {
            data,
            is_key_frame: true,
        })
        .unwrap();
    }
    drop(tx);
    let (event_tx, event_rx) = recorder();

    detect::run(
        &config,
        ChannelCursor::new(rx),
        ShrinkingDecoder { decoded: 0 },
        Box::new(AlwaysActive),
        &mut PanickingClassifier,
        None,
        Some(event_tx),
        Arc::new(AtomicBool::new(false)),
    )
    .unwrap();

    assert!(event_rx.try_iter().next().is_none());
}

#[test]
fn short_stream_never_runs_detection() {
    let config = base_config();
    let cursor = cursor_over(vec![uniform(10), uniform(10)]);
    let (event_tx, event_rx) = recorder();

    run_pipeline(
        &config,
        cursor,
        Box::new(AlwaysActive),
        &mut PanickingClassifier,
        None,
        Some(event_tx),
    );

    assert!(event_rx.try_iter().next().is_none());
}
