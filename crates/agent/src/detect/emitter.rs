//! Motion-event delivery.
//!
//! Each event fans out to two independent sinks, always in the same order:
//! the message bus first, then the recorder channel. Bus failures are logged
//! and swallowed; the recorder send blocks when the recorder is not keeping
//! up, which is the backpressure mechanism slowing the detector instead of
//! dropping events.

use std::sync::Arc;

use crossbeam_channel::Sender;
use tracing::{info, warn};

use crate::{bus::MessageBus, config::Config, detect::MotionEvent, messaging};

pub struct EventEmitter {
    bus: Option<Arc<dyn MessageBus>>,
    recorder: Option<Sender<MotionEvent>>,
    device_key: String,
    hub_key: String,
    offline: bool,
    recording: bool,
}

impl EventEmitter {
    pub fn new(
        config: &Config,
        bus: Option<Arc<dyn MessageBus>>,
        recorder: Option<Sender<MotionEvent>>,
    ) -> Self {
        Self {
            bus,
            recorder,
            device_key: config.key.clone(),
            hub_key: config.hub_key.clone(),
            offline: config.offline(),
            recording: config.recording_enabled(),
        }
    }

    /// Deliver one event: bus publish (unless offline), then recorder send
    /// (unless recording is disabled).
    pub fn emit(&self, event: MotionEvent) {
        if let Some(bus) = self.bus.as_deref() {
            if !self.offline {
                self.publish(bus, &event);
            }
        }

        if self.recording {
            if let Some(recorder) = self.recorder.as_ref() {
                if recorder.send(event).is_err() {
                    warn!("recorder channel closed; motion event dropped");
                }
            }
        }
    }

    fn publish(&self, bus: &dyn MessageBus, event: &MotionEvent) {
        if !self.hub_key.is_empty() {
            match messaging::package_motion(&self.device_key, event.timestamp) {
                Ok(payload) => {
                    let topic = format!("kerberos/hub/{}", self.hub_key);
                    if let Err(err) = bus.publish(&topic, 0, false, &payload) {
                        warn!("hub publish failed: {err:#}");
                    }
                }
                Err(err) => {
                    info!("failed to package hub message: {err:#}");
                }
            }
        } else {
            let topic = format!("kerberos/agent/{}", self.device_key);
            if let Err(err) = bus.publish(&topic, 2, false, b"motion") {
                warn!("agent publish failed: {err:#}");
            }
        }
    }
}
