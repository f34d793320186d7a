//! Hub message packaging.
//!
//! Messages published to the hub topic are wrapped in an outer envelope
//! carrying the device key and a packaging timestamp, with the domain payload
//! nested inside. Payload encryption is negotiated elsewhere; the detector
//! always sends plaintext envelopes and marks them as such.

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;

/// Outer envelope shared by every hub-bound message.
#[derive(Debug, Serialize)]
pub struct Envelope {
    pub device_id: String,
    pub timestamp: i64,
    pub encrypted: bool,
    pub payload: MotionPayload,
}

/// Inner payload describing a motion event.
#[derive(Debug, Serialize)]
pub struct MotionPayload {
    pub action: String,
    pub device_id: String,
    pub value: MotionValue,
}

#[derive(Debug, Serialize)]
pub struct MotionValue {
    pub timestamp: i64,
}

/// Package a motion event for the hub topic.
///
/// A packaging failure drops only this publish; other deliveries proceed.
pub fn package_motion(device_key: &str, event_timestamp: i64) -> Result<Vec<u8>> {
    let envelope = Envelope {
        device_id: device_key.to_string(),
        timestamp: Utc::now().timestamp(),
        encrypted: false,
        payload: MotionPayload {
            action: "motion".to_string(),
            device_id: device_key.to_string(),
            value: MotionValue {
                timestamp: event_timestamp,
            },
        },
    };
    serde_json::to_vec(&envelope).context("serialising hub envelope")
}
