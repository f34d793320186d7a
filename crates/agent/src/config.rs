//! Agent configuration.
//!
//! The configuration arrives as JSON written by the management plane. Several
//! toggles are string-typed on the wire (`"true"` / `"false"` / empty); the
//! struct keeps them as strings and exposes accessor methods so every stage
//! applies the same interpretation.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use chrono_tz::Tz;
use motion_core::{Point, Polygon, Region};
use serde::Deserialize;
use tracing::warn;

/// Canonical agent configuration shared by every stage in the pipeline.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// tz-database name used to evaluate detection conditions.
    pub timezone: String,
    /// Device key identifying this agent on peer-to-peer topics.
    pub key: String,
    /// Hub key; when set, events are routed to the aggregated hub topic.
    pub hub_key: String,
    /// `"true"` suppresses all outbound messaging.
    pub offline: String,
    pub capture: CaptureConfig,
    /// Region of interest; absent or empty disables detection entirely.
    pub region: Option<RegionConfig>,
    /// Optional per-weekday detection windows, Sunday first.
    pub timetable: Option<Vec<TimeWindow>>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Stream URI the agent captures from.
    pub rtsp: String,
    /// `"true"` means continuous recording: the detector is not started.
    pub continuous: String,
    /// `"false"` skips motion/classifier work but keeps the window rotating.
    pub motion: String,
    /// `"false"` suppresses delivery to the recorder channel.
    pub recording: String,
    /// Change-count threshold; `0` falls back to the built-in default.
    #[serde(rename = "pixelChangeThreshold")]
    pub pixel_change_threshold: usize,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegionConfig {
    pub polygon: Vec<PolygonConfig>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct PolygonConfig {
    pub coordinates: Vec<Point>,
}

/// Two optional detection intervals for one weekday, in seconds of day.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(default)]
pub struct TimeWindow {
    pub start1: u32,
    pub end1: u32,
    pub start2: u32,
    pub end2: u32,
}

impl TimeWindow {
    /// Whether `seconds` (of day) falls inside either interval.
    pub fn contains(&self, seconds: u32) -> bool {
        (seconds >= self.start1 && seconds <= self.end1)
            || (seconds >= self.start2 && seconds <= self.end2)
    }
}

impl Config {
    /// Load and parse the configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading configuration from {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("parsing configuration from {}", path.display()))
    }

    pub fn continuous(&self) -> bool {
        self.capture.continuous == "true"
    }

    pub fn motion_enabled(&self) -> bool {
        self.capture.motion != "false"
    }

    pub fn recording_enabled(&self) -> bool {
        self.capture.recording != "false"
    }

    pub fn offline(&self) -> bool {
        self.offline == "true"
    }

    /// Change-count threshold with the unset/zero fallback applied.
    pub fn pixel_change_threshold(&self) -> usize {
        if self.capture.pixel_change_threshold == 0 {
            motion_core::DEFAULT_CHANGE_THRESHOLD
        } else {
            self.capture.pixel_change_threshold
        }
    }

    /// Parse the configured timezone, falling back to UTC on bad input.
    pub fn tz(&self) -> Tz {
        match self.timezone.parse::<Tz>() {
            Ok(tz) => tz,
            Err(_) => {
                if !self.timezone.is_empty() {
                    warn!(timezone = %self.timezone, "unknown timezone, falling back to UTC");
                }
                Tz::UTC
            }
        }
    }

    /// Build the detection region from the configured polygons.
    pub fn region(&self) -> Region {
        let polygons = self
            .region
            .iter()
            .flat_map(|region| region.polygon.iter())
            .map(|polygon| Polygon::new(polygon.coordinates.iter().copied()))
            .collect();
        Region::new(polygons)
    }
}
