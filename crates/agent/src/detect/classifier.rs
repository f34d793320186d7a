//! Person confirmation via the external classifier.
//!
//! The default adapter stages the frame as a JPEG at a well-known transient
//! path and shells out to the YOLO helper script, which prints a JSON array
//! of detections on stdout. The adapter is synchronous and owns the transient
//! file, overwriting it on every call. All of its failure modes are non-fatal
//! for the pipeline: the frame is simply treated as carrying no person.

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::PathBuf,
    process::{Command, ExitStatus},
};

use anyhow::Error;
use image::{codecs::jpeg::JpegEncoder, ExtendedColorType};
use serde::Deserialize;
use stream_ingest::GrayFrame;
use thiserror::Error;

/// Confidence a `person` record must exceed to confirm a detection.
pub const PERSON_CONFIDENCE_THRESHOLD: f64 = 0.5;

const TRANSIENT_IMAGE_PATH: &str = "/tmp/frame.jpg";
const JPEG_QUALITY: u8 = 90;

/// Single record parsed from the classifier's stdout.
#[derive(Clone, Debug, Deserialize)]
pub struct Detection {
    pub class: String,
    pub confidence: f64,
}

/// Whether any record confirms a person.
pub fn contains_person(detections: &[Detection]) -> bool {
    detections
        .iter()
        .any(|d| d.class == "person" && d.confidence > PERSON_CONFIDENCE_THRESHOLD)
}

#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("failed to stage frame at {path:?}")]
    Stage {
        path: PathBuf,
        #[source]
        source: Error,
    },
    #[error("failed to launch classifier process")]
    Launch(#[from] std::io::Error),
    #[error("classifier process exited with {status}")]
    Process { status: ExitStatus },
    #[error("classifier produced no output")]
    EmptyOutput,
    #[error("failed to parse classifier output")]
    Parse(#[from] serde_json::Error),
}

/// Capability seam for person confirmation; the pipeline does not care
/// whether the implementation is in-process or shells out.
pub trait Classifier {
    fn classify(&mut self, frame: &GrayFrame) -> Result<Vec<Detection>, ClassifyError>;
}

/// Out-of-process YOLO classifier invoked as `python3 <script> <image>`.
pub struct YoloProcessClassifier {
    script: PathBuf,
    image_path: PathBuf,
}

impl YoloProcessClassifier {
    pub fn new(script: impl Into<PathBuf>) -> Self {
        Self {
            script: script.into(),
            image_path: PathBuf::from(TRANSIENT_IMAGE_PATH),
        }
    }

    /// Override the transient image path. One detector per path; the file is
    /// overwritten on each call.
    pub fn with_image_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.image_path = path.into();
        self
    }

    fn stage_frame(&self, frame: &GrayFrame) -> Result<(), Error> {
        let file = File::create(&self.image_path)?;
        let mut writer = BufWriter::new(file);
        let mut encoder = JpegEncoder::new_with_quality(&mut writer, JPEG_QUALITY);
        encoder.encode(
            frame.data(),
            frame.width() as u32,
            frame.height() as u32,
            ExtendedColorType::L8,
        )?;
        writer.flush()?;
        Ok(())
    }
}

impl Classifier for YoloProcessClassifier {
    fn classify(&mut self, frame: &GrayFrame) -> Result<Vec<Detection>, ClassifyError> {
        self.stage_frame(frame)
            .map_err(|source| ClassifyError::Stage {
                path: self.image_path.clone(),
                source,
            })?;

        let output = Command::new("python3")
            .arg(&self.script)
            .arg(&self.image_path)
            .output()?;

        if !output.status.success() {
            return Err(ClassifyError::Process {
                status: output.status,
            });
        }
        if output.stdout.is_empty() {
            return Err(ClassifyError::EmptyOutput);
        }

        Ok(serde_json::from_slice(&output.stdout)?)
    }
}
