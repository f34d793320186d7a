//! Motion-detection pipeline.
//!
//! The module is split into focused submodules:
//! - `window`: rolling three-frame window sourced from the packet cursor.
//! - `gate`: condition gate deciding whether detection is active right now.
//! - `classifier`: person confirmation via the out-of-process classifier.
//! - `emitter`: bus publish and recorder-channel delivery of motion events.
//! - `pipeline`: the orchestrating loop tying the stages together.

pub mod classifier;
pub mod emitter;
pub mod gate;
pub mod pipeline;
pub mod window;

pub use pipeline::run;

/// Motion event handed to the recorder and summarised on the bus.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MotionEvent {
    /// Seconds since the Unix epoch at detection time.
    pub timestamp: i64,
    /// Change count reported by the differencer for the triple that fired.
    pub changed_pixels: usize,
}
