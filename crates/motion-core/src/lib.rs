//! Core motion-detection algorithms shared by the agent.
//!
//! The crate is deliberately free of I/O: callers hand in luma buffers and
//! polygon lists, and get back pixel-offset masks and change counts. The two
//! building blocks are:
//! - `region`: rasterises operator-drawn polygons into a flat mask index.
//! - `differ`: three-frame absolute-difference with a per-pixel threshold.

pub mod differ;
pub mod region;

pub use differ::{DiffOutcome, three_frame_diff, DEFAULT_CHANGE_THRESHOLD, DELTA_THRESHOLD};
pub use region::{MaskIndex, Point, Polygon, Region};
