//! Packet ingestion layer for the motion-detection agent.
//!
//! The crate owns the data model shared between capture and detection
//! (`Packet`, `GrayFrame`), the pull seams the detector consumes
//! (`PacketCursor`, `FrameDecoder`), and an FFmpeg-subprocess feed that turns
//! a live stream URI into raw-luma key-frame packets.

pub mod cursor;
pub mod decoder;
pub mod ffmpeg;
pub mod types;

pub use cursor::{ChannelCursor, PacketCursor};
pub use decoder::{FrameDecoder, RawLumaDecoder};
pub use types::{CursorError, DecodeError, GrayFrame, Packet};
