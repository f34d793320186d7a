//! Shared data types exposed by the stream ingest layer.

use anyhow::Error;
use thiserror::Error;

/// Opaque decoder input pulled from a packet cursor.
#[derive(Clone, Debug, Default)]
pub struct Packet {
    /// Encoded payload; empty packets are skipped by consumers.
    pub data: Vec<u8>,
    /// Whether the payload decodes independently of its neighbours.
    pub is_key_frame: bool,
}

/// Decoded 8-bit luminance frame, immutable once produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrayFrame {
    data: Vec<u8>,
    width: i32,
    height: i32,
}

impl GrayFrame {
    /// Wrap a row-major luma buffer, validating it covers `width`x`height`.
    pub fn from_luma(data: Vec<u8>, width: i32, height: i32) -> Result<Self, DecodeError> {
        let expected = (width.max(0) as usize) * (height.max(0) as usize);
        if width <= 0 || height <= 0 || data.len() != expected {
            return Err(DecodeError::PayloadSize {
                expected,
                actual: data.len(),
                width,
                height,
            });
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn pixel_count(&self) -> usize {
        self.data.len()
    }
}

#[derive(Debug, Error)]
/// Errors reported by packet cursors.
pub enum CursorError {
    /// The upstream capture finished; the detection loop exits cleanly.
    #[error("end of stream")]
    EndOfStream,
    #[error(transparent)]
    Other(#[from] Error),
}

#[derive(Debug, Error)]
/// Errors that can arise while decoding a packet into a gray frame.
pub enum DecodeError {
    #[error("payload is {actual} bytes, expected {expected} for {width}x{height} luma")]
    PayloadSize {
        expected: usize,
        actual: usize,
        width: i32,
        height: i32,
    },
    #[error(transparent)]
    Other(#[from] Error),
}
