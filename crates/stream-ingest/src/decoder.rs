//! Packet-to-frame decoding.

use crate::types::{DecodeError, GrayFrame, Packet};

/// Decode seam turning packets into gray frames.
pub trait FrameDecoder {
    fn decode(&mut self, packet: &Packet) -> Result<GrayFrame, DecodeError>;
}

/// Decoder for packets carrying a raw 8-bit luma plane of fixed dimensions,
/// as produced by the FFmpeg feed in this crate.
pub struct RawLumaDecoder {
    width: i32,
    height: i32,
}

impl RawLumaDecoder {
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}

impl FrameDecoder for RawLumaDecoder {
    fn decode(&mut self, packet: &Packet) -> Result<GrayFrame, DecodeError> {
        GrayFrame::from_luma(packet.data.clone(), self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_exact_luma_plane() {
        let mut decoder = RawLumaDecoder::new(4, 2);
        let packet = Packet {
            data: vec![7u8; 8],
            is_key_frame: true,
        };
        let frame = decoder.decode(&packet).unwrap();
        assert_eq!(frame.data(), &[7u8; 8]);
    }

    #[test]
    fn rejects_truncated_payload() {
        let mut decoder = RawLumaDecoder::new(4, 2);
        let packet = Packet {
            data: vec![7u8; 5],
            is_key_frame: true,
        };
        assert!(decoder.decode(&packet).is_err());
    }
}
