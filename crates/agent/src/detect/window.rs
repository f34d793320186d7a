//! Rolling three-frame window over the packet cursor.

use stream_ingest::{CursorError, FrameDecoder, GrayFrame, PacketCursor};
use tracing::debug;

/// Pulls packets, filters to key frames, and decodes them on demand.
///
/// Empty payloads and non-key packets are skipped silently; decode failures
/// are skipped with a debug log. End-of-stream and cursor errors both end the
/// stream of frames.
pub struct FrameSource<C, D> {
    cursor: C,
    decoder: D,
}

impl<C: PacketCursor, D: FrameDecoder> FrameSource<C, D> {
    pub fn new(cursor: C, decoder: D) -> Self {
        Self { cursor, decoder }
    }

    /// Next decodable key frame, or `None` once the cursor is exhausted.
    pub fn next_key_frame(&mut self) -> Option<GrayFrame> {
        loop {
            match self.cursor.read_packet() {
                Ok(packet) => {
                    if packet.data.is_empty() || !packet.is_key_frame {
                        continue;
                    }
                    match self.decoder.decode(&packet) {
                        Ok(frame) => return Some(frame),
                        Err(err) => {
                            debug!("dropping undecodable key frame: {err}");
                            continue;
                        }
                    }
                }
                Err(CursorError::EndOfStream) => return None,
                Err(CursorError::Other(err)) => {
                    debug!("packet cursor failed: {err:#}");
                    return None;
                }
            }
        }
    }
}

/// Fixed triple of the most recent frames: `(oldest, middle, newest)`.
///
/// The window never rotates itself; the pipeline rotates it once per accepted
/// frame so ordering relative to gating and emission stays explicit.
pub struct FrameWindow {
    slots: [GrayFrame; 3],
}

impl FrameWindow {
    /// Pull frames until three are accepted. `None` when the stream ends
    /// first, in which case the detection loop must not run.
    pub fn prime<C: PacketCursor, D: FrameDecoder>(
        source: &mut FrameSource<C, D>,
    ) -> Option<Self> {
        let first = source.next_key_frame()?;
        let second = source.next_key_frame()?;
        let third = source.next_key_frame()?;
        Some(Self {
            slots: [first, second, third],
        })
    }

    /// Shift left and install `newest`, releasing the oldest frame.
    pub fn rotate(&mut self, newest: GrayFrame) {
        self.slots.rotate_left(1);
        self.slots[2] = newest;
    }

    pub fn oldest(&self) -> &GrayFrame {
        &self.slots[0]
    }

    pub fn middle(&self) -> &GrayFrame {
        &self.slots[1]
    }

    pub fn newest(&self) -> &GrayFrame {
        &self.slots[2]
    }
}
