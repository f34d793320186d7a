//! Pull-based packet sources.

use crossbeam_channel::Receiver;

use crate::types::{CursorError, Packet};

/// Pull seam the detection loop reads packets from.
pub trait PacketCursor {
    /// Fetch the next packet, or `CursorError::EndOfStream` when the
    /// upstream capture has finished.
    fn read_packet(&mut self) -> Result<Packet, CursorError>;
}

/// Cursor over a bounded channel fed by a capture thread.
///
/// A closed channel is reported as end-of-stream, which is how capture
/// shutdown propagates into the detection loop.
pub struct ChannelCursor {
    rx: Receiver<Packet>,
}

impl ChannelCursor {
    pub fn new(rx: Receiver<Packet>) -> Self {
        Self { rx }
    }
}

impl PacketCursor for ChannelCursor {
    fn read_packet(&mut self) -> Result<Packet, CursorError> {
        self.rx.recv().map_err(|_| CursorError::EndOfStream)
    }
}
