//! BMS frame reassembly.
//!
//! The BMS streams frames split across notifications, sometimes with noise in
//! between.  Each push resynchronises on the magic bytes, cuts out every
//! complete frame and decodes it.  Checksums are reported but not enforced.

use bytes::{Buf, BytesMut};
use tracing::{debug, warn};
use vanlink_core::protocol::bms::{
    checksum_matches, find_frame_start, frame_len, parse_response, FRAME_MAGIC, MIN_FRAME_LEN,
};
use vanlink_core::BmsTelemetry;

use super::Reassembler;

/// Largest declared frame accepted.  Longer declarations are treated as a
/// false magic match.
pub const MAX_FRAME_LEN: usize = 2048;

#[derive(Debug, Default)]
pub struct FrameAssembler {
    buf: BytesMut,
}

impl FrameAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Drops everything before the next magic sequence.  Returns `false` when
    /// no magic is buffered.
    fn resync(&mut self, label: &str) -> bool {
        match find_frame_start(&self.buf) {
            Some(0) => true,
            Some(start) => {
                debug!(channel = %label, dropped = start, "skipping bytes before frame start");
                self.buf.advance(start);
                true
            }
            None => {
                // A lone trailing magic byte may be the start of the next frame.
                let keep = usize::from(self.buf.last() == Some(&FRAME_MAGIC[0]));
                let dropped = self.buf.len() - keep;
                if dropped > 0 {
                    debug!(channel = %label, dropped, "no frame start; discarding bytes");
                    self.buf.advance(dropped);
                }
                false
            }
        }
    }
}

impl Reassembler for FrameAssembler {
    type Output = BmsTelemetry;

    fn push(&mut self, chunk: &[u8], label: &str) -> Vec<BmsTelemetry> {
        self.buf.extend_from_slice(chunk);

        let mut frames = Vec::new();
        while self.resync(label) {
            let Some(len) = frame_len(&self.buf) else {
                break;
            };
            if !(MIN_FRAME_LEN..=MAX_FRAME_LEN).contains(&len) {
                warn!(channel = %label, declared = len, "implausible frame length; skipping magic");
                self.buf.advance(FRAME_MAGIC.len());
                continue;
            }
            if self.buf.len() < len {
                break;
            }

            let frame = self.buf.split_to(len);
            if !checksum_matches(&frame) {
                debug!(channel = %label, "frame checksum mismatch; decoding anyway");
            }
            match parse_response(&frame) {
                Some(telemetry) => frames.push(telemetry),
                None => debug!(channel = %label, bytes = len, "undecodable frame dropped"),
            }
        }
        frames
    }

    fn reset(&mut self) {
        self.buf.clear();
    }
}
