//! Frame splitter and reassembler: turns a COBS-encoded datagram into
//! fixed 121-byte payload chunks for the 133-byte wire frame, and back.

use tracing::warn;

use crate::error::ReassemblyError;

pub const WIRE_FRAME_SIZE: usize = 133;
pub const TRANSPORT_HEADER_SIZE: usize = 12;
pub const PAYLOAD_SIZE: usize = WIRE_FRAME_SIZE - TRANSPORT_HEADER_SIZE; // 121

/// Safety ceiling on the reassembly buffer. A well-formed peer never
/// accumulates more than a few kilobytes without a delimiter; this bounds
/// memory use against a corrupt or hostile stream.
const REASSEMBLY_BUFFER_CEILING: usize = 64 * 1024;

/// Split a complete COBS-encoded frame (including its trailing
/// delimiter) into zero-padded [`PAYLOAD_SIZE`]-byte chunks.
pub fn split(cobs_frame: &[u8]) -> Vec<[u8; PAYLOAD_SIZE]> {
    if cobs_frame.is_empty() {
        return vec![[0u8; PAYLOAD_SIZE]];
    }

    let mut chunks = Vec::with_capacity(cobs_frame.len().div_ceil(PAYLOAD_SIZE));
    for chunk in cobs_frame.chunks(PAYLOAD_SIZE) {
        let mut padded = [0u8; PAYLOAD_SIZE];
        padded[..chunk.len()].copy_from_slice(chunk);
        chunks.push(padded);
    }
    chunks
}

/// Stateful byte-stream reassembler. One instance per peer on the RX
/// side; callers feed it successive 121-byte payloads stripped of their
/// transport header and receive back zero or more complete COBS frames
/// (without the trailing delimiter).
#[derive(Debug, Default)]
pub struct Reassembler {
    buffer: Vec<u8>,
    empty_frames_dropped: u64,
}

impl Reassembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Count of empty-run-between-two-delimiters occurrences seen so far,
    /// reset to zero by the call. Callers poll this after `add_payload`
    /// to feed a statistics counter without `Reassembler` itself owning
    /// one.
    pub fn take_empty_frames_dropped(&mut self) -> u64 {
        std::mem::take(&mut self.empty_frames_dropped)
    }

    pub fn add_payload(&mut self, payload: &[u8]) -> Result<Vec<Vec<u8>>, ReassemblyError> {
        if payload.len() != PAYLOAD_SIZE {
            return Err(ReassemblyError::InvalidPayloadSize { expected: PAYLOAD_SIZE, got: payload.len() });
        }

        self.buffer.extend_from_slice(payload);
        if self.buffer.len() > REASSEMBLY_BUFFER_CEILING {
            let overflowed = self.buffer.len();
            self.buffer.clear();
            return Err(ReassemblyError::Overflow(overflowed));
        }

        let mut frames = Vec::new();
        loop {
            let Some(delim) = self.buffer.iter().position(|&b| b == 0) else {
                break;
            };
            if delim == 0 {
                warn!("{}", ReassemblyError::EmptyFrame);
                self.empty_frames_dropped += 1;
                self.buffer.remove(0);
                continue;
            }
            let frame: Vec<u8> = self.buffer.drain(..=delim).collect();
            frames.push(frame[..frame.len() - 1].to_vec());
        }
        Ok(frames)
    }
}
