//! RTP (RFC 3550) header construction for Opulent Voice audio frames.

use bytes::{BufMut, BytesMut};

use crate::error::ProtocolError;
use crate::station::StationIdentifier;

pub const VERSION: u8 = 2;
pub const PT_OPUS: u8 = 96;
pub const HEADER_SIZE: usize = 12;

pub const FRAME_DURATION_MS: u32 = 40;
pub const SAMPLE_RATE: u32 = 48_000;
pub const OPUS_PAYLOAD_SIZE: usize = 80;
pub const SAMPLES_PER_FRAME: u32 = 1920;

/// FNV-1a, used to derive a deterministic SSRC from a station's callsign.
fn fnv1a_u32(bytes: &[u8]) -> u32 {
    const FNV_OFFSET: u32 = 0x811C_9DC5;
    const FNV_PRIME: u32 = 0x0100_0193;
    let mut h = FNV_OFFSET;
    for &b in bytes {
        h ^= b as u32;
        h = h.wrapping_mul(FNV_PRIME);
    }
    h
}

/// Builds successive RTP-framed OPUS audio packets for one talk session.
/// One instance lives for the process lifetime of the audio/TX thread.
pub struct RtpFrameBuilder {
    sequence_number: u16,
    ssrc: u32,
    timestamp_base: u32,
    talk_spurt_open: bool,
}

impl RtpFrameBuilder {
    pub fn new(station: &StationIdentifier, timestamp_base: u32) -> Self {
        let mut ssrc = fnv1a_u32(station.callsign().as_bytes());
        if ssrc == 0 {
            ssrc = 1;
        }
        Self {
            sequence_number: rand::random(),
            ssrc,
            timestamp_base,
            talk_spurt_open: false,
        }
    }

    pub fn ssrc(&self) -> u32 {
        self.ssrc
    }

    /// Mark the next frame as the start of a new talk spurt (RTP marker bit).
    /// Called on PTT press and whenever a mid-spurt resync is needed.
    pub fn start_new_talk_spurt(&mut self) {
        self.talk_spurt_open = false;
    }

    pub fn end_talk_spurt(&mut self) {
        self.talk_spurt_open = true;
    }

    fn is_talk_spurt_start(&self) -> bool {
        !self.talk_spurt_open
    }

    /// Build one RTP packet (header + raw OPUS payload). `opus_packet` must
    /// be exactly [`OPUS_PAYLOAD_SIZE`] bytes.
    pub fn build_audio_frame(&mut self, opus_packet: &[u8]) -> Result<Vec<u8>, ProtocolError> {
        if opus_packet.len() != OPUS_PAYLOAD_SIZE {
            return Err(ProtocolError::ProtocolViolation {
                expected: OPUS_PAYLOAD_SIZE,
                got: opus_packet.len(),
            });
        }

        let marker = self.is_talk_spurt_start();
        let timestamp = self
            .timestamp_base
            .wrapping_add((self.sequence_number as u32).wrapping_mul(SAMPLES_PER_FRAME));

        let first_word = ((VERSION as u32) << 30)
            | ((marker as u32) << 23)
            | ((PT_OPUS as u32) << 16)
            | self.sequence_number as u32;

        let mut buf = BytesMut::with_capacity(HEADER_SIZE + opus_packet.len());
        buf.put_u32(first_word);
        buf.put_u32(timestamp);
        buf.put_u32(self.ssrc);
        buf.put_slice(opus_packet);

        self.sequence_number = self.sequence_number.wrapping_add(1);
        self.talk_spurt_open = true;
        Ok(buf.to_vec())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRtpHeader {
    pub version: u8,
    pub marker: bool,
    pub payload_type: u8,
    pub sequence_number: u16,
    pub timestamp: u32,
    pub ssrc: u32,
}

pub fn parse_header(bytes: &[u8]) -> Result<ParsedRtpHeader, ProtocolError> {
    if bytes.len() < HEADER_SIZE {
        return Err(ProtocolError::MalformedUdp("RTP header truncated"));
    }
    let first_word = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let timestamp = u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    let ssrc = u32::from_be_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);

    Ok(ParsedRtpHeader {
        version: ((first_word >> 30) & 0x3) as u8,
        marker: ((first_word >> 23) & 0x1) != 0,
        payload_type: ((first_word >> 16) & 0x7F) as u8,
        sequence_number: (first_word & 0xFFFF) as u16,
        timestamp,
        ssrc,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn station() -> StationIdentifier {
        StationIdentifier::new("W1ABC").unwrap()
    }

    #[test]
    fn ssrc_is_derived_and_nonzero() {
        let builder = RtpFrameBuilder::new(&station(), 0);
        assert_ne!(builder.ssrc(), 0);
    }

    #[test]
    fn rejects_wrong_payload_size() {
        let mut builder = RtpFrameBuilder::new(&station(), 0);
        let err = builder.build_audio_frame(&[0u8; 40]).unwrap_err();
        assert!(matches!(err, ProtocolError::ProtocolViolation { expected: 80, got: 40 }));
    }

    #[test]
    fn first_frame_after_talk_spurt_start_sets_marker() {
        let mut builder = RtpFrameBuilder::new(&station(), 0);
        builder.start_new_talk_spurt();
        let packet = [0xAAu8; OPUS_PAYLOAD_SIZE];
        let frame = builder.build_audio_frame(&packet).unwrap();
        let parsed = parse_header(&frame).unwrap();
        assert!(parsed.marker);

        let frame2 = builder.build_audio_frame(&packet).unwrap();
        let parsed2 = parse_header(&frame2).unwrap();
        assert!(!parsed2.marker);
    }

    #[test]
    fn sequence_number_increments_and_wraps() {
        let mut builder = RtpFrameBuilder::new(&station(), 0);
        builder.sequence_number = 0xFFFF;
        let packet = [0u8; OPUS_PAYLOAD_SIZE];
        let frame = builder.build_audio_frame(&packet).unwrap();
        let parsed = parse_header(&frame).unwrap();
        assert_eq!(parsed.sequence_number, 0xFFFF);
        assert_eq!(builder.sequence_number, 0);
    }

    #[test]
    fn header_round_trips_version_and_payload_type() {
        let mut builder = RtpFrameBuilder::new(&station(), 12345);
        let packet = [0x7Fu8; OPUS_PAYLOAD_SIZE];
        let frame = builder.build_audio_frame(&packet).unwrap();
        let parsed = parse_header(&frame).unwrap();
        assert_eq!(parsed.version, VERSION);
        assert_eq!(parsed.payload_type, PT_OPUS);
        assert_eq!(&frame[HEADER_SIZE..], &packet[..]);
    }
}
