//! The full protocol stack: RTP/UDP/IP encapsulation, COBS encoding, frame
//! splitting, and the 12-byte transport header that makes up the 133-byte
//! wire frame. One [`ProtocolEngine`] per process, shared (behind a lock)
//! between the audio/TX thread and the control/text paths.

use std::net::Ipv4Addr;
use std::sync::Arc;

use crate::cobs;
use crate::error::ProtocolError;
use crate::framing::{self, PAYLOAD_SIZE};
use crate::headers::{self, ip::TrafficClass, IpHeaderBuilder, RtpFrameBuilder, UdpHeaderBuilder};
use crate::station::StationIdentifier;
use crate::stats::Stats;

/// Reserved 3-byte transport token. Unvalidated on receive — present for
/// wire-format compatibility with the rest of the Opulent Voice
/// ecosystem, not used to authenticate or version frames.
pub const TRANSPORT_TOKEN: [u8; 3] = [0xBB, 0xAA, 0xDD];
pub const TRANSPORT_HEADER_SIZE: usize = framing::TRANSPORT_HEADER_SIZE;
pub const WIRE_FRAME_SIZE: usize = framing::WIRE_FRAME_SIZE;

pub struct ProtocolEngine {
    station: StationIdentifier,
    ip: IpHeaderBuilder,
    rtp: RtpFrameBuilder,
    audio_udp: UdpHeaderBuilder,
    text_udp: UdpHeaderBuilder,
    control_udp: UdpHeaderBuilder,
    stats: Arc<Stats>,
}

impl ProtocolEngine {
    pub fn new(
        station: StationIdentifier,
        source_ip: Ipv4Addr,
        dest_ip: Ipv4Addr,
        timestamp_base: u32,
        stats: Arc<Stats>,
    ) -> Self {
        let rtp = RtpFrameBuilder::new(&station, timestamp_base);
        let source_port = headers::ephemeral_port();
        Self {
            ip: IpHeaderBuilder::new(source_ip, dest_ip),
            rtp,
            audio_udp: UdpHeaderBuilder::new(source_port, headers::PORT_AUDIO),
            text_udp: UdpHeaderBuilder::new(source_port, headers::PORT_TEXT),
            control_udp: UdpHeaderBuilder::new(source_port, headers::PORT_CONTROL),
            station,
            stats,
        }
    }

    pub fn station(&self) -> &StationIdentifier {
        &self.station
    }

    pub fn rtp_mut(&mut self) -> &mut RtpFrameBuilder {
        &mut self.rtp
    }

    fn transport_header(&self) -> [u8; TRANSPORT_HEADER_SIZE] {
        let mut header = [0u8; TRANSPORT_HEADER_SIZE];
        header[..6].copy_from_slice(&self.station.to_bytes());
        header[6..9].copy_from_slice(&TRANSPORT_TOKEN);
        // bytes 9..12 reserved, left zero
        header
    }

    fn wire_frames_from_ip_packet(&self, ip_packet: Vec<u8>) -> Vec<Vec<u8>> {
        let encoded = cobs::encode(&ip_packet);
        Stats::add(&self.stats.cobs_overhead_bytes, encoded.len().saturating_sub(ip_packet.len()) as u64);
        let transport_header = self.transport_header();
        framing::split(&encoded)
            .into_iter()
            .map(|chunk| {
                let mut frame = Vec::with_capacity(WIRE_FRAME_SIZE);
                frame.extend_from_slice(&transport_header);
                frame.extend_from_slice(&chunk);
                frame
            })
            .collect()
    }

    /// Build the wire frames carrying one OPUS audio packet.
    pub fn create_audio_frames(&mut self, opus_packet: &[u8]) -> Result<Vec<Vec<u8>>, ProtocolError> {
        let rtp_packet = self.rtp.build_audio_frame(opus_packet)?;
        let udp_packet = self.audio_udp.build(&rtp_packet, self.ip.source_ip(), self.ip.dest_ip());
        let ip_packet = self.ip.build(&udp_packet, TrafficClass::Voice)?;
        Ok(self.wire_frames_from_ip_packet(ip_packet))
    }

    /// Build the wire frames carrying a UTF-8 text message.
    pub fn create_text_frames(&self, text: &str) -> Result<Vec<Vec<u8>>, ProtocolError> {
        let udp_packet = self.text_udp.build(text.as_bytes(), self.ip.source_ip(), self.ip.dest_ip());
        let ip_packet = self.ip.build(&udp_packet, TrafficClass::Text)?;
        Ok(self.wire_frames_from_ip_packet(ip_packet))
    }

    /// Build the wire frames carrying a control message (e.g. `PTT_START`).
    pub fn create_control_frames(&self, data: &[u8]) -> Result<Vec<Vec<u8>>, ProtocolError> {
        let udp_packet = self.control_udp.build(data, self.ip.source_ip(), self.ip.dest_ip());
        let ip_packet = self.ip.build(&udp_packet, TrafficClass::Control)?;
        Ok(self.wire_frames_from_ip_packet(ip_packet))
    }
}

/// A wire frame split into its transport header and COBS-chunk payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedWireFrame {
    pub station: StationIdentifier,
    pub payload: [u8; PAYLOAD_SIZE],
}

pub fn parse_wire_frame(frame: &[u8]) -> Result<ParsedWireFrame, ProtocolError> {
    if frame.len() != WIRE_FRAME_SIZE {
        return Err(ProtocolError::MalformedUdp("wire frame is not 133 bytes"));
    }
    let mut station_bytes = [0u8; 6];
    station_bytes.copy_from_slice(&frame[0..6]);
    let station = StationIdentifier::from_bytes(&station_bytes)
        .map_err(|_| ProtocolError::MalformedUdp("invalid station id in transport header"))?;

    let mut payload = [0u8; PAYLOAD_SIZE];
    payload.copy_from_slice(&frame[TRANSPORT_HEADER_SIZE..]);
    Ok(ParsedWireFrame { station, payload })
}

/// Destination UDP ports mapped to the traffic class they carry, used by
/// the RX path to dispatch a decoded IP packet's embedded UDP datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodedClass {
    Audio,
    Text,
    Control,
}

pub fn classify_port(port: u16) -> Result<DecodedClass, ProtocolError> {
    match port {
        p if p == headers::PORT_AUDIO => Ok(DecodedClass::Audio),
        p if p == headers::PORT_TEXT => Ok(DecodedClass::Text),
        p if p == headers::PORT_CONTROL => Ok(DecodedClass::Control),
        other => Err(ProtocolError::UnknownPort(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> ProtocolEngine {
        ProtocolEngine::new(
            StationIdentifier::new("W1ABC").unwrap(),
            Ipv4Addr::new(192, 168, 1, 10),
            Ipv4Addr::new(192, 168, 1, 100),
            0,
            Arc::new(Stats::new()),
        )
    }

    #[test]
    fn audio_frame_records_cobs_overhead_bytes() {
        let mut eng = engine();
        let opus = [0x11u8; crate::headers::rtp::OPUS_PAYLOAD_SIZE];
        eng.create_audio_frames(&opus).unwrap();
        assert!(eng.stats.snapshot().cobs_overhead_bytes > 0);
    }

    #[test]
    fn audio_frame_is_a_single_133_byte_wire_frame_for_small_payload() {
        let mut eng = engine();
        let opus = [0x11u8; crate::headers::rtp::OPUS_PAYLOAD_SIZE];
        let frames = eng.create_audio_frames(&opus).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].len(), WIRE_FRAME_SIZE);
    }

    #[test]
    fn wire_frame_carries_station_id_and_token() {
        let mut eng = engine();
        let opus = [0x22u8; crate::headers::rtp::OPUS_PAYLOAD_SIZE];
        let frame = &eng.create_audio_frames(&opus).unwrap()[0];
        assert_eq!(&frame[0..6], &StationIdentifier::new("W1ABC").unwrap().to_bytes());
        assert_eq!(&frame[6..9], &TRANSPORT_TOKEN);
    }

    #[test]
    fn text_frame_roundtrips_through_parse_and_cobs_decode() {
        let eng = engine();
        let frames = eng.create_text_frames("hello").unwrap();
        assert_eq!(frames.len(), 1);
        let parsed = parse_wire_frame(&frames[0]).unwrap();
        assert_eq!(parsed.station.callsign(), "W1ABC");

        let mut with_delim = parsed.payload.to_vec();
        // strip trailing zero padding back to the real COBS frame boundary
        while with_delim.last() == Some(&0) {
            with_delim.pop();
        }
        with_delim.push(0);
        let ip_packet = cobs::decode(&with_delim).unwrap();
        let ip_header = crate::headers::ip::parse_header(&ip_packet).unwrap();
        let udp = crate::headers::udp::parse_header(&ip_packet[crate::headers::ip::HEADER_SIZE..]).unwrap();
        assert_eq!(ip_header.tos, TrafficClass::Text.tos());
        assert_eq!(classify_port(udp.dest_port).unwrap(), DecodedClass::Text);
    }

    #[test]
    fn rejects_wrong_sized_wire_frame() {
        assert!(parse_wire_frame(&[0u8; 10]).is_err());
    }

    #[test]
    fn classify_port_rejects_unknown_port() {
        assert!(matches!(classify_port(12345), Err(ProtocolError::UnknownPort(12345))));
    }
}
