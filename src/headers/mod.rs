//! RTP / UDP / IPv4 header builders, packed with `bytes::BufMut` as plain
//! big-endian field writes — no derive-macro wire format crate.

pub mod ip;
pub mod rtp;
pub mod udp;

pub use ip::{IpHeaderBuilder, TrafficClass};
pub use rtp::RtpFrameBuilder;
pub use udp::UdpHeaderBuilder;

/// Well-known destination UDP ports for each traffic class.
pub const PORT_AUDIO: u16 = 57373;
pub const PORT_TEXT: u16 = 57374;
pub const PORT_CONTROL: u16 = 57375;

/// Ephemeral source port range used when none is configured explicitly.
pub const EPHEMERAL_PORT_MIN: u16 = 49152;
pub const EPHEMERAL_PORT_MAX: u16 = 65535;

pub fn ephemeral_port() -> u16 {
    EPHEMERAL_PORT_MIN + (rand::random::<u16>() % (EPHEMERAL_PORT_MAX - EPHEMERAL_PORT_MIN))
}
