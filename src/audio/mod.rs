//! Audio capture/playout/codec boundary. Real device I/O lives behind the
//! `audio-device` feature (`cpal` + `opus` + `ringbuf`); disabling it
//! still leaves the core engine (`frame_manager`, `protocol`, `framing`,
//! `cobs`) fully testable against synthetic PCM/OPUS buffers.

#[cfg(feature = "audio-device")]
pub mod capture;
#[cfg(feature = "audio-device")]
pub mod codec;
#[cfg(feature = "audio-device")]
pub mod playout;

pub const SAMPLE_RATE: u32 = crate::headers::rtp::SAMPLE_RATE;
pub const CHANNELS: u16 = 1;
pub const SAMPLES_PER_FRAME: usize = crate::headers::rtp::SAMPLES_PER_FRAME as usize;

#[cfg(feature = "audio-device")]
pub use capture::Capture;
#[cfg(feature = "audio-device")]
pub use codec::OpusCodec;
#[cfg(feature = "audio-device")]
pub use playout::Playout;
