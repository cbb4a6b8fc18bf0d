//! Thin OPUS encode/decode wrapper — the protocol layer above this only
//! cares about the resulting byte sizes, not codec internals.

use anyhow::Result;

/// Constant bitrate chosen so a 40ms frame always encodes to exactly
/// [`crate::headers::rtp::OPUS_PAYLOAD_SIZE`] (80) bytes:
/// 16000 bps * 0.04 s / 8 = 80 bytes.
const CBR_BITRATE_BPS: i32 = 16_000;

pub struct OpusCodec {
    enc: opus::Encoder,
    dec: opus::Decoder,
}

impl OpusCodec {
    pub fn new(sample_rate: u32, channels: u16) -> Result<Self> {
        let ch = if channels == 2 { opus::Channels::Stereo } else { opus::Channels::Mono };
        let mut enc = opus::Encoder::new(sample_rate, ch, opus::Application::Voip)?;
        enc.set_vbr(false)?;
        enc.set_bitrate(opus::Bitrate::Bits(CBR_BITRATE_BPS))?;
        let dec = opus::Decoder::new(sample_rate, ch)?;
        Ok(Self { enc, dec })
    }

    pub fn encode(&mut self, pcm: &[i16], out: &mut [u8]) -> Result<usize> {
        Ok(self.enc.encode(pcm, out)?)
    }

    pub fn decode(&mut self, data: &[u8], pcm_out: &mut [i16]) -> Result<usize> {
        Ok(self.dec.decode(data, pcm_out, false)?)
    }
}
