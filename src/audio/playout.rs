//! Speaker playout: a ring-buffered consumer fed by the RX thread as OPUS
//! packets are decoded.

use anyhow::{anyhow, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapProd, HeapRb};
use std::sync::{Arc, Mutex};

pub struct Playout {
    _stream: cpal::Stream,
    prod: Arc<Mutex<HeapProd<i16>>>,
}

unsafe impl Send for Playout {}
unsafe impl Sync for Playout {}

impl Playout {
    pub fn start(sample_rate: u32, channels: u16) -> Result<Self> {
        let host = cpal::default_host();
        let dev = host.default_output_device().ok_or_else(|| anyhow!("no output device"))?;
        let (stream_cfg, actual_channels) = compatible_output_config(&dev, sample_rate, channels)?;

        let rb = HeapRb::<i16>::new(sample_rate as usize * channels as usize);
        let (prod, cons) = rb.split();
        let prod = Arc::new(Mutex::new(prod));
        let cons = Arc::new(Mutex::new(cons));
        let target_ch = channels;

        let stream = dev.build_output_stream(
            &stream_cfg,
            move |out: &mut [i16], _| {
                let Ok(mut c) = cons.lock() else { return };
                if actual_channels == target_ch {
                    for o in out.iter_mut() {
                        *o = c.try_pop().unwrap_or(0);
                    }
                } else {
                    for frame in out.chunks_mut(actual_channels as usize) {
                        let sample = c.try_pop().unwrap_or(0);
                        for o in frame.iter_mut() {
                            *o = sample;
                        }
                    }
                }
            },
            |err| {
                tracing::error!(%err, "audio playout stream error");
            },
            None,
        )?;
        stream.play()?;
        Ok(Self { _stream: stream, prod })
    }

    pub fn push_pcm(&self, pcm: &[i16]) {
        if let Ok(mut p) = self.prod.lock() {
            for &s in pcm {
                let _ = p.try_push(s);
            }
        }
    }
}

pub fn enumerate_output_devices() -> Vec<String> {
    let host = cpal::default_host();
    host.output_devices()
        .map(|devs| devs.filter_map(|d| d.name().ok()).collect())
        .unwrap_or_default()
}

fn compatible_output_config(dev: &cpal::Device, target_rate: u32, target_channels: u16) -> Result<(cpal::StreamConfig, u16)> {
    if let Ok(ranges) = dev.supported_output_configs() {
        for range in ranges {
            if range.channels() == target_channels
                && range.min_sample_rate().0 <= target_rate
                && range.max_sample_rate().0 >= target_rate
            {
                return Ok((
                    cpal::StreamConfig {
                        channels: target_channels,
                        sample_rate: cpal::SampleRate(target_rate),
                        buffer_size: cpal::BufferSize::Default,
                    },
                    target_channels,
                ));
            }
        }
    }
    if let Ok(ranges) = dev.supported_output_configs() {
        for range in ranges {
            if range.min_sample_rate().0 <= target_rate && range.max_sample_rate().0 >= target_rate {
                let ch = range.channels();
                return Ok((
                    cpal::StreamConfig {
                        channels: ch,
                        sample_rate: cpal::SampleRate(target_rate),
                        buffer_size: cpal::BufferSize::Default,
                    },
                    ch,
                ));
            }
        }
    }
    let default = dev.default_output_config().context("no supported output configuration")?;
    let ch = default.channels();
    Ok((default.config(), ch))
}
