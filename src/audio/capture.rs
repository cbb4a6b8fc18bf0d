//! Microphone capture. The callback calls `on_frame` directly the moment
//! a full 1920-sample (40ms) frame has accumulated — this is what drives
//! the scheduler tick on the audio/TX thread, rather than a separate
//! thread polling a ring buffer on its own schedule.

use anyhow::{anyhow, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::{Arc, Mutex};

use super::SAMPLES_PER_FRAME;

pub struct Capture {
    _stream: cpal::Stream,
}

// Safety: cpal::Stream carries platform handles that are Send but not Sync
// on some backends. The stream is only ever touched to keep it alive
// (dropping it tears down the device callback).
unsafe impl Send for Capture {}
unsafe impl Sync for Capture {}

impl Capture {
    /// Start capturing and invoke `on_frame` with exactly
    /// [`SAMPLES_PER_FRAME`] mono i16 samples each time one is ready.
    pub fn start(sample_rate: u32, channels: u16, mut on_frame: impl FnMut(&[i16]) + Send + 'static) -> Result<Self> {
        let host = cpal::default_host();
        let dev = host.default_input_device().ok_or_else(|| anyhow!("no input device"))?;
        let (stream_cfg, actual_channels) = compatible_input_config(&dev, sample_rate, channels)?;

        let pending = Arc::new(Mutex::new(Vec::<i16>::with_capacity(SAMPLES_PER_FRAME * 2)));
        let target_ch = channels;

        let stream = dev.build_input_stream(
            &stream_cfg,
            move |data: &[i16], _| {
                let Ok(mut buf) = pending.lock() else { return };
                if actual_channels == target_ch {
                    buf.extend_from_slice(data);
                } else {
                    for chunk in data.chunks(actual_channels as usize) {
                        if let Some(&s) = chunk.first() {
                            buf.push(s);
                        }
                    }
                }
                while buf.len() >= SAMPLES_PER_FRAME {
                    let frame: Vec<i16> = buf.drain(..SAMPLES_PER_FRAME).collect();
                    on_frame(&frame);
                }
            },
            |err| {
                tracing::error!(%err, "audio capture stream error");
            },
            None,
        )?;
        stream.play()?;
        Ok(Self { _stream: stream })
    }
}

pub fn enumerate_input_devices() -> Vec<String> {
    let host = cpal::default_host();
    host.input_devices()
        .map(|devs| devs.filter_map(|d| d.name().ok()).collect())
        .unwrap_or_default()
}

fn compatible_input_config(dev: &cpal::Device, target_rate: u32, target_channels: u16) -> Result<(cpal::StreamConfig, u16)> {
    if let Ok(ranges) = dev.supported_input_configs() {
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
    if let Ok(ranges) = dev.supported_input_configs() {
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
    let default = dev.default_input_config().context("no supported input configuration")?;
    let ch = default.channels();
    Ok((default.config(), ch))
}
